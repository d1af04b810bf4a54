//! Predictor safety: the prefilter may report false candidates but must
//! never skip a real match.

use harrow_compiler::{PatternOptions, compile};

use crate::input::Input;
use crate::matcher::Matcher;

fn all_spans(pattern: &str, hay: &[u8]) -> Vec<(usize, usize)> {
    let program = compile(pattern, &PatternOptions::default()).unwrap();
    Matcher::new(&program, Input::from_bytes(hay.to_vec()))
        .find_iter()
        .map(|m| (m.start, m.end))
        .collect()
}

/// Brute-force reference: try the interpreter at every position.
fn reference_spans(pattern: &str, hay: &[u8]) -> Vec<(usize, usize)> {
    let program = compile(pattern, &PatternOptions::default()).unwrap();
    let mut out = Vec::new();
    let mut at = 0;
    while at <= hay.len() {
        let mut m = Matcher::new(&program, Input::from_bytes(hay[at..].to_vec()));
        match m.scan() {
            Some(hit) if hit.start == 0 => {
                out.push((at, at + hit.end));
                at += hit.end.max(1);
            }
            _ => at += 1,
        }
    }
    out
}

fn assert_agrees(pattern: &str, hay: &[u8]) {
    assert_eq!(
        all_spans(pattern, hay),
        reference_spans(pattern, hay),
        "prefilter dropped candidates for {pattern:?}"
    );
}

#[test]
fn literal_prefix_filter_is_safe() {
    assert_agrees("status", b"the status: statuses have status codes");
    assert_agrees("xyzzy", b"no such word here");
}

#[test]
fn short_pattern_bitap_is_safe() {
    assert_agrees("ab", b"abab cab drab");
    assert_agrees("a.c", b"abc axc a-c ac abbc");
}

#[test]
fn class_pattern_filter_is_safe() {
    assert_agrees("[0-9][0-9]", b"a 12 b 3 c 456");
    assert_agrees("v[aeiou]t", b"vat vet vit vt vut vot");
}

#[test]
fn alternation_filter_is_safe() {
    assert_agrees("cat|cow|dog", b"a catalog of cows and dogs");
}

#[test]
fn variable_prefix_lookback_is_safe() {
    // the literal content sits after a variable-length prefix
    assert_agrees("[a-z]+ing", b"running walked swimming sing i ing");
}

#[test]
fn anchored_pattern_filter_is_safe() {
    let spans = all_spans("[a-z]+z", b"fizz buzz az z");
    let reference = reference_spans("[a-z]+z", b"fizz buzz az z");
    assert_eq!(spans, reference);
}

#[test]
fn matches_at_buffer_tail_are_found() {
    // candidates that end exactly at the buffer end must not be lost
    assert_agrees("end", b"the very end");
    assert_agrees("[0-9]+", b"count 42");
}

#[test]
fn predictor_tables_are_populated_for_literals() {
    let program = compile("needle", &PatternOptions::default()).unwrap();
    let p = program.predictor();
    assert_eq!(p.len, 6);
    assert!(p.one);
    assert_eq!(&p.chr[..6], b"needle");
}

#[test]
fn predictor_min_reflects_shortest_path() {
    let program = compile("[a-z][0-9]", &PatternOptions::default()).unwrap();
    assert_eq!(program.predictor().min, 2);

    let program = compile("[0-9]", &PatternOptions::default()).unwrap();
    assert_eq!(program.predictor().min, 1);
}

#[test]
fn mixed_length_literals_share_a_prefix() {
    let program = compile("ab|abcd", &PatternOptions::default()).unwrap();
    let p = program.predictor();
    assert_eq!(p.len, 2);
    assert_eq!(&p.chr[..2], b"ab");
    assert!(!p.one); // accepting state still has outgoing edges
}

#[test]
fn nullable_pattern_disables_prefilter() {
    let program = compile("a*", &PatternOptions::default()).unwrap();
    let p = program.predictor();
    assert_eq!(p.min, 0);
    assert_eq!(p.len, 0);
}
