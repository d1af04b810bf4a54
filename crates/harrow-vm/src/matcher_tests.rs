use harrow_compiler::{PatternOptions, compile};

use crate::input::Input;
use crate::matcher::Matcher;
use crate::record::Match;

fn find_all(pattern: &str, options: &PatternOptions, hay: &str) -> Vec<Match> {
    let program = compile(pattern, options).unwrap();
    Matcher::new(&program, Input::from_bytes(hay.as_bytes().to_vec()))
        .find_iter()
        .collect()
}

fn spans(matches: &[Match]) -> Vec<(usize, usize)> {
    matches.iter().map(|m| (m.start, m.end)).collect()
}

#[test]
fn alternation_group_captures() {
    let ms = find_all("a(b|c)d", &PatternOptions::default(), "xabdxacdx");
    assert_eq!(spans(&ms), vec![(1, 4), (5, 8)]);
    let c1 = ms[0].captures[1].unwrap();
    assert_eq!((c1.begin, c1.end), (2, 3)); // "b"
    let c2 = ms[1].captures[1].unwrap();
    assert_eq!((c2.begin, c2.end), (6, 7)); // "c"
    // group 0 spans the whole match
    let c0 = ms[0].captures[0].unwrap();
    assert_eq!((c0.begin, c0.end), (1, 4));
}

#[test]
fn repeated_class_matches() {
    let ms = find_all("([0-9]+)", &PatternOptions::default(), "v12 v345");
    assert_eq!(spans(&ms), vec![(1, 3), (5, 8)]);
    let c = ms[1].captures[1].unwrap();
    assert_eq!((c.begin, c.end), (5, 8));
}

#[test]
fn lazy_beats_greedy() {
    let ms = find_all("a.*?b", &PatternOptions::default(), "aXbYb");
    assert_eq!(ms[0].start, 0);
    assert_eq!(ms[0].end, 3); // "aXb", not "aXbYb"
}

#[test]
fn multiline_bol_anchor() {
    let opts = PatternOptions::default().multiline(true).dotall(true);
    let ms = find_all("^hello", &opts, "x\nhello\n");
    assert_eq!(spans(&ms), vec![(2, 7)]);
}

#[test]
fn word_boundaries() {
    let ms = find_all(r"\bthe\b", &PatternOptions::default(), "there the other");
    assert_eq!(spans(&ms), vec![(6, 9)]);
}

#[test]
fn plain_literal_find_all() {
    let ms = find_all("foo", &PatternOptions::default(), "a foo b foofoo");
    assert_eq!(spans(&ms), vec![(2, 5), (8, 11), (11, 14)]);
    assert_eq!(ms[0].accept, 1);
}

#[test]
fn literal_alternation_uses_accept_labels() {
    let ms = find_all("cat|dog", &PatternOptions::default(), "a dog, a cat");
    assert_eq!(spans(&ms), vec![(2, 5), (9, 12)]);
    assert_eq!(ms[0].accept, 2); // dog is the second alternation
    assert_eq!(ms[1].accept, 1);
}

#[test]
fn case_insensitive_literals() {
    let opts = PatternOptions::default().case_insensitive(true);
    let ms = find_all("abc", &opts, "xABcyAbC");
    assert_eq!(spans(&ms), vec![(1, 4), (5, 8)]);
}

#[test]
fn empty_pattern_matches_everywhere() {
    let ms = find_all("", &PatternOptions::default(), "ab");
    assert_eq!(spans(&ms), vec![(0, 0), (1, 1), (2, 2)]);
    assert!(ms.iter().all(|m| m.is_empty()));
}

#[test]
fn caret_dollar_matches_empty_lines_only() {
    let opts = PatternOptions::default().multiline(true);
    let ms = find_all("^$", &opts, "a\n\nb\n");
    let at = spans(&ms);
    assert!(at.contains(&(2, 2)), "empty line not matched: {at:?}");
    assert!(!at.contains(&(0, 0)));
    assert!(!at.contains(&(1, 1)));
    assert!(!at.contains(&(4, 4)));
}

#[test]
fn counted_repeat() {
    let ms = find_all("a{2,3}", &PatternOptions::default(), "a aa aaaa");
    // leftmost-longest: aa, then aaa + a leftover matched as aa? no:
    // positions 5..8 aaa, leaving one a at 8 which alone cannot match
    assert_eq!(spans(&ms), vec![(2, 4), (5, 8)]);
}

#[test]
fn negative_pattern_reports_redo() {
    let ms = find_all("(?^bad)", &PatternOptions::default(), "a bad b");
    assert_eq!(ms.len(), 1);
    assert!(ms[0].redo);
    assert_eq!(ms[0].accept, 0);
    assert_eq!((ms[0].start, ms[0].end), (2, 5));
}

#[test]
fn scan_is_anchored() {
    let program = compile("foo", &PatternOptions::default()).unwrap();
    let mut m = Matcher::new(&program, Input::from_bytes(b"foobar".to_vec()));
    let hit = m.scan().unwrap();
    assert_eq!((hit.start, hit.end), (0, 3));

    let mut m = Matcher::new(&program, Input::from_bytes(b"xfoo".to_vec()));
    assert!(m.scan().is_none());
}

#[test]
fn matches_requires_full_input() {
    let program = compile("[0-9]+", &PatternOptions::default()).unwrap();
    let mut m = Matcher::new(&program, Input::from_bytes(b"123".to_vec()));
    assert!(m.matches().is_some());

    let mut m = Matcher::new(&program, Input::from_bytes(b"12x".to_vec()));
    assert!(m.matches().is_none());
}

#[test]
fn split_emits_final_tail() {
    let program = compile(",", &PatternOptions::default()).unwrap();
    let m = Matcher::new(&program, Input::from_bytes(b"a,b,,c".to_vec()));
    let parts: Vec<(Vec<u8>, bool)> = m
        .split_iter()
        .map(|(field, delim)| (field, delim.is_some()))
        .collect();
    assert_eq!(
        parts,
        vec![
            (b"a".to_vec(), true),
            (b"b".to_vec(), true),
            (b"".to_vec(), true),
            (b"c".to_vec(), false),
        ]
    );
}

#[test]
fn split_without_delimiter_is_one_field() {
    let program = compile(";", &PatternOptions::default()).unwrap();
    let m = Matcher::new(&program, Input::from_bytes(b"plain".to_vec()));
    let parts: Vec<_> = m.split_iter().collect();
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].0, b"plain".to_vec());
    assert!(parts[0].1.is_none());
}

#[test]
fn dollar_at_end_of_buffer() {
    let opts = PatternOptions::default().multiline(true);
    let ms = find_all("end$", &opts, "the end\nend here");
    assert_eq!(spans(&ms), vec![(4, 7)]);
}

#[test]
fn dot_does_not_cross_newline_by_default() {
    let ms = find_all("a.b", &PatternOptions::default(), "a\nb axb");
    assert_eq!(spans(&ms), vec![(4, 7)]);
}

#[test]
fn dotall_crosses_newline() {
    let opts = PatternOptions::default().dotall(true);
    let ms = find_all("a.b", &opts, "a\nb");
    assert_eq!(spans(&ms), vec![(0, 3)]);
}

#[test]
fn longest_match_wins() {
    let ms = find_all("ab|abc", &PatternOptions::default(), "abc");
    assert_eq!(spans(&ms), vec![(0, 3)]);
}

#[test]
fn lookahead_records_its_span() {
    let ms = find_all("foo(?=bar)", &PatternOptions::default(), "foobar foox");
    assert_eq!(ms.len(), 1);
    assert_eq!((ms[0].start, ms[0].end), (0, 6));
    let la = ms[0].captures[1].unwrap();
    assert_eq!((la.begin, la.end), (3, 6));
}

#[test]
fn streamed_input_matches_across_chunks() {
    let program = compile("needle", &PatternOptions::default()).unwrap();
    let mut hay = vec![b'x'; 200_000];
    hay.extend_from_slice(b"needle");
    hay.extend(vec![b'y'; 100]);
    let m = Matcher::new(&program, Input::from_reader(std::io::Cursor::new(hay)));
    let ms: Vec<Match> = m.find_iter().collect();
    assert_eq!(spans(&ms), vec![(200_000, 200_006)]);
}
