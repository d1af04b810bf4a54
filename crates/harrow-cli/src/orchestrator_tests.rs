use std::io::Write;

use harrow_compiler::{PatternOptions, compile};
use harrow_vm::{Input, MatchRecord};

use crate::orchestrator::Orchestrator;
use crate::output::{CountSink, OutputSink, TextSink};

struct Collect {
    records: Vec<(MatchRecord, Vec<u8>)>,
}

impl OutputSink for Collect {
    fn record(&mut self, record: &MatchRecord, matched: &[u8]) -> std::io::Result<()> {
        self.records.push((record.clone(), matched.to_vec()));
        Ok(())
    }
}

fn search(pattern: &str, hay: &str) -> Vec<(MatchRecord, Vec<u8>)> {
    let opts = PatternOptions::default().multiline(true);
    let program = compile(pattern, &opts).unwrap();
    let orchestrator = Orchestrator::new(&program);
    let mut sink = Collect {
        records: Vec::new(),
    };
    orchestrator.search_input("part", Input::from_bytes(hay.as_bytes().to_vec()), &mut sink);
    sink.records
}

#[test]
fn line_and_column_tracking() {
    let records = search("fox", "the quick\nbrown fox\njumps\nfox");
    assert_eq!(records.len(), 2);
    let (first, text) = &records[0];
    assert_eq!(first.line, 2);
    assert_eq!(first.column, 7);
    assert_eq!(first.byte_offset, 16);
    assert_eq!(text, b"fox");
    let (second, _) = &records[1];
    assert_eq!(second.line, 4);
    assert_eq!(second.column, 1);
}

#[test]
fn utf8_columns_skip_continuation_bytes() {
    // é is two bytes but one column
    let records = search("x", "é\u{e9}x");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0.line, 1);
    assert_eq!(records[0].0.column, 3);
    assert_eq!(records[0].0.byte_offset, 4);
}

#[test]
fn matches_in_order_with_offsets() {
    let records = search("[0-9]+", "a1b22c333");
    let offsets: Vec<_> = records.iter().map(|(r, _)| r.byte_offset).collect();
    assert_eq!(offsets, vec![1, 3, 6]);
    let lengths: Vec<_> = records.iter().map(|(r, _)| r.length).collect();
    assert_eq!(lengths, vec![1, 2, 3]);
}

#[test]
fn redo_matches_are_suppressed_by_default() {
    let opts = PatternOptions::default();
    let program = compile("(?^hidden)", &opts).unwrap();
    let orchestrator = Orchestrator::new(&program);
    let mut sink = CountSink::default();
    orchestrator.search_input(
        "p",
        Input::from_bytes(b"this is hidden text".to_vec()),
        &mut sink,
    );
    assert_eq!(sink.matches, 0);

    let mut orchestrator = Orchestrator::new(&program);
    orchestrator.report_redo = true;
    let mut sink = CountSink::default();
    orchestrator.search_input(
        "p",
        Input::from_bytes(b"this is hidden text".to_vec()),
        &mut sink,
    );
    assert_eq!(sink.matches, 1);
}

#[test]
fn text_sink_formats_lines() {
    let opts = PatternOptions::default().multiline(true);
    let program = compile("b+", &opts).unwrap();
    let orchestrator = Orchestrator::new(&program);
    let mut out = Vec::new();
    {
        let mut sink = TextSink::new(&mut out);
        orchestrator.search_input("f.txt", Input::from_bytes(b"a\nbb".to_vec()), &mut sink);
        sink.finish().unwrap();
    }
    let text = String::from_utf8(out).unwrap();
    assert_eq!(text, "f.txt:2:1:bb\n");
}

#[test]
fn cancellation_stops_the_search() {
    let opts = PatternOptions::default();
    let program = compile("x", &opts).unwrap();
    let orchestrator = Orchestrator::new(&program);
    orchestrator.cancel_flag().store(true, std::sync::atomic::Ordering::Relaxed);
    let mut sink = CountSink::default();
    let status = orchestrator.search_input(
        "p",
        Input::from_bytes(b"xxxx".to_vec()),
        &mut sink,
    );
    assert_eq!(status.matches, 0);
}

#[test]
fn search_path_over_gzip_names_the_file() {
    let packed = flate2_gz(b"needle in line\n");
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.gz");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&packed)
        .unwrap();

    let opts = PatternOptions::default().multiline(true);
    let program = compile("needle", &opts).unwrap();
    let orchestrator = Orchestrator::new(&program);
    let mut sink = Collect {
        records: Vec::new(),
    };
    let status = orchestrator.search_path(&path, 1, &mut sink);
    assert_eq!(status.matches, 1);
    assert!(sink.records[0].0.partname.ends_with("data.gz"));
    assert_eq!(sink.records[0].1, b"needle");
}

fn flate2_gz(data: &[u8]) -> Vec<u8> {
    // the unpack crate carries flate2; reuse it through a small local
    // gzip writer to build the fixture
    use std::io::Write as _;
    let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}
