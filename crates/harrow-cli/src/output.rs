//! Output sinks for match records.
//!
//! The orchestrator talks to a `&mut dyn OutputSink`; nothing here is
//! process-global. Formatting beyond these sinks (color, context
//! lines, the TUI) belongs to outer layers.

use std::io::Write;

use harrow_vm::MatchRecord;

pub trait OutputSink {
    /// One match: the record plus the matched bytes.
    fn record(&mut self, record: &MatchRecord, matched: &[u8]) -> std::io::Result<()>;

    /// End of one searched file or part stream.
    fn finish(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// `name:line:column: text` lines, grep-style.
pub struct TextSink<W: Write> {
    out: W,
    show_offsets: bool,
}

impl<W: Write> TextSink<W> {
    pub fn new(out: W) -> Self {
        TextSink {
            out,
            show_offsets: false,
        }
    }

    pub fn show_offsets(mut self, yes: bool) -> Self {
        self.show_offsets = yes;
        self
    }
}

impl<W: Write> OutputSink for TextSink<W> {
    fn record(&mut self, record: &MatchRecord, matched: &[u8]) -> std::io::Result<()> {
        if !record.partname.is_empty() {
            write!(self.out, "{}:", record.partname)?;
        }
        write!(self.out, "{}:{}:", record.line, record.column)?;
        if self.show_offsets {
            write!(self.out, "{}+{}:", record.byte_offset, record.length)?;
        }
        self.out.write_all(&sanitize(matched))?;
        writeln!(self.out)
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

/// One JSON object per match, newline-delimited.
pub struct JsonSink<W: Write> {
    out: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(out: W) -> Self {
        JsonSink { out }
    }
}

impl<W: Write> OutputSink for JsonSink<W> {
    fn record(&mut self, record: &MatchRecord, matched: &[u8]) -> std::io::Result<()> {
        #[derive(serde::Serialize)]
        struct Line<'a> {
            #[serde(flatten)]
            record: &'a MatchRecord,
            text: String,
        }
        let line = Line {
            record,
            text: String::from_utf8_lossy(matched).into_owned(),
        };
        serde_json::to_writer(&mut self.out, &line)?;
        writeln!(self.out)
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.out.flush()
    }
}

/// Counts matches without printing them.
#[derive(Default)]
pub struct CountSink {
    pub matches: usize,
}

impl OutputSink for CountSink {
    fn record(&mut self, _record: &MatchRecord, _matched: &[u8]) -> std::io::Result<()> {
        self.matches += 1;
        Ok(())
    }
}

/// Replace control bytes so matches print on one terminal line.
fn sanitize(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .map(|&b| if b == b'\n' || b == b'\r' { b' ' } else { b })
        .collect()
}
