//! Drives one compiled pattern over one stream or file.
//!
//! The orchestrator asks the matcher for the next match, maintains
//! line/column numbers incrementally over the bytes it walks past, and
//! hands match records to the output sink. For compressed input it
//! multiplexes over the parts coming out of the decompression chain.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use harrow_bytecode::Program;
use harrow_unpack::Unpacker;
use harrow_vm::{Input, Matcher, MatchRecord};
use tracing::warn;

use crate::output::OutputSink;

/// Result of searching one file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStatus {
    pub matches: usize,
    /// Something was skipped or failed; maps to exit status 1.
    pub warned: bool,
}

impl SearchStatus {
    fn absorb(&mut self, other: SearchStatus) {
        self.matches += other.matches;
        self.warned |= other.warned;
    }
}

pub struct Orchestrator<'p> {
    program: &'p Program,
    cancel: Arc<AtomicBool>,
    /// Report negated `(?^...)` matches instead of suppressing them.
    pub report_redo: bool,
}

impl<'p> Orchestrator<'p> {
    pub fn new(program: &'p Program) -> Self {
        Orchestrator {
            program,
            cancel: Arc::new(AtomicBool::new(false)),
            report_redo: false,
        }
    }

    /// A handle that cancels a running search from another thread.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    /// Search one part stream; `partname` is the display name.
    pub fn search_input(
        &self,
        partname: &str,
        input: Input,
        sink: &mut dyn OutputSink,
    ) -> SearchStatus {
        let mut status = SearchStatus::default();
        let mut matcher = Matcher::new(self.program, input);
        let mut line: usize = 1;
        let mut column: usize = 0; // characters since the line start
        let mut counted_to: usize = 0;
        loop {
            if self.cancelled() {
                break;
            }
            matcher.hold_from(counted_to);
            let Some(m) = matcher.find() else { break };
            // advance line/column over the bytes walked past
            let (window, base) = matcher.window();
            for &b in &window[counted_to - base..m.start - base] {
                if b == b'\n' {
                    line += 1;
                    column = 0;
                } else if b & 0xc0 != 0x80 {
                    // UTF-8 continuation bytes do not advance a column
                    column += 1;
                }
            }
            counted_to = m.start;
            if m.redo && !self.report_redo {
                continue;
            }
            status.matches += 1;
            let record = MatchRecord {
                partname: partname.to_string(),
                byte_offset: m.start,
                line,
                column: column + 1,
                length: m.len(),
                accept_label: m.accept,
                captures: m.captures.clone(),
            };
            let matched = &window[m.start - base..m.end - base];
            if let Err(e) = sink.record(&record, matched) {
                warn!("write error: {e}");
                status.warned = true;
                break;
            }
        }
        if let Some(e) = matcher.take_error() {
            warn!("{e}");
            status.warned = true;
        }
        let _ = sink.finish();
        status
    }

    /// Search a file, transparently decompressing up to `zmax` nested
    /// layers when `zmax > 0`.
    pub fn search_path(
        &self,
        path: &Path,
        zmax: usize,
        sink: &mut dyn OutputSink,
    ) -> SearchStatus {
        let display_name = path.display().to_string();
        if zmax == 0 {
            return match Input::from_path(path) {
                Ok(input) => self.search_input(&display_name, input, sink),
                Err(e) => {
                    warn!("{e}");
                    SearchStatus {
                        matches: 0,
                        warned: true,
                    }
                }
            };
        }
        let file = match std::fs::File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("cannot open {display_name}: {e}");
                return SearchStatus {
                    matches: 0,
                    warned: true,
                };
            }
        };
        let mut status = SearchStatus::default();
        let mut unpacker = Unpacker::new();
        let Some(mut pipe) = unpacker.start(zmax, &display_name, file) else {
            warn!("cannot decompress {display_name}");
            return SearchStatus {
                matches: 0,
                warned: true,
            };
        };
        loop {
            if self.cancelled() {
                unpacker.cancel();
            }
            let part = unpacker.wait_partname();
            let name = if part.is_empty() {
                display_name.clone()
            } else {
                format!("{display_name}:{part}")
            };
            status.absorb(self.search_input(&name, Input::from_reader(pipe), sink));
            match unpacker.open_next() {
                Some(next) => pipe = next,
                None => break,
            }
        }
        unpacker.join();
        status
    }
}
