//! The matcher: buffered input plus the four match methods.

use harrow_bytecode::Program;

use crate::input::{Input, InputError};
use crate::record::Match;

/// How a match attempt relates to the input position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Method {
    /// Anchored at the current position; never advances past
    /// non-matching bytes.
    Scan,
    /// Search forward for the next match, prefilter assisted.
    Find,
    /// Like find, but the caller consumes the text between matches.
    Split,
    /// Anchored and must consume all remaining input.
    Match,
}

const CHUNK: usize = 65536;

/// Executes a compiled pattern over buffered input.
///
/// Buffer invariant: `cur <= pos <= end <= buf.len()`; `base` is the
/// absolute offset of `buf[0]` within the part. A shift moves retained
/// bytes to the front and advances `base`; shifts only happen between
/// match attempts, so in-flight offsets stay valid. `cur` marks the
/// oldest byte the consumer still needs (split fields, line starts).
pub struct Matcher<'p> {
    pub(crate) program: &'p Program,
    pub(crate) input: Input,
    pub(crate) buf: Vec<u8>,
    pub(crate) base: usize,
    pub(crate) cur: usize,
    pub(crate) pos: usize,
    pub(crate) end: usize,
    pub(crate) eof: bool,
    error: Option<InputError>,
}

impl<'p> Matcher<'p> {
    pub fn new(program: &'p Program, input: Input) -> Self {
        Matcher {
            program,
            input,
            buf: Vec::new(),
            base: 0,
            cur: 0,
            pos: 0,
            end: 0,
            eof: false,
            error: None,
        }
    }

    /// The first read error encountered, if any.
    pub fn take_error(&mut self) -> Option<InputError> {
        self.error.take()
    }

    /// The buffered window and the absolute offset of its first byte.
    /// Valid until the next `find`/`scan` call shifts the buffer.
    pub fn window(&self) -> (&[u8], usize) {
        (&self.buf[..self.end], self.base)
    }

    /// Pin the oldest absolute offset the caller still needs; bytes at
    /// or after it survive buffer shifts.
    pub fn hold_from(&mut self, abs: usize) {
        self.cur = abs.saturating_sub(self.base).min(self.end);
    }

    /// Absolute offset of the matcher cursor.
    pub fn at(&self) -> usize {
        self.base + self.pos
    }

    /// True once the input is exhausted and fully consumed.
    pub fn done(&self) -> bool {
        self.eof && self.pos >= self.end
    }

    /// Pull more transcoded bytes into the buffer; false at EOF.
    pub(crate) fn fill(&mut self) -> bool {
        if self.eof {
            return false;
        }
        if self.buf.len() < self.end + CHUNK {
            self.buf.resize(self.end + CHUNK, 0);
        }
        match self.input.read(&mut self.buf[self.end..self.end + CHUNK]) {
            Ok(0) => {
                self.eof = true;
                false
            }
            Ok(n) => {
                self.end += n;
                true
            }
            Err(e) => {
                self.error = Some(e);
                self.eof = true;
                false
            }
        }
    }

    /// Drop consumed bytes, keeping one byte of context before the
    /// oldest live offset for boundary predicates.
    pub(crate) fn shift(&mut self) {
        let keep = self.cur.min(self.pos).saturating_sub(1);
        if keep == 0 {
            return;
        }
        self.buf.copy_within(keep..self.end, 0);
        self.base += keep;
        self.cur -= keep;
        self.pos -= keep;
        self.end -= keep;
    }

    /// Byte at buffer offset `i`, filling the buffer as needed.
    pub(crate) fn byte_at(&mut self, i: usize) -> Option<u8> {
        while i >= self.end {
            if !self.fill() {
                return None;
            }
        }
        Some(self.buf[i])
    }

    /// Anchored match at the current position, longest wins.
    pub fn scan(&mut self) -> Option<Match> {
        let _ = self.byte_at(self.pos);
        let m = self.execute_at(self.pos)?;
        let m = self.absolute(m);
        self.pos = m.end - self.base;
        Some(m)
    }

    /// Find the next match at or after the current position.
    pub fn find(&mut self) -> Option<Match> {
        loop {
            if self.pos >= self.end && !self.fill() {
                // a pattern matching empty still matches once at EOF
                if self.pos == self.end
                    && let Some(m) = self.execute_at(self.pos)
                {
                    let m = self.absolute(m);
                    self.pos = m.end - self.base + 1;
                    return Some(m);
                }
                return None;
            }
            // the prefilter leaves pos at the next candidate, or at the
            // first offset still viable once more input arrives
            if !self.advance() {
                self.fill();
                continue;
            }
            if let Some(m) = self.execute_at(self.pos) {
                let m = self.absolute(m);
                self.pos = if m.is_empty() {
                    m.end - self.base + 1
                } else {
                    m.end - self.base
                };
                return Some(m);
            }
            self.pos += 1;
            self.shift();
        }
    }

    /// Whole-input match: anchored and consuming everything.
    pub fn matches(&mut self) -> Option<Match> {
        let _ = self.byte_at(self.pos);
        let m = self.execute_at(self.pos)?;
        // drain to EOF so the length check is meaningful
        while self.fill() {}
        if m.end == self.end {
            Some(self.absolute(m))
        } else {
            None
        }
    }

    /// Iterator over all matches, in byte order.
    pub fn find_iter(self) -> FindIter<'p> {
        FindIter { matcher: self }
    }

    /// Iterator over the fields between delimiter matches. The final
    /// tail is emitted even without a trailing delimiter.
    pub fn split_iter(self) -> SplitIter<'p> {
        SplitIter {
            matcher: self,
            done: false,
            field_start: 0,
        }
    }

    fn absolute(&self, m: Match) -> Match {
        let base = self.base;
        Match {
            start: m.start + base,
            end: m.end + base,
            accept: m.accept,
            redo: m.redo,
            captures: m
                .captures
                .into_iter()
                .map(|c| {
                    c.map(|c| crate::record::Capture {
                        begin: c.begin + base,
                        end: c.end + base,
                    })
                })
                .collect(),
        }
    }
}

pub struct FindIter<'p> {
    matcher: Matcher<'p>,
}

impl Iterator for FindIter<'_> {
    type Item = Match;

    fn next(&mut self) -> Option<Match> {
        // nothing behind pos is needed again; let the buffer shift
        self.matcher.cur = self.matcher.pos.min(self.matcher.end);
        self.matcher.find()
    }
}

/// Yields `(field, Option<delimiter>)` pairs: the bytes before each
/// delimiter match, then the final tail with `None`.
pub struct SplitIter<'p> {
    matcher: Matcher<'p>,
    done: bool,
    /// Absolute offset where the current field began.
    field_start: usize,
}

impl Iterator for SplitIter<'_> {
    type Item = (Vec<u8>, Option<Match>);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        // hold the field bytes in the buffer while searching
        self.matcher.cur = (self.field_start - self.matcher.base).min(self.matcher.end);
        match self.matcher.find() {
            Some(m) => {
                let lo = self.field_start - self.matcher.base;
                let hi = m.start - self.matcher.base;
                let field = self.matcher.buf[lo..hi].to_vec();
                self.field_start = m.end;
                Some((field, Some(m)))
            }
            None => {
                self.done = true;
                let lo = (self.field_start.saturating_sub(self.matcher.base))
                    .min(self.matcher.end);
                let field = self.matcher.buf[lo..self.matcher.end].to_vec();
                Some((field, None))
            }
        }
    }
}
