//! Match results.

use serde::Serialize;

/// A capture span, 0-based byte offsets within the part.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub begin: usize,
    pub end: usize,
}

/// One match produced by the interpreter. Offsets are absolute within
/// the searched part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Match {
    pub start: usize,
    pub end: usize,
    /// Accept label, 1-based; identifies the top-level alternation.
    pub accept: u32,
    /// Negated match from a `(?^...)` pattern; the caller decides what
    /// a negated match means.
    pub redo: bool,
    /// Lookahead capture spans indexed by lookahead id.
    pub captures: Vec<Option<Capture>>,
}

impl Match {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// A full match record as handed to output collaborators.
#[derive(Clone, Debug, Serialize)]
pub struct MatchRecord {
    /// Colon-joined part name (empty for plain files).
    pub partname: String,
    /// Byte offset of the match within the part.
    pub byte_offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in UTF-8 characters.
    pub column: usize,
    /// Match length in bytes.
    pub length: usize,
    pub accept_label: u32,
    pub captures: Vec<Option<Capture>>,
}
