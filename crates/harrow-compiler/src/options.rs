//! Pattern compile options.

/// Options that shape parsing and compilation. The single-letter names
/// follow the classic regex modifier letters; whole-pattern `(?imsqx-)`
/// directives override them per compile.
#[derive(Clone, Debug)]
pub struct PatternOptions {
    /// Case-insensitive matching.
    pub i: bool,
    /// Multiline: `^` and `$` match at line boundaries.
    pub m: bool,
    /// Dotall: `.` also matches newline.
    pub s: bool,
    /// Extended: unescaped whitespace and `#` comments are ignored.
    pub x: bool,
    /// Quote mode: the pattern is a literal string.
    pub q: bool,
    /// Bracket lists treat the escape character literally.
    pub b: bool,
    /// Lenient mode hint (limit errors still abort).
    pub r: bool,
    /// The escape character; `None` disables escapes entirely.
    pub escape: Option<u8>,
}

impl Default for PatternOptions {
    fn default() -> Self {
        PatternOptions {
            i: false,
            m: false,
            s: false,
            x: false,
            q: false,
            b: false,
            r: false,
            escape: Some(b'\\'),
        }
    }
}

impl PatternOptions {
    /// Parse a compact option string like `"imx"`.
    pub fn from_letters(letters: &str) -> Self {
        let mut opts = PatternOptions::default();
        for c in letters.chars() {
            match c {
                'i' => opts.i = true,
                'm' => opts.m = true,
                's' => opts.s = true,
                'x' => opts.x = true,
                'q' => opts.q = true,
                'b' => opts.b = true,
                'r' => opts.r = true,
                _ => {}
            }
        }
        opts
    }

    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.i = yes;
        self
    }

    pub fn multiline(mut self, yes: bool) -> Self {
        self.m = yes;
        self
    }

    pub fn dotall(mut self, yes: bool) -> Self {
        self.s = yes;
        self
    }
}
