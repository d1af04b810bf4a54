//! Regex syntax and limit errors, with caret rendering.

use annotate_snippets::{AnnotationKind, Level, Renderer, Snippet};
use thiserror::Error;

/// What went wrong, following POSIX-ish error naming.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum RegexErrorKind {
    #[error("mismatched ( )")]
    MismatchedParens,
    #[error("mismatched [ ]")]
    MismatchedBrackets,
    #[error("mismatched {{ }}")]
    MismatchedBraces,
    #[error("mismatched quotation")]
    MismatchedQuotation,
    #[error("invalid character class")]
    InvalidClass,
    #[error("invalid character class range")]
    InvalidClassRange,
    #[error("invalid collating element")]
    InvalidCollating,
    #[error("invalid escape")]
    InvalidEscape,
    #[error("invalid modifier")]
    InvalidModifier,
    #[error("invalid repeat")]
    InvalidRepeat,
    #[error("invalid syntax")]
    InvalidSyntax,
    #[error("empty expression")]
    EmptyExpression,
    #[error("pattern exceeds length limit")]
    ExceedsLength,
    #[error("pattern exceeds complexity limits")]
    ExceedsLimits,
}

/// A compile error carrying the pattern source and byte offset.
#[derive(Clone, Debug, Error)]
#[error("error at position {pos}: {kind}")]
pub struct RegexError {
    pub kind: RegexErrorKind,
    pub pattern: String,
    pub pos: usize,
}

impl RegexError {
    pub fn new(kind: RegexErrorKind, pattern: impl Into<String>, pos: usize) -> Self {
        RegexError {
            kind,
            pattern: pattern.into(),
            pos,
        }
    }

    /// True for the limit-class errors that abort compilation even in
    /// lenient mode.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            RegexErrorKind::ExceedsLength | RegexErrorKind::ExceedsLimits
        )
    }

    /// Render a caret diagnostic pointing into the pattern.
    pub fn render(&self) -> String {
        let end = (self.pos + 1).min(self.pattern.len());
        let start = self.pos.min(end);
        let message = self.kind.to_string();
        let snippet = Snippet::source(&self.pattern)
            .line_start(1)
            .annotation(AnnotationKind::Primary.span(start..end).label(&message));
        let group = Level::ERROR.primary_title(&message).element(snippet);
        Renderer::plain().render(&[group]).to_string()
    }
}
