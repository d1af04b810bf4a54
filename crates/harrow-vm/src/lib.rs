//! Match engine for harrow compiled patterns.
//!
//! The [`Matcher`] buffers bytes from an [`Input`] (re-encoded to UTF-8
//! on the fly) and executes compiled bytecode over them in one of four
//! methods: scan, find, split, and whole-input match. The prefilter
//! tables of the pattern drive the skip loop; the interpreter confirms
//! candidates.

mod codec;
mod input;
mod interp;
mod matcher;
mod prefilter;
mod record;
mod tables;

pub use codec::Encoding;
pub use input::{Input, InputError};
pub use matcher::{FindIter, Matcher, Method, SplitIter};
pub use record::{Capture, Match, MatchRecord};

#[cfg(test)]
mod codec_tests;
#[cfg(test)]
mod input_tests;
#[cfg(test)]
mod matcher_tests;
#[cfg(test)]
mod prefilter_tests;
