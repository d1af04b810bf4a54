//! Pattern compiler for harrow.
//!
//! Compilation runs in four stages, all driven from [`compile`]:
//!
//! 1. the recursive-descent parser builds the followpos NFA (no epsilon
//!    transitions) plus the tree DFA for all-literal alternations,
//! 2. subset construction turns it into a DFA over bytes and meta
//!    symbols, with lazy-edge trimming and tree-DFA merging,
//! 3. the predictor analysis finds an s-t cut through the DFA and fills
//!    the prefilter tables,
//! 4. the assembler compacts edges and emits the 32-bit cell stream.

mod assemble;
mod builder;
mod classes;
mod dfa;
mod error;
mod mods;
mod options;
mod parser;
mod predict;

pub use error::{RegexError, RegexErrorKind};
pub use options::PatternOptions;

use harrow_bytecode::Program;

/// Compile `pattern` into bytecode and predictor tables.
pub fn compile(pattern: &str, options: &PatternOptions) -> Result<Program, RegexError> {
    let mut compiler = parser::Compiler::new(pattern, options.clone());
    let parsed = compiler.parse()?;
    let mut dfa = builder::build(&mut compiler, parsed)?;
    let predictor = predict::analyze(&mut dfa, &compiler);
    let cells = assemble::encode(&mut dfa, &compiler)?;
    let subpatterns = compiler.subpatterns();
    Ok(Program::new(cells, predictor, subpatterns, pattern.to_string()))
}

#[cfg(test)]
mod assemble_tests;
#[cfg(test)]
mod builder_tests;
#[cfg(test)]
mod mods_tests;
#[cfg(test)]
mod parser_tests;
#[cfg(test)]
mod predict_tests;
