//! Bytecode format and runtime types for harrow compiled patterns.
//!
//! A compiled pattern is a flat array of 32-bit cells (the DFA encoded as
//! ranged GOTO instructions) plus the predictor tables that let the
//! matcher skip input that provably cannot start a match. Both halves
//! have a defined byte-level export format; see `opcode` and `predictor`.

mod dump;
mod opcode;
mod predictor;
mod program;

pub use dump::dump;
pub use opcode::{HALT_PC, LONG_PC, Op, Opcode};
pub use predictor::{BTAP, HASH, Predictor, PredictorError, chain_hash, pair_hash};
pub use program::{Program, ProgramError};

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod opcode_tests;
#[cfg(test)]
mod predictor_tests;
