//! Compiled pattern artifact.

use thiserror::Error;

use crate::opcode::Opcode;
use crate::predictor::{Predictor, PredictorError};

#[derive(Debug, Error)]
pub enum ProgramError {
    #[error("bytecode blob length {0} is not a multiple of 4")]
    MisalignedCode(usize),
    #[error("empty bytecode")]
    EmptyCode,
    #[error(transparent)]
    Predictor(#[from] PredictorError),
}

/// A compiled pattern: bytecode cells, predictor tables, and the map
/// from accept labels back to the top-level alternation sources.
#[derive(Clone, Debug)]
pub struct Program {
    cells: Vec<Opcode>,
    predictor: Predictor,
    subpatterns: Vec<String>,
    pattern: String,
}

impl Program {
    pub fn new(
        cells: Vec<Opcode>,
        predictor: Predictor,
        subpatterns: Vec<String>,
        pattern: String,
    ) -> Self {
        Program {
            cells,
            predictor,
            subpatterns,
            pattern,
        }
    }

    pub fn cells(&self) -> &[Opcode] {
        &self.cells
    }

    pub fn predictor(&self) -> &Predictor {
        &self.predictor
    }

    /// The full pattern source.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of top-level alternations (accept labels run 1..=size).
    pub fn size(&self) -> usize {
        self.subpatterns.len()
    }

    /// Source of the sub-pattern behind accept label `choice`;
    /// `choice` 0 names the whole pattern.
    pub fn subpattern(&self, choice: usize) -> Option<&str> {
        if choice == 0 {
            Some(&self.pattern)
        } else {
            self.subpatterns.get(choice - 1).map(|s| s.as_str())
        }
    }

    /// Export the bytecode as little-endian 32-bit cells.
    pub fn code_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.cells.len() * 4);
        for cell in &self.cells {
            out.extend_from_slice(&cell.0.to_le_bytes());
        }
        out
    }

    /// Export the predictor blob.
    pub fn predictor_blob(&self) -> Vec<u8> {
        self.predictor.to_blob()
    }

    /// Rebuild the cell vector from a little-endian export.
    pub fn cells_from_bytes(bytes: &[u8]) -> Result<Vec<Opcode>, ProgramError> {
        if bytes.len() % 4 != 0 {
            return Err(ProgramError::MisalignedCode(bytes.len()));
        }
        if bytes.is_empty() {
            return Err(ProgramError::EmptyCode);
        }
        Ok(bytes
            .chunks_exact(4)
            .map(|c| Opcode(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
            .collect())
    }
}
