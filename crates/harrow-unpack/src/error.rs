//! Decompression errors.
//!
//! These are contained inside a worker: the part stream ends early and
//! the error is logged; the consumer just sees EOF.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum UnpackError {
    #[error("cannot decompress {path}: {reason}")]
    CannotDecompress { path: String, reason: String },
    #[error("unsupported compression method {method} in {path}")]
    UnsupportedMethod { path: String, method: u16 },
    #[error("crc mismatch in {path}: stored {stored:#010x}, computed {computed:#010x}")]
    CrcMismatch {
        path: String,
        stored: u32,
        computed: u32,
    },
    #[error("premature end of compressed data in {path}")]
    PrematureEof { path: String },
    #[error("{path} is encrypted; encrypted archives are not supported")]
    EncryptedZip { path: String },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
