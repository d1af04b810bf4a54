//! Chained decompression workers.
//!
//! Each stage peels one compression or archive layer and streams the
//! contained files into a pipe as `(partname, bytes)` parts. Stages
//! chain for nested containers (`tar.gz` inside `zip`, ...); part
//! names are colon-joined across layers, `outer.zip:inner.tar:file`.

mod cpio;
mod error;
mod magic;
mod source;
mod tar;
mod worker;
mod zip;

pub use error::UnpackError;
pub use magic::{Container, detect, is_cpio_header, is_tar_block};
pub use source::ZSource;
pub use worker::Unpacker;
pub use zip::ZipEntry;

#[cfg(test)]
mod magic_tests;
#[cfg(test)]
mod zip_tests;
