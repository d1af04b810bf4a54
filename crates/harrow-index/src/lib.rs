//! File-system index store.
//!
//! Each indexed directory carries a `._UG#_Store` file: a 4-byte magic
//! followed by contiguous records, one per indexed file, holding a
//! staggered Bloom filter over the file's 1..8-grams. The search tool
//! probes the filter with a pattern's hashes to skip files that cannot
//! match.

mod hasher;
mod store;

pub use hasher::{FileIndex, index_bytes, indexhash, noise_percentage};
pub use store::{INDEX_FILENAME, IndexError, Record, Store};

#[cfg(test)]
mod hasher_tests;
#[cfg(test)]
mod store_tests;
