//! The `._UG#_Store` sidecar format.
//!
//! Layout: a 4-byte magic `"UG#\x03"`, then contiguous records with no
//! separators:
//!
//! ```text
//! record := header[4] basename[basename_size] hashes[2^logsize]
//! header := { accuracy: '0'..'9',
//!             flags|logsize (bit7 binary, bit6 archive, bit5 compressed,
//!                            low 5 bits logsize 0..16),
//!             basename_size_lo, basename_size_hi }
//! ```
//!
//! Records are unique by basename in insertion order; when rewriting,
//! a later duplicate supersedes the earlier one.

use std::io::{Read, Write};
use std::path::Path;

use thiserror::Error;

/// Sidecar file name used in each indexed directory.
pub const INDEX_FILENAME: &str = "._UG#_Store";

const MAGIC: [u8; 4] = *b"UG#\x03";

const FLAG_BINARY: u8 = 0x80;
const FLAG_ARCHIVE: u8 = 0x40;
const FLAG_COMPRESSED: u8 = 0x20;
const LOGSIZE_MASK: u8 = 0x1f;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("not an index store (bad magic)")]
    BadMagic,
    #[error("truncated index record")]
    Truncated,
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// One record of the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    pub accuracy: u8,
    pub binary: bool,
    pub archive: bool,
    pub compressed: bool,
    pub basename: String,
    pub hashes: Vec<u8>,
}

impl Record {
    pub fn logsize(&self) -> u8 {
        if self.hashes.is_empty() {
            0
        } else {
            self.hashes.len().trailing_zeros() as u8
        }
    }

    fn write_to(&self, out: &mut impl Write) -> Result<(), IndexError> {
        let flags = (self.binary as u8) << 7
            | (self.archive as u8) << 6
            | (self.compressed as u8) << 5
            | (self.logsize() & LOGSIZE_MASK);
        let basename_size = self.basename.len().min(0xffff) as u16;
        out.write_all(&[
            self.accuracy + b'0',
            flags,
            basename_size as u8,
            (basename_size >> 8) as u8,
        ])?;
        out.write_all(&self.basename.as_bytes()[..basename_size as usize])?;
        out.write_all(&self.hashes)?;
        Ok(())
    }

    fn read_from(input: &mut impl Read) -> Result<Option<Record>, IndexError> {
        let mut header = [0u8; 4];
        match input.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let accuracy = header[0].saturating_sub(b'0');
        let logsize = header[1] & LOGSIZE_MASK;
        let basename_size = header[2] as usize | (header[3] as usize) << 8;
        let mut basename = vec![0u8; basename_size];
        input
            .read_exact(&mut basename)
            .map_err(|_| IndexError::Truncated)?;
        let hashes_size = if logsize > 0 { 1usize << logsize } else { 0 };
        let mut hashes = vec![0u8; hashes_size];
        input
            .read_exact(&mut hashes)
            .map_err(|_| IndexError::Truncated)?;
        Ok(Some(Record {
            accuracy,
            binary: header[1] & FLAG_BINARY != 0,
            archive: header[1] & FLAG_ARCHIVE != 0,
            compressed: header[1] & FLAG_COMPRESSED != 0,
            basename: String::from_utf8_lossy(&basename).into_owned(),
            hashes,
        }))
    }
}

/// An in-memory view of one directory's store.
#[derive(Clone, Debug, Default)]
pub struct Store {
    records: Vec<Record>,
}

impl Store {
    pub fn new() -> Self {
        Store::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, basename: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.basename == basename)
    }

    /// Add or replace; later records supersede earlier ones while
    /// keeping the original insertion position.
    pub fn upsert(&mut self, record: Record) {
        match self
            .records
            .iter_mut()
            .find(|r| r.basename == record.basename)
        {
            Some(slot) => *slot = record,
            None => self.records.push(record),
        }
    }

    pub fn remove(&mut self, basename: &str) -> bool {
        let before = self.records.len();
        self.records.retain(|r| r.basename != basename);
        before != self.records.len()
    }

    pub fn read(mut input: impl Read) -> Result<Store, IndexError> {
        let mut magic = [0u8; 4];
        input.read_exact(&mut magic).map_err(|_| IndexError::BadMagic)?;
        if magic != MAGIC {
            return Err(IndexError::BadMagic);
        }
        let mut store = Store::new();
        while let Some(record) = Record::read_from(&mut input)? {
            // later duplicates supersede earlier ones
            store.upsert(record);
        }
        Ok(store)
    }

    pub fn write(&self, mut out: impl Write) -> Result<(), IndexError> {
        out.write_all(&MAGIC)?;
        for record in &self.records {
            record.write_to(&mut out)?;
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Store, IndexError> {
        Store::read(std::fs::File::open(path)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), IndexError> {
        let mut file = std::fs::File::create(path)?;
        self.write(&mut file)?;
        Ok(())
    }
}
