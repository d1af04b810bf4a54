//! Unified byte input with transparent re-encoding to UTF-8.
//!
//! An `Input` owns exactly one of an in-memory buffer, an open file, or
//! a boxed byte stream. The first read sniffs a BOM when the encoding
//! was left at `Plain`; all non-UTF-8 encodings are transcoded to UTF-8
//! on the fly, so the matcher always sees UTF-8 (or raw binary) bytes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use thiserror::Error;

use crate::codec::{self, Encoding};

#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open {path}: {source}")]
    CannotOpen {
        path: String,
        source: std::io::Error,
    },
    #[error("read error: {0}")]
    Read(#[from] std::io::Error),
}

enum Source {
    Memory(MemoryBytes, usize),
    File(File),
    Stream(Box<dyn Read + Send>),
}

enum MemoryBytes {
    Owned(Vec<u8>),
    Mapped(memmap2::Mmap),
}

impl MemoryBytes {
    fn as_slice(&self) -> &[u8] {
        match self {
            MemoryBytes::Owned(v) => v,
            MemoryBytes::Mapped(m) => m,
        }
    }
}

/// Byte source for the matcher.
pub struct Input {
    source: Source,
    encoding: Encoding,
    /// Raw bytes read but not yet transcoded (partial sequences).
    pending: Vec<u8>,
    /// Transcoded bytes not yet handed out.
    decoded: Vec<u8>,
    started: bool,
    raw_eof: bool,
}

impl Input {
    fn new(source: Source) -> Self {
        Input {
            source,
            encoding: Encoding::Plain,
            pending: Vec::new(),
            decoded: Vec::new(),
            started: false,
            raw_eof: false,
        }
    }

    /// Search an in-memory buffer.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Input::new(Source::Memory(MemoryBytes::Owned(data.into()), 0))
    }

    /// Open and (when possible) memory-map a file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InputError::CannotOpen {
            path: path.display().to_string(),
            source,
        })?;
        // mapping can fail on pipes and special files; fall back to reads
        match unsafe { memmap2::Mmap::map(&file) } {
            Ok(map) => Ok(Input::new(Source::Memory(MemoryBytes::Mapped(map), 0))),
            Err(_) => Ok(Input::new(Source::File(file))),
        }
    }

    /// Read from an already-open file.
    pub fn from_file(file: File) -> Self {
        Input::new(Source::File(file))
    }

    /// Read from an arbitrary byte stream (a pipe, a decompressor).
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Input::new(Source::Stream(Box::new(reader)))
    }

    /// Force an encoding instead of BOM sniffing.
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn encoding(&self) -> &Encoding {
        &self.encoding
    }

    /// Replace the source; the previous one is closed first.
    pub fn reassign(&mut self, other: Input) {
        *self = other;
    }

    fn read_raw(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.source {
            Source::Memory(bytes, at) => {
                let data = bytes.as_slice();
                let n = buf.len().min(data.len() - *at);
                buf[..n].copy_from_slice(&data[*at..*at + n]);
                *at += n;
                Ok(n)
            }
            Source::File(file) => file.read(buf),
            Source::Stream(reader) => reader.read(buf),
        }
    }

    /// Fill `out` with up to `out.len()` UTF-8 bytes; 0 means EOF.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, InputError> {
        // serve previously transcoded bytes first
        if self.decoded.is_empty() {
            self.refill()?;
        }
        let n = out.len().min(self.decoded.len());
        out[..n].copy_from_slice(&self.decoded[..n]);
        self.decoded.drain(..n);
        Ok(n)
    }

    fn refill(&mut self) -> Result<(), InputError> {
        let mut raw = [0u8; 16384];
        loop {
            if self.raw_eof && self.pending.is_empty() {
                return Ok(());
            }
            if !self.raw_eof {
                let n = self.read_raw(&mut raw)?;
                if n == 0 {
                    self.raw_eof = true;
                } else {
                    self.pending.extend_from_slice(&raw[..n]);
                }
            }
            if !self.started {
                // wait for enough bytes to sniff a BOM
                if self.pending.len() < 4 && !self.raw_eof {
                    continue;
                }
                self.started = true;
                if self.encoding == Encoding::Plain
                    && let Some((enc, bom)) = codec::detect_bom(&self.pending)
                {
                    self.encoding = enc;
                    self.pending.drain(..bom);
                }
            }
            self.transcode();
            if !self.decoded.is_empty() || self.raw_eof {
                return Ok(());
            }
        }
    }

    fn transcode(&mut self) {
        match &self.encoding {
            Encoding::Plain | Encoding::Utf8 => {
                self.decoded.append(&mut self.pending);
            }
            Encoding::Latin => {
                for &b in &self.pending {
                    codec::push_utf8(&mut self.decoded, b as u32);
                }
                self.pending.clear();
            }
            Encoding::Utf16Be | Encoding::Utf16Le => {
                let be = self.encoding == Encoding::Utf16Be;
                let mut at = 0;
                while at + 2 <= self.pending.len() {
                    let u = unit16(&self.pending[at..], be);
                    if (0xd800..=0xdbff).contains(&u) {
                        if at + 4 > self.pending.len() {
                            if self.raw_eof {
                                codec::push_utf8(&mut self.decoded, 0xfffd);
                                at += 2;
                                continue;
                            }
                            break;
                        }
                        let lo = unit16(&self.pending[at + 2..], be);
                        if (0xdc00..=0xdfff).contains(&lo) {
                            let cp = 0x10000
                                + (((u as u32 - 0xd800) << 10) | (lo as u32 - 0xdc00));
                            codec::push_utf8(&mut self.decoded, cp);
                            at += 4;
                        } else {
                            codec::push_utf8(&mut self.decoded, 0xfffd);
                            at += 2;
                        }
                    } else {
                        codec::push_utf8(&mut self.decoded, u as u32);
                        at += 2;
                    }
                }
                self.pending.drain(..at);
                if self.raw_eof && !self.pending.is_empty() {
                    codec::push_utf8(&mut self.decoded, 0xfffd);
                    self.pending.clear();
                }
            }
            Encoding::Utf32Be | Encoding::Utf32Le => {
                let be = self.encoding == Encoding::Utf32Be;
                let mut at = 0;
                while at + 4 <= self.pending.len() {
                    let b = &self.pending[at..at + 4];
                    let cp = if be {
                        u32::from_be_bytes([b[0], b[1], b[2], b[3]])
                    } else {
                        u32::from_le_bytes([b[0], b[1], b[2], b[3]])
                    };
                    codec::push_utf8(&mut self.decoded, cp);
                    at += 4;
                }
                self.pending.drain(..at);
                if self.raw_eof && !self.pending.is_empty() {
                    codec::push_utf8(&mut self.decoded, 0xfffd);
                    self.pending.clear();
                }
            }
            Encoding::Ebcdic => {
                for &b in &self.pending {
                    codec::push_utf8(&mut self.decoded, crate::tables::EBCDIC[b as usize] as u32);
                }
                self.pending.clear();
            }
            Encoding::Custom(table) => {
                for &b in &self.pending {
                    codec::push_utf8(&mut self.decoded, table[b as usize] as u32);
                }
                self.pending.clear();
            }
            enc => {
                let table = enc.table().expect("table-driven encoding");
                let mac = *enc == Encoding::MacRoman;
                for &b in &self.pending {
                    if mac && b == b'\r' {
                        self.decoded.push(b'\n');
                    } else if b < 0x80 {
                        self.decoded.push(b);
                    } else {
                        codec::push_utf8(&mut self.decoded, table[b as usize - 0x80] as u32);
                    }
                }
                self.pending.clear();
            }
        }
    }
}

fn unit16(b: &[u8], be: bool) -> u16 {
    if be {
        u16::from_be_bytes([b[0], b[1]])
    } else {
        u16::from_le_bytes([b[0], b[1]])
    }
}
