//! Streaming zip reader over local file headers.
//!
//! Reads entries in archive order without seeking, which is what a
//! pipe demands: parse a local header, stream the entry body, verify
//! the CRC, continue. Stored and deflated entries are supported;
//! encrypted entries and exotic methods are reported as errors.

use std::io::Read;

use flate2::{Decompress, FlushDecompress, Status};

use crate::error::UnpackError;

const HEADER_MAGIC: u32 = 0x0403_4b50; // PK\x03\x04
const DESCRIPTOR_MAGIC: u32 = 0x0807_4b50; // PK\x07\x08

const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// Info-ZIP Unicode Path extra field id.
const UNICODE_PATH_ID: u16 = 0x7075;

type Stream = Box<dyn Read + Send>;

/// One zip entry's header data.
#[derive(Clone, Debug)]
pub struct ZipEntry {
    pub name: String,
    pub method: u16,
    pub crc: u32,
    pub compressed_size: u64,
    pub size: u64,
    pub has_descriptor: bool,
}

impl ZipEntry {
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

struct EntryState {
    info: ZipEntry,
    inflate: Option<Decompress>,
    /// Raw bytes left to consume for stored entries.
    remaining: u64,
    hasher: crc32fast::Hasher,
    finished: bool,
}

/// Pull-based zip stream: `next_entry` then `read` until it returns 0.
pub(crate) struct ZipStream {
    pathname: String,
    reader: Stream,
    inbuf: Vec<u8>,
    raw_eof: bool,
    entry: Option<EntryState>,
    done: bool,
}

impl ZipStream {
    pub fn new(pathname: String, reader: Stream) -> Self {
        ZipStream {
            pathname,
            reader,
            inbuf: Vec::new(),
            raw_eof: false,
            entry: None,
            done: false,
        }
    }

    fn fill(&mut self) -> std::io::Result<usize> {
        if self.raw_eof {
            return Ok(0);
        }
        let mut chunk = [0u8; 16384];
        let n = self.reader.read(&mut chunk)?;
        if n == 0 {
            self.raw_eof = true;
        } else {
            self.inbuf.extend_from_slice(&chunk[..n]);
        }
        Ok(n)
    }

    /// Ensure at least `n` raw bytes are buffered.
    fn want(&mut self, n: usize) -> Result<bool, UnpackError> {
        while self.inbuf.len() < n {
            if self.fill()? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn take(&mut self, n: usize) -> Vec<u8> {
        self.inbuf.drain(..n).collect()
    }

    /// Parse the next local file header, or None at the central
    /// directory / end of stream.
    pub fn next_entry(&mut self) -> Result<Option<&ZipEntry>, UnpackError> {
        if self.done {
            return Ok(None);
        }
        // drain any open entry to reach the next header
        if self.entry.is_some() {
            let mut sink = [0u8; 4096];
            while self.read(&mut sink)? > 0 {}
        }
        self.entry = None;
        if !self.want(30)? {
            self.done = true;
            return Ok(None);
        }
        let sig = u32::from_le_bytes([self.inbuf[0], self.inbuf[1], self.inbuf[2], self.inbuf[3]]);
        if sig != HEADER_MAGIC {
            // central directory or trailing junk ends the entry walk
            self.done = true;
            return Ok(None);
        }
        let header = self.take(30);
        let flags = u16::from_le_bytes([header[6], header[7]]);
        let method = u16::from_le_bytes([header[8], header[9]]);
        let crc = u32::from_le_bytes([header[14], header[15], header[16], header[17]]);
        let csize = u32::from_le_bytes([header[18], header[19], header[20], header[21]]);
        let size = u32::from_le_bytes([header[22], header[23], header[24], header[25]]);
        let name_len = u16::from_le_bytes([header[26], header[27]]) as usize;
        let extra_len = u16::from_le_bytes([header[28], header[29]]) as usize;
        if flags & 1 != 0 {
            return Err(UnpackError::EncryptedZip {
                path: self.pathname.clone(),
            });
        }
        if !self.want(name_len + extra_len)? {
            return Err(UnpackError::PrematureEof {
                path: self.pathname.clone(),
            });
        }
        let name_bytes = self.take(name_len);
        let extra = self.take(extra_len);
        let mut name = String::from_utf8_lossy(&name_bytes).into_owned();
        // Info-ZIP Unicode Path extra field overrides the header name
        let mut at = 0;
        while at + 4 <= extra.len() {
            let id = u16::from_le_bytes([extra[at], extra[at + 1]]);
            let len = u16::from_le_bytes([extra[at + 2], extra[at + 3]]) as usize;
            let body = &extra[at + 4..(at + 4 + len).min(extra.len())];
            if id == UNICODE_PATH_ID && body.len() > 5 {
                name = String::from_utf8_lossy(&body[5..]).into_owned();
            }
            at += 4 + len;
        }
        if method != METHOD_STORED && method != METHOD_DEFLATE {
            return Err(UnpackError::UnsupportedMethod {
                path: self.pathname.clone(),
                method,
            });
        }
        let info = ZipEntry {
            name,
            method,
            crc,
            compressed_size: csize as u64,
            size: size as u64,
            has_descriptor: flags & (1 << 3) != 0,
        };
        self.entry = Some(EntryState {
            remaining: info.compressed_size,
            inflate: (method == METHOD_DEFLATE).then(|| Decompress::new(false)),
            hasher: crc32fast::Hasher::new(),
            finished: false,
            info,
        });
        Ok(self.entry.as_ref().map(|e| &e.info))
    }

    pub fn entry(&self) -> Option<&ZipEntry> {
        self.entry.as_ref().map(|e| &e.info)
    }

    /// Read decompressed bytes of the current entry; 0 at entry end.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize, UnpackError> {
        let Some(mut state) = self.entry.take() else {
            return Ok(0);
        };
        let result = self.read_entry(&mut state, out);
        self.entry = Some(state);
        result
    }

    fn read_entry(&mut self, state: &mut EntryState, out: &mut [u8]) -> Result<usize, UnpackError> {
        if state.finished || out.is_empty() {
            return Ok(0);
        }
        if state.inflate.is_none() {
            // stored entry: copy through
            if state.remaining == 0 {
                return self.finish_entry(state, 0);
            }
            if self.inbuf.is_empty() && self.fill()? == 0 {
                return Err(UnpackError::PrematureEof {
                    path: self.pathname.clone(),
                });
            }
            let n = (state.remaining as usize)
                .min(out.len())
                .min(self.inbuf.len());
            out[..n].copy_from_slice(&self.inbuf[..n]);
            self.inbuf.drain(..n);
            state.hasher.update(&out[..n]);
            state.remaining -= n as u64;
            if state.remaining == 0 {
                return self.finish_entry(state, n);
            }
            return Ok(n);
        }
        loop {
            if self.inbuf.is_empty() && !self.raw_eof {
                self.fill()?;
            }
            let inflate = state.inflate.as_mut().expect("deflate entry");
            let before_in = inflate.total_in();
            let before_out = inflate.total_out();
            let status = inflate
                .decompress(&self.inbuf, out, FlushDecompress::None)
                .map_err(|e| UnpackError::CannotDecompress {
                    path: self.pathname.clone(),
                    reason: e.to_string(),
                })?;
            let consumed = (inflate.total_in() - before_in) as usize;
            let produced = (inflate.total_out() - before_out) as usize;
            self.inbuf.drain(..consumed);
            state.hasher.update(&out[..produced]);
            match status {
                Status::StreamEnd => {
                    return self.finish_entry(state, produced);
                }
                _ if produced > 0 => return Ok(produced),
                _ if self.raw_eof && self.inbuf.is_empty() => {
                    return Err(UnpackError::PrematureEof {
                        path: self.pathname.clone(),
                    });
                }
                _ => continue,
            }
        }
    }

    /// Verify the CRC (reading the trailing descriptor when present)
    /// and mark the entry done.
    fn finish_entry(&mut self, state: &mut EntryState, produced: usize) -> Result<usize, UnpackError> {
        state.finished = true;
        let mut stored_crc = state.info.crc;
        if state.info.has_descriptor {
            if !self.want(4)? {
                return Err(UnpackError::PrematureEof {
                    path: self.pathname.clone(),
                });
            }
            let first =
                u32::from_le_bytes([self.inbuf[0], self.inbuf[1], self.inbuf[2], self.inbuf[3]]);
            let need = if first == DESCRIPTOR_MAGIC { 16 } else { 12 };
            if !self.want(need)? {
                return Err(UnpackError::PrematureEof {
                    path: self.pathname.clone(),
                });
            }
            let descriptor = self.take(need);
            let at = need - 12;
            stored_crc = u32::from_le_bytes([
                descriptor[at],
                descriptor[at + 1],
                descriptor[at + 2],
                descriptor[at + 3],
            ]);
        }
        let computed = std::mem::take(&mut state.hasher).finalize();
        if stored_crc != 0 && stored_crc != computed {
            return Err(UnpackError::CrcMismatch {
                path: self.pathname.clone(),
                stored: stored_crc,
                computed,
            });
        }
        Ok(produced)
    }
}
