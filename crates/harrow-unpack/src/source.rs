//! One decompression layer over a byte stream.
//!
//! `ZSource` sniffs the container magic and installs the matching
//! decoder; zip archives additionally expose entry-by-entry reads. The
//! output of one source can feed the next chain stage to unwrap nested
//! containers.

use std::io::Read;

use crate::error::UnpackError;
use crate::magic::{Container, detect};
use crate::zip::{ZipEntry, ZipStream};

type Stream = Box<dyn Read + Send>;

/// A reader that replays a sniffed head before the rest of the stream.
struct Rewound {
    head: Vec<u8>,
    at: usize,
    rest: Stream,
}

impl Read for Rewound {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.at < self.head.len() {
            let n = buf.len().min(self.head.len() - self.at);
            buf[..n].copy_from_slice(&self.head[self.at..self.at + n]);
            self.at += n;
            return Ok(n);
        }
        self.rest.read(buf)
    }
}

enum Decoder {
    Plain(Stream),
    Gzip(Box<flate2::read::MultiGzDecoder<Rewound>>),
    Bzip2(Box<bzip2::read::MultiBzDecoder<Rewound>>),
    Xz(Box<xz2::read::XzDecoder<Rewound>>),
    Zstd(Box<zstd::stream::read::Decoder<'static, std::io::BufReader<Rewound>>>),
    Zip(ZipStream),
}

/// A single decompression stage's byte source.
pub struct ZSource {
    pathname: String,
    decoder: Decoder,
    compressed: bool,
}

impl ZSource {
    /// Sniff `reader` and build the matching decoder.
    pub fn new(pathname: &str, mut reader: Stream) -> Result<Self, UnpackError> {
        let mut head = Vec::with_capacity(8);
        let mut probe = [0u8; 8];
        while head.len() < 8 {
            let n = reader.read(&mut probe[..8 - head.len()])?;
            if n == 0 {
                break;
            }
            head.extend_from_slice(&probe[..n]);
        }
        let container = detect(&head);
        let rewound = Rewound {
            head,
            at: 0,
            rest: reader,
        };
        let decoder = match container {
            Container::Gzip => Decoder::Gzip(Box::new(flate2::read::MultiGzDecoder::new(rewound))),
            Container::Bzip2 => {
                Decoder::Bzip2(Box::new(bzip2::read::MultiBzDecoder::new(rewound)))
            }
            Container::Xz => Decoder::Xz(Box::new(xz2::read::XzDecoder::new_multi_decoder(
                rewound,
            ))),
            Container::Zstd => Decoder::Zstd(Box::new(
                zstd::stream::read::Decoder::new(rewound).map_err(UnpackError::Io)?,
            )),
            Container::Zip => {
                let mut zip = ZipStream::new(pathname.to_string(), Box::new(rewound));
                zip.next_entry()?;
                Decoder::Zip(zip)
            }
            Container::Plain => Decoder::Plain(Box::new(rewound)),
        };
        Ok(ZSource {
            pathname: pathname.to_string(),
            compressed: container != Container::Plain,
            decoder,
        })
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    /// True when this stage actually decompresses (or unzips).
    pub fn decompressing(&self) -> bool {
        self.compressed
    }

    /// Current zip entry, when this source walks a zip archive.
    pub fn zip_entry(&self) -> Option<&ZipEntry> {
        match &self.decoder {
            Decoder::Zip(zip) => zip.entry(),
            _ => None,
        }
    }

    /// Advance to the next zip entry; true when one is available.
    pub fn zip_next(&mut self) -> Result<bool, UnpackError> {
        match &mut self.decoder {
            Decoder::Zip(zip) => Ok(zip.next_entry()?.is_some()),
            _ => Ok(false),
        }
    }

    /// Decompress a block into `buf`; 0 means end of the current part
    /// (for zip: end of the current entry).
    pub fn decompress(&mut self, buf: &mut [u8]) -> Result<usize, UnpackError> {
        match &mut self.decoder {
            Decoder::Plain(r) => Ok(r.read(buf)?),
            Decoder::Gzip(r) => Ok(r.read(buf)?),
            Decoder::Bzip2(r) => Ok(r.read(buf)?),
            Decoder::Xz(r) => Ok(r.read(buf)?),
            Decoder::Zstd(r) => Ok(r.read(buf)?),
            Decoder::Zip(zip) => zip.read(buf),
        }
    }
}
