//! Prefilter predictor tables and their byte-level export.
//!
//! The compiler derives these from the DFA; the matcher reads them to
//! skip input. On disk every table byte is bit-inverted so that an
//! all-zero buffer decodes to "cannot match anywhere".

use thiserror::Error;

/// Size of the PM4 / PM-hash tables.
pub const HASH: usize = 0x2000;

/// Size of the bitap pair table.
pub const BTAP: usize = 0x4000;

/// Hash of a byte pair for the `tap` table.
#[inline]
pub fn pair_hash(prev: u8, curr: u8) -> u16 {
    (((prev as u16) << 6) ^ curr as u16) & (BTAP as u16 - 1)
}

/// Chained hash over a byte sequence for the `pma`/`pmh` tables.
#[inline]
pub fn chain_hash(h: u16, b: u8) -> u16 {
    ((h << 3) ^ b as u16) & (HASH as u16 - 1)
}

#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("predictor blob truncated at byte {0}")]
    Truncated(usize),
}

/// Immutable prefilter tables of a compiled pattern.
///
/// `bit`, `tap`, `pma` and `pmh` are Bloom-style: a cleared bit means
/// "possible", a set bit means "impossible". `min` is the shortest match
/// length capped at 8; `len` the exact literal prefix length when the
/// automaton is a straight chain up front.
#[derive(Clone)]
pub struct Predictor {
    /// Literal prefix length (0 when the pattern has no literal spine).
    pub len: u8,
    /// Minimum match length, capped at 8.
    pub min: u8,
    /// Whole pattern is one literal string.
    pub one: bool,
    /// Pattern can only match at begin of line.
    pub bol: bool,
    /// Literal prefix bytes (`len` of them), then needle pin tables.
    pub chr: Vec<u8>,
    /// 8-lane bitap Bloom filter; bit k clear in `bit[b]` iff byte `b`
    /// may occur at match position `k`.
    pub bit: [u8; 256],
    /// Pair Bloom over `pair_hash(prev, curr)`.
    pub tap: Box<[u8; BTAP]>,
    /// PM4 filter (used when `min <= 3`), 2 bits per depth.
    pub pma: Box<[u8; HASH]>,
    /// PM-hash filter (used when `min >= 4`).
    pub pmh: Box<[u8; HASH]>,
    /// Bytes that may start a match.
    pub fst: [bool; 256],
    /// Lookback byte set (bytes on edges cut away by the s-t cut).
    pub cbk: [bool; 256],
    /// Max lookback distance; 0xFFFF when the cut crossed loops, 0 when
    /// there is no lookback at all.
    pub lbk: u16,
    /// Min lookback distance.
    pub lbm: u16,

    // Search hints derived at compile time; not part of the blob.
    /// Boyer-Moore shift table over the literal prefix.
    pub bms: [u8; 256],
    /// Boyer-Moore minimal shift distance; 0 disables B-M.
    pub bmd: u16,
    /// Offset of the least frequent prefix/needle position.
    pub lcp: u16,
    /// Offset of the second needle position (0xFFFF selects B-M).
    pub lcs: u16,
    /// Number of needle pins in `chr` per position; 0 disables pinning.
    pub pin: u16,
    /// Average bitap entropy per pattern position.
    pub npy: u16,
}

impl Default for Predictor {
    fn default() -> Self {
        Predictor {
            len: 0,
            min: 0,
            one: false,
            bol: false,
            chr: Vec::new(),
            bit: [0xff; 256],
            tap: Box::new([0xff; BTAP]),
            pma: Box::new([0xff; HASH]),
            pmh: Box::new([0xff; HASH]),
            fst: [false; 256],
            cbk: [false; 256],
            lbk: 0,
            lbm: 0,
            bms: [0; 256],
            bmd: 0,
            lcp: 0,
            lcs: 0,
            pin: 0,
            npy: 0,
        }
    }
}

impl Predictor {
    pub fn has_lookback(&self) -> bool {
        self.lbk > 0
    }

    /// Serialize to the on-disk blob (bit-inverted tables).
    pub fn to_blob(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.len as usize + 256 + BTAP + HASH + 68);
        out.push(self.len);
        let flags = (self.min & 0x0f)
            | ((self.one as u8) << 4)
            | ((self.has_lookback() as u8) << 5)
            | ((self.bol as u8) << 6)
            | 0x80;
        out.push(flags);
        if self.len > 0 {
            out.extend_from_slice(&self.chr[..self.len as usize]);
        } else {
            out.extend(self.bit.iter().map(|&b| !b));
            out.extend(self.tap.iter().map(|&b| !b));
        }
        if self.min < 4 {
            out.extend(self.pma.iter().map(|&b| !b));
        } else {
            out.extend(self.pmh.iter().map(|&b| !b));
        }
        if self.has_lookback() {
            out.extend_from_slice(&self.lbk.to_le_bytes());
            out.extend_from_slice(&self.lbm.to_le_bytes());
            out.extend_from_slice(&pack_bitset(&self.cbk));
            out.extend_from_slice(&pack_bitset(&self.fst));
        }
        out
    }

    /// Deserialize a blob written by [`Predictor::to_blob`].
    pub fn from_blob(blob: &[u8]) -> Result<Predictor, PredictorError> {
        let mut p = Predictor::default();
        let mut at = 0usize;
        let take = |at: &mut usize, n: usize| -> Result<std::ops::Range<usize>, PredictorError> {
            if *at + n > blob.len() {
                return Err(PredictorError::Truncated(blob.len()));
            }
            let r = *at..*at + n;
            *at += n;
            Ok(r)
        };
        let head = take(&mut at, 2)?;
        p.len = blob[head.start];
        let flags = blob[head.start + 1];
        p.min = flags & 0x0f;
        p.one = flags & 0x10 != 0;
        let has_lookback = flags & 0x20 != 0;
        p.bol = flags & 0x40 != 0;
        let has_tap = flags & 0x80 != 0;
        if p.len > 0 {
            let r = take(&mut at, p.len as usize)?;
            p.chr = blob[r].to_vec();
        } else {
            let r = take(&mut at, 256)?;
            for (i, &b) in blob[r].iter().enumerate() {
                p.bit[i] = !b;
            }
            if has_tap {
                let r = take(&mut at, BTAP)?;
                for i in 0..BTAP {
                    p.tap[i] = !blob[r.start + i];
                }
            } else {
                // legacy blob without a pair table: lossily derive it
                // from the bitap lanes (uncorrelated, still sound)
                for k in 0..p.min {
                    let mask = 1u8 << k;
                    for ch in 0..=255u8 {
                        if p.bit[ch as usize] & mask != 0 {
                            continue;
                        }
                        for next in 0..=255u8 {
                            if k + 1 >= p.min || p.bit[next as usize] & (mask << 1) == 0 {
                                p.tap[pair_hash(ch, next) as usize] &= !mask;
                            }
                        }
                    }
                }
            }
        }
        if p.min < 4 {
            let r = take(&mut at, HASH)?;
            for i in 0..HASH {
                p.pma[i] = !blob[r.start + i];
            }
        } else {
            let r = take(&mut at, HASH)?;
            for i in 0..HASH {
                p.pmh[i] = !blob[r.start + i];
            }
        }
        if has_lookback {
            let r = take(&mut at, 4)?;
            p.lbk = u16::from_le_bytes([blob[r.start], blob[r.start + 1]]);
            p.lbm = u16::from_le_bytes([blob[r.start + 2], blob[r.start + 3]]);
            let r = take(&mut at, 32)?;
            unpack_bitset(&blob[r], &mut p.cbk);
            let r = take(&mut at, 32)?;
            unpack_bitset(&blob[r], &mut p.fst);
        } else {
            // recover the first-byte set from bitap lane 0
            for i in 0..256 {
                p.fst[i] = p.bit[i] & 1 == 0;
            }
        }
        Ok(p)
    }
}

fn pack_bitset(bits: &[bool; 256]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for (i, &b) in bits.iter().enumerate() {
        if b {
            out[i >> 3] |= 1 << (i & 7);
        }
    }
    out
}

fn unpack_bitset(bytes: &[u8], bits: &mut [bool; 256]) {
    for i in 0..256 {
        bits[i] = bytes[i >> 3] & (1 << (i & 7)) != 0;
    }
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("len", &self.len)
            .field("min", &self.min)
            .field("one", &self.one)
            .field("bol", &self.bol)
            .field("lbk", &self.lbk)
            .field("lbm", &self.lbm)
            .field("pin", &self.pin)
            .field("bmd", &self.bmd)
            .finish_non_exhaustive()
    }
}
