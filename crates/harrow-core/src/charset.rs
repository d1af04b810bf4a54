//! Byte + meta character sets.
//!
//! A `CharSet` covers the 256 byte values plus the meta symbols the
//! compiler expands anchors and boundaries into. It is a flat 320-bit
//! bitset, which keeps the subset-construction inner loops branch-free.

/// First meta symbol value; everything above a byte is a meta.
pub const META_MIN: u16 = 0x101;

/// Last meta symbol value.
pub const META_MAX: u16 = 0x10f;

/// Meta symbols carried on DFA edges next to plain bytes.
///
/// The word-boundary symbols come in begin/end pairs: the `..B` form is
/// used when the anchor opened a pattern (it constrains the position
/// before the first matched byte), the `..E` form when it closed one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u16)]
pub enum Meta {
    /// Word boundary at a match begin.
    WBB = 0x101,
    /// Word boundary at a match end.
    WBE = 0x102,
    /// Non-word-boundary at a match begin.
    NWB = 0x103,
    /// Non-word-boundary at a match end.
    NWE = 0x104,
    /// Begin-of-word, opening.
    BWB = 0x105,
    /// End-of-word, opening.
    EWB = 0x106,
    /// Begin-of-word, closing.
    BWE = 0x107,
    /// End-of-word, closing.
    EWE = 0x108,
    /// Begin of line.
    BOL = 0x109,
    /// End of line.
    EOL = 0x10a,
    /// Begin of buffer.
    BOB = 0x10b,
    /// End of buffer.
    EOB = 0x10c,
    /// Undent boundary.
    UND = 0x10d,
    /// Indent boundary.
    IND = 0x10e,
    /// Dedent boundary.
    DED = 0x10f,
}

impl Meta {
    pub fn from_u16(v: u16) -> Option<Meta> {
        Some(match v {
            0x101 => Meta::WBB,
            0x102 => Meta::WBE,
            0x103 => Meta::NWB,
            0x104 => Meta::NWE,
            0x105 => Meta::BWB,
            0x106 => Meta::EWB,
            0x107 => Meta::BWE,
            0x108 => Meta::EWE,
            0x109 => Meta::BOL,
            0x10a => Meta::EOL,
            0x10b => Meta::BOB,
            0x10c => Meta::EOB,
            0x10d => Meta::UND,
            0x10e => Meta::IND,
            0x10f => Meta::DED,
            _ => return None,
        })
    }

    pub fn label(self) -> &'static str {
        match self {
            Meta::WBB => "WBB",
            Meta::WBE => "WBE",
            Meta::NWB => "NWB",
            Meta::NWE => "NWE",
            Meta::BWB => "BWB",
            Meta::EWB => "EWB",
            Meta::BWE => "BWE",
            Meta::EWE => "EWE",
            Meta::BOL => "BOL",
            Meta::EOL => "EOL",
            Meta::BOB => "BOB",
            Meta::EOB => "EOB",
            Meta::UND => "UND",
            Meta::IND => "IND",
            Meta::DED => "DED",
        }
    }
}

/// True when `c` names a meta symbol rather than a byte.
pub fn is_meta(c: u16) -> bool {
    c > 0xff
}

/// Word bytes for boundary evaluation: ASCII alphanumerics and `_`.
pub fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Set of byte values 0..=255 plus meta symbols, as a 320-bit bitset.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct CharSet {
    words: [u64; 5],
}

impl CharSet {
    pub const fn new() -> Self {
        CharSet { words: [0; 5] }
    }

    /// Construct from raw 64-bit words (low word holds bytes 0..=63).
    pub const fn from_words(words: [u64; 5]) -> Self {
        CharSet { words }
    }

    /// The dot class: all bytes except `\n`, plus nothing else.
    pub fn dot() -> Self {
        let mut cs = CharSet::new();
        cs.add_range(0x00, 0xff);
        cs.remove(b'\n' as u16);
        cs
    }

    /// All 256 bytes (dotall).
    pub fn any_byte() -> Self {
        let mut cs = CharSet::new();
        cs.add_range(0x00, 0xff);
        cs
    }

    pub fn add(&mut self, c: u16) {
        debug_assert!(c <= META_MAX);
        self.words[(c >> 6) as usize] |= 1 << (c & 0x3f);
    }

    pub fn add_range(&mut self, lo: u16, hi: u16) {
        for c in lo..=hi {
            self.add(c);
        }
    }

    pub fn remove(&mut self, c: u16) {
        self.words[(c >> 6) as usize] &= !(1 << (c & 0x3f));
    }

    pub fn contains(&self, c: u16) -> bool {
        c <= META_MAX && self.words[(c >> 6) as usize] & (1 << (c & 0x3f)) != 0
    }

    pub fn any(&self) -> bool {
        self.words.iter().any(|&w| w != 0)
    }

    pub fn intersects(&self, other: &CharSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(&a, &b)| a & b != 0)
    }

    /// Lowest member, if any.
    pub fn lo(&self) -> Option<u16> {
        for (i, &w) in self.words.iter().enumerate() {
            if w != 0 {
                return Some((i as u16) * 64 + w.trailing_zeros() as u16);
            }
        }
        None
    }

    /// Highest member, if any.
    pub fn hi(&self) -> Option<u16> {
        for (i, &w) in self.words.iter().enumerate().rev() {
            if w != 0 {
                return Some((i as u16) * 64 + 63 - w.leading_zeros() as u16);
            }
        }
        None
    }

    /// Number of members.
    pub fn count(&self) -> u32 {
        self.words.iter().map(|w| w.count_ones()).sum()
    }

    /// Complement within the byte range 0..=255; metas are untouched.
    pub fn flip256(&mut self) {
        for w in &mut self.words[0..4] {
            *w = !*w;
        }
    }
}

impl std::ops::BitOrAssign for CharSet {
    fn bitor_assign(&mut self, rhs: Self) {
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a |= b;
        }
    }
}

impl std::ops::BitAnd for CharSet {
    type Output = CharSet;
    fn bitand(self, rhs: Self) -> CharSet {
        let mut out = CharSet::new();
        for i in 0..5 {
            out.words[i] = self.words[i] & rhs.words[i];
        }
        out
    }
}

impl std::ops::SubAssign for CharSet {
    fn sub_assign(&mut self, rhs: Self) {
        for (a, b) in self.words.iter_mut().zip(rhs.words.iter()) {
            *a &= !b;
        }
    }
}

impl std::fmt::Debug for CharSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CharSet[")?;
        let mut first = true;
        let mut c = 0u16;
        while c <= META_MAX {
            if self.contains(c) {
                let lo = c;
                while c < META_MAX && self.contains(c + 1) {
                    c += 1;
                }
                if !first {
                    write!(f, " ")?;
                }
                first = false;
                if let Some(m) = Meta::from_u16(lo) {
                    write!(f, "{}", m.label())?;
                } else if lo == c {
                    write!(f, "{lo:#04x}")?;
                } else {
                    write!(f, "{lo:#04x}-{c:#04x}")?;
                }
            }
            c += 1;
        }
        write!(f, "]")
    }
}
