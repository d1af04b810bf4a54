//! Character encodings and UTF-8 transcoding.

use crate::tables;

/// Input encodings recognized by [`crate::Input`]. UTF variants are
/// also auto-detected from a BOM; everything else must be requested.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Encoding {
    /// Plain octets: ASCII, binary, or UTF-8 without BOM.
    Plain,
    Utf8,
    Utf16Be,
    Utf16Le,
    Utf32Be,
    Utf32Le,
    /// ISO-8859-1.
    Latin,
    Cp437,
    Cp850,
    Cp858,
    Ebcdic,
    Cp1250,
    Cp1251,
    Cp1252,
    Cp1253,
    Cp1254,
    Cp1255,
    Cp1256,
    Cp1257,
    Cp1258,
    Iso8859_2,
    Iso8859_3,
    Iso8859_4,
    Iso8859_5,
    Iso8859_6,
    Iso8859_7,
    Iso8859_8,
    Iso8859_9,
    Iso8859_10,
    Iso8859_11,
    Iso8859_13,
    Iso8859_14,
    Iso8859_15,
    Iso8859_16,
    /// Macintosh Roman, with CR to LF translation.
    MacRoman,
    Koi8R,
    Koi8U,
    Koi8Ru,
    /// Caller-supplied 256-entry table of target code points.
    Custom(Box<[u16; 256]>),
}

impl Encoding {
    /// The high-half code page table, when this is a single-byte
    /// table-driven encoding.
    pub(crate) fn table(&self) -> Option<&[u16; 128]> {
        Some(match self {
            Encoding::Cp437 => &tables::CP437,
            Encoding::Cp850 => &tables::CP850,
            Encoding::Cp858 => &tables::CP858,
            Encoding::Cp1250 => &tables::CP1250,
            Encoding::Cp1251 => &tables::CP1251,
            Encoding::Cp1252 => &tables::CP1252,
            Encoding::Cp1253 => &tables::CP1253,
            Encoding::Cp1254 => &tables::CP1254,
            Encoding::Cp1255 => &tables::CP1255,
            Encoding::Cp1256 => &tables::CP1256,
            Encoding::Cp1257 => &tables::CP1257,
            Encoding::Cp1258 => &tables::CP1258,
            Encoding::Iso8859_2 => &tables::ISO8859_2,
            Encoding::Iso8859_3 => &tables::ISO8859_3,
            Encoding::Iso8859_4 => &tables::ISO8859_4,
            Encoding::Iso8859_5 => &tables::ISO8859_5,
            Encoding::Iso8859_6 => &tables::ISO8859_6,
            Encoding::Iso8859_7 => &tables::ISO8859_7,
            Encoding::Iso8859_8 => &tables::ISO8859_8,
            Encoding::Iso8859_9 => &tables::ISO8859_9,
            Encoding::Iso8859_10 => &tables::ISO8859_10,
            Encoding::Iso8859_11 => &tables::ISO8859_11,
            Encoding::Iso8859_13 => &tables::ISO8859_13,
            Encoding::Iso8859_14 => &tables::ISO8859_14,
            Encoding::Iso8859_15 => &tables::ISO8859_15,
            Encoding::Iso8859_16 => &tables::ISO8859_16,
            Encoding::MacRoman => &tables::MACROMAN,
            Encoding::Koi8R => &tables::KOI8_R,
            Encoding::Koi8U => &tables::KOI8_U,
            Encoding::Koi8Ru => &tables::KOI8_RU,
            _ => return None,
        })
    }
}

/// Detect a BOM at the start of `head`; returns the encoding and the
/// BOM length.
pub(crate) fn detect_bom(head: &[u8]) -> Option<(Encoding, usize)> {
    if head.starts_with(&[0x00, 0x00, 0xfe, 0xff]) {
        Some((Encoding::Utf32Be, 4))
    } else if head.starts_with(&[0xff, 0xfe, 0x00, 0x00]) {
        Some((Encoding::Utf32Le, 4))
    } else if head.starts_with(&[0xef, 0xbb, 0xbf]) {
        Some((Encoding::Utf8, 3))
    } else if head.starts_with(&[0xfe, 0xff]) {
        Some((Encoding::Utf16Be, 2))
    } else if head.starts_with(&[0xff, 0xfe]) {
        Some((Encoding::Utf16Le, 2))
    } else {
        None
    }
}

/// Append the UTF-8 encoding of `cp` to `out`. Surrogates and
/// out-of-range values encode U+FFFD.
pub(crate) fn push_utf8(out: &mut Vec<u8>, cp: u32) {
    let cp = if (0xd800..=0xdfff).contains(&cp) || cp > 0x10ffff {
        0xfffd
    } else {
        cp
    };
    match cp {
        0..=0x7f => out.push(cp as u8),
        0x80..=0x7ff => {
            out.push(0xc0 | (cp >> 6) as u8);
            out.push(0x80 | (cp & 0x3f) as u8);
        }
        0x800..=0xffff => {
            out.push(0xe0 | (cp >> 12) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3f) as u8);
            out.push(0x80 | (cp & 0x3f) as u8);
        }
        _ => {
            out.push(0xf0 | (cp >> 18) as u8);
            out.push(0x80 | ((cp >> 12) & 0x3f) as u8);
            out.push(0x80 | ((cp >> 6) & 0x3f) as u8);
            out.push(0x80 | (cp & 0x3f) as u8);
        }
    }
}

/// Validate one UTF-8 sequence at the start of `bytes`, rejecting
/// overlong forms and surrogate code points. Returns the code point
/// and its length.
pub fn decode_utf8(bytes: &[u8]) -> Option<(u32, usize)> {
    let b0 = *bytes.first()? as u32;
    if b0 < 0x80 {
        return Some((b0, 1));
    }
    let need = match b0 {
        0xc2..=0xdf => 1,
        0xe0..=0xef => 2,
        0xf0..=0xf4 => 3,
        _ => return None, // continuation byte, overlong lead, or > U+10FFFF
    };
    if bytes.len() < need + 1 {
        return None;
    }
    let mut cp = b0 & (0x3f >> need);
    for &b in &bytes[1..=need] {
        if b & 0xc0 != 0x80 {
            return None;
        }
        cp = (cp << 6) | (b & 0x3f) as u32;
    }
    let ok = match need {
        1 => cp >= 0x80,
        2 => cp >= 0x800 && !(0xd800..=0xdfff).contains(&cp),
        _ => (0x10000..=0x10ffff).contains(&cp),
    };
    if ok { Some((cp, need + 1)) } else { None }
}
