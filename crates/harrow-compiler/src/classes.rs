//! Escape sequences and bracket list compilation.

use harrow_core::{CharSet, Location, Meta, is_meta};

use crate::error::{RegexError, RegexErrorKind};
use crate::mods::{ModFlag, ModSpans};
use crate::parser::Compiler;

/// POSIX class names, in escape-table order.
static POSIX_CLASS: [&str; 14] = [
    "ASCII", "Space", "XDigit", "Cntrl", "Print", "Alnum", "Alpha", "Blank", "Digit", "Graph",
    "Lower", "Punct", "Upper", "Word",
];

/// POSIX class byte sets as four 64-bit words (low word = bytes 0..=63).
#[rustfmt::skip]
static POSIX_CHARS: [[u64; 5]; 14] = [
    [0xffffffffffffffff, 0xffffffffffffffff, 0, 0, 0], // ASCII
    [0x0000000100003e00, 0x0000000000000000, 0, 0, 0], // Space: \t-\r, ' '
    [0x03ff000000000000, 0x0000007e0000007e, 0, 0, 0], // XDigit: 0-9, A-F, a-f
    [0x00000000ffffffff, 0x8000000000000000, 0, 0, 0], // Cntrl: \x00-\x1f, \x7f
    [0xffffffff00000000, 0x7fffffffffffffff, 0, 0, 0], // Print: ' '-'~'
    [0x03ff000000000000, 0x07fffffe07fffffe, 0, 0, 0], // Alnum: 0-9, A-Z, a-z
    [0x0000000000000000, 0x07fffffe07fffffe, 0, 0, 0], // Alpha: A-Z, a-z
    [0x0000000100000200, 0x0000000000000000, 0, 0, 0], // Blank: \t, ' '
    [0x03ff000000000000, 0x0000000000000000, 0, 0, 0], // Digit: 0-9
    [0xfffffffe00000000, 0x7fffffffffffffff, 0, 0, 0], // Graph: '!'-'~'
    [0x0000000000000000, 0x07fffffe00000000, 0, 0, 0], // Lower: a-z
    [0xfc00fffe00000000, 0x78000001f8000001, 0, 0, 0], // Punct
    [0x0000000000000000, 0x0000000007fffffe, 0, 0, 0], // Upper: A-Z
    [0x03ff000000000000, 0x07fffffe87fffffe, 0, 0, 0], // Word: 0-9, A-Z, a-z, _
];

/// Escape letters mapping to POSIX classes; index/2 is the class, odd
/// indices are the complemented upper-case forms.
static CLASS_ESCAPES: &[u8] = b"__sSxX________hHdD__lL__uUwW";

/// Add POSIX class `index` to `chars`.
pub(crate) fn posix(index: usize, chars: &mut CharSet) {
    *chars |= CharSet::from_words(POSIX_CHARS[index]);
}

impl Compiler<'_> {
    /// Parse the escape sequence at `loc` (pointing at the escape
    /// character). Returns the literal byte, or a meta value when the
    /// escape denotes a class that was added to `chars`.
    pub(crate) fn parse_esc(
        &self,
        loc: &mut Location,
        mut chars: Option<&mut CharSet>,
    ) -> Result<u16, RegexError> {
        *loc += 1;
        let mut c: u16 = self.at(*loc) as u16;
        if c == b'0' as u16 {
            // octal \0nnn
            c = 0;
            *loc += 1;
            let mut d = self.at(*loc);
            if (b'0'..=b'7').contains(&d) {
                c = (d - b'0') as u16;
                *loc += 1;
                d = self.at(*loc);
                if (b'0'..=b'7').contains(&d) {
                    c = (c << 3) + (d - b'0') as u16;
                    *loc += 1;
                    d = self.at(*loc);
                    if c < 32 && (b'0'..=b'7').contains(&d) {
                        c = (c << 3) + (d - b'0') as u16;
                        *loc += 1;
                    }
                }
            }
        } else if (c == b'x' as u16 || c == b'u' as u16) && self.at(*loc + 1) == b'{' {
            // \x{hh} and \u{hh}
            c = 0;
            *loc += 2;
            let d = self.at(*loc);
            if d.is_ascii_hexdigit() {
                c = hex_val(d) as u16;
                *loc += 1;
                let d = self.at(*loc);
                if d.is_ascii_hexdigit() {
                    c = (c << 4) + hex_val(d) as u16;
                    *loc += 1;
                }
            }
            if self.at(*loc) == b'}' {
                *loc += 1;
            } else {
                return Err(self.err(RegexErrorKind::InvalidEscape, *loc));
            }
        } else if c == b'x' as u16 && self.at(*loc + 1).is_ascii_hexdigit() {
            *loc += 1;
            let d = self.at(*loc);
            c = hex_val(d) as u16;
            *loc += 1;
            let d = self.at(*loc);
            if d.is_ascii_hexdigit() {
                c = (c << 4) + hex_val(d) as u16;
                *loc += 1;
            }
        } else if c == b'c' as u16 {
            // control character \cX
            *loc += 1;
            c = (self.at(*loc) % 32) as u16;
            *loc += 1;
        } else if c == b'e' as u16 {
            c = 0x1b;
            *loc += 1;
        } else if c == b'N' as u16 {
            // any byte except newline
            if let Some(chars) = chars.as_deref_mut() {
                chars.add_range(0, 9);
                chars.add_range(11, 255);
            }
            *loc += 1;
            c = Meta::EOL as u16;
        } else if (c == b'p' as u16 || c == b'P' as u16) && self.at(*loc + 1) == b'{' {
            let negate = c == b'P' as u16;
            *loc += 2;
            if let Some(chars) = chars.as_deref_mut() {
                let index = POSIX_CLASS
                    .iter()
                    .position(|name| self.eq_at(*loc, name))
                    .ok_or_else(|| self.err(RegexErrorKind::InvalidClass, *loc))?;
                posix(index, chars);
                if negate {
                    chars.flip256();
                }
                *loc += POSIX_CLASS[index].len() as Location;
                if self.at(*loc) == b'}' {
                    *loc += 1;
                } else {
                    return Err(self.err(RegexErrorKind::InvalidEscape, *loc));
                }
            } else {
                loop {
                    *loc += 1;
                    let d = self.at(*loc);
                    if d == 0 || d == b'}' {
                        break;
                    }
                }
                if self.at(*loc) == b'}' {
                    *loc += 1;
                } else {
                    return Err(self.err(RegexErrorKind::InvalidEscape, *loc));
                }
            }
            c = Meta::EOL as u16;
        } else {
            if let Some(i) = b"abtnvfr".iter().position(|&e| e as u16 == c) {
                c = 0x07 + i as u16;
            } else if let Some(i) = CLASS_ESCAPES.iter().position(|&e| e != b'_' && e as u16 == c)
            {
                if let Some(chars) = chars.as_deref_mut() {
                    posix(i / 2, chars);
                    if i % 2 == 1 {
                        chars.flip256();
                    }
                }
                c = Meta::EOL as u16;
            }
            *loc += 1;
        }
        if c <= 0xff
            && let Some(chars) = chars
        {
            chars.add(c);
        }
        Ok(c)
    }

    /// Compile the bracket list starting at `loc` (just after `[`).
    pub(crate) fn compile_list(
        &self,
        mut loc: Location,
        chars: &mut CharSet,
        modifiers: &ModSpans,
    ) -> Result<(), RegexError> {
        let complement = self.at(loc) == b'^';
        if complement {
            loc += 1;
        }
        let mut prev: u16 = Meta::BOL as u16; // sentinel: no previous char
        let mut lo: u16 = Meta::EOL as u16; // sentinel: no open range
        let mut c: u16 = self.at(loc) as u16;
        while c != 0 && (c != b']' as u16 || prev == Meta::BOL as u16) {
            if c == b'-' as u16 && !is_meta(prev) && is_meta(lo) {
                lo = prev;
            } else {
                if c == b'[' as u16
                    && self.at(loc + 1) == b':'
                    && let Some(c_loc) = self.find_at(loc + 2, b':')
                    && self.at(c_loc + 1) == b']'
                {
                    if c_loc == loc + 3 {
                        // single-letter form [:x:] is an escape class
                        loc += 1;
                        c = self.parse_esc(&mut loc, Some(&mut *chars))?;
                    } else {
                        let index = POSIX_CLASS
                            .iter()
                            .position(|name| self.eq_at(loc + 4, &name[2..]))
                            .ok_or_else(|| self.err(RegexErrorKind::InvalidClass, loc))?;
                        posix(index, chars);
                        c = Meta::EOL as u16;
                    }
                    loc = c_loc + 1;
                } else if c == b'[' as u16 && matches!(self.at(loc + 1), b'.' | b'=') {
                    // collating element [.x.] or equivalence [=x=]
                    let e = self.at(loc + 2);
                    if e == 0 || self.at(loc + 3) != self.at(loc + 1) || self.at(loc + 4) != b']'
                    {
                        return Err(self.err(RegexErrorKind::InvalidCollating, loc));
                    }
                    c = e as u16;
                    loc += 4;
                } else if Some(c as u8) == self.opts.escape && c <= 0xff && !self.opts.b {
                    c = self.parse_esc(&mut loc, Some(&mut *chars))?;
                    loc -= 1;
                }
                if !is_meta(c) {
                    if !is_meta(lo) {
                        // close the range lo-c
                        if modifiers.is(ModFlag::I, loc) {
                            let mut a = lo;
                            let mut b = c;
                            if (b'a' as u16..=b'z' as u16).contains(&a) && b <= b'z' as u16 {
                                a = upper(a);
                            }
                            if (b'a' as u16..=b'z' as u16).contains(&b) && a <= upper(b) {
                                b = upper(b);
                            }
                            if a > b {
                                return Err(self.err(RegexErrorKind::InvalidClassRange, loc));
                            }
                            chars.add_range(a, b);
                            let a = lo.max(b'A' as u16);
                            let b = c.min(b'Z' as u16);
                            if a <= b {
                                chars.add_range(lower(a), lower(b));
                            }
                            let a = lo.max(b'a' as u16);
                            let b = c.min(b'z' as u16);
                            if a <= b {
                                chars.add_range(upper(a), upper(b));
                            }
                        } else {
                            if lo > c {
                                return Err(self.err(RegexErrorKind::InvalidClassRange, loc));
                            }
                            chars.add_range(lo, c);
                        }
                        c = Meta::EOL as u16;
                    } else if (c as u8).is_ascii_alphabetic() && modifiers.is(ModFlag::I, loc) {
                        chars.add(upper(c));
                        chars.add(lower(c));
                    } else {
                        chars.add(c);
                    }
                }
                prev = c;
                lo = Meta::EOL as u16;
            }
            loc += 1;
            c = self.at(loc) as u16;
        }
        if !is_meta(lo) {
            chars.add(b'-' as u16);
        }
        if complement {
            chars.flip256();
        }
        Ok(())
    }
}

fn hex_val(d: u8) -> u8 {
    if d > b'9' { (d | 0x20) - (b'a' - 10) } else { d - b'0' }
}

fn upper(c: u16) -> u16 {
    if (b'a' as u16..=b'z' as u16).contains(&c) {
        c - 32
    } else {
        c
    }
}

fn lower(c: u16) -> u16 {
    if (b'A' as u16..=b'Z' as u16).contains(&c) {
        c + 32
    } else {
        c
    }
}
