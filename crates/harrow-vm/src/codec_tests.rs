use crate::codec::{decode_utf8, detect_bom, push_utf8};
use crate::codec::Encoding;

#[test]
fn bom_detection_order() {
    assert_eq!(
        detect_bom(&[0xef, 0xbb, 0xbf, b'a']),
        Some((Encoding::Utf8, 3))
    );
    assert_eq!(
        detect_bom(&[0xfe, 0xff, 0x00, b'a']),
        Some((Encoding::Utf16Be, 2))
    );
    assert_eq!(
        detect_bom(&[0xff, 0xfe, b'a', 0x00]),
        Some((Encoding::Utf16Le, 2))
    );
    // UTF-32 LE BOM shadows the UTF-16 LE prefix and must win
    assert_eq!(
        detect_bom(&[0xff, 0xfe, 0x00, 0x00]),
        Some((Encoding::Utf32Le, 4))
    );
    assert_eq!(
        detect_bom(&[0x00, 0x00, 0xfe, 0xff]),
        Some((Encoding::Utf32Be, 4))
    );
    assert_eq!(detect_bom(b"abcd"), None);
}

#[test]
fn utf8_encoding_widths() {
    let mut out = Vec::new();
    push_utf8(&mut out, 'A' as u32);
    push_utf8(&mut out, 0xe9); // é
    push_utf8(&mut out, 0x20ac); // €
    push_utf8(&mut out, 0x1f600);
    assert_eq!(out, "Aé€😀".as_bytes());
}

#[test]
fn surrogates_encode_replacement() {
    let mut out = Vec::new();
    push_utf8(&mut out, 0xd800);
    assert_eq!(out, "\u{fffd}".as_bytes());
    out.clear();
    push_utf8(&mut out, 0x110000);
    assert_eq!(out, "\u{fffd}".as_bytes());
}

#[test]
fn decode_rejects_overlong_and_surrogates() {
    // overlong encoding of '/'
    assert_eq!(decode_utf8(&[0xc0, 0xaf]), None);
    assert_eq!(decode_utf8(&[0xe0, 0x80, 0xaf]), None);
    // surrogate D800 as UTF-8
    assert_eq!(decode_utf8(&[0xed, 0xa0, 0x80]), None);
    // bare continuation
    assert_eq!(decode_utf8(&[0x80]), None);
}

#[test]
fn decode_accepts_valid_sequences() {
    assert_eq!(decode_utf8(b"A"), Some((0x41, 1)));
    assert_eq!(decode_utf8("é".as_bytes()), Some((0xe9, 2)));
    assert_eq!(decode_utf8("€".as_bytes()), Some((0x20ac, 3)));
    assert_eq!(decode_utf8("😀".as_bytes()), Some((0x1f600, 4)));
}

#[test]
fn code_page_tables_have_known_entries() {
    use crate::tables;
    assert_eq!(tables::CP1252[0x80 - 0x80], 0x20ac); // €
    assert_eq!(tables::CP437[0x82 - 0x80], 0xe9); // é
    assert_eq!(tables::KOI8_R[0xc1 - 0x80], 0x0430); // а
    assert_eq!(tables::ISO8859_15[0xa4 - 0x80], 0x20ac); // €
    assert_eq!(tables::EBCDIC[0xc1], 'A' as u16);
    assert_eq!(tables::EBCDIC[0x40], ' ' as u16);
}
