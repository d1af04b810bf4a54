use crate::codec::Encoding;
use crate::input::Input;

fn read_all(mut input: Input) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 97]; // odd size to exercise partial reads
    loop {
        let n = input.read(&mut buf).unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn plain_bytes_pass_through() {
    let data = b"hello \xff\x00 world".to_vec();
    assert_eq!(read_all(Input::from_bytes(data.clone())), data);
}

#[test]
fn utf8_bom_is_stripped() {
    let mut data = vec![0xef, 0xbb, 0xbf];
    data.extend_from_slice("héllo".as_bytes());
    assert_eq!(read_all(Input::from_bytes(data)), "héllo".as_bytes());
}

#[test]
fn utf16le_bom_transcodes() {
    let mut data = vec![0xff, 0xfe];
    for u in "héllo€".encode_utf16() {
        data.extend_from_slice(&u.to_le_bytes());
    }
    assert_eq!(read_all(Input::from_bytes(data)), "héllo€".as_bytes());
}

#[test]
fn utf16be_surrogate_pairs() {
    let mut data = vec![0xfe, 0xff];
    for u in "a😀b".encode_utf16() {
        data.extend_from_slice(&u.to_be_bytes());
    }
    assert_eq!(read_all(Input::from_bytes(data)), "a😀b".as_bytes());
}

#[test]
fn utf32le_bom_transcodes() {
    let mut data = vec![0xff, 0xfe, 0x00, 0x00];
    for c in "xé€😀".chars() {
        data.extend_from_slice(&(c as u32).to_le_bytes());
    }
    assert_eq!(read_all(Input::from_bytes(data)), "xé€😀".as_bytes());
}

#[test]
fn latin1_transcodes_high_bytes() {
    let input = Input::from_bytes(vec![b'a', 0xe9, b'b']).with_encoding(Encoding::Latin);
    assert_eq!(read_all(input), "aéb".as_bytes());
}

#[test]
fn cp1252_euro_sign() {
    let input = Input::from_bytes(vec![0x80, b'1']).with_encoding(Encoding::Cp1252);
    assert_eq!(read_all(input), "€1".as_bytes());
}

#[test]
fn macroman_translates_cr_to_lf() {
    let input = Input::from_bytes(b"line1\rline2\r".to_vec()).with_encoding(Encoding::MacRoman);
    assert_eq!(read_all(input), b"line1\nline2\n");
}

#[test]
fn ebcdic_text() {
    // "AB " in EBCDIC cp037
    let input = Input::from_bytes(vec![0xc1, 0xc2, 0x40]).with_encoding(Encoding::Ebcdic);
    assert_eq!(read_all(input), b"AB ");
}

#[test]
fn custom_table_maps_every_byte() {
    let mut table = [0u16; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        *slot = (i as u16).wrapping_add(1);
    }
    let input =
        Input::from_bytes(vec![0x40, 0x41]).with_encoding(Encoding::Custom(Box::new(table)));
    assert_eq!(read_all(input), b"AB");
}

#[test]
fn stream_source_works() {
    let reader = std::io::Cursor::new(b"streamed bytes".to_vec());
    assert_eq!(read_all(Input::from_reader(reader)), b"streamed bytes");
}

#[test]
fn reassign_switches_sources() {
    let mut input = Input::from_bytes(b"old".to_vec());
    let mut buf = [0u8; 2];
    input.read(&mut buf).unwrap();
    input.reassign(Input::from_bytes(b"new".to_vec()));
    assert_eq!(read_all(input), b"new");
}
