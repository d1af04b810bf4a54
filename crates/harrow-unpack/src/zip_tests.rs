use std::io::Write;

use crate::zip::ZipStream;

/// Append a stored (method 0) local entry.
fn push_stored(zip: &mut Vec<u8>, name: &str, data: &[u8]) {
    let crc = crc32fast::hash(data);
    zip.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
    zip.extend_from_slice(&20u16.to_le_bytes()); // version needed
    zip.extend_from_slice(&0u16.to_le_bytes()); // flags
    zip.extend_from_slice(&0u16.to_le_bytes()); // method: stored
    zip.extend_from_slice(&0u16.to_le_bytes()); // time
    zip.extend_from_slice(&0u16.to_le_bytes()); // date
    zip.extend_from_slice(&crc.to_le_bytes());
    zip.extend_from_slice(&(data.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(data.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(name.len() as u16).to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes()); // extra len
    zip.extend_from_slice(name.as_bytes());
    zip.extend_from_slice(data);
}

/// Append a deflated (method 8) local entry.
fn push_deflated(zip: &mut Vec<u8>, name: &str, data: &[u8]) {
    let crc = crc32fast::hash(data);
    let mut enc = flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
    enc.write_all(data).unwrap();
    let packed = enc.finish().unwrap();
    zip.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
    zip.extend_from_slice(&20u16.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip.extend_from_slice(&8u16.to_le_bytes()); // method: deflate
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip.extend_from_slice(&crc.to_le_bytes());
    zip.extend_from_slice(&(packed.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(data.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(name.len() as u16).to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip.extend_from_slice(name.as_bytes());
    zip.extend_from_slice(&packed);
}

fn push_end_of_directory(zip: &mut Vec<u8>) {
    // central directory magic stops the entry walk
    zip.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
}

fn read_entry(zip: &mut ZipStream) -> Vec<u8> {
    let mut out = Vec::new();
    let mut buf = [0u8; 64];
    loop {
        let n = zip.read(&mut buf).unwrap();
        if n == 0 {
            return out;
        }
        out.extend_from_slice(&buf[..n]);
    }
}

#[test]
fn stored_and_deflated_entries_round_trip() {
    let mut bytes = Vec::new();
    push_stored(&mut bytes, "a.txt", b"foo\n");
    push_deflated(&mut bytes, "b.txt", b"foobar\n");
    push_end_of_directory(&mut bytes);

    let mut zip = ZipStream::new("archive.zip".into(), Box::new(std::io::Cursor::new(bytes)));
    let entry = zip.next_entry().unwrap().unwrap();
    assert_eq!(entry.name, "a.txt");
    assert_eq!(read_entry(&mut zip), b"foo\n");

    let entry = zip.next_entry().unwrap().unwrap();
    assert_eq!(entry.name, "b.txt");
    assert_eq!(entry.method, 8);
    assert_eq!(read_entry(&mut zip), b"foobar\n");

    assert!(zip.next_entry().unwrap().is_none());
}

#[test]
fn skipping_an_entry_drains_it() {
    let mut bytes = Vec::new();
    push_stored(&mut bytes, "first", b"0123456789");
    push_stored(&mut bytes, "second", b"abc");
    push_end_of_directory(&mut bytes);

    let mut zip = ZipStream::new("x.zip".into(), Box::new(std::io::Cursor::new(bytes)));
    zip.next_entry().unwrap().unwrap();
    // skip the first entry entirely
    let entry = zip.next_entry().unwrap().unwrap();
    assert_eq!(entry.name, "second");
    assert_eq!(read_entry(&mut zip), b"abc");
}

#[test]
fn crc_mismatch_is_detected() {
    let mut bytes = Vec::new();
    push_stored(&mut bytes, "bad", b"data");
    // corrupt one payload byte (the last 4 bytes are the payload)
    let at = bytes.len() - 1;
    bytes[at] ^= 0xff;
    push_end_of_directory(&mut bytes);

    let mut zip = ZipStream::new("x.zip".into(), Box::new(std::io::Cursor::new(bytes)));
    zip.next_entry().unwrap().unwrap();
    let mut buf = [0u8; 16];
    let mut failed = false;
    loop {
        match zip.read(&mut buf) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                failed = true;
                assert!(e.to_string().contains("crc"));
                break;
            }
        }
    }
    assert!(failed);
}

#[test]
fn encrypted_entries_are_rejected() {
    let mut bytes = Vec::new();
    push_stored(&mut bytes, "secret", b"data");
    bytes[6] |= 1; // set the encryption flag
    let mut zip = ZipStream::new("x.zip".into(), Box::new(std::io::Cursor::new(bytes)));
    let err = zip.next_entry().unwrap_err();
    assert!(err.to_string().contains("encrypted"));
}

#[test]
fn unicode_path_extra_overrides_name() {
    let name = "mangled";
    let utf8 = "héllo.txt";
    let data = b"x";
    let crc = crc32fast::hash(data);
    let mut extra = Vec::new();
    extra.extend_from_slice(&0x7075u16.to_le_bytes());
    let body_len = 5 + utf8.len();
    extra.extend_from_slice(&(body_len as u16).to_le_bytes());
    extra.push(1); // version
    extra.extend_from_slice(&crc32fast::hash(name.as_bytes()).to_le_bytes());
    extra.extend_from_slice(utf8.as_bytes());

    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
    bytes.extend_from_slice(&20u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&0u16.to_le_bytes());
    bytes.extend_from_slice(&crc.to_le_bytes());
    bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&(name.len() as u16).to_le_bytes());
    bytes.extend_from_slice(&(extra.len() as u16).to_le_bytes());
    bytes.extend_from_slice(name.as_bytes());
    bytes.extend_from_slice(&extra);
    bytes.extend_from_slice(data);

    let mut zip = ZipStream::new("x.zip".into(), Box::new(std::io::Cursor::new(bytes)));
    let entry = zip.next_entry().unwrap().unwrap();
    assert_eq!(entry.name, "héllo.txt");
}
