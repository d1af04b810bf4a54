use crate::hasher::index_bytes;
use crate::store::{Record, Store};

fn record(basename: &str, hashes: Vec<u8>) -> Record {
    Record {
        accuracy: 4,
        binary: false,
        archive: false,
        compressed: false,
        basename: basename.to_string(),
        hashes,
    }
}

#[test]
fn round_trips_records() {
    let mut store = Store::new();
    store.upsert(record("a.txt", vec![0xaa; 16]));
    let mut b = record("b.bin", vec![0x55; 32]);
    b.binary = true;
    b.compressed = true;
    store.upsert(b);

    let mut bytes = Vec::new();
    store.write(&mut bytes).unwrap();
    assert_eq!(&bytes[..4], b"UG#\x03");

    let back = Store::read(bytes.as_slice()).unwrap();
    assert_eq!(back.records().len(), 2);
    assert_eq!(back.records()[0].basename, "a.txt");
    assert_eq!(back.records()[0].logsize(), 4);
    let b = back.get("b.bin").unwrap();
    assert!(b.binary);
    assert!(b.compressed);
    assert!(!b.archive);
    assert_eq!(b.hashes.len(), 32);
}

#[test]
fn rewriting_unchanged_store_is_byte_identical() {
    let mut store = Store::new();
    store.upsert(record("one", index_bytes(b"some file content", 4).hashes));
    store.upsert(record("two", index_bytes(b"other content", 4).hashes));

    let mut first = Vec::new();
    store.write(&mut first).unwrap();
    let reread = Store::read(first.as_slice()).unwrap();
    let mut second = Vec::new();
    reread.write(&mut second).unwrap();
    assert_eq!(first, second);
}

#[test]
fn later_duplicates_supersede() {
    let mut store = Store::new();
    store.upsert(record("dup", vec![0x11; 16]));
    store.upsert(record("other", vec![0x22; 16]));
    store.upsert(record("dup", vec![0x33; 16]));
    assert_eq!(store.records().len(), 2);
    // position preserved, content replaced
    assert_eq!(store.records()[0].basename, "dup");
    assert_eq!(store.records()[0].hashes[0], 0x33);
}

#[test]
fn bad_magic_is_rejected() {
    assert!(Store::read(&b"XXXX"[..]).is_err());
    assert!(Store::read(&b"UG"[..]).is_err());
}

#[test]
fn truncated_record_is_an_error() {
    let mut store = Store::new();
    store.upsert(record("x", vec![0u8; 16]));
    let mut bytes = Vec::new();
    store.write(&mut bytes).unwrap();
    bytes.truncate(bytes.len() - 3);
    assert!(Store::read(bytes.as_slice()).is_err());
}

#[test]
fn save_and_load_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(crate::store::INDEX_FILENAME);
    let mut store = Store::new();
    store.upsert(record("f", vec![0xf0; 16]));
    store.save(&path).unwrap();
    let back = Store::load(&path).unwrap();
    assert_eq!(back.records(), store.records());
}

#[test]
fn empty_hashes_record() {
    let mut store = Store::new();
    store.upsert(record("empty", Vec::new()));
    let mut bytes = Vec::new();
    store.write(&mut bytes).unwrap();
    let back = Store::read(bytes.as_slice()).unwrap();
    assert_eq!(back.get("empty").unwrap().hashes.len(), 0);
}
