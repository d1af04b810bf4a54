use crate::hasher::{index_bytes, indexhash, noise_percentage};

#[test]
fn indexhash_is_prime61_mod_2_16() {
    assert_eq!(indexhash(0, 7), 7);
    assert_eq!(indexhash(1, 0), 61);
    assert_eq!(indexhash(100, 5), 6105);
    // wraps at 2^16
    assert_eq!(indexhash(0x1000, 0), (61 * 0x1000) & 0xffff);
}

#[test]
fn noise_percentages() {
    assert_eq!(noise_percentage(9), 10);
    assert_eq!(noise_percentage(0), 80);
    assert!(noise_percentage(4) > 10 && noise_percentage(4) < 80);
}

#[test]
fn empty_file_has_empty_index() {
    let idx = index_bytes(b"", 4);
    assert_eq!(idx.logsize, 0);
    assert!(idx.hashes.is_empty());
}

#[test]
fn contained_grams_are_reported_possible() {
    let text = b"the quick brown fox jumps over the lazy dog";
    let idx = index_bytes(text, 9);
    for window in [&b"quick"[..], b"fox", b"the", b"lazy dog", b"g"] {
        assert!(idx.may_contain(window), "false negative for {window:?}");
    }
}

#[test]
fn absent_grams_are_mostly_rejected_at_high_accuracy() {
    let text = b"abcdefgh ".repeat(16);
    let idx = index_bytes(&text, 9);
    // a probe that shares no grams with the content
    assert!(!idx.may_contain(b"XYZQWJVK"));
}

#[test]
fn lower_accuracy_gives_smaller_tables() {
    let text: Vec<u8> = (0..4096u32).map(|i| (i * 31) as u8).collect();
    let high = index_bytes(&text, 9);
    let low = index_bytes(&text, 0);
    assert!(low.hashes.len() <= high.hashes.len());
    assert!(high.hashes.len() <= 65536);
    assert!(low.hashes.len() >= 16);
}

#[test]
fn indexing_is_deterministic() {
    let text = b"same input, same table".repeat(8);
    let a = index_bytes(&text, 4);
    let b = index_bytes(&text, 4);
    assert_eq!(a.hashes, b.hashes);
    assert_eq!(a.logsize, b.logsize);
}
