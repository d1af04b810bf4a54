use crate::predictor::{BTAP, HASH, Predictor, chain_hash, pair_hash};

fn sample() -> Predictor {
    let mut p = Predictor::default();
    p.min = 3;
    p.bol = true;
    p.bit[b'f' as usize] &= !0x01;
    p.bit[b'o' as usize] &= !0x06;
    p.tap[pair_hash(b'f', b'o') as usize] &= !0x01;
    p.tap[pair_hash(b'o', b'o') as usize] &= !0x02;
    let h = chain_hash(b'f' as u16, b'o');
    p.pma[h as usize] &= !0x30;
    for i in 0..256 {
        p.fst[i] = p.bit[i] & 1 == 0;
    }
    p
}

#[test]
fn blob_round_trips_without_lookback() {
    let p = sample();
    let blob = p.to_blob();
    assert_eq!(blob.len(), 2 + 256 + BTAP + HASH);
    let q = Predictor::from_blob(&blob).unwrap();
    assert_eq!(q.min, 3);
    assert!(q.bol);
    assert!(!q.one);
    assert_eq!(q.bit, p.bit);
    assert_eq!(&q.tap[..], &p.tap[..]);
    assert_eq!(&q.pma[..], &p.pma[..]);
    assert_eq!(q.fst, p.fst);
    // writing back yields the original bytes
    assert_eq!(q.to_blob(), blob);
}

#[test]
fn blob_round_trips_with_lookback() {
    let mut p = sample();
    p.lbk = 0xffff;
    p.lbm = 2;
    p.cbk[b'-' as usize] = true;
    p.cbk[b'a' as usize] = true;
    let blob = p.to_blob();
    assert_eq!(blob.len(), 2 + 256 + BTAP + HASH + 4 + 32 + 32);
    let q = Predictor::from_blob(&blob).unwrap();
    assert_eq!(q.lbk, 0xffff);
    assert_eq!(q.lbm, 2);
    assert_eq!(q.cbk, p.cbk);
    assert_eq!(q.fst, p.fst);
    assert_eq!(q.to_blob(), blob);
}

#[test]
fn literal_prefix_blob_carries_chars() {
    let mut p = Predictor::default();
    p.len = 3;
    p.min = 3;
    p.one = true;
    p.chr = b"foo".to_vec();
    let blob = p.to_blob();
    assert_eq!(blob.len(), 2 + 3 + HASH);
    assert_eq!(&blob[2..5], b"foo");
    let q = Predictor::from_blob(&blob).unwrap();
    assert_eq!(q.len, 3);
    assert!(q.one);
    assert_eq!(q.chr, b"foo");
}

#[test]
fn default_blob_decodes_to_no_match() {
    // an all-0xFF table set inverts to zeros on disk
    let p = Predictor::default();
    let blob = p.to_blob();
    assert!(blob[2..2 + 256].iter().all(|&b| b == 0));
    let q = Predictor::from_blob(&blob).unwrap();
    assert!(q.bit.iter().all(|&b| b == 0xff));
    assert!(q.fst.iter().all(|&f| !f));
}

#[test]
fn pm_table_selection_follows_min() {
    let mut p = Predictor::default();
    p.min = 5;
    p.pmh[123] = 0xf0;
    let blob = p.to_blob();
    let q = Predictor::from_blob(&blob).unwrap();
    assert_eq!(q.pmh[123], 0xf0);
    assert_eq!(q.pma[123], 0xff); // untouched: pma not serialized for min >= 4
}

#[test]
fn truncated_blob_is_an_error() {
    let p = sample();
    let blob = p.to_blob();
    assert!(Predictor::from_blob(&blob[..100]).is_err());
    assert!(Predictor::from_blob(&[]).is_err());
}

#[test]
fn hash_functions_stay_in_range() {
    for prev in [0u8, 1, 0x7f, 0xff] {
        for curr in [0u8, 0x40, 0xff] {
            assert!((pair_hash(prev, curr) as usize) < BTAP);
        }
    }
    let mut h = 0u16;
    for b in b"chained-input-bytes" {
        h = chain_hash(h, *b);
        assert!((h as usize) < HASH);
    }
}
