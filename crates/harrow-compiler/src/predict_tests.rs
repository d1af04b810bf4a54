use crate::compile;
use crate::options::PatternOptions;

fn predictor_of(pattern: &str) -> harrow_bytecode::Predictor {
    compile(pattern, &PatternOptions::default())
        .unwrap()
        .predictor()
        .clone()
}

#[test]
fn literal_chain_detection() {
    let p = predictor_of("hello");
    assert_eq!(p.len, 5);
    assert!(p.one);
    assert_eq!(&p.chr[..5], b"hello");
    assert_eq!(p.min, 0); // min tracking only applies past the prefix
}

#[test]
fn long_literals_get_boyer_moore_shifts() {
    let p = predictor_of("incomprehensible");
    assert_eq!(p.len, 16);
    // bad character shifts: last byte shifts 0, absent bytes shift len
    assert_eq!(p.bms[b'e' as usize], 0);
    assert_eq!(p.bms[b'q' as usize], 16);
    // shift for 'i' is distance from its last occurrence to the end
    assert_eq!(p.bms[b'i' as usize], 3);
}

#[test]
fn class_pattern_fills_bitap_lanes() {
    let p = predictor_of("[ab]x");
    assert_eq!(p.min, 2);
    assert_eq!(p.len, 0);
    // lane 0: a and b possible, x not
    assert_eq!(p.bit[b'a' as usize] & 1, 0);
    assert_eq!(p.bit[b'b' as usize] & 1, 0);
    assert_ne!(p.bit[b'x' as usize] & 1, 0);
    // lane 1: x possible
    assert_eq!(p.bit[b'x' as usize] & 2, 0);
    assert_ne!(p.bit[b'a' as usize] & 2, 0);
}

#[test]
fn first_byte_set_covers_start_edges() {
    let p = predictor_of("[cd]og|fish");
    for b in [b'c', b'd', b'f'] {
        assert!(p.fst[b as usize], "missing first byte {}", b as char);
    }
    assert!(!p.fst[b'o' as usize]);
    assert!(!p.fst[b'z' as usize]);
}

#[test]
fn min_is_capped_at_eight() {
    let p = predictor_of("[0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9][0-9]");
    assert!(p.min <= 8);
    assert!(p.min >= 1);
}

#[test]
fn nullable_pattern_has_min_zero() {
    let p = predictor_of("x*");
    assert_eq!(p.min, 0);
}

#[test]
fn anchored_pattern_records_bol() {
    let p = predictor_of("^start");
    assert!(p.bol);
    let p = predictor_of("start");
    assert!(!p.bol);
}

#[test]
fn pm_tables_mark_possible_prefixes() {
    use harrow_bytecode::chain_hash;
    let p = predictor_of("[ab]x");
    // depth-0 continue bit cleared for a/b
    assert_eq!(p.pma[b'a' as usize] & 0x40, 0);
    assert_ne!(p.pma[b'q' as usize] & 0x40, 0);
    // depth-1 accept bit cleared along the a->x chain
    let h = chain_hash(b'a' as u16, b'x');
    assert_eq!(p.pma[h as usize] & 0x20, 0, "a->x should continue");
}

#[test]
fn pair_table_tracks_adjacent_bytes() {
    use harrow_bytecode::pair_hash;
    let p = predictor_of("[ab]x");
    assert_eq!(p.tap[pair_hash(b'a', b'x') as usize] & 1, 0);
    assert_eq!(p.tap[pair_hash(b'b', b'x') as usize] & 1, 0);
}

#[test]
fn looping_prefix_produces_lookback() {
    // literal content after a variable-length prefix: when the cut
    // lands, the loop bytes become the lookback set
    let p = predictor_of("[a-z]+ing");
    if p.lbk > 0 {
        assert!(p.cbk.iter().any(|&b| b));
        assert_eq!(p.lbk, 0xffff); // the cut crossed a loop
    }
}

#[test]
fn blob_round_trip_through_program() {
    let program = compile("[ab]cd+", &PatternOptions::default()).unwrap();
    let blob = program.predictor_blob();
    let back = harrow_bytecode::Predictor::from_blob(&blob).unwrap();
    assert_eq!(back.to_blob(), blob);
    assert_eq!(back.min, program.predictor().min);
}
