use crate::ranges::ByteRanges;

#[test]
fn insert_and_contains() {
    let mut r = ByteRanges::new();
    r.insert(10, 20);
    assert!(r.contains(10));
    assert!(r.contains(20));
    assert!(!r.contains(21));
    assert!(!r.contains(9));
    assert_eq!(r.count(), 11);
}

#[test]
fn adjacent_ranges_coalesce() {
    let mut r = ByteRanges::new();
    r.insert(10, 20);
    r.insert(21, 30);
    assert_eq!(r.len(), 1);
    assert_eq!(r.count(), 21);
}

#[test]
fn overlapping_ranges_merge() {
    let mut r = ByteRanges::new();
    r.insert(10, 20);
    r.insert(15, 25);
    r.insert(5, 12);
    assert_eq!(r.len(), 1);
    assert_eq!(r.iter().next(), Some((5, 26)));
}

#[test]
fn disjoint_ranges_stay_ordered() {
    let mut r = ByteRanges::new();
    r.insert(100, 110);
    r.insert(1, 2);
    r.insert(50, 50);
    let all: Vec<_> = r.iter().collect();
    assert_eq!(all, vec![(1, 3), (50, 51), (100, 111)]);
}

#[test]
fn bridging_insert_merges_neighbors() {
    let mut r = ByteRanges::new();
    r.insert(1, 3);
    r.insert(8, 9);
    r.insert(4, 7);
    assert_eq!(r.len(), 1);
    assert_eq!(r.count(), 9);
}

#[test]
fn values_iterates_members() {
    let mut r = ByteRanges::new();
    r.insert(3, 4);
    r.insert(7, 7);
    let vals: Vec<_> = r.values().collect();
    assert_eq!(vals, vec![3, 4, 7]);
}

#[test]
fn extend_unions() {
    let mut a = ByteRanges::new();
    a.insert(1, 5);
    let mut b = ByteRanges::new();
    b.insert(4, 9);
    b.insert(20, 22);
    a.extend(&b);
    assert_eq!(a.count(), 12);
    assert_eq!(a.len(), 2);
}
