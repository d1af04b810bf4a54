use crate::mods::{ModFlag, ModSpans};

#[test]
fn plain_span() {
    let mut m = ModSpans::new();
    m.update(ModFlag::I, false, 2, 8);
    assert!(!m.is(ModFlag::I, 1));
    assert!(m.is(ModFlag::I, 2));
    assert!(m.is(ModFlag::I, 8));
    assert!(!m.is(ModFlag::I, 9));
    assert!(!m.is(ModFlag::M, 5));
}

#[test]
fn inner_negation_wins_over_outer_set() {
    let mut m = ModSpans::new();
    // inner groups apply before outer ones
    m.update(ModFlag::I, true, 3, 5);
    m.update(ModFlag::I, false, 0, 10);
    assert!(m.is(ModFlag::I, 2));
    assert!(!m.is(ModFlag::I, 3));
    assert!(!m.is(ModFlag::I, 5));
    assert!(m.is(ModFlag::I, 6));
}

#[test]
fn inner_set_wins_over_outer_negation() {
    let mut m = ModSpans::new();
    m.update(ModFlag::S, false, 4, 6);
    m.update(ModFlag::S, true, 0, 10);
    assert!(m.is(ModFlag::S, 5));
    assert!(!m.is(ModFlag::S, 2));
}

#[test]
fn disjoint_spans() {
    let mut m = ModSpans::new();
    m.update(ModFlag::Q, false, 0, 2);
    m.update(ModFlag::Q, false, 10, 12);
    assert!(m.is(ModFlag::Q, 1));
    assert!(!m.is(ModFlag::Q, 5));
    assert!(m.is(ModFlag::Q, 11));
}

#[test]
fn empty_or_inverted_range_is_ignored() {
    let mut m = ModSpans::new();
    m.update(ModFlag::M, false, 5, 3);
    assert!(!m.is(ModFlag::M, 4));
}
