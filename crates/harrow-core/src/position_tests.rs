use crate::position::Position;

#[test]
fn packs_and_unpacks_fields() {
    let p = Position::new(0x123456).with_iter(7).with_lazy(3);
    assert_eq!(p.loc(), 0x123456);
    assert_eq!(p.iter(), 7);
    assert_eq!(p.lazy(), 3);
    assert!(!p.is_accept());
    assert!(!p.is_anchor());
}

#[test]
fn iter_offsets_stack() {
    let p = Position::new(10).with_iter(2).with_iter(5);
    assert_eq!(p.iter(), 7);
    assert_eq!(p.loc(), 10);
}

#[test]
fn lazy_is_replaced_not_added() {
    let p = Position::new(1).with_lazy(4).with_lazy(9);
    assert_eq!(p.lazy(), 9);
    assert_eq!(p.with_lazy(0).lazy(), 0);
}

#[test]
fn flags_round_trip() {
    let p = Position::new(5)
        .with_anchor(true)
        .with_ticked(true)
        .with_negate(true);
    assert!(p.is_anchor());
    assert!(p.is_ticked());
    assert!(p.is_negate());
    assert!(!p.with_anchor(false).is_anchor());
}

#[test]
fn accepting_positions_sort_first_is_false() {
    // accept flag sorts after non-accept at the same location
    let a = Position::accepting(1);
    let b = Position::new(1);
    assert!(b < a);
}

#[test]
fn ordering_is_loc_then_iter_then_lazy() {
    let p1 = Position::new(3);
    let p2 = Position::new(4);
    let p3 = Position::new(3).with_iter(1);
    let p4 = Position::new(3).with_lazy(1);
    assert!(p1 < p2);
    assert!(p1 < p3);
    assert!(p3 < p2);
    assert!(p1 < p4);
    assert!(p4 < p3);
}

#[test]
fn pos_strips_lazy_and_flags() {
    let p = Position::new(9).with_iter(2).with_lazy(5).with_anchor(true);
    let base = p.pos();
    assert_eq!(base.loc(), 9);
    assert_eq!(base.iter(), 2);
    assert_eq!(base.lazy(), 0);
    assert!(!base.is_anchor());
}

#[test]
fn accepting_carries_label() {
    let p = Position::accepting(42);
    assert!(p.is_accept());
    assert_eq!(p.accepts(), 42);
}
