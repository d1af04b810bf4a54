use harrow_core::{PosSet, Position, pos_add};

use crate::builder::trim_lazy;
use crate::compile;
use crate::options::PatternOptions;
use crate::parser::{LazyLoc, LazySet};

#[test]
fn trim_lazy_cuts_competing_lazy_positions() {
    // a lazy accept removes every other position with its lazy id
    let mut pos = PosSet::new();
    pos_add(&mut pos, Position::new(3).with_lazy(1));
    pos_add(&mut pos, Position::new(7));
    pos_add(&mut pos, Position::accepting(1).with_lazy(1));
    let lazypos: LazySet = vec![LazyLoc { lazy: 1, loc: 5 }];
    trim_lazy(&mut pos, &lazypos);
    assert!(pos.contains(&Position::accepting(1)));
    assert!(pos.contains(&Position::new(7)));
    assert!(!pos.iter().any(|p| p.lazy() == 1));
}

#[test]
fn trim_lazy_canonicalizes() {
    let mut pos = vec![
        Position::new(9),
        Position::new(2),
        Position::new(9),
        Position::new(5),
    ];
    trim_lazy(&mut pos, &LazySet::new());
    assert_eq!(
        pos,
        vec![Position::new(2), Position::new(5), Position::new(9)]
    );
}

#[test]
fn trim_lazy_reverts_positions_past_last_quantifier() {
    let mut pos = vec![
        Position::new(2).with_lazy(1),
        Position::new(8).with_lazy(1),
    ];
    let lazypos: LazySet = vec![LazyLoc { lazy: 1, loc: 4 }];
    trim_lazy(&mut pos, &lazypos);
    // position 8 lies past the quantifier at 4 and reverts to greedy
    assert!(pos.contains(&Position::new(8)));
    assert!(pos.contains(&Position::new(2).with_lazy(1)));
}

#[test]
fn states_are_deduplicated() {
    // a|aa|aaa over one-byte alphabet: state count stays small because
    // identical position sets intern to the same state
    let program = compile("a(x|y)b", &PatternOptions::default()).unwrap();
    // x and y lead to the same follow set, so they share one target
    // state; the cell stream must stay compact
    assert!(program.cells().len() < 24, "got {}", program.cells().len());
}

#[test]
fn tree_and_nfa_alternations_merge() {
    let program = compile("get|set|[gs]o", &PatternOptions::default()).unwrap();
    // mixed literal and class alternations must compile into one DFA
    assert!(!program.cells().is_empty());
    assert_eq!(program.size(), 3);
}

#[test]
fn case_insensitive_tree_doubles_edges() {
    let opts = PatternOptions::from_letters("i");
    let program = compile("ab", &opts).unwrap();
    use harrow_bytecode::Op;
    let mut saw_upper = false;
    let mut saw_lower = false;
    for cell in program.cells() {
        if let Op::Goto { lo, hi, .. } = cell.decode(false) {
            if lo <= b'A' && b'A' <= hi {
                saw_upper = true;
            }
            if lo <= b'a' && b'a' <= hi {
                saw_lower = true;
            }
        }
    }
    assert!(saw_upper && saw_lower);
}

#[test]
fn redo_state_emits_redo_cell() {
    let program = compile("(?^no)", &PatternOptions::default()).unwrap();
    use harrow_bytecode::Op;
    assert!(
        program
            .cells()
            .iter()
            .any(|c| c.decode(false) == Op::Redo)
    );
}

#[test]
fn word_boundary_compiles_to_meta_cells() {
    let program = compile(r"\bword\b", &PatternOptions::default()).unwrap();
    use harrow_bytecode::Op;
    let metas: Vec<_> = program
        .cells()
        .iter()
        .filter_map(|c| match c.decode(false) {
            Op::GotoMeta { meta, .. } => Some(meta),
            _ => None,
        })
        .collect();
    assert!(metas.contains(&harrow_core::Meta::WBB));
    assert!(metas.contains(&harrow_core::Meta::WBE));
}

#[test]
fn capture_groups_emit_head_and_tail() {
    let program = compile("a(b)c", &PatternOptions::default()).unwrap();
    use harrow_bytecode::Op;
    let ops: Vec<_> = program
        .cells()
        .iter()
        .map(|c| c.decode(false))
        .collect();
    assert!(ops.contains(&Op::Head(0)));
    assert!(ops.contains(&Op::Tail(0)));
}
