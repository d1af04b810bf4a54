//! Subset construction: followpos NFA to DFA.

use harrow_core::{CharSet, Meta, PosSet, pos_insert};

use crate::dfa::{Dfa, Edge, MAX_STATES, StateId, hash_pos};
use crate::error::{RegexError, RegexErrorKind};
use crate::mods::{ModFlag, ModSpans};
use crate::parser::{Compiler, Follow, LazySet, LookMap, Parsed};

/// A transition move: a character set leading to a position set.
type Moves = Vec<(CharSet, PosSet)>;

/// Build the DFA from the parsed followpos NFA and tree DFA.
pub(crate) fn build(comp: &mut Compiler, parsed: Parsed) -> Result<Dfa, RegexError> {
    let Parsed {
        startpos,
        mut followpos,
        lazypos,
        modifiers,
        lookahead,
    } = parsed;
    let mut dfa = Dfa::new();
    let tnode = if comp.tfa.is_empty() { None } else { Some(0) };
    let mut start_pos = startpos;
    trim_lazy(&mut start_pos, &lazypos);
    let start = dfa.add_state(tnode, start_pos);

    // 64K-bucket hash table over canonical position sets; collisions
    // chain through a BST threaded into the states
    let mut table: Vec<Option<StateId>> = vec![None; 0x10000];
    if dfa.state(start).tnode.is_none() {
        table[hash_pos(&dfa.state(start).pos) as usize] = Some(start);
    }

    let mut i = 0usize;
    while i < dfa.states.len() {
        let sid = i as StateId;
        if let Some(tn) = dfa.state(sid).tnode {
            let acc = comp.tfa.nodes[tn as usize].accept;
            if acc > 0 {
                dfa.state_mut(sid).accept = acc;
            }
        }
        let mut moves = compile_transition(
            comp,
            &mut dfa,
            sid,
            &mut followpos,
            &lazypos,
            &modifiers,
            &lookahead,
        )?;
        if let Some(tn) = dfa.state(sid).tnode {
            merge_tree(comp, &mut dfa, sid, tn, &mut moves);
        }
        for (chars, pos) in moves {
            let h = hash_pos(&pos) as usize;
            let mut slot = table[h];
            let (target, _created) = dfa.intern(&mut slot, pos);
            table[h] = slot;
            for (lo, hi) in runs(&chars) {
                dfa.state_mut(sid).edges.insert(
                    lo,
                    Edge {
                        hi,
                        target: Some(target),
                    },
                );
            }
        }
        if dfa.states.len() > MAX_STATES {
            return Err(comp.err(RegexErrorKind::ExceedsLimits, 0));
        }
        i += 1;
    }
    dfa.code_states = dfa.states.len();
    Ok(dfa)
}

/// Contiguous member runs of a character set, ascending.
fn runs(chars: &CharSet) -> Vec<(u16, u16)> {
    let mut out = Vec::new();
    let (Some(min), Some(max)) = (chars.lo(), chars.hi()) else {
        return out;
    };
    let mut lo = min;
    while lo <= max {
        if chars.contains(lo) {
            let mut hi = lo;
            while hi < max && chars.contains(hi + 1) {
                hi += 1;
            }
            out.push((lo, hi));
            lo = hi + 1;
        }
        lo += 1;
    }
    out
}

/// Compute the move partition of one state from the followpos map.
#[allow(clippy::too_many_arguments)]
fn compile_transition(
    comp: &mut Compiler,
    dfa: &mut Dfa,
    sid: StateId,
    followpos: &mut Follow,
    lazypos: &LazySet,
    modifiers: &ModSpans,
    lookahead: &LookMap,
) -> Result<Moves, RegexError> {
    let mut moves: Moves = Vec::new();
    let positions = dfa.state(sid).pos.clone();

    // accept labels: the lowest wins; negated accepts mark redo states
    for k in &positions {
        if k.is_accept() {
            let accept = k.accepts();
            let state = dfa.state_mut(sid);
            if state.accept == 0 || accept < state.accept {
                state.accept = accept;
            }
            if k.is_negate() {
                state.redo = true;
            }
        }
    }

    for k in &positions {
        if k.is_accept() {
            continue;
        }
        let loc = k.loc();
        let c = comp.at(loc);
        let literal = modifiers.is(ModFlag::Q, loc);
        if c == b'(' && !literal {
            let mut n: u16 = 0;
            for (_choice, spans) in lookahead.iter() {
                if let Some(j) = spans.index_of(loc) {
                    let l = n
                        .checked_add(j as u16)
                        .ok_or_else(|| comp.err(RegexErrorKind::ExceedsLimits, loc))?;
                    dfa.state_mut(sid).heads.insert(l);
                }
                n = n
                    .checked_add(spans.len() as u16)
                    .ok_or_else(|| comp.err(RegexErrorKind::ExceedsLimits, loc))?;
            }
        } else if c == b')' && !literal {
            let mut n: u16 = 0;
            for (_choice, spans) in lookahead.iter() {
                if let Some(j) = spans.index_of(loc) {
                    let l = n
                        .checked_add(j as u16)
                        .ok_or_else(|| comp.err(RegexErrorKind::ExceedsLimits, loc))?;
                    dfa.state_mut(sid).tails.insert(l);
                }
                n = n
                    .checked_add(spans.len() as u16)
                    .ok_or_else(|| comp.err(RegexErrorKind::ExceedsLimits, loc))?;
            }
        } else {
            if !followpos.contains_key(&k.pos()) {
                continue;
            }
            if k.is_negate()
                && let Some(entry) = followpos.get_mut(&k.pos())
                && entry.first().is_some_and(|p| !p.is_negate())
            {
                for p in entry.iter_mut() {
                    *p = p.with_negate(true);
                }
            }
            let base_follow = followpos[&k.pos()].clone();
            // resolve the (possibly lazy-propagated) follow set key
            let follow_key = if k.lazy() > 0 {
                let full = *k;
                if !followpos.contains_key(&full) {
                    let l = k.lazy();
                    let lazy_follow: PosSet = base_follow
                        .iter()
                        .map(|p| if p.is_ticked() { *p } else { p.with_lazy(l) })
                        .collect();
                    followpos.insert(full, lazy_follow);
                }
                full
            } else {
                k.pos()
            };

            let mut chars = CharSet::new();
            let mut trim = false;
            if literal {
                let ch = c as u16;
                if c.is_ascii_alphabetic() && modifiers.is(ModFlag::I, loc) {
                    chars.add(ch & !0x20);
                    chars.add(ch | 0x20);
                } else {
                    chars.add(ch);
                }
            } else {
                match c {
                    b'.' => {
                        chars |= if modifiers.is(ModFlag::S, loc) {
                            CharSet::any_byte()
                        } else {
                            CharSet::dot()
                        };
                    }
                    b'^' => {
                        chars.add(if modifiers.is(ModFlag::M, loc) {
                            Meta::BOL as u16
                        } else {
                            Meta::BOB as u16
                        });
                        trim = true;
                    }
                    b'$' => {
                        chars.add(if modifiers.is(ModFlag::M, loc) {
                            Meta::EOL as u16
                        } else {
                            Meta::EOB as u16
                        });
                    }
                    b'[' => {
                        comp.compile_list(loc + 1, &mut chars, modifiers)?;
                    }
                    _ => match comp.escape_at(loc) {
                        0 => {
                            let ch = c as u16;
                            if c.is_ascii_alphabetic() && modifiers.is(ModFlag::I, loc) {
                                chars.add(ch & !0x20);
                                chars.add(ch | 0x20);
                            } else {
                                chars.add(ch);
                            }
                        }
                        b'i' => chars.add(Meta::IND as u16),
                        b'j' => chars.add(Meta::DED as u16),
                        b'k' => chars.add(Meta::UND as u16),
                        b'A' => {
                            chars.add(Meta::BOB as u16);
                            trim = true;
                        }
                        b'z' => chars.add(Meta::EOB as u16),
                        b'B' => chars.add(if k.is_anchor() {
                            Meta::NWB as u16
                        } else {
                            Meta::NWE as u16
                        }),
                        b'b' => chars.add(if k.is_anchor() {
                            Meta::WBB as u16
                        } else {
                            Meta::WBE as u16
                        }),
                        b'<' => chars.add(if k.is_anchor() {
                            Meta::BWB as u16
                        } else {
                            Meta::BWE as u16
                        }),
                        b'>' => chars.add(if k.is_anchor() {
                            Meta::EWB as u16
                        } else {
                            Meta::EWE as u16
                        }),
                        _ => {
                            let mut esc_loc = loc;
                            let ch = comp.parse_esc(&mut esc_loc, Some(&mut chars))?;
                            if ch <= b'z' as u16
                                && (ch as u8).is_ascii_alphabetic()
                                && modifiers.is(ModFlag::I, loc)
                            {
                                chars.add(ch & !0x20);
                                chars.add(ch | 0x20);
                            }
                        }
                    },
                }
            }
            if trim {
                // an anchor into an accepting state prunes the rest
                if let Some(entry) = followpos.get_mut(&follow_key) {
                    trim_anchors(comp, entry);
                }
            }
            let follow = followpos.get(&follow_key).cloned().unwrap_or_default();
            transition(&mut moves, chars, follow);
        }
    }

    let mut i = 0;
    while i < moves.len() {
        trim_lazy(&mut moves[i].1, lazypos);
        if moves[i].1.is_empty() {
            moves.remove(i);
        } else {
            i += 1;
        }
    }
    Ok(moves)
}

/// Merge `chars -> follow` into the move partition, keeping possets
/// that are reached by identical character sets merged and splitting
/// overlapping character sets.
fn transition(moves: &mut Moves, mut chars: CharSet, follow: PosSet) {
    let mut i = 0;
    while i < moves.len() {
        if moves[i].1 == follow {
            chars |= moves[i].0;
            moves.remove(i);
        } else {
            i += 1;
        }
    }
    let n = moves.len();
    for i in 0..n {
        let common = chars & moves[i].0;
        if common.any() {
            if common == moves[i].0 {
                chars -= common;
                pos_insert(&mut moves[i].1, &follow);
            } else {
                let mut merged = moves[i].1.clone();
                pos_insert(&mut merged, &follow);
                moves.push((common, merged));
                chars -= common;
                moves[i].0 -= common;
            }
            if !chars.any() {
                return;
            }
        }
    }
    if chars.any() {
        moves.push((chars, follow));
    }
}

/// Remove non-anchor positions from a follow set that an anchor leads
/// into when the set contains an accept.
fn trim_anchors(comp: &Compiler, follow: &mut PosSet) {
    if follow.iter().any(|p| p.is_accept()) {
        follow.retain(|q| q.is_accept() || q.is_anchor() || comp.at(q.loc()) == b')');
    }
}

/// Cut lazy edges: a lazy accept (or anchor) position removes every
/// other position sharing its lazy id, then the set is canonicalized.
pub(crate) fn trim_lazy(pos: &mut PosSet, lazypos: &LazySet) {
    loop {
        let Some(i) = pos
            .iter()
            .position(|p| p.lazy() > 0 && (p.is_accept() || p.is_anchor()))
        else {
            break;
        };
        let l = pos[i].lazy();
        pos[i] = pos[i].with_lazy(0);
        pos.retain(|q| q.lazy() != l);
    }
    pos.sort();
    pos.dedup();
    // when the first position is still lazy, positions past the last
    // matching quantifier location revert to greedy
    if pos.first().is_some_and(|p| p.lazy() > 0) {
        let mut max = 0;
        for l in lazypos {
            if pos.iter().any(|p| p.lazy() == l.lazy) && max < l.loc {
                max = l.loc;
            }
        }
        if max > 0 {
            for p in pos.iter_mut() {
                if p.loc() > max {
                    *p = p.with_lazy(0);
                }
            }
            pos.sort();
            pos.dedup();
        }
    }
}

/// Merge the tree-DFA node riding on `sid` into the move partition,
/// materializing combined or pure-tree successor states.
fn merge_tree(comp: &mut Compiler, dfa: &mut Dfa, sid: StateId, tn: u32, moves: &mut Moves) {
    let tree_edges: Vec<(u8, u32)> = comp.tfa.nodes[tn as usize]
        .edges
        .iter()
        .map(|(&c, &child)| (c, child))
        .collect();
    if moves.is_empty() {
        for &(c, child) in &tree_edges {
            let target = dfa.add_state(Some(child), PosSet::new());
            dfa.state_mut(sid).edges.insert(
                c as u16,
                Edge {
                    hi: c as u16,
                    target: Some(target),
                },
            );
            if comp.opts.i && c.is_ascii_lowercase() {
                let u = (c as u16) & !0x20;
                dfa.state_mut(sid).edges.insert(
                    u,
                    Edge {
                        hi: u,
                        target: Some(target),
                    },
                );
            }
        }
        return;
    }
    let mut chars = CharSet::new();
    for &(c, _) in &tree_edges {
        chars.add(c as u16);
        if comp.opts.i && c.is_ascii_lowercase() {
            chars.add((c as u16) & !0x20);
        }
    }
    let tree_child = |c: u8| -> u32 {
        let c = if comp.opts.i && c.is_ascii_uppercase() {
            c | 0x20
        } else {
            c
        };
        comp.tfa.nodes[tn as usize].edges[&c]
    };
    let mut i = 0;
    while i < moves.len() {
        if chars.intersects(&moves[i].0) {
            let common = chars & moves[i].0;
            chars -= common;
            for (lo, hi) in runs(&common) {
                for c in lo..=hi {
                    let b = c as u8;
                    if comp.opts.i && b.is_ascii_uppercase() {
                        continue;
                    }
                    let target = dfa.add_state(Some(tree_child(b)), moves[i].1.clone());
                    dfa.state_mut(sid).edges.insert(
                        c,
                        Edge {
                            hi: c,
                            target: Some(target),
                        },
                    );
                    if comp.opts.i && b.is_ascii_lowercase() {
                        let u = c & !0x20;
                        dfa.state_mut(sid).edges.insert(
                            u,
                            Edge {
                                hi: u,
                                target: Some(target),
                            },
                        );
                    }
                }
            }
            moves[i].0 -= common;
            if moves[i].0.any() {
                i += 1;
            } else {
                moves.remove(i);
            }
        } else {
            i += 1;
        }
    }
    if comp.opts.i {
        // normalized to lower case; drop the upper-case leftovers
        let mut upper = CharSet::new();
        upper.add_range(b'A' as u16, b'Z' as u16);
        chars -= upper;
    }
    for (lo, hi) in runs(&chars) {
        for c in lo..=hi {
            let b = c as u8;
            let target = dfa.add_state(Some(tree_child(b)), PosSet::new());
            if comp.opts.i && b.is_ascii_alphabetic() {
                let l = c | 0x20;
                let u = c & !0x20;
                dfa.state_mut(sid).edges.insert(
                    l,
                    Edge {
                        hi: l,
                        target: Some(target),
                    },
                );
                dfa.state_mut(sid).edges.insert(
                    u,
                    Edge {
                        hi: u,
                        target: Some(target),
                    },
                );
            } else {
                dfa.state_mut(sid).edges.insert(
                    c,
                    Edge {
                        hi: c,
                        target: Some(target),
                    },
                );
            }
        }
    }
}
