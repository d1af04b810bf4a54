//! DFA to bytecode assembly.
//!
//! Two counting passes compute each state's cell address; the second
//! pass only runs when the total spills past the 16-bit pc space and
//! conservatively widens jumps to the GOTO LONG form. Emission then
//! writes cells at the computed addresses.

use harrow_bytecode::{HALT_PC, LONG_PC, Opcode};
use harrow_core::{Meta, is_meta};

use crate::dfa::{Dfa, Edge, StateId};
use crate::error::{RegexError, RegexErrorKind};
use crate::parser::Compiler;

/// Accept labels are clamped to the 16-bit TAKE operand.
const AMAX: u32 = 0xffff;

/// Total cell count bound.
const GMAX: u64 = 0x00fe_ffff;

/// Forward jumps at or beyond this first-pass address are widened.
const HALF: u32 = LONG_PC as u32 / 2;

pub(crate) fn encode(dfa: &mut Dfa, comp: &Compiler) -> Result<Vec<Opcode>, RegexError> {
    compact(dfa);

    // pass A: count cells per state, assign addresses, and append the
    // trailing HALT edge where the byte space is not fully covered
    let mut nop: u64 = 0;
    for i in 0..dfa.code_states {
        let sid = i as StateId;
        let state = dfa.state_mut(sid);
        if state.accept > AMAX {
            state.accept = AMAX;
        }
        state.prev_addr = nop as u32;
        state.addr = nop as u32;
        let mut cover: u32 = 0;
        for (&lo, edge) in &state.edges {
            if lo as u32 == cover {
                cover = edge.hi as u32 + 1;
            }
            nop += 1;
            if is_meta(lo) {
                nop += (edge.hi - lo) as u64;
            }
        }
        if cover <= 0xff {
            state.edges.insert(
                cover as u16,
                Edge {
                    hi: 0xff,
                    target: None,
                },
            );
            nop += 1;
        }
        nop += (state.heads.len()
            + state.tails.len()
            + (state.accept > 0 || state.redo) as usize) as u64;
        if nop > GMAX {
            return Err(comp.err(RegexErrorKind::ExceedsLimits, 0));
        }
    }

    // pass B: re-count with widened jumps when the pc space overflowed
    let long_mode = nop > LONG_PC as u64;
    if long_mode {
        nop = 0;
        for i in 0..dfa.code_states {
            let sid = i as StateId;
            dfa.state_mut(sid).addr = nop as u32;
            let state = dfa.state(sid);
            let state_first = state.prev_addr;
            let mut extra: u64 = 0;
            for (&lo, edge) in &state.edges {
                let wide = edge
                    .target
                    .map(|t| {
                        let t = dfa.state(t);
                        (t.prev_addr > state_first && t.prev_addr >= HALF)
                            || t.addr >= LONG_PC as u32
                    })
                    .unwrap_or(false);
                let cells = if wide { 2u64 } else { 1 };
                extra += cells;
                if is_meta(lo) {
                    extra += (edge.hi - lo) as u64 * cells;
                }
            }
            extra += (state.heads.len()
                + state.tails.len()
                + (state.accept > 0 || state.redo) as usize) as u64;
            nop += extra;
            if nop > GMAX {
                return Err(comp.err(RegexErrorKind::ExceedsLimits, 0));
            }
        }
    }

    // emission
    let mut code: Vec<Opcode> = Vec::with_capacity(nop as usize);
    for i in 0..dfa.code_states {
        let sid = i as StateId;
        let state = dfa.state(sid);
        debug_assert_eq!(code.len() as u32, state.addr);
        if state.redo {
            code.push(Opcode::redo());
        } else if state.accept > 0 {
            code.push(Opcode::take(state.accept as u16));
        }
        for &t in &state.tails {
            code.push(Opcode::tail(t));
        }
        for &h in &state.heads {
            code.push(Opcode::head(h));
        }
        let state_first = state.prev_addr;
        for (&lo, edge) in state.edges.iter().rev() {
            let target = edge.target.map(|t| {
                let t = dfa.state(t);
                let wide = long_mode
                    && ((t.prev_addr > state_first && t.prev_addr >= HALF)
                        || t.addr >= LONG_PC as u32);
                (t.addr, wide)
            });
            if is_meta(lo) {
                for m in lo..=edge.hi {
                    let meta = Meta::from_u16(m).expect("meta edge in range");
                    match target {
                        None => code.push(Opcode::goto_meta(meta, HALT_PC)),
                        Some((addr, true)) => {
                            code.push(Opcode::goto_meta(meta, LONG_PC));
                            code.push(Opcode::long(addr));
                        }
                        Some((addr, false)) => {
                            code.push(Opcode::goto_meta(meta, addr as u16));
                        }
                    }
                }
            } else {
                let (lo, hi) = (lo as u8, edge.hi as u8);
                match target {
                    None => code.push(Opcode::goto(lo, hi, HALT_PC)),
                    Some((addr, true)) => {
                        code.push(Opcode::goto(lo, hi, LONG_PC));
                        code.push(Opcode::long(addr));
                    }
                    Some((addr, false)) => code.push(Opcode::goto(lo, hi, addr as u16)),
                }
            }
        }
    }
    debug_assert_eq!(code.len() as u64, nop);
    Ok(code)
}

/// Reverse-order edge compaction: adjacent or overlapping ranges with
/// the same target merge into one edge. Because emission is in
/// descending order and the matcher tests edges in that order, a broad
/// merged range may legally overlap earlier carve-outs.
pub(crate) fn compact(dfa: &mut Dfa) {
    for state in dfa.states.iter_mut() {
        let mut edges: Vec<(u16, Edge)> = state.edges.iter().map(|(&lo, &e)| (lo, e)).collect();
        let mut i = 0;
        while i < edges.len() {
            let mut hi = edges[i].1.hi;
            if hi >= 0xff {
                break;
            }
            let mut j = i + 1;
            while j < edges.len() && edges[j].0 <= hi + 1 {
                hi = edges[j].1.hi;
                if edges[j].1.target == edges[i].1.target {
                    edges[i].1.hi = hi;
                    edges.remove(j);
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        state.edges = edges.into_iter().collect();
    }
}
