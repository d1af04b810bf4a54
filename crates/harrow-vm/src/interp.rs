//! Bytecode interpreter.
//!
//! One `execute_at` call runs the DFA from a start offset and returns
//! the best accept seen: the longest match, with the lower accept label
//! winning ties. Lazy quantifiers need no special handling here; the
//! compiler already cut the edges that would grow a lazy match.

use harrow_bytecode::{HALT_PC, LONG_PC, Op};
use harrow_core::{Meta, is_word_byte};

use crate::matcher::Matcher;
use crate::record::{Capture, Match};

impl Matcher<'_> {
    /// Run the bytecode anchored at buffer offset `start`; offsets in
    /// the returned match are buffer-relative.
    pub(crate) fn execute_at(&mut self, start: usize) -> Option<Match> {
        let cells = self.program.cells();
        let mut pc: usize = 0;
        let mut at = start;
        let mut heads: Vec<(u16, usize)> = Vec::new();
        let mut caps: Vec<Option<Capture>> = Vec::new();
        let mut best: Option<Match> = None;

        loop {
            if pc >= cells.len() {
                break;
            }
            let c = self.byte_at(at);
            match cells[pc].decode(false) {
                Op::Take(label) => {
                    let take = match &best {
                        None => true,
                        Some(b) => at > b.end || (at == b.end && (label as u32) < b.accept),
                    };
                    if take {
                        best = Some(Match {
                            start,
                            end: at,
                            accept: label as u32,
                            redo: false,
                            captures: caps.clone(),
                        });
                    }
                    pc += 1;
                }
                Op::Redo => {
                    let take = best.as_ref().is_none_or(|b| at >= b.end);
                    if take {
                        best = Some(Match {
                            start,
                            end: at,
                            accept: 0,
                            redo: true,
                            captures: caps.clone(),
                        });
                    }
                    pc += 1;
                }
                Op::Head(id) => {
                    heads.push((id, at));
                    pc += 1;
                }
                Op::Tail(id) => {
                    let idx = id as usize;
                    if caps.len() <= idx {
                        caps.resize(idx + 1, None);
                    }
                    if let Some(i) = heads.iter().rposition(|&(h, _)| h == id) {
                        let (_, begin) = heads.remove(i);
                        caps[idx] = Some(Capture { begin, end: at });
                    } else if let Some(c) = caps[idx].as_mut() {
                        // a repeated tail extends the captured span
                        c.end = at;
                    }
                    // the TAKE of this state has already run; refresh
                    // its capture snapshot with the completed span
                    if let Some(b) = best.as_mut()
                        && b.end == at
                    {
                        b.captures = caps.clone();
                    }
                    pc += 1;
                }
                Op::Halt => break,
                Op::Goto { lo, hi, pc: target } => {
                    let width = 1 + (target == LONG_PC) as usize;
                    match c {
                        Some(b) if lo <= b && b <= hi => {
                            at += 1;
                            match self.jump(pc, target) {
                                Some(next) => pc = next,
                                None => break,
                            }
                        }
                        Some(_) => pc += width,
                        // at EOF no byte edge of this state can fire,
                        // and only byte edges remain in its cell block
                        None => break,
                    }
                }
                Op::GotoMeta { meta, pc: target } => {
                    let width = 1 + (target == LONG_PC) as usize;
                    if self.meta_holds(meta, start, at) {
                        match self.jump(pc, target) {
                            Some(next) => pc = next,
                            None => break,
                        }
                    } else {
                        pc += width;
                    }
                }
                Op::Long(_) => {
                    // extension cells are consumed by their GOTO
                    pc += 1;
                }
            }
        }
        best.map(|mut m| {
            // group 0 is the whole match
            if m.captures.is_empty() {
                m.captures = vec![Some(Capture {
                    begin: m.start,
                    end: m.end,
                })];
            } else {
                m.captures.insert(
                    0,
                    Some(Capture {
                        begin: m.start,
                        end: m.end,
                    }),
                );
            }
            m
        })
    }

    fn jump(&self, pc: usize, target: u16) -> Option<usize> {
        match target {
            HALT_PC => None,
            LONG_PC => Some(self.program.cells()[pc + 1].0 as usize),
            t => Some(t as usize),
        }
    }

    /// Evaluate a boundary predicate without consuming input. The
    /// begin variants assert at the match start, the end variants at
    /// the current offset.
    pub(crate) fn meta_holds(&mut self, meta: Meta, start: usize, at: usize) -> bool {
        let before_start = if start == 0 {
            None
        } else {
            Some(self.buf[start - 1])
        };
        let at_start = if start < self.end {
            Some(self.buf[start])
        } else {
            self.byte_at(start)
        };
        let curr = self.byte_at(at);
        let prev = if at == 0 { None } else { Some(self.buf[at - 1]) };
        let wb = |a: Option<u8>, b: Option<u8>| {
            a.is_some_and(is_word_byte) != b.is_some_and(is_word_byte)
        };
        match meta {
            Meta::BOB => self.base + start == 0,
            Meta::EOB => curr.is_none(),
            Meta::BOL => before_start.is_none() || before_start == Some(b'\n'),
            Meta::EOL => curr.is_none() || curr == Some(b'\n'),
            Meta::WBB => wb(before_start, at_start),
            Meta::WBE => wb(prev, curr),
            Meta::NWB => !wb(before_start, at_start),
            Meta::NWE => !wb(prev, curr),
            Meta::BWB => {
                !before_start.is_some_and(is_word_byte) && at_start.is_some_and(is_word_byte)
            }
            Meta::BWE => !prev.is_some_and(is_word_byte) && curr.is_some_and(is_word_byte),
            Meta::EWB => {
                before_start.is_some_and(is_word_byte) && !at_start.is_some_and(is_word_byte)
            }
            Meta::EWE => prev.is_some_and(is_word_byte) && !curr.is_some_and(is_word_byte),
            // indentation tracking is outside this engine
            Meta::UND | Meta::IND | Meta::DED => false,
        }
    }
}
