//! DFA analysis for the match predictor.
//!
//! A breadth-first search over the DFA selects an s-t cut with few,
//! low-frequency edge characters; the states past the cut become the
//! prediction start states. Bytes on edges cut away are recorded as the
//! lookback set so the matcher can re-anchor a full match. The start
//! states then seed the bitap, pair, PM4 and PM-hash tables.

use std::collections::BTreeSet;

use harrow_bytecode::{Predictor, chain_hash, pair_hash};
use harrow_core::{ByteRanges, frequency};
use indexmap::IndexMap;

use crate::dfa::{DEAD_PATH, Dfa, KEEP_PATH, LOOP_PATH, MAX_DEPTH, StateId};
use crate::parser::Compiler;

/// Tunable thresholds for needle and Boyer-Moore selection.
const PIN_MAX: u16 = 3;
const FREQ_MAX_ONE: u16 = 20;
const FREQ_MAX: u16 = 251;
const BM_FREQ_MIN: u16 = 35;
const BM_FREQ_HIGH: u16 = 50;
const BM_SCORE_MIN: u64 = 1;
const BM_SCORE_HIGH: u64 = 3;
const BM_COMBINED_MIN: u64 = 52;

struct Analysis<'d> {
    dfa: &'d mut Dfa,
    p: Predictor,
    cut: u32,
    cut_backedge: bool,
}

/// Analyze the DFA and produce the predictor tables.
pub(crate) fn analyze(dfa: &mut Dfa, comp: &Compiler) -> Predictor {
    let mut a = Analysis {
        dfa,
        p: Predictor::default(),
        cut: 0,
        cut_backedge: false,
    };
    a.p.bol = comp.bol;
    let mut start_states: BTreeSet<StateId> = BTreeSet::new();

    if a.dfa.state(0).accept == 0 {
        a.find_cut(&mut start_states);
    }

    if a.p.lbk == 0 {
        a.scan_literal_chain(&mut start_states);
    }

    a.p.min = 0;
    if !start_states.is_empty() {
        a.gen_predict_match(&start_states);
    }
    a.finish();
    a.p
}

impl Analysis<'_> {
    /// Breadth-first s-t cut search; fills `fst`, the lookback tables,
    /// and on success the new prediction start states.
    fn find_cut(&mut self, start_states: &mut BTreeSet<StateId>) {
        let dfa = &mut *self.dfa;
        let mut backedge = false;
        let mut has_backedge = false;
        let mut fin_depth: u16 = 0xffff;
        let mut fin_count: u16 = 0;
        let mut states: BTreeSet<StateId> = BTreeSet::new();
        let mut fin_states: BTreeSet<StateId> = BTreeSet::new();
        let mut chars = ByteRanges::new();
        let mut cut_backedge = false;
        let mut cut_depth: u16 = 0;
        let mut cut_fin_depth: u16 = 0;
        let mut cut_fin_count: u16 = 0;
        let mut cut_span: u16 = 0;
        let mut cut_count: u16 = 0xffff;
        let mut min_count: u16 = 0xffff;
        let mut max_count: u16 = 0;
        let mut max_freq: u8 = 0;
        let mut cut_states: BTreeSet<StateId> = BTreeSet::new();
        let mut cut_fin_states: BTreeSet<StateId> = BTreeSet::new();
        let mut cut_chars = ByteRanges::new();
        let mut best_cut_backedge = false;
        let mut best_cut_depth: u16 = 0;
        let mut best_cut_fin_depth: u16 = 0xffff;
        let mut best_cut_fin_count: u16 = 0;
        let mut best_cut_span: u16 = 0;
        let mut best_cut_count: u16 = 0xffff;
        let mut best_min_count: u16 = 0xffff;
        let mut best_cut_states: BTreeSet<StateId> = BTreeSet::new();
        let mut best_cut_fin_states: BTreeSet<StateId> = BTreeSet::new();
        let mut best_cut_chars = ByteRanges::new();

        dfa.state_mut(0).first = 1;
        states.insert(0);
        let mut searching = false;

        for depth in 0..MAX_DEPTH {
            let mut next_states: BTreeSet<StateId> = BTreeSet::new();
            let mut next_chars = ByteRanges::new();
            let is_more = fin_count == 0;
            for &sid in &states {
                let state_first = dfa.state(sid).first;
                for (lo, hi, target) in dfa.meta_closure(sid).edges {
                    if depth == 0 {
                        for ch in lo..=hi {
                            self.p.fst[ch as usize] = true;
                        }
                    }
                    let crosses_newline = lo <= b'\n' && hi >= b'\n';
                    if crosses_newline || dfa.accepts_via_meta(target) {
                        // a final edge: keep the newline path alive and
                        // count the final characters separately
                        dfa.state_mut(target).first =
                            if crosses_newline { KEEP_PATH } else { 0 };
                        fin_states.insert(sid);
                        if fin_depth == 0xffff {
                            fin_depth = depth;
                        }
                        fin_count = fin_count.saturating_add((hi - lo) as u16 + 1);
                        continue;
                    }
                    let target_first = dfa.state(target).first;
                    if target_first == 0 || target_first > cut_depth as u32 + 1 {
                        next_chars.insert(lo as u32, hi as u32);
                    }
                    if target_first == 0 {
                        dfa.state_mut(target).first = depth as u32 + 2;
                    } else if target_first <= state_first {
                        chars.insert(lo as u32, hi as u32);
                        if cut_depth == 0 || target_first > cut_depth as u32 + 1 {
                            has_backedge = true;
                        }
                        backedge = true;
                        continue;
                    }
                    next_states.insert(target);
                }
            }
            let mut count = next_chars.count() as u16;
            for ch in next_chars.values() {
                max_freq = max_freq.max(frequency(ch as u8));
            }
            let prev_min_count = min_count;
            if count > max_count {
                max_count = count;
            }
            if count + fin_count < min_count {
                min_count = count + fin_count;
            }
            if is_more {
                cut_span = depth - cut_depth;
            }
            if searching {
                let make_cut = if has_backedge {
                    max_count > fin_count + 4 || max_freq > 251 || 2 * count < max_count
                } else if fin_count == 0 {
                    cut_span > 6
                        && prev_min_count < 0xffff
                        && prev_min_count > 8
                        && prev_min_count >= min_count
                } else {
                    cut_span > 7 && prev_min_count < 0xffff && prev_min_count > 8 && min_count <= 2
                };
                if make_cut {
                    let better = if cut_span <= 2 {
                        cut_span > best_cut_span
                    } else {
                        best_min_count >= prev_min_count && cut_span >= best_cut_span
                    };
                    if better {
                        best_cut_states = cut_states.clone();
                        best_cut_fin_states = cut_fin_states.clone();
                        best_cut_count = cut_count;
                        best_cut_chars = cut_chars.clone();
                        best_cut_backedge = cut_backedge;
                        best_cut_depth = cut_depth;
                        best_cut_fin_depth = cut_fin_depth;
                        best_cut_fin_count = cut_fin_count;
                        best_cut_span = cut_span;
                        best_min_count = prev_min_count;
                        searching = false;
                    }
                }
            }
            if !searching {
                if depth > 0 {
                    // recount at the cut without the soon-ignored edges
                    next_chars.clear();
                    for &sid in &states {
                        for (lo, hi, target) in dfa.meta_closure(sid).edges {
                            if (lo > b'\n' || hi < b'\n') && !dfa.accepts_via_meta(target) {
                                let target_first = dfa.state(target).first;
                                if target_first == 0 || target_first > depth as u32 + 1 {
                                    next_chars.insert(lo as u32, hi as u32);
                                }
                            }
                        }
                    }
                    count = next_chars.count() as u16;
                }
                cut_states = states.clone();
                cut_fin_states = fin_states.clone();
                cut_count = count + fin_count;
                cut_chars.extend(&chars);
                cut_backedge = backedge;
                cut_depth = depth;
                cut_fin_depth = if fin_depth == 0xffff { depth } else { fin_depth };
                cut_fin_count = fin_count;
                chars.clear();
                has_backedge = false;
                max_freq = 0;
                max_count = count;
                min_count = cut_count;
                searching = true;
            }
            chars.extend(&next_chars);
            states = next_states;
            if count <= fin_count || !is_more {
                if is_more {
                    cut_span += 1;
                }
                break;
            }
        }

        // keep whichever cut scored better, the current or the best
        if best_cut_depth > 0 || best_cut_backedge || best_cut_span > 0 {
            let mut better = false;
            if (best_cut_span == 1
                || (!cut_backedge && min_count < best_min_count)
                || best_cut_fin_count == cut_fin_count)
                && cut_count <= best_cut_count
                && min_count <= best_min_count
            {
                if cut_span == 2 && fin_count > cut_count {
                    better = min_count < best_min_count;
                } else if cut_span > best_cut_span {
                    better = cut_fin_count == 0 || min_count < best_min_count;
                } else if cut_span >= 2 || cut_span == best_cut_span {
                    better = min_count < best_min_count;
                }
            }
            if !better {
                cut_states = best_cut_states;
                cut_fin_states = best_cut_fin_states;
                cut_chars = best_cut_chars;
                cut_backedge = best_cut_backedge;
                cut_depth = best_cut_depth;
                cut_fin_depth = best_cut_fin_depth;
            }
        }

        if cut_depth == 0 && !cut_backedge {
            return;
        }
        self.cut = cut_depth as u32 + 1;
        let cut = self.cut;

        // materialize the new start states past the cut
        let mut sweep: [BTreeSet<StateId>; 8] = Default::default();
        cut_states.extend(cut_fin_states.iter().copied());
        for &sid in &cut_states {
            let edges: Vec<(u16, crate::dfa::Edge)> = dfa
                .state(sid)
                .edges
                .iter()
                .map(|(&lo, &e)| (lo, e))
                .collect();
            let start = dfa.add_state(None, Vec::new());
            dfa.state_mut(start).first = 1;
            for (lo, edge) in edges {
                let Some(target) = edge.target else { continue };
                let target_first = dfa.state(target).first;
                if target_first == 0 || target_first > cut {
                    sweep[0].insert(target);
                    dfa.state_mut(start).edges.insert(lo, edge);
                }
            }
            if !dfa.state(start).edges.is_empty() {
                start_states.insert(start);
            }
        }

        // forward sweep: mark keep/loop/dead paths up to 7 more levels
        let mut depth = 0usize;
        while depth < 7 && !sweep[depth].is_empty() {
            let level: Vec<StateId> = sweep[depth].iter().copied().collect();
            for sid in level {
                let closure = dfa.meta_closure(sid);
                if dfa.state(sid).accept > 0 || closure.accepting {
                    continue;
                }
                let mut can = false;
                let mut any = false;
                let state_first = dfa.state(sid).first;
                for (lo, hi, target) in closure.edges {
                    if (lo <= b'\n' && hi >= b'\n') || state_first == KEEP_PATH {
                        any = true;
                        if dfa.state(target).first != KEEP_PATH {
                            dfa.state_mut(target).first = KEEP_PATH;
                            sweep[depth + 1].insert(target);
                        }
                    } else {
                        let target_first = dfa.state(target).first;
                        if target_first == 0 || target_first > cut {
                            any = true;
                            if target_first != LOOP_PATH {
                                sweep[depth + 1].insert(target);
                            }
                        } else {
                            can = true;
                            cut_backedge = true;
                            cut_chars.insert(lo as u32, hi as u32);
                        }
                    }
                }
                if can && dfa.state(sid).first != KEEP_PATH {
                    dfa.state_mut(sid).first = if any { LOOP_PATH } else { DEAD_PATH };
                }
            }
            depth += 1;
        }

        // backward sweep: a state whose every path dies is dead too
        while depth > 0 {
            let level: Vec<StateId> = sweep[depth - 1].iter().copied().collect();
            for sid in level {
                if dfa.state(sid).first == KEEP_PATH {
                    continue;
                }
                let closure = dfa.meta_closure(sid);
                if dfa.state(sid).accept > 0 || closure.accepting {
                    continue;
                }
                let mut all = true;
                for (lo, hi, target) in closure.edges {
                    match dfa.state(target).first {
                        DEAD_PATH => cut_chars.insert(lo as u32, hi as u32),
                        LOOP_PATH => {
                            all = false;
                            dfa.state_mut(sid).first = LOOP_PATH;
                            cut_chars.insert(lo as u32, hi as u32);
                        }
                        _ => all = false,
                    }
                }
                if all {
                    dfa.state_mut(sid).first = DEAD_PATH;
                }
            }
            depth -= 1;
        }

        // drop start states whose edges all lead to dead paths
        let ids: Vec<StateId> = start_states.iter().copied().collect();
        for sid in ids {
            let mut all = true;
            for (lo, hi, target) in dfa.meta_closure(sid).edges {
                match dfa.state(target).first {
                    DEAD_PATH => cut_chars.insert(lo as u32, hi as u32),
                    LOOP_PATH => {
                        all = false;
                        cut_chars.insert(lo as u32, hi as u32);
                    }
                    _ => all = false,
                }
            }
            if all {
                start_states.remove(&sid);
            }
        }

        self.p.lbk = if cut_backedge { 0xffff } else { cut_depth };
        self.p.lbm = cut_fin_depth;
        for ch in cut_chars.values() {
            if ch < 256 {
                self.p.cbk[ch as usize] = true;
            }
        }
        self.cut_backedge = cut_backedge;
    }

    /// Follow the single-edge spine from the start state to find an
    /// exact literal prefix, and seed the prediction start states.
    fn scan_literal_chain(&mut self, start_states: &mut BTreeSet<StateId>) {
        let dfa = &*self.dfa;
        let mut sid: StateId = 0;
        let mut one = true;
        let mut chr: Vec<u8> = Vec::new();
        while dfa.state(sid).accept == 0 {
            let state = dfa.state(sid);
            if state.edges.len() != 1 || !state.heads.is_empty() {
                one = false;
                break;
            }
            let (&lo, edge) = state.edges.iter().next().expect("single edge");
            if lo == edge.hi {
                if lo <= 0xff {
                    if chr.len() >= 255 {
                        one = false;
                        break;
                    }
                    chr.push(lo as u8);
                } else {
                    one = false;
                }
            } else {
                one = false;
                break;
            }
            let Some(next) = edge.target else {
                one = false;
                break;
            };
            sid = next;
        }
        let state = dfa.state(sid);
        if (state.accept > 0 && !state.edges.is_empty()) || state.redo {
            one = false;
        }
        if chr.is_empty() || state.accept == 0 {
            start_states.insert(sid);
        }
        self.p.len = chr.len() as u8;
        self.p.one = one;
        self.p.chr = chr;
    }

    /// Shortest match length from the start states, capped at 8.
    fn gen_min(&mut self, states: &BTreeSet<StateId>) {
        let dfa = &*self.dfa;
        self.p.min = 8;
        let mut next: BTreeSet<StateId> = states.clone();
        let mut level: u8 = 0;
        while level < self.p.min {
            let mut none = true;
            let prev = std::mem::take(&mut next);
            'from: for &from in &prev {
                let closure = dfa.meta_closure(from);
                if dfa.state(from).accept > 0 || closure.accepting {
                    none = true;
                    break 'from;
                }
                for (_, _, target) in closure.edges {
                    let target_first = dfa.state(target).first;
                    if self.p.lbk > 0 && target_first > 0 && target_first <= self.cut {
                        continue;
                    }
                    none = false;
                    if self.p.min == level + 1 {
                        continue;
                    }
                    if dfa.accepts_via_meta(target) {
                        self.p.min = level + 1;
                    } else {
                        next.insert(target);
                    }
                }
            }
            if none {
                self.p.min = level;
            }
            level += 1;
        }
    }

    /// Populate bitap, pair, PM4 and PM-hash tables from the start
    /// states, propagating per-state hash and character ranges.
    fn gen_predict_match(&mut self, states: &BTreeSet<StateId>) {
        self.gen_min(states);
        let depth = (self.p.min as usize).max(4);
        let mut hashes: Vec<IndexMap<StateId, (ByteRanges, ByteRanges)>> =
            vec![IndexMap::new(); depth];
        self.gen_predict_match_start(states, &mut hashes[0]);
        for level in 1..depth {
            let prev = std::mem::take(&mut hashes[level - 1]);
            if prev.is_empty() {
                break;
            }
            for (from, ranges) in &prev {
                self.gen_predict_match_transitions(level, *from, ranges, &mut hashes[level]);
            }
        }
    }

    fn gen_predict_match_start(
        &mut self,
        states: &BTreeSet<StateId>,
        first_hashes: &mut IndexMap<StateId, (ByteRanges, ByteRanges)>,
    ) {
        for &sid in states {
            for (lo, hi, target) in self.dfa.meta_closure(sid).edges {
                let target_first = self.dfa.state(target).first;
                if self.p.lbk > 0 && target_first > 0 && target_first <= self.cut {
                    continue;
                }
                let next_accept = self.dfa.accepts_via_meta(target);
                first_hashes
                    .entry(target)
                    .or_default()
                    .0
                    .insert(lo as u32, hi as u32);
                let mut mask: u8 = !(1 << 6);
                if next_accept {
                    mask &= !(1 << 7);
                }
                for ch in lo..=hi {
                    self.p.bit[ch as usize] &= !1;
                    self.p.pmh[ch as usize] &= !1;
                    self.p.pma[ch as usize] &= mask;
                }
                if self.p.min <= 1 {
                    self.seal_tap(lo, hi, target, next_accept, !1);
                }
            }
        }
        // the first level's character ranges equal its hash ranges
        for (_, ranges) in first_hashes.iter_mut() {
            ranges.1 = ranges.0.clone();
        }
    }

    fn gen_predict_match_transitions(
        &mut self,
        level: usize,
        state: StateId,
        previous: &(ByteRanges, ByteRanges),
        level_hashes: &mut IndexMap<StateId, (ByteRanges, ByteRanges)>,
    ) {
        let depth = (self.p.min as usize).max(4);
        for (lo, hi, target) in self.dfa.meta_closure(state).edges {
            let target_first = self.dfa.state(target).first;
            if self.p.lbk > 0 && target_first > 0 && target_first <= self.cut {
                continue;
            }
            let next_accept = self.dfa.accepts_via_meta(target);
            let has_next = level + 1 < depth;
            if level < self.p.min as usize {
                let bit_mask: u8 = !(1 << level);
                for ch in lo..=hi {
                    self.p.bit[ch as usize] &= bit_mask;
                }
                // the pair bit sits one lane below the bitap lane
                let tap_mask = bit_mask >> 1;
                for curr in lo..=hi {
                    for prev in previous.1.values() {
                        self.p.tap[pair_hash(prev as u8, curr) as usize] &= tap_mask;
                    }
                }
                if level + 1 < self.p.min as usize && has_next {
                    level_hashes
                        .entry(target)
                        .or_default()
                        .1
                        .insert(lo as u32, hi as u32);
                } else {
                    self.seal_tap(lo, hi, target, next_accept, bit_mask);
                }
            }
            if level < 4 {
                let pmh_mask: u8 = !(1 << level);
                let mut pma_mask: u8 = !(1 << (6 - 2 * level));
                if level == 3 || next_accept {
                    pma_mask &= !(1 << (7 - 2 * level));
                }
                for prev in previous.0.values() {
                    for ch in lo..=hi {
                        let h = chain_hash(prev as u16, ch) as usize;
                        self.p.pmh[h] &= pmh_mask;
                        self.p.pma[h] &= pma_mask;
                        if has_next {
                            level_hashes.entry(target).or_default().0.insert_one(h as u32);
                        }
                    }
                }
            } else if level < self.p.min as usize {
                let pmh_mask: u8 = !(1 << level);
                for prev in previous.0.values() {
                    for ch in lo..=hi {
                        let h = chain_hash(prev as u16, ch) as usize;
                        self.p.pmh[h] &= pmh_mask;
                        if has_next {
                            level_hashes.entry(target).or_default().0.insert_one(h as u32);
                        }
                    }
                }
            }
        }
    }

    /// Final tap population for the last bitap level: an accepting edge
    /// pairs with every possible next byte, otherwise with the bytes on
    /// the target's own edges.
    fn seal_tap(&mut self, lo: u8, hi: u8, target: StateId, next_accept: bool, mask: u8) {
        if next_accept {
            for last in lo..=hi {
                for curr in 0..=255u8 {
                    self.p.tap[pair_hash(last, curr) as usize] &= mask;
                }
            }
        } else {
            let next_edges = self.dfa.meta_closure(target).edges;
            for (nlo, nhi, _) in next_edges {
                for ch in lo..=hi {
                    for nch in nlo..=nhi {
                        self.p.tap[pair_hash(ch, nch) as usize] &= mask;
                    }
                }
            }
        }
    }

    /// Post-analysis: bitap entropy, needle pin selection, and the
    /// Boyer-Moore shift table for literal prefixes.
    fn finish(&mut self) {
        let p = &mut self.p;
        if p.len == 0 {
            if p.min > 0 {
                let mask: u8 = !(((1u32 << p.min) - 1) as u8);
                for b in p.bit.iter_mut() {
                    *b |= mask;
                }
                for t in p.tap.iter_mut() {
                    *t |= mask;
                }
                let mut npy: u32 = 0;
                for b in p.bit.iter() {
                    npy += (!b & 0xff).count_ones();
                }
                p.npy = (npy / p.min as u32) as u16;
            }
            // score candidate needle positions by mean byte frequency
            let min = p.min.max(1);
            let mut score: Vec<(u8, u8, u16)> = Vec::new(); // (mean freq, position, pins)
            for k in 0..min {
                let mask = 1u8 << k;
                let mut n: u16 = 0;
                let mut max: u16 = 0;
                let mut sum: u16 = 0;
                for i in 0..256u16 {
                    if n > PIN_MAX {
                        break;
                    }
                    if p.bit[i as usize] & mask == 0 {
                        n += 1;
                        let freq = frequency(i as u8) as u16;
                        max = max.max(freq);
                        sum += freq;
                    }
                }
                if n > 0 && n <= PIN_MAX && max <= FREQ_MAX {
                    let m = (sum + n - 1) / n;
                    if m <= FREQ_MAX {
                        let at = score
                            .iter()
                            .position(|&(f, _, pins)| {
                                f as u16 > m || (f as u16 == m && pins > n)
                            })
                            .unwrap_or(score.len());
                        score.insert(at, (m as u8, k, n));
                    }
                }
            }
            let mut lcp: u16 = 0;
            let mut lcs: u16 = 0;
            let mut nlcp: u16 = 0xffff;
            let mut nlcs: u16 = 0xffff;
            let mut freqlcp: u16 = 255;
            let mut freqlcs: u16 = 255;
            if score.len() == 1 && p.min <= 3 {
                freqlcp = score[0].0 as u16;
                freqlcs = freqlcp;
                lcp = score[0].1 as u16;
                lcs = lcp;
                nlcp = score[0].2;
                nlcs = nlcp;
                // a single noisy position is better served by PM4
                let freqmax = if p.min > 1 || nlcp > 5 {
                    FREQ_MAX_ONE
                } else {
                    FREQ_MAX
                };
                if freqlcp > freqmax {
                    freqlcp = 255;
                    freqlcs = 255;
                }
            } else if score.len() >= 2 {
                freqlcp = score[0].0 as u16;
                lcp = score[0].1 as u16;
                nlcp = score[0].2;
                freqlcs = score[1].0 as u16;
                lcs = score[1].1 as u16;
                nlcs = score[1].2;
                if lcp + 1 == lcs || lcs + 1 == lcp || (nlcp <= 8 && nlcs > 8) {
                    // prefer a non-adjacent second needle position
                    for &(f, k, n) in score.iter().skip(2) {
                        if n <= 8 && (lcp as i32 - k as i32).abs() > 1 {
                            freqlcs = f as u16;
                            lcs = k as u16;
                            nlcs = n;
                            break;
                        }
                    }
                }
            }
            let n = nlcp.max(nlcs);
            let freqmax = 2 * FREQ_MAX;
            if n > 0 && n <= PIN_MAX && freqlcp + freqlcs <= freqmax {
                let masklcp = 1u8 << lcp;
                let masklcs = 1u8 << lcs;
                let mut chr = vec![0u8; 2 * n as usize];
                let mut j = 0usize;
                let mut k = n as usize;
                for i in 0..256u16 {
                    if p.bit[i as usize] & masklcp == 0 && j < n as usize {
                        chr[j] = i as u8;
                        j += 1;
                    }
                    if p.bit[i as usize] & masklcs == 0 && k < 2 * n as usize {
                        chr[k] = i as u8;
                        k += 1;
                    }
                }
                while j < n as usize {
                    chr[j] = chr[j - 1];
                    j += 1;
                }
                while k < 2 * n as usize {
                    chr[k] = chr[k - 1];
                    k += 1;
                }
                p.chr = chr;
                p.pin = n;
                p.lcp = lcp;
                p.lcs = lcs;
            }
        } else if p.len > 1 {
            let n = p.len;
            p.bms = [n; 256];
            p.lcp = 0;
            p.lcs = 1;
            for i in 0..n as usize {
                let pch = p.chr[i];
                p.bms[pch as usize] = n - i as u8 - 1;
                if i > 0 {
                    let freqpch = frequency(pch);
                    let lcpch = p.chr[p.lcp as usize];
                    let lcsch = p.chr[p.lcs as usize];
                    if frequency(lcpch) > freqpch {
                        p.lcs = p.lcp;
                        p.lcp = i as u16;
                    } else if frequency(lcsch) > freqpch
                        || (frequency(lcsch) == freqpch
                            && (p.lcp as i32 - p.lcs as i32).abs()
                                < (p.lcp as i32 - i as i32).abs())
                    {
                        p.lcs = i as u16;
                    }
                }
            }
            let i = n as usize - 1;
            let mut j = i;
            while j > 0 {
                if p.chr[j - 1] == p.chr[i] {
                    break;
                }
                j -= 1;
            }
            p.bmd = (i - j + 1) as u16;
            let mut score: u64 = 0;
            for i in 0..n as usize {
                score += p.bms[p.chr[i] as usize] as u64;
            }
            score /= n as u64;
            let fch = frequency(p.chr[p.lcp as usize]) as u16;
            if score > BM_SCORE_MIN
                && fch > BM_FREQ_MIN
                && (score > BM_SCORE_HIGH || fch > BM_FREQ_HIGH)
                && fch as u64 + score > BM_COMBINED_MIN
            {
                p.lcs = 0xffff; // Boyer-Moore wins
            }
            if p.lcs < 0xffff {
                p.bmd = 0;
                // spread lcp and lcs apart when adjacent
                if p.len == 3 && (p.lcp == 1 || p.lcs == 1) {
                    p.lcp = 0;
                    p.lcs = 2;
                } else if p.len > 3 && (p.lcp + 1 == p.lcs || p.lcs + 1 == p.lcp) {
                    let mut freqlcs: u16 = 255;
                    for i in 0..n as u16 {
                        if i > p.lcp + 1 || i + 1 < p.lcp {
                            let freqpch = frequency(p.chr[i as usize]) as u16;
                            if freqlcs > freqpch {
                                p.lcs = i;
                                freqlcs = freqpch;
                            }
                        }
                    }
                }
            }
        }
    }
}
