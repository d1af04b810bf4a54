//! Recursive-descent regex parser.
//!
//! Builds the followpos NFA directly, without an AST: each grammar rule
//! returns a fragment (firstpos, lastpos, nullability, repeat width,
//! lazy ids) and extends the shared followpos map. Top-level
//! alternations that contain no regex metacharacters bypass the NFA and
//! are inserted into the tree DFA instead.
//!
//! Grammar phases: `parse1` alternation, `parse2` concatenation and
//! leading anchors, `parse3` quantifiers, `parse4` atoms.

use indexmap::IndexMap;

use harrow_core::{Lazy, Location, PosSet, Position, pos_add, pos_insert};

use crate::dfa::TreeDfa;
use crate::error::{RegexError, RegexErrorKind};
use crate::mods::{ModFlag, ModSpans};
use crate::options::PatternOptions;

/// Followpos map; insertion order is preserved so compilation is
/// deterministic.
pub(crate) type Follow = IndexMap<Position, PosSet>;

/// A lazy quantifier registration: its id and source location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct LazyLoc {
    pub lazy: Lazy,
    pub loc: Location,
}

pub(crate) type LazySet = Vec<LazyLoc>;

pub(crate) fn lazy_add(set: &mut LazySet, lazy: Lazy, loc: Location) {
    let entry = LazyLoc { lazy, loc };
    if !set.contains(&entry) {
        set.push(entry);
    }
}

pub(crate) fn lazy_insert(set: &mut LazySet, other: &LazySet) {
    for &entry in other {
        if !set.contains(&entry) {
            set.push(entry);
        }
    }
}

/// Disjoint lookahead spans of one top-level alternation, ordered by
/// start location. The span runs from the `(` of `(?=` to its `)`.
#[derive(Clone, Debug, Default)]
pub(crate) struct Lookaheads(pub Vec<(Location, Location)>);

impl Lookaheads {
    pub fn contains_loc(&self, loc: Location) -> bool {
        self.index_of(loc).is_some()
    }

    /// Index of the span containing `loc`.
    pub fn index_of(&self, loc: Location) -> Option<usize> {
        self.0.iter().position(|&(start, stop)| start <= loc && loc <= stop)
    }

    /// Record a span unless it would nest into an existing one.
    pub fn insert(&mut self, start: Location, stop: Location) {
        if self.0.iter().any(|&(s, e)| start <= e && s <= stop) {
            return;
        }
        let at = self.0.partition_point(|&(s, _)| s < start);
        self.0.insert(at, (start, stop));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Lookahead spans per accept label, ordered by label.
pub(crate) type LookMap = std::collections::BTreeMap<u32, Lookaheads>;

/// Everything the parser hands to the DFA builder.
pub(crate) struct Parsed {
    pub startpos: PosSet,
    pub followpos: Follow,
    pub lazypos: LazySet,
    pub modifiers: ModSpans,
    pub lookahead: LookMap,
}

/// A sub-expression fragment during parsing.
#[derive(Clone, Debug, Default)]
struct Frag {
    firstpos: PosSet,
    lastpos: PosSet,
    nullable: bool,
    lazypos: LazySet,
    /// Total virtual repeat copies inside this fragment (starts at 1).
    iter: u32,
}

/// Shared accumulators threaded through the grammar.
struct Px {
    followpos: Follow,
    lazyidx: Lazy,
    modifiers: ModSpans,
}

/// Compiler state shared by the parser and the DFA builder.
pub(crate) struct Compiler<'p> {
    pattern: &'p str,
    rex: &'p [u8],
    pub(crate) opts: PatternOptions,
    /// Pattern can only match at begin of line.
    pub(crate) bol: bool,
    /// Source offsets separating the top-level alternations.
    pub(crate) end: Vec<Location>,
    pub(crate) tfa: TreeDfa,
}

impl<'p> Compiler<'p> {
    pub fn new(pattern: &'p str, opts: PatternOptions) -> Self {
        Compiler {
            pattern,
            rex: pattern.as_bytes(),
            opts,
            bol: false,
            end: Vec::new(),
            tfa: TreeDfa::default(),
        }
    }

    pub fn pattern(&self) -> &str {
        self.pattern
    }

    /// Source slices of the top-level alternations, by accept label.
    pub fn subpatterns(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.end.len());
        let mut prev = 0usize;
        for &end in &self.end {
            let end = end as usize;
            out.push(self.pattern[prev.min(self.pattern.len())..end.min(self.pattern.len())].to_string());
            prev = end + 1;
        }
        out
    }

    pub(crate) fn err(&self, kind: RegexErrorKind, pos: Location) -> RegexError {
        RegexError::new(kind, self.pattern, pos as usize)
    }

    /// Byte at `loc`, or 0 at and beyond the end.
    pub(crate) fn at(&self, loc: Location) -> u8 {
        self.rex.get(loc as usize).copied().unwrap_or(0)
    }

    /// The escaped character after the escape at `loc`, or 0.
    pub(crate) fn escape_at(&self, loc: Location) -> u8 {
        match self.opts.escape {
            Some(e) if self.at(loc) == e => self.at(loc + 1),
            _ => 0,
        }
    }

    fn escapes_at(&self, loc: Location, set: &[u8]) -> bool {
        let c = self.escape_at(loc);
        c != 0 && set.contains(&c)
    }

    /// Find `needle` at or after `loc`; returns its location.
    pub(crate) fn find_at(&self, loc: Location, needle: u8) -> Option<Location> {
        self.rex[(loc as usize).min(self.rex.len())..]
            .iter()
            .position(|&b| b == needle)
            .map(|i| loc + i as Location)
    }

    /// Case-insensitively match `name` at `loc`.
    pub(crate) fn eq_at(&self, loc: Location, name: &str) -> bool {
        let start = loc as usize;
        let end = start + name.len();
        end <= self.rex.len() && self.rex[start..end].eq_ignore_ascii_case(name.as_bytes())
    }

    /// Parse the pattern into the followpos NFA and the tree DFA.
    pub(crate) fn parse(&mut self) -> Result<Parsed, RegexError> {
        if self.rex.len() > Position::MAX_LOC as usize {
            return Err(self.err(RegexErrorKind::ExceedsLength, Position::MAX_LOC));
        }
        let len = self.rex.len() as Location;
        let mut loc: Location = 0;
        let mut choice: u32 = 1;
        let mut startpos = PosSet::new();
        let mut lookahead = LookMap::new();
        let mut all_lazypos = LazySet::new();
        let mut px = Px {
            followpos: Follow::default(),
            lazyidx: 0,
            modifiers: ModSpans::new(),
        };

        // (?imsqx-...) directives that apply to the pattern as a whole
        while self.at(loc) == b'(' && self.at(loc + 1) == b'?' {
            let back = loc;
            loc += 2;
            while self.at(loc) == b'-' || self.at(loc).is_ascii_alphanumeric() {
                loc += 1;
            }
            if self.at(loc) == b')' {
                let mut active = true;
                loc = back + 2;
                loop {
                    let c = self.at(loc);
                    if c == b')' {
                        break;
                    }
                    match c {
                        b'-' => active = false,
                        b'i' => self.opts.i = active,
                        b'm' => self.opts.m = active,
                        b'q' => self.opts.q = active,
                        b's' => self.opts.s = active,
                        b'x' => self.opts.x = active,
                        _ => return Err(self.err(RegexErrorKind::InvalidModifier, loc)),
                    }
                    loc += 1;
                }
                loc += 1;
            } else {
                loc = back;
                break;
            }
        }

        // assume bol unless the pattern is empty; cleared later when no ^
        // starts a (sub)pattern
        self.bol = self.at(loc) != 0;

        loop {
            let mut end = loc;
            if !self.opts.q && !self.opts.x {
                // scan ahead for a pure string alternation
                loop {
                    let c = self.at(end);
                    if c == 0 || c == b'|' {
                        break;
                    }
                    if matches!(
                        c,
                        b'.' | b'^' | b'$' | b'(' | b'[' | b'{' | b'?' | b'*' | b'+' | b')'
                    ) {
                        end = loc;
                        break;
                    }
                    if Some(c) == self.opts.escape {
                        let c = self.at(end + 1);
                        if c == 0
                            || b"0123456789<>ABDHLNPSUWXbcdehijklpsuwxz".contains(&c)
                        {
                            end = loc;
                            break;
                        }
                        end += 1;
                        if c == b'Q' {
                            loop {
                                end += 1;
                                let c = self.at(end);
                                if c == 0 {
                                    break;
                                }
                                if Some(c) == self.opts.escape && self.at(end + 1) == b'E' {
                                    break;
                                }
                            }
                        }
                    }
                    end += 1;
                }
            }
            if loc < end {
                // string pattern without regex metas: insert into the tree DFA
                self.bol = false;
                let mut quote = false;
                let mut node = self.tfa.root();
                while loc < end {
                    let mut c = self.at(loc);
                    loc += 1;
                    if Some(c) == self.opts.escape {
                        if self.at(loc) == b'E' {
                            quote = false;
                            loc += 1;
                            continue;
                        }
                        if !quote {
                            if self.at(loc) == b'Q' {
                                quote = true;
                                loc += 1;
                                continue;
                            }
                            c = self.at(loc);
                            loc += 1;
                            if let Some(i) = b"abtnvfr".iter().position(|&e| e == c) {
                                c = 0x07 + i as u8;
                            }
                        }
                    } else if c.is_ascii_uppercase() && self.opts.i {
                        c = c.to_ascii_lowercase();
                    }
                    node = self.tfa.edge(node, c);
                    if self.tfa.nodes.len() > crate::dfa::MAX_STATES {
                        return Err(self.err(RegexErrorKind::ExceedsLimits, loc));
                    }
                }
                if self.tfa.nodes[node as usize].accept == 0 {
                    self.tfa.nodes[node as usize].accept = choice;
                }
            } else {
                let mut frag = Frag::default();
                let la = lookahead.entry(choice).or_default();
                self.parse2(true, &mut loc, &mut frag, &mut px, la)?;
                pos_insert(&mut startpos, &frag.firstpos);
                if frag.nullable {
                    pos_add(&mut startpos, Position::accepting(choice));
                }
                if frag.lazypos.is_empty() {
                    for p in &frag.lastpos {
                        pos_add(
                            px.followpos.entry(p.pos()).or_default(),
                            Position::accepting(choice),
                        );
                    }
                } else {
                    for p in &frag.lastpos {
                        for l in &frag.lazypos {
                            pos_add(
                                px.followpos.entry(p.pos()).or_default(),
                                Position::accepting(choice).with_lazy(l.lazy),
                            );
                        }
                    }
                }
                lazy_insert(&mut all_lazypos, &frag.lazypos);
            }
            choice = choice
                .checked_add(1)
                .ok_or_else(|| self.err(RegexErrorKind::ExceedsLimits, loc))?;
            self.end.push(loc);
            if self.at(loc) != b'|' {
                break;
            }
            loc += 1;
        }
        if self.at(loc) == b')' {
            return Err(self.err(RegexErrorKind::MismatchedParens, loc));
        } else if self.at(loc) != 0 {
            return Err(self.err(RegexErrorKind::InvalidSyntax, loc));
        }
        if self.opts.i {
            px.modifiers.update(ModFlag::I, false, 0, len);
        }
        if self.opts.m {
            px.modifiers.update(ModFlag::M, false, 0, len);
        }
        if self.opts.s {
            px.modifiers.update(ModFlag::S, false, 0, len);
        }
        Ok(Parsed {
            startpos,
            followpos: px.followpos,
            lazypos: all_lazypos,
            modifiers: px.modifiers,
            lookahead,
        })
    }

    fn parse1(
        &mut self,
        begin: bool,
        loc: &mut Location,
        frag: &mut Frag,
        px: &mut Px,
        la: &mut Lookaheads,
    ) -> Result<(), RegexError> {
        self.parse2(begin, loc, frag, px, la)?;
        while self.at(*loc) == b'|' {
            *loc += 1;
            let mut alt = Frag::default();
            self.parse2(begin, loc, &mut alt, px, la)?;
            pos_insert(&mut frag.firstpos, &alt.firstpos);
            pos_insert(&mut frag.lastpos, &alt.lastpos);
            lazy_insert(&mut frag.lazypos, &alt.lazypos);
            if alt.nullable {
                frag.nullable = true;
            }
            if alt.iter > frag.iter {
                frag.iter = alt.iter;
            }
        }
        Ok(())
    }

    fn parse2(
        &mut self,
        mut begin: bool,
        loc: &mut Location,
        frag: &mut Frag,
        px: &mut Px,
        la: &mut Lookaheads,
    ) -> Result<(), RegexError> {
        let mut a_pos = PosSet::new();
        if begin {
            loop {
                if self.opts.x {
                    while self.at(*loc).is_ascii_whitespace() {
                        *loc += 1;
                    }
                }
                if self.at(*loc) == b'^' {
                    pos_add(&mut a_pos, Position::new(*loc));
                    *loc += 1;
                    begin = false;
                } else if self.escapes_at(*loc, b"ABb<>") {
                    pos_add(&mut a_pos, Position::new(*loc));
                    *loc += 2;
                    if begin {
                        self.bol = false;
                        begin = false;
                    }
                } else {
                    if self.escapes_at(*loc, b"ij") {
                        self.bol = false;
                        begin = false;
                    }
                    break;
                }
            }
        }
        let c = self.at(*loc);
        if begin || (c != 0 && c != b'|' && c != b')') {
            self.parse3(begin, loc, frag, px, la)?;
            loop {
                let c = self.at(*loc);
                if c == 0 || c == b'|' || c == b')' {
                    break;
                }
                let mut next = Frag::default();
                self.parse3(false, loc, &mut next, px, la)?;
                if frag.nullable {
                    pos_insert(&mut frag.firstpos, &next.firstpos);
                }
                for p in &frag.lastpos {
                    pos_insert(
                        px.followpos.entry(p.pos()).or_default(),
                        &next.firstpos,
                    );
                }
                if next.nullable {
                    pos_insert(&mut frag.lastpos, &next.lastpos);
                } else {
                    frag.lastpos = next.lastpos;
                    frag.nullable = false;
                }
                lazy_insert(&mut frag.lazypos, &next.lazypos);
                if next.iter > frag.iter {
                    frag.iter = next.iter;
                }
            }
        }
        for &p in &a_pos {
            for k in frag.lastpos.clone() {
                if self.at(k.loc()) == b')' && la.contains_loc(k.loc()) {
                    pos_add(px.followpos.entry(p.pos()).or_default(), k);
                }
            }
            if frag.lazypos.is_empty() {
                for k in frag.lastpos.clone() {
                    let anchored = !frag.nullable || k.pos() != p.pos();
                    pos_add(
                        px.followpos.entry(k.pos()).or_default(),
                        p.with_anchor(anchored),
                    );
                }
            } else {
                // starting anchors become lazy
                for l in frag.lazypos.clone() {
                    for k in frag.lastpos.clone() {
                        let anchored = !frag.nullable || k.pos() != p.pos();
                        pos_add(
                            px.followpos.entry(k.pos()).or_default(),
                            p.with_lazy(l.lazy).with_anchor(anchored),
                        );
                    }
                }
            }
            frag.lastpos.clear();
            pos_add(&mut frag.lastpos, p);
            if frag.nullable || frag.firstpos.is_empty() {
                pos_add(&mut frag.firstpos, p);
                frag.nullable = false;
            }
        }
        Ok(())
    }

    fn parse3(
        &mut self,
        begin: bool,
        loc: &mut Location,
        frag: &mut Frag,
        px: &mut Px,
        la: &mut Lookaheads,
    ) -> Result<(), RegexError> {
        let b_pos = *loc;
        self.parse4(begin, loc, frag, px, la)?;
        let mut c = self.at(*loc);
        if self.opts.x {
            while c.is_ascii_whitespace() {
                *loc += 1;
                c = self.at(*loc);
            }
        }
        loop {
            if c == b'*' || c == b'+' || c == b'?' {
                if c == b'*' || c == b'?' {
                    frag.nullable = true;
                    if begin {
                        self.bol = false;
                    }
                }
                *loc += 1;
                if self.at(*loc) == b'?' {
                    px.lazyidx = px
                        .lazyidx
                        .checked_add(1)
                        .ok_or_else(|| self.err(RegexErrorKind::ExceedsLimits, *loc))?;
                    lazy_add(&mut frag.lazypos, px.lazyidx, *loc);
                    mark_lazy(&frag.lazypos, &mut frag.firstpos);
                    *loc += 1;
                } else if c != b'?' && !frag.lazypos.is_empty() {
                    mark_greedy(&mut frag.firstpos);
                }
                if c != b'?' {
                    for p in frag.lastpos.clone() {
                        pos_insert(
                            px.followpos.entry(p.pos()).or_default(),
                            &frag.firstpos,
                        );
                    }
                }
            } else if c == b'{' {
                // {n,m} repeats the sub-regex n to m times
                let mut d: u64 = 0;
                for _ in 0..7 {
                    *loc += 1;
                    let c = self.at(*loc);
                    if !c.is_ascii_digit() {
                        break;
                    }
                    d = 10 * d + (c - b'0') as u64;
                }
                if d > Position::MAX_ITER as u64 {
                    return Err(self.err(RegexErrorKind::ExceedsLimits, *loc));
                }
                let n = d as u32;
                let mut m = n;
                let mut unlimited = false;
                if self.at(*loc) == b',' {
                    if self.at(*loc + 1).is_ascii_digit() {
                        m = 0;
                        for _ in 0..7 {
                            *loc += 1;
                            let c = self.at(*loc);
                            if !c.is_ascii_digit() {
                                break;
                            }
                            m = 10 * m + (c - b'0') as u32;
                        }
                    } else {
                        unlimited = true;
                        *loc += 1;
                    }
                }
                if self.at(*loc) == b'}' {
                    let nullable1 = frag.nullable;
                    if n == 0 {
                        frag.nullable = true;
                    }
                    if n > m {
                        return Err(self.err(RegexErrorKind::InvalidRepeat, *loc));
                    }
                    *loc += 1;
                    if self.at(*loc) == b'?' {
                        px.lazyidx = px
                            .lazyidx
                            .checked_add(1)
                            .ok_or_else(|| self.err(RegexErrorKind::ExceedsLimits, *loc))?;
                        lazy_add(&mut frag.lazypos, px.lazyidx, *loc);
                        mark_lazy(&frag.lazypos, &mut frag.firstpos);
                        *loc += 1;
                    }
                    if frag.nullable && unlimited {
                        // {0,} behaves as *
                        for p in frag.lastpos.clone() {
                            pos_insert(
                                px.followpos.entry(p.pos()).or_default(),
                                &frag.firstpos,
                            );
                        }
                    } else if m > 0 {
                        if frag.iter as u64 * m as u64 > Position::MAX_ITER as u64 {
                            return Err(self.err(RegexErrorKind::ExceedsLimits, *loc));
                        }
                        let iter = frag.iter;
                        // virtually repeat the sub-regex m-1 times
                        let mut followpos1 = Follow::default();
                        for (key, follows) in px.followpos.iter() {
                            if key.loc() >= b_pos {
                                for i in 0..m - 1 {
                                    let d = (iter * (i + 1)) as u16;
                                    let entry =
                                        followpos1.entry(key.with_iter(d)).or_default();
                                    for p in follows {
                                        pos_add(entry, p.with_iter(d));
                                    }
                                }
                            }
                        }
                        for (key, follows) in followpos1 {
                            pos_insert(px.followpos.entry(key).or_default(), &follows);
                        }
                        // m-1 virtual concatenations via iter-indexed clones
                        for i in 0..m - 1 {
                            for k in frag.lastpos.clone() {
                                for j in frag.firstpos.clone() {
                                    pos_add(
                                        px.followpos
                                            .entry(k.pos().with_iter((iter * i) as u16))
                                            .or_default(),
                                        j.with_iter((iter * i + iter) as u16),
                                    );
                                }
                            }
                        }
                        if unlimited {
                            for k in frag.lastpos.clone() {
                                for j in frag.firstpos.clone() {
                                    pos_add(
                                        px.followpos
                                            .entry(k.pos().with_iter((iter * (m - 1)) as u16))
                                            .or_default(),
                                        j.with_iter((iter * (m - 1)) as u16),
                                    );
                                }
                            }
                        }
                        if nullable1 {
                            // nullable sub-regex: extend firstpos with clones
                            let firstpos1 = frag.firstpos.clone();
                            for i in 1..=m - 1 {
                                for k in &firstpos1 {
                                    pos_add(&mut frag.firstpos, k.with_iter((iter * i) as u16));
                                }
                            }
                        }
                        // copies n..m-1 are optional (0..m-1 when nullable)
                        let mut lastpos1 = PosSet::new();
                        let lo = if frag.nullable { 0 } else { n - 1 };
                        for i in lo..=m - 1 {
                            for k in &frag.lastpos {
                                pos_add(&mut lastpos1, k.with_iter((iter * i) as u16));
                            }
                        }
                        frag.lastpos = lastpos1;
                        frag.iter *= m;
                    } else {
                        // zero repeat {0}
                        frag.firstpos.clear();
                        frag.lastpos.clear();
                        frag.lazypos.clear();
                    }
                } else if self.at(*loc) == 0 {
                    return Err(self.err(RegexErrorKind::MismatchedBraces, *loc));
                } else {
                    return Err(self.err(RegexErrorKind::InvalidRepeat, *loc));
                }
            } else {
                break;
            }
            c = self.at(*loc);
        }
        Ok(())
    }

    fn parse4(
        &mut self,
        begin: bool,
        loc: &mut Location,
        frag: &mut Frag,
        px: &mut Px,
        la: &mut Lookaheads,
    ) -> Result<(), RegexError> {
        *frag = Frag {
            nullable: true,
            iter: 1,
            ..Frag::default()
        };
        let c = self.at(*loc);
        if c == b'(' {
            *loc += 1;
            if self.at(*loc) == b'?' {
                *loc += 1;
                let c = self.at(*loc);
                match c {
                    b'#' => {
                        // (?# comment: skip to its closing paren
                        loop {
                            *loc += 1;
                            let c = self.at(*loc);
                            if c == b')' {
                                *loc += 1;
                                return Ok(());
                            }
                            if c == 0 {
                                return Err(
                                    self.err(RegexErrorKind::MismatchedParens, *loc)
                                );
                            }
                        }
                    }
                    b'^' => {
                        // (?^ negative pattern producing a redo match
                        *loc += 1;
                        let mut inner = Frag::default();
                        self.parse1(begin, loc, &mut inner, px, la)?;
                        for p in &inner.firstpos {
                            pos_add(&mut frag.firstpos, p.with_negate(true));
                        }
                        frag.lastpos = inner.lastpos;
                        frag.nullable = inner.nullable;
                        frag.lazypos = inner.lazypos;
                        frag.iter = inner.iter;
                    }
                    b'=' => {
                        // (?= lookahead
                        let l_pos = Position::new(*loc - 2);
                        *loc += 1;
                        self.parse1(begin, loc, frag, px, la)?;
                        pos_add(&mut frag.firstpos, l_pos);
                        if frag.nullable {
                            pos_add(&mut frag.lastpos, l_pos);
                        }
                        la.insert(l_pos.loc(), *loc);
                        let tick = Position::new(*loc).with_ticked(true);
                        for p in frag.lastpos.clone() {
                            pos_add(px.followpos.entry(p.pos()).or_default(), tick);
                        }
                        pos_add(&mut frag.lastpos, tick);
                        if frag.nullable {
                            pos_add(&mut frag.firstpos, tick);
                            pos_add(&mut frag.lastpos, l_pos);
                        }
                    }
                    b':' => {
                        *loc += 1;
                        self.parse1(begin, loc, frag, px, la)?;
                    }
                    _ => {
                        // (?imsqux-imsqux[:...]) modifier group
                        let mut m_loc = *loc;
                        let mut negative = false;
                        let opt_q = self.opts.q;
                        let opt_x = self.opts.x;
                        let mut c = c;
                        loop {
                            match c {
                                b'-' => negative = true,
                                b'q' => self.opts.q = !negative,
                                b'x' => self.opts.x = !negative,
                                b'i' | b'm' | b's' | b'u' => {}
                                _ => {
                                    return Err(
                                        self.err(RegexErrorKind::InvalidModifier, *loc)
                                    );
                                }
                            }
                            *loc += 1;
                            c = self.at(*loc);
                            if c == 0 || c == b':' || c == b')' {
                                break;
                            }
                        }
                        if c != 0 {
                            *loc += 1;
                        }
                        self.parse1(begin, loc, frag, px, la)?;
                        let mut negative = false;
                        loop {
                            let c = self.at(m_loc);
                            m_loc += 1;
                            match c {
                                b'-' => negative = true,
                                b'i' => px.modifiers.update(ModFlag::I, negative, m_loc, *loc),
                                b'm' => px.modifiers.update(ModFlag::M, negative, m_loc, *loc),
                                b's' => px.modifiers.update(ModFlag::S, negative, m_loc, *loc),
                                b'u' => px.modifiers.update(ModFlag::U, negative, m_loc, *loc),
                                _ => {}
                            }
                            if c == 0 || c == b':' || c == b')' {
                                break;
                            }
                        }
                        self.opts.q = opt_q;
                        self.opts.x = opt_x;
                        // the group was already closed by the modifier scan
                        if c == b')' {
                            return Ok(());
                        }
                    }
                }
                // every (?...) form except the directive form expects `)`
                if c != b')' {
                    if self.at(*loc) == b')' {
                        *loc += 1;
                    } else {
                        return Err(self.err(RegexErrorKind::MismatchedParens, *loc));
                    }
                }
            } else {
                // plain capturing group: record its span exactly like a
                // lookahead so HEAD/TAIL cells track the capture
                let l_pos = Position::new(*loc - 1);
                self.parse1(begin, loc, frag, px, la)?;
                pos_add(&mut frag.firstpos, l_pos);
                if frag.nullable {
                    pos_add(&mut frag.lastpos, l_pos);
                }
                la.insert(l_pos.loc(), *loc);
                let tick = Position::new(*loc).with_ticked(true);
                for p in frag.lastpos.clone() {
                    pos_add(px.followpos.entry(p.pos()).or_default(), tick);
                }
                pos_add(&mut frag.lastpos, tick);
                if frag.nullable {
                    pos_add(&mut frag.firstpos, tick);
                    pos_add(&mut frag.lastpos, l_pos);
                }
                if self.at(*loc) == b')' {
                    *loc += 1;
                } else {
                    return Err(self.err(RegexErrorKind::MismatchedParens, *loc));
                }
            }
        } else {
            if begin && c != b'^' {
                self.bol = false;
            }
            if c == b'[' {
                pos_add(&mut frag.firstpos, Position::new(*loc));
                pos_add(&mut frag.lastpos, Position::new(*loc));
                frag.nullable = false;
                *loc += 1;
                let mut c = self.at(*loc);
                if c == b'^' {
                    *loc += 1;
                    c = self.at(*loc);
                }
                while c != 0 {
                    if c == b'['
                        && matches!(self.at(*loc + 1), b':' | b'.' | b'=')
                        && let Some(c_loc) = self.find_at(*loc + 2, self.at(*loc + 1))
                        && self.at(c_loc + 1) == b']'
                    {
                        *loc = c_loc + 1;
                    } else if Some(c) == self.opts.escape && !self.opts.b {
                        *loc += 1;
                    }
                    *loc += 1;
                    c = self.at(*loc);
                    if c == b']' {
                        break;
                    }
                }
                if c == 0 {
                    return Err(self.err(RegexErrorKind::MismatchedBrackets, *loc));
                }
                *loc += 1;
            } else if (c == b'"' && self.opts.q) || self.escape_at(*loc) == b'Q' {
                // quoted literal run "..." or \Q...\E
                let quoted = c == b'"';
                if !quoted {
                    *loc += 1;
                }
                *loc += 1;
                let q_loc = *loc;
                let mut c = self.at(*loc);
                let at_end = |this: &Self, c: u8, loc: Location| -> bool {
                    if quoted {
                        c == b'"'
                    } else {
                        Some(c) == this.opts.escape && this.at(loc + 1) == b'E'
                    }
                };
                if c != 0 && !at_end(self, c, *loc) {
                    pos_add(&mut frag.firstpos, Position::new(*loc));
                    let mut p = Position::NPOS;
                    loop {
                        if quoted && Some(c) == self.opts.escape && self.at(*loc + 1) == b'"' {
                            *loc += 1;
                        }
                        if p != Position::NPOS {
                            pos_add(
                                px.followpos.entry(p.pos()).or_default(),
                                Position::new(*loc),
                            );
                        }
                        p = Position::new(*loc);
                        *loc += 1;
                        c = self.at(*loc);
                        if c == 0 || at_end(self, c, *loc) {
                            break;
                        }
                    }
                    pos_add(&mut frag.lastpos, p);
                    frag.nullable = false;
                    px.modifiers.update(ModFlag::Q, false, q_loc, *loc - 1);
                }
                if !quoted && self.at(*loc) != 0 {
                    *loc += 1;
                }
                if self.at(*loc) != 0 {
                    *loc += 1;
                } else {
                    return Err(self.err(RegexErrorKind::MismatchedQuotation, *loc));
                }
            } else if c == b'#' && self.opts.x {
                *loc += 1;
                loop {
                    let c = self.at(*loc);
                    if c == 0 || c == b'\n' {
                        if c == b'\n' {
                            *loc += 1;
                        }
                        break;
                    }
                    *loc += 1;
                }
            } else if c.is_ascii_whitespace() && self.opts.x {
                *loc += 1;
            } else if c == b')' {
                return Err(self.err(
                    if begin {
                        RegexErrorKind::EmptyExpression
                    } else {
                        RegexErrorKind::MismatchedParens
                    },
                    *loc,
                ));
            } else if c != 0 && c != b'|' && c != b'?' && c != b'*' && c != b'+' {
                pos_add(&mut frag.firstpos, Position::new(*loc));
                pos_add(&mut frag.lastpos, Position::new(*loc));
                frag.nullable = false;
                if Some(c) == self.opts.escape {
                    self.parse_esc(loc, None)?;
                } else {
                    *loc += 1;
                }
            } else if c != 0 {
                return Err(self.err(
                    if begin {
                        RegexErrorKind::EmptyExpression
                    } else {
                        RegexErrorKind::InvalidSyntax
                    },
                    *loc,
                ));
            }
        }
        Ok(())
    }
}

/// Tag every first position with every registered lazy id; the last
/// registration wins, which matches the quantifier nesting order.
fn mark_lazy(lazypos: &LazySet, pos: &mut PosSet) {
    for p in pos.iter_mut() {
        for l in lazypos {
            *p = p.with_lazy(l.lazy);
        }
    }
}

/// Strip lazy ids to restore greediness.
fn mark_greedy(pos: &mut PosSet) {
    for p in pos.iter_mut() {
        *p = p.with_lazy(0);
    }
}
