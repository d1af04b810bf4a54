//! Modifier spans.
//!
//! Inline modifier groups like `(?i:...)` apply a flag over a span of
//! pattern locations. Inner groups are applied before outer ones, so a
//! positive span never overwrites locations an inner group negated, and
//! vice versa.

use harrow_core::{ByteRanges, Location};

/// The modifier flags that carry location spans.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModFlag {
    /// Case-insensitive.
    I,
    /// Multiline anchors.
    M,
    /// Dotall.
    S,
    /// Unicode (accepted, currently byte-oriented).
    U,
    /// Quoted literal span.
    Q,
}

const FLAGS: usize = 5;

/// Per-flag on/off location spans.
#[derive(Clone, Debug, Default)]
pub struct ModSpans {
    on: [ByteRanges; FLAGS],
    off: [ByteRanges; FLAGS],
}

impl ModSpans {
    pub fn new() -> Self {
        ModSpans::default()
    }

    /// Apply `flag` (or its negation) over `from..=to`. Locations already
    /// claimed by the opposite polarity (an inner group) are left alone.
    pub fn update(&mut self, flag: ModFlag, negated: bool, from: Location, to: Location) {
        if from > to {
            return;
        }
        let idx = flag as usize;
        let (dst, exclude) = if negated {
            let (a, b) = (&mut self.off[idx], &self.on[idx]);
            (a, b.clone())
        } else {
            let (a, b) = (&mut self.on[idx], &self.off[idx]);
            (a, b.clone())
        };
        // insert [from..=to] minus the excluded spans
        let mut at = from;
        for (lo, hi) in exclude.iter() {
            if hi <= at {
                continue;
            }
            if lo > to {
                break;
            }
            if at < lo {
                dst.insert(at, (lo - 1).min(to));
            }
            at = at.max(hi);
            if at > to {
                break;
            }
        }
        if at <= to {
            dst.insert(at, to);
        }
    }

    /// Is `flag` in effect at `loc`?
    pub fn is(&self, flag: ModFlag, loc: Location) -> bool {
        self.on[flag as usize].contains(loc)
    }
}
