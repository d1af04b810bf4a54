//! Ordered range sets.
//!
//! Half-open `[lo, hi)` ranges kept sorted and coalesced. The predictor
//! analysis uses these for edge character sets and for propagating hash
//! value ranges level by level, where a bitset over the full hash space
//! would be wasteful.

/// Ordered set of disjoint half-open `u32` ranges.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ByteRanges {
    ranges: Vec<(u32, u32)>,
}

impl ByteRanges {
    pub fn new() -> Self {
        ByteRanges { ranges: Vec::new() }
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Insert the inclusive range `lo..=hi`.
    pub fn insert(&mut self, lo: u32, hi: u32) {
        debug_assert!(lo <= hi);
        self.insert_half_open(lo, hi + 1);
    }

    /// Insert a single value.
    pub fn insert_one(&mut self, v: u32) {
        self.insert(v, v);
    }

    fn insert_half_open(&mut self, lo: u32, hi: u32) {
        // find first range whose end could touch lo
        let mut i = self
            .ranges
            .partition_point(|&(_, end)| end < lo);
        let mut lo = lo;
        let mut hi = hi;
        // merge every overlapping or adjacent range
        while i < self.ranges.len() && self.ranges[i].0 <= hi {
            lo = lo.min(self.ranges[i].0);
            hi = hi.max(self.ranges[i].1);
            self.ranges.remove(i);
        }
        self.ranges.insert(i, (lo, hi));
    }

    pub fn contains(&self, v: u32) -> bool {
        self.ranges
            .binary_search_by(|&(lo, hi)| {
                if v < lo {
                    std::cmp::Ordering::Greater
                } else if v >= hi {
                    std::cmp::Ordering::Less
                } else {
                    std::cmp::Ordering::Equal
                }
            })
            .is_ok()
    }

    /// Total number of values covered.
    pub fn count(&self) -> u64 {
        self.ranges.iter().map(|&(lo, hi)| (hi - lo) as u64).sum()
    }

    /// Number of disjoint ranges.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Iterate the half-open `(lo, hi)` ranges in order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        self.ranges.iter().copied()
    }

    /// Iterate every covered value in order.
    pub fn values(&self) -> impl Iterator<Item = u32> + '_ {
        self.ranges.iter().flat_map(|&(lo, hi)| lo..hi)
    }

    /// Union in place.
    pub fn extend(&mut self, other: &ByteRanges) {
        for (lo, hi) in other.iter() {
            self.insert_half_open(lo, hi);
        }
    }
}
