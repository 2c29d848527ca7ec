//! Static interval index over one contig.
//!
//! Intervals are kept in a flat `Vec` sorted by `(start, end)`. The sorted
//! array doubles as an implicit balanced binary tree: the node at index `i`
//! sits at level `k` = number of trailing one bits of `i`, and its children
//! are `i -/+ 2^(k-1)`. Each node stores the max end of its subtree, so an
//! overlap query visits O(log n + k) nodes.

use crate::censtats_structs::{GenomicInterval, PositionType};

/// Below this level a subtree is scanned linearly instead of descended.
const LINEAR_SCAN_LEVEL: u32 = 3;

#[derive(Debug, Clone)]
pub struct IntervalStore<C, T> {
    intervals: Vec<GenomicInterval<C, T>>,
    max_ends: Vec<C>,
    max_level: Option<u32>,
}

impl<C: PositionType, T> Default for IntervalStore<C, T> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
            max_ends: Vec::new(),
            max_level: None,
        }
    }
}

impl<C: PositionType, T> FromIterator<GenomicInterval<C, T>> for IntervalStore<C, T> {
    fn from_iter<I: IntoIterator<Item = GenomicInterval<C, T>>>(iter: I) -> Self {
        Self::build(iter.into_iter().collect())
    }
}

impl<C: PositionType, T> IntervalStore<C, T> {
    /// Sorts `intervals` by `(start, end)` and indexes them.
    pub fn build(intervals: Vec<GenomicInterval<C, T>>) -> Self {
        let mut store = Self {
            max_ends: vec![C::zero(); intervals.len()],
            intervals,
            max_level: None,
        };
        store.sort_and_index();
        store
    }

    fn sort_and_index(&mut self) {
        // radsort is stable: sorting by the minor key first leaves
        // equal-start intervals ordered by end.
        radsort::sort_by_key(&mut self.intervals, |iv| iv.end);
        radsort::sort_by_key(&mut self.intervals, |iv| iv.start);
        self.index();
    }

    fn index(&mut self) {
        let n = self.intervals.len();
        self.max_ends.truncate(n);
        if n == 0 {
            self.max_level = None;
            return;
        }

        // Leaves.
        let mut last_i = 0;
        let mut last = self.intervals[0].end;
        for i in (0..n).step_by(2) {
            last_i = i;
            self.max_ends[i] = self.intervals[i].end;
            last = self.max_ends[i];
        }

        // Internal nodes, one level at a time. `last` tracks the max end of
        // the rightmost subtree at the current level, standing in for right
        // children that fall past the end of the array.
        let mut k = 1;
        while (1usize << k) <= n {
            let x = 1usize << (k - 1);
            let step = x << 2;
            let mut i = (x << 1) - 1;
            while i < n {
                let left = self.max_ends[i - x];
                let right = if i + x < n { self.max_ends[i + x] } else { last };
                self.max_ends[i] = self.intervals[i].end.max(left).max(right);
                i += step;
            }
            last_i = if (last_i >> k) & 1 == 1 {
                last_i - x
            } else {
                last_i + x
            };
            if last_i < n && self.max_ends[last_i] > last {
                last = self.max_ends[last_i];
            }
            k += 1;
        }
        self.max_level = Some(k - 1);
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Intervals in ascending `(start, end)` order.
    pub fn iter(&self) -> impl Iterator<Item = &GenomicInterval<C, T>> {
        self.intervals.iter()
    }

    /// Smallest start in the store.
    pub fn begin(&self) -> Option<C> {
        self.intervals.first().map(|iv| iv.start)
    }

    /// Largest end in the store.
    pub fn end(&self) -> Option<C> {
        self.intervals.iter().map(|iv| iv.end).max()
    }

    /// All stored intervals intersecting `[start, end)`, in ascending
    /// `(start, end)` order.
    pub fn overlap(&self, start: C, end: C) -> Vec<&GenomicInterval<C, T>> {
        let mut hits = Vec::new();
        let Some(max_level) = self.max_level else {
            return hits;
        };
        if start >= end {
            return hits;
        }
        let n = self.intervals.len();

        // (node, level, left subtree already handled)
        let mut stack: Vec<(usize, u32, bool)> = Vec::with_capacity(64);
        stack.push(((1usize << max_level) - 1, max_level, false));

        while let Some((x, k, visited_left)) = stack.pop() {
            if k <= LINEAR_SCAN_LEVEL {
                let i0 = x >> k << k;
                let i1 = (i0 + (1usize << (k + 1)) - 1).min(n);
                for iv in self.intervals[i0.min(n)..i1].iter() {
                    if iv.start >= end {
                        break;
                    }
                    if start < iv.end {
                        hits.push(iv);
                    }
                }
            } else if !visited_left {
                stack.push((x, k, true));
                let y = x - (1usize << (k - 1));
                if y >= n || self.max_ends[y] > start {
                    stack.push((y, k - 1, false));
                }
            } else if x < n && self.intervals[x].start < end {
                if start < self.intervals[x].end {
                    hits.push(&self.intervals[x]);
                }
                stack.push((x + (1usize << (k - 1)), k - 1, false));
            }
        }

        hits
    }

    /// Trims every stored interval to `[left_bound, right_bound)`, dropping
    /// those left empty. Chop a clone when the original must stay intact.
    pub fn chop(&mut self, left_bound: C, right_bound: C) {
        self.intervals.retain_mut(|iv| {
            iv.start = iv.start.max(left_bound);
            iv.end = iv.end.min(right_bound);
            iv.start < iv.end
        });
        // Clipping can reorder intervals that share a clipped start.
        self.sort_and_index();
    }

    pub fn into_intervals(self) -> Vec<GenomicInterval<C, T>> {
        self.intervals
    }
}

impl<C: PositionType, T: Clone> IntervalStore<C, T> {
    /// A new store holding copies of the intervals intersecting `[start, end)`.
    pub fn subset(&self, start: C, end: C) -> Self {
        Self::build(self.overlap(start, end).into_iter().cloned().collect())
    }
}

/// Length of the intersection of two intervals, zero if disjoint.
pub fn overlap_size<C: PositionType, T, U>(
    a: &GenomicInterval<C, T>,
    b: &GenomicInterval<C, U>,
) -> C {
    let lo = a.start.max(b.start);
    let hi = a.end.min(b.end);
    if hi > lo {
        hi - lo
    } else {
        C::zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(start: i64, end: i64) -> GenomicInterval<i64, usize> {
        GenomicInterval::new(start, end, 0)
    }

    fn brute_force(ivs: &[GenomicInterval<i64, usize>], start: i64, end: i64) -> Vec<(i64, i64)> {
        let mut hits: Vec<(i64, i64)> = ivs
            .iter()
            .filter(|iv| iv.overlaps(start, end))
            .map(|iv| (iv.start, iv.end))
            .collect();
        hits.sort();
        hits
    }

    #[test]
    fn empty_store() {
        let store: IntervalStore<i64, usize> = IntervalStore::build(vec![]);
        assert!(store.is_empty());
        assert!(store.overlap(0, 100).is_empty());
        assert_eq!(store.begin(), None);
        assert_eq!(store.end(), None);
    }

    #[test]
    fn single_interval_half_open() {
        let store = IntervalStore::build(vec![iv(10, 20)]);
        assert_eq!(store.overlap(5, 15).len(), 1);
        assert_eq!(store.overlap(19, 25).len(), 1);
        assert!(store.overlap(0, 10).is_empty());
        assert!(store.overlap(20, 30).is_empty());
    }

    #[test]
    fn nested_and_disjoint() {
        let store = IntervalStore::build(vec![
            iv(50, 60),
            iv(0, 100),
            iv(10, 90),
            iv(20, 30),
            iv(200, 210),
        ]);
        let hits: Vec<_> = store.overlap(55, 56).iter().map(|iv| (iv.start, iv.end)).collect();
        assert_eq!(hits, vec![(0, 100), (10, 90), (50, 60)]);
        assert!(store.overlap(100, 200).is_empty());
        assert_eq!(store.overlap(205, 1000).len(), 1);
    }

    #[test]
    fn matches_brute_force_on_many_sizes() {
        for n in 0..70_i64 {
            let ivs: Vec<_> = (0..n)
                .map(|i| iv((i * 37) % 101, (i * 37) % 101 + 1 + (i * 13) % 29))
                .collect();
            let store = IntervalStore::build(ivs.clone());
            for q in (0..140).step_by(7) {
                let got: Vec<_> = store.overlap(q, q + 11).iter().map(|iv| (iv.start, iv.end)).collect();
                assert_eq!(got, brute_force(&ivs, q, q + 11), "n={n} q={q}");
            }
        }
    }

    #[test]
    fn overlap_size_partial_and_disjoint() {
        assert_eq!(overlap_size(&iv(0, 10), &iv(5, 20)), 5);
        assert_eq!(overlap_size(&iv(0, 10), &iv(10, 20)), 0);
        assert_eq!(overlap_size(&iv(0, 100), &iv(40, 60)), 20);
    }

    #[test]
    fn chop_clips_to_bounds() {
        let mut store = IntervalStore::build(vec![iv(0, 50), iv(40, 120), iv(150, 160), iv(90, 95)]);
        let original = store.clone();
        store.chop(45, 100);
        let got: Vec<_> = store.iter().map(|iv| (iv.start, iv.end)).collect();
        assert_eq!(got, vec![(45, 50), (45, 100), (90, 95)]);
        assert_eq!(store.overlap(96, 99).len(), 1);
        assert_eq!(original.len(), 4);
    }

    #[test]
    fn chop_keeps_start_end_order() {
        let mut store = IntervalStore::build(vec![iv(0, 200), iv(10, 50)]);
        store.chop(45, 100);
        let got: Vec<_> = store.iter().map(|iv| (iv.start, iv.end)).collect();
        assert_eq!(got, vec![(45, 50), (45, 100)]);
        let hits: Vec<_> = store.overlap(0, 1000).iter().map(|iv| (iv.start, iv.end)).collect();
        assert_eq!(hits, vec![(45, 50), (45, 100)]);
    }
}
