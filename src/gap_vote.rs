use rustc_hash::FxHashMap;

use crate::censtats_structs::{GenomicInterval, MergedInterval, PositionType};
use crate::config::AllowList;
use crate::interval_store::{overlap_size, IntervalStore};

/// Merge veto based on what fills the gap between two intervals.
///
/// The repeat type covering the most bases of the gap must be on the allow
/// list for the merge to go ahead. Without an annotation track every merge
/// is allowed.
#[derive(Debug, Clone, Copy)]
pub struct GapContentVoter<'a, C> {
    tree: Option<&'a IntervalStore<C, String>>,
    allowed: &'a AllowList,
}

impl<'a, C: PositionType> GapContentVoter<'a, C> {
    pub fn new(tree: Option<&'a IntervalStore<C, String>>, allowed: &'a AllowList) -> Self {
        Self { tree, allowed }
    }

    pub fn may_merge<T, U>(&self, current: &MergedInterval<C, T>, next: &GenomicInterval<C, U>) -> bool {
        self.gap_allows(current.end, next.start)
    }

    pub fn gap_allows(&self, gap_start: C, gap_end: C) -> bool {
        let Some(tree) = self.tree else {
            return true;
        };
        // Gaps of at most 1 bp are not worth a lookup.
        if gap_end - gap_start <= C::one() {
            return true;
        }
        match majority_type(tree, gap_start, gap_end) {
            Some(rtype) => self.allowed.contains(rtype),
            None => true,
        }
    }
}

/// Type with the largest summed overlap with `[gap_start, gap_end)`. Ties go
/// to the type seen first in the tree's `(start, end)` order.
pub fn majority_type<C: PositionType>(
    tree: &IntervalStore<C, String>,
    gap_start: C,
    gap_end: C,
) -> Option<&str> {
    let gap = GenomicInterval::new(gap_start, gap_end, ());
    let mut totals: FxHashMap<&str, C> = FxHashMap::default();
    let mut seen_order: Vec<&str> = Vec::new();

    for hit in tree.overlap(gap_start, gap_end) {
        let rtype = hit.label.as_str();
        let total = totals.entry(rtype).or_insert_with(|| {
            seen_order.push(rtype);
            C::zero()
        });
        *total = *total + overlap_size(hit, &gap);
    }

    let mut best: Option<(&str, C)> = None;
    for rtype in seen_order {
        let total = totals[rtype];
        match best {
            Some((_, best_total)) if total <= best_total => {}
            _ => best = Some((rtype, total)),
        }
    }
    best.map(|(rtype, _)| rtype)
}
