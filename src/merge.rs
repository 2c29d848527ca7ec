use num_traits::ToPrimitive;

use crate::censtats_structs::{GenomicInterval, MergedInterval, PositionType};
use crate::error::{CenstatsError, Result};

/// Single pass fold over intervals sorted by start.
///
/// `current` starts as the first interval. Each following interval is folded
/// into it when the gap `next.start - current.end` is at most `max_gap`
/// (overlaps give a negative gap) and `may_merge` agrees; otherwise `current`
/// is emitted and restarted from `next`.
///
/// Input that is not sorted by start is rejected before anything is emitted.
pub fn merge_with_policy<C, T, P, F>(
    intervals: &[GenomicInterval<C, T>],
    max_gap: C,
    mut may_merge: P,
    mut fold: F,
) -> Result<Vec<MergedInterval<C, T>>>
where
    C: PositionType,
    T: Clone,
    P: FnMut(&MergedInterval<C, T>, &GenomicInterval<C, T>) -> bool,
    F: FnMut(MergedInterval<C, T>, &GenomicInterval<C, T>) -> MergedInterval<C, T>,
{
    if max_gap < C::zero() {
        return Err(CenstatsError::InvalidParameter(format!(
            "merge distance must be non-negative, got {:?}",
            max_gap
        )));
    }
    check_sorted(intervals)?;

    let mut out = Vec::with_capacity(intervals.len());
    let Some((first, rest)) = intervals.split_first() else {
        return Ok(out);
    };

    let mut current = MergedInterval::singleton(first.clone());
    for next in rest {
        let gap = next.start - current.end;
        if gap <= max_gap && may_merge(&current, next) {
            current = fold(current, next);
        } else {
            out.push(std::mem::replace(
                &mut current,
                MergedInterval::singleton(next.clone()),
            ));
        }
    }
    out.push(current);

    Ok(out)
}

/// Merge with the standard fold: extend the end, bump the count, keep the
/// first interval's label.
pub fn merge_intervals<C, T, P>(
    intervals: &[GenomicInterval<C, T>],
    max_gap: C,
    may_merge: P,
) -> Result<Vec<MergedInterval<C, T>>>
where
    C: PositionType,
    T: Clone,
    P: FnMut(&MergedInterval<C, T>, &GenomicInterval<C, T>) -> bool,
{
    merge_with_policy(intervals, max_gap, may_merge, extend_fold)
}

pub fn extend_fold<C: PositionType, T>(
    current: MergedInterval<C, T>,
    next: &GenomicInterval<C, T>,
) -> MergedInterval<C, T> {
    MergedInterval {
        start: current.start,
        end: current.end.max(next.end),
        fold_count: current.fold_count + 1,
        label: current.label,
    }
}

fn check_sorted<C: PositionType, T>(intervals: &[GenomicInterval<C, T>]) -> Result<()> {
    for (position, pair) in intervals.windows(2).enumerate() {
        if pair[1].start < pair[0].start {
            return Err(CenstatsError::InputOrdering {
                position: position + 1,
                previous_start: pair[0].start.to_i64().unwrap_or(i64::MAX),
                start: pair[1].start.to_i64().unwrap_or(i64::MAX),
            });
        }
    }
    Ok(())
}
