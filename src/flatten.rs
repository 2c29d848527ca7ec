use crate::censtats_structs::{FlattenedRun, RepeatRecord};
use crate::error::{CenstatsError, Result};

/// How single noisy records are relabeled before same-type runs are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlattenPolicy {
    /// A record sandwiched between two records of one type takes that type.
    Neighbor,
    /// A record takes the type of the longest record among itself and the
    /// `window_size - 1` records after it.
    WindowMajority { window_size: usize },
}

/// Denoise a contig's repeat track (sorted by start) into same-type runs.
pub fn flatten_repeats(records: &[RepeatRecord], policy: FlattenPolicy) -> Result<Vec<FlattenedRun>> {
    if records.is_empty() {
        return Err(CenstatsError::EmptyInput("cannot flatten an empty repeat track"));
    }
    let labels = match policy {
        FlattenPolicy::Neighbor => neighbor_labels(records),
        FlattenPolicy::WindowMajority { window_size } => window_majority_labels(records, window_size)?,
    };
    Ok(group_runs(records, &labels))
}

fn neighbor_labels(records: &[RepeatRecord]) -> Vec<&str> {
    let mut labels: Vec<&str> = records.iter().map(|r| r.rtype.as_str()).collect();
    // Reads neighbors from `records`, so earlier relabels never cascade.
    for (i, window) in records.windows(3).enumerate() {
        if window[0].rtype == window[2].rtype {
            labels[i + 1] = window[0].rtype.as_str();
        }
    }
    labels
}

fn window_majority_labels(records: &[RepeatRecord], window_size: usize) -> Result<Vec<&str>> {
    if window_size == 0 {
        return Err(CenstatsError::InvalidParameter(
            "flatten window size must be at least 1".to_string(),
        ));
    }
    let n = records.len();
    let labels = (0..n)
        .map(|i| {
            let window = &records[i..i.saturating_add(window_size).min(n)];
            let mut best = &window[0];
            for r in &window[1..] {
                // Strict comparison keeps the first of equally long records.
                if r.dst() > best.dst() {
                    best = r;
                }
            }
            best.rtype.as_str()
        })
        .collect();
    Ok(labels)
}

fn group_runs(records: &[RepeatRecord], labels: &[&str]) -> Vec<FlattenedRun> {
    let mut runs: Vec<FlattenedRun> = Vec::new();
    let mut prev_label: Option<&str> = None;

    for (record, &label) in records.iter().zip(labels) {
        let continues_run = prev_label == Some(label);
        match runs.last_mut() {
            Some(run) if continues_run => {
                run.start = run.start.min(record.start);
                run.end = run.end.max(record.end);
                run.dst = run.end - run.start;
            }
            _ => runs.push(FlattenedRun {
                start: record.start,
                end: record.end,
                rtype: label.to_string(),
                dst: record.end - record.start,
            }),
        }
        prev_label = Some(label);
    }

    radsort::sort_by_key(&mut runs, |r| r.start);
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::censtats_structs::Strand;

    fn rec(start: i64, end: i64, rtype: &str) -> RepeatRecord {
        RepeatRecord {
            contig: "chr1".to_string(),
            start,
            end,
            strand: Strand::Forward,
            rtype: rtype.to_string(),
            rclass: "Satellite/centr".to_string(),
        }
    }

    fn summary(runs: &[FlattenedRun]) -> Vec<(i64, i64, &str)> {
        runs.iter().map(|r| (r.start, r.end, r.rtype.as_str())).collect()
    }

    #[test]
    fn empty_track_is_an_error() {
        let err = flatten_repeats(&[], FlattenPolicy::Neighbor).unwrap_err();
        assert!(matches!(err, CenstatsError::EmptyInput(_)));
    }

    #[test]
    fn single_type_yields_one_run() {
        let recs = vec![rec(0, 10, "ALR/Alpha"), rec(5, 30, "ALR/Alpha"), rec(30, 40, "ALR/Alpha")];
        for policy in [FlattenPolicy::Neighbor, FlattenPolicy::WindowMajority { window_size: 2 }] {
            let runs = flatten_repeats(&recs, policy).unwrap();
            assert_eq!(summary(&runs), vec![(0, 40, "ALR/Alpha")]);
            assert_eq!(runs[0].dst, 40);
        }
    }

    #[test]
    fn neighbor_rule_absorbs_sandwiched_record() {
        let recs = vec![
            rec(0, 100, "ALR/Alpha"),
            rec(100, 110, "L1"),
            rec(110, 200, "ALR/Alpha"),
            rec(200, 300, "HSat2"),
        ];
        let runs = flatten_repeats(&recs, FlattenPolicy::Neighbor).unwrap();
        assert_eq!(summary(&runs), vec![(0, 200, "ALR/Alpha"), (200, 300, "HSat2")]);
    }

    #[test]
    fn neighbor_rule_leaves_boundaries() {
        let recs = vec![rec(0, 10, "L1"), rec(10, 20, "ALR/Alpha"), rec(20, 30, "HSat2")];
        let runs = flatten_repeats(&recs, FlattenPolicy::Neighbor).unwrap();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].rtype, "L1");
        assert_eq!(runs[2].rtype, "HSat2");
    }

    #[test]
    fn neighbor_rule_does_not_cascade() {
        // A B A B: both middles are sandwiched and read the original neighbors.
        let recs = vec![rec(0, 10, "A"), rec(10, 20, "B"), rec(20, 30, "A"), rec(30, 40, "B")];
        let runs = flatten_repeats(&recs, FlattenPolicy::Neighbor).unwrap();
        assert_eq!(summary(&runs), vec![(0, 20, "A"), (20, 40, "B")]);
    }

    #[test]
    fn window_of_one_is_noop() {
        let recs = vec![rec(0, 10, "A"), rec(10, 20, "B"), rec(20, 30, "A")];
        let runs = flatten_repeats(&recs, FlattenPolicy::WindowMajority { window_size: 1 }).unwrap();
        assert_eq!(summary(&runs), vec![(0, 10, "A"), (10, 20, "B"), (20, 30, "A")]);
    }

    #[test]
    fn window_majority_takes_longest_first_on_tie() {
        let recs = vec![
            rec(0, 10, "A"),
            rec(10, 110, "B"),
            rec(110, 120, "A"),
            rec(120, 220, "C"),
        ];
        let runs = flatten_repeats(&recs, FlattenPolicy::WindowMajority { window_size: 2 }).unwrap();
        // 0 -> B, 1 -> B (B vs A), 2 -> C, 3 -> C (window shrinks at the end).
        assert_eq!(summary(&runs), vec![(0, 110, "B"), (110, 220, "C")]);

        let tied = vec![rec(0, 50, "A"), rec(50, 100, "B")];
        let runs = flatten_repeats(&tied, FlattenPolicy::WindowMajority { window_size: 2 }).unwrap();
        assert_eq!(summary(&runs), vec![(0, 50, "A"), (50, 100, "B")]);
    }

    #[test]
    fn window_larger_than_track() {
        let recs = vec![rec(0, 10, "A"), rec(10, 40, "B")];
        let runs = flatten_repeats(&recs, FlattenPolicy::WindowMajority { window_size: 10 }).unwrap();
        assert_eq!(summary(&runs), vec![(0, 40, "B")]);
    }

    #[test]
    fn unbounded_window_uses_what_remains() {
        let recs = vec![rec(0, 10, "A"), rec(10, 40, "B")];
        let policy = FlattenPolicy::WindowMajority { window_size: usize::MAX };
        let runs = flatten_repeats(&recs, policy).unwrap();
        assert_eq!(summary(&runs), vec![(0, 40, "B")]);
    }

    #[test]
    fn zero_window_rejected() {
        let recs = vec![rec(0, 10, "A")];
        let err = flatten_repeats(&recs, FlattenPolicy::WindowMajority { window_size: 0 }).unwrap_err();
        assert!(matches!(err, CenstatsError::InvalidParameter(_)));
    }
}
