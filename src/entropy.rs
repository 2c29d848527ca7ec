//! Windowed Shannon diversity of repeat composition along each contig.

use std::collections::BTreeMap;

use log::{debug, info};
use rayon::prelude::*;

use crate::censtats_structs::{GenomicInterval, RepeatRecord};
use crate::config::EntropyConfig;
use crate::error::{CenstatsError, Result};
use crate::interval_store::IntervalStore;
use crate::sorts::group_by_contig;

#[derive(Debug, Clone, PartialEq)]
pub struct EntropyWindow {
    pub contig: String,
    pub start: i64,
    pub end: i64,
    pub shannon_index: f64,
}

/// Normalized Shannon index `H / ln(k)` of per-type covered lengths, in
/// `[0, 1]`. Zero when fewer than two types are present.
pub fn shannon_index<I>(lengths: I) -> f64
where
    I: IntoIterator<Item = i64>,
{
    let lengths: Vec<f64> = lengths.into_iter().filter(|&l| l > 0).map(|l| l as f64).collect();
    if lengths.len() <= 1 {
        return 0.0;
    }
    let total: f64 = lengths.iter().sum();
    let h: f64 = lengths
        .iter()
        .map(|&l| {
            let p = l / total;
            -p * p.ln()
        })
        .sum();
    h / (lengths.len() as f64).ln()
}

/// Shannon index of every non-empty `window_size` window on every contig.
pub fn shannon_entropy_windows(records: Vec<RepeatRecord>, config: &EntropyConfig) -> Result<Vec<EntropyWindow>> {
    if config.window_size <= 0 {
        return Err(CenstatsError::InvalidParameter(format!(
            "entropy window size must be positive, got {}",
            config.window_size
        )));
    }

    let groups = group_by_contig(records, |r| r.contig.as_str());
    info!("Computing repeat entropy for {} contig(s)", groups.len());

    let windows: Vec<Vec<EntropyWindow>> = groups
        .into_par_iter()
        .map(|(contig, records)| contig_windows(&contig, records, config))
        .collect();
    Ok(windows.into_iter().flatten().collect())
}

fn contig_windows(contig: &str, records: Vec<RepeatRecord>, config: &EntropyConfig) -> Vec<EntropyWindow> {
    let store: IntervalStore<i64, String> = records
        .into_iter()
        .filter(|r| !config.filter_repeats.contains(&r.rtype))
        .map(|r| GenomicInterval::new(r.start, r.end, r.rtype))
        .collect();
    let (Some(begin), Some(end)) = (store.begin(), store.end()) else {
        debug!("{contig}: nothing left after filtering");
        return Vec::new();
    };

    let mut windows = Vec::new();
    let mut window_start = begin;
    while window_start < end {
        let window_end = window_start.saturating_add(config.window_size).min(end);
        let mut window = store.subset(window_start, window_end);
        window.chop(window_start, window_end);

        if let (Some(start), Some(stop)) = (window.begin(), window.end()) {
            let mut covered: BTreeMap<&str, i64> = BTreeMap::new();
            for iv in window.iter() {
                *covered.entry(iv.label.as_str()).or_default() += iv.length();
            }
            windows.push(EntropyWindow {
                contig: contig.to_string(),
                start,
                end: stop,
                shannon_index: shannon_index(covered.into_values()),
            });
        }
        window_start = window_end;
    }

    debug!("{contig}: {} window(s)", windows.len());
    windows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::censtats_structs::Strand;

    fn rec(contig: &str, start: i64, end: i64, rtype: &str) -> RepeatRecord {
        RepeatRecord {
            contig: contig.to_string(),
            start,
            end,
            strand: Strand::Forward,
            rtype: rtype.to_string(),
            rclass: "Satellite".to_string(),
        }
    }

    fn config(window_size: i64) -> EntropyConfig {
        EntropyConfig {
            window_size,
            ..EntropyConfig::default()
        }
    }

    #[test]
    fn index_is_normalized() {
        assert_eq!(shannon_index(Vec::<i64>::new()), 0.0);
        assert_eq!(shannon_index([500]), 0.0);
        assert!((shannon_index([50, 50]) - 1.0).abs() < 1e-12);
        assert!((shannon_index([10, 10, 10, 10]) - 1.0).abs() < 1e-12);
        let skewed = shannon_index([90, 10]);
        assert!(skewed > 0.0 && skewed < 1.0);
    }

    #[test]
    fn uniform_window_has_zero_entropy() {
        let records = vec![rec("c", 0, 100, "ALR/Alpha"), rec("c", 100, 200, "ALR/Alpha")];
        let windows = shannon_entropy_windows(records, &config(1000)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!((windows[0].start, windows[0].end), (0, 200));
        assert_eq!(windows[0].shannon_index, 0.0);
    }

    #[test]
    fn records_are_clipped_to_windows() {
        // A and B split the first window evenly; the second is all B.
        let records = vec![rec("c", 0, 50, "A"), rec("c", 50, 200, "B")];
        let windows = shannon_entropy_windows(records, &config(100)).unwrap();
        assert_eq!(windows.len(), 2);
        assert!((windows[0].shannon_index - 1.0).abs() < 1e-12);
        assert_eq!((windows[1].start, windows[1].end), (100, 200));
        assert_eq!(windows[1].shannon_index, 0.0);
    }

    #[test]
    fn empty_windows_are_skipped() {
        let records = vec![rec("c", 0, 10, "A"), rec("c", 250, 260, "B")];
        let windows = shannon_entropy_windows(records, &config(100)).unwrap();
        let spans: Vec<_> = windows.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(spans, vec![(0, 10), (250, 260)]);
    }

    #[test]
    fn filtered_types_are_ignored() {
        let records = vec![
            rec("c", 0, 50, "ALR/Alpha"),
            rec("c", 50, 100, "Simple_repeat"),
            rec("d", 0, 50, "HSat1A"),
        ];
        let windows = shannon_entropy_windows(records, &config(100)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].contig, "c");
        assert_eq!(windows[0].shannon_index, 0.0);
    }

    #[test]
    fn huge_window_covers_whole_contig() {
        let records = vec![rec("c", 10, 50, "A"), rec("c", 50, 90, "B")];
        let windows = shannon_entropy_windows(records, &config(i64::MAX)).unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!((windows[0].start, windows[0].end), (10, 90));
        assert!((windows[0].shannon_index - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_positive_window() {
        let err = shannon_entropy_windows(Vec::new(), &config(0)).unwrap_err();
        assert!(matches!(err, CenstatsError::InvalidParameter(_)));
    }
}
