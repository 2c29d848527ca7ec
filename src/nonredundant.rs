//! Reconcile centromere length calls from two assemblies of the same samples.
//!
//! Calls are keyed by sample and chromosome. Within a key, left and right
//! calls whose lengths differ by less than `bp_diff` are paired, closest
//! first, each call used at most once.

use std::collections::BTreeMap;

use log::{info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::NonredundantConfig;
use crate::error::{CenstatsError, Result};
use crate::reader::LengthRow;

/// Sample and chromosome parsed from a `sample_chr_contig` name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CenKey {
    pub sample: String,
    pub chrom: String,
}

impl CenKey {
    /// `HG01573_rc-chr1_haplotype1-0000024:121168122-126852171` gives
    /// `(HG01573, chr1)`.
    pub fn parse(ctg: &str) -> Option<CenKey> {
        let mut fields = ctg.splitn(3, '_');
        let sample = fields.next()?;
        let chrom = fields.next()?;
        fields.next()?;
        let chrom = chrom.strip_prefix("rc-").unwrap_or(chrom);
        if sample.is_empty() || chrom.is_empty() {
            return None;
        }
        Some(CenKey {
            sample: sample.to_string(),
            chrom: chrom.to_string(),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub both: Vec<(LengthRow, LengthRow)>,
    pub left_only: Vec<LengthRow>,
    pub right_only: Vec<LengthRow>,
    /// Calls sharing sample, chromosome and length with another call on the
    /// same side.
    pub left_dupes: Vec<LengthRow>,
    pub right_dupes: Vec<LengthRow>,
}

pub fn nonredundant_cens(
    left: Vec<LengthRow>,
    right: Vec<LengthRow>,
    config: &NonredundantConfig,
) -> Result<Reconciled> {
    if config.bp_diff < 0 {
        return Err(CenstatsError::InvalidParameter(format!(
            "bp_diff must be non-negative, got {}",
            config.bp_diff
        )));
    }
    let left_keys = keys(&left)?;
    let right_keys = keys(&right)?;

    let mut groups: BTreeMap<&CenKey, (Vec<usize>, Vec<usize>)> = BTreeMap::new();
    for (i, key) in left_keys.iter().enumerate() {
        groups.entry(key).or_default().0.push(i);
    }
    for (j, key) in right_keys.iter().enumerate() {
        groups.entry(key).or_default().1.push(j);
    }

    let mut left_match: Vec<Option<usize>> = vec![None; left.len()];
    let mut right_used = vec![false; right.len()];
    for (lefts, rights) in groups.values() {
        for (i, j) in closest_pairs(&left, lefts, &right, rights, config.bp_diff) {
            left_match[i] = Some(j);
            right_used[j] = true;
        }
    }

    let mut out = Reconciled {
        left_dupes: duplicates(&left, &left_keys),
        right_dupes: duplicates(&right, &right_keys),
        ..Reconciled::default()
    };
    for (i, row) in left.iter().enumerate() {
        match left_match[i] {
            Some(j) => out.both.push((row.clone(), right[j].clone())),
            None => out.left_only.push(row.clone()),
        }
    }
    out.right_only = right
        .iter()
        .zip(&right_used)
        .filter(|(_, used)| !**used)
        .map(|(row, _)| row.clone())
        .collect();

    if !out.left_dupes.is_empty() || !out.right_dupes.is_empty() {
        warn!(
            "Potential duplicate calls: {} left, {} right",
            out.left_dupes.len(),
            out.right_dupes.len()
        );
    }
    info!(
        "{} paired, {} left only, {} right only",
        out.both.len(),
        out.left_only.len(),
        out.right_only.len()
    );
    Ok(out)
}

fn keys(rows: &[LengthRow]) -> Result<Vec<CenKey>> {
    rows.iter()
        .enumerate()
        .map(|(row, r)| {
            CenKey::parse(&r.ctg).ok_or_else(|| CenstatsError::MalformedRecord {
                row,
                reason: format!("contig {:?} is not sample_chr_contig", r.ctg),
            })
        })
        .collect()
}

/// Greedy minimum-difference assignment. Candidates are taken in
/// `(diff, left index, right index)` order.
fn closest_pairs(
    left: &[LengthRow],
    lefts: &[usize],
    right: &[LengthRow],
    rights: &[usize],
    bp_diff: i64,
) -> Vec<(usize, usize)> {
    let mut candidates: Vec<(i64, usize, usize)> = Vec::new();
    for &i in lefts {
        for &j in rights {
            let diff = (left[i].length - right[j].length).abs();
            if diff < bp_diff {
                candidates.push((diff, i, j));
            }
        }
    }
    candidates.sort_unstable();

    let mut left_taken: FxHashSet<usize> = FxHashSet::default();
    let mut right_taken: FxHashSet<usize> = FxHashSet::default();
    let mut pairs = Vec::new();
    for (_, i, j) in candidates {
        if left_taken.contains(&i) || right_taken.contains(&j) {
            continue;
        }
        left_taken.insert(i);
        right_taken.insert(j);
        pairs.push((i, j));
    }
    pairs
}

fn duplicates(rows: &[LengthRow], keys: &[CenKey]) -> Vec<LengthRow> {
    let mut counts: FxHashMap<(&CenKey, i64), usize> = FxHashMap::default();
    for (row, key) in rows.iter().zip(keys) {
        *counts.entry((key, row.length)).or_default() += 1;
    }
    let mut dupes: Vec<LengthRow> = rows
        .iter()
        .zip(keys)
        .filter(|(row, key)| counts[&(*key, row.length)] > 1)
        .map(|(row, _)| row.clone())
        .collect();
    dupes.sort_by(|a, b| a.length.cmp(&b.length).then_with(|| a.ctg.cmp(&b.ctg)));
    dupes
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(ctg: &str, length: i64) -> LengthRow {
        LengthRow {
            ctg: ctg.to_string(),
            start: 0,
            end: length,
            length,
        }
    }

    #[test]
    fn parses_keys() {
        let key = CenKey::parse("HG01573_rc-chr1_haplotype1-0000024:121168122-126852171").unwrap();
        assert_eq!(key.sample, "HG01573");
        assert_eq!(key.chrom, "chr1");
        assert_eq!(CenKey::parse("HG01573_chr1"), None);
    }

    #[test]
    fn pairs_closest_lengths() {
        let left = vec![row("S1_chr1_a", 3_000_000), row("S1_chr1_b", 2_000_000)];
        let right = vec![row("S1_rc-chr1_x", 2_000_400), row("S1_chr1_y", 3_000_100)];
        let out = nonredundant_cens(left, right, &NonredundantConfig::default()).unwrap();
        let pairs: Vec<_> = out.both.iter().map(|(l, r)| (l.ctg.as_str(), r.ctg.as_str())).collect();
        assert_eq!(pairs, vec![("S1_chr1_a", "S1_chr1_y"), ("S1_chr1_b", "S1_rc-chr1_x")]);
        assert!(out.left_only.is_empty());
        assert!(out.right_only.is_empty());
    }

    #[test]
    fn each_call_used_once() {
        // Both left calls are closest to the same right call.
        let left = vec![row("S1_chr2_a", 1000), row("S1_chr2_b", 1100)];
        let right = vec![row("S1_chr2_x", 1050)];
        let out = nonredundant_cens(left, right, &NonredundantConfig::default()).unwrap();
        assert_eq!(out.both.len(), 1);
        // Equal differences: the lower left index wins.
        assert_eq!(out.both[0].0.ctg, "S1_chr2_a");
        assert_eq!(out.left_only.len(), 1);
        assert_eq!(out.left_only[0].ctg, "S1_chr2_b");
    }

    #[test]
    fn distant_and_unshared_calls_stay_unpaired() {
        let left = vec![row("S1_chr3_a", 10_000), row("S2_chr3_a", 5000)];
        let right = vec![row("S1_chr3_x", 12_000), row("S1_chr4_x", 5000)];
        let out = nonredundant_cens(left, right, &NonredundantConfig::default()).unwrap();
        assert!(out.both.is_empty());
        assert_eq!(out.left_only.len(), 2);
        assert_eq!(out.right_only.len(), 2);
    }

    #[test]
    fn flags_duplicates() {
        let left = vec![row("S1_chr5_a", 7000), row("S1_rc-chr5_b", 7000), row("S1_chr5_c", 9000)];
        let out = nonredundant_cens(left, Vec::new(), &NonredundantConfig::default()).unwrap();
        let dupes: Vec<_> = out.left_dupes.iter().map(|r| r.ctg.as_str()).collect();
        assert_eq!(dupes, vec!["S1_chr5_a", "S1_rc-chr5_b"]);
        assert!(out.right_dupes.is_empty());
    }

    #[test]
    fn malformed_contig_is_an_error() {
        let err = nonredundant_cens(vec![row("nounderscores", 10)], Vec::new(), &NonredundantConfig::default())
            .unwrap_err();
        assert!(matches!(err, CenstatsError::MalformedRecord { row: 0, .. }));
    }
}
