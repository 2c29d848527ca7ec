//! Centromere status classification against reference centromere contigs.
//!
//! Each contig's RepeatMasker track is flattened into same-type runs and
//! summarized as a per-type profile of run lengths. The query is assigned
//! to the reference with the smallest Bray-Curtis distance, then labelled
//! from that distance and from how much alpha satellite covers its edges.

use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info, warn};
use rayon::prelude::*;

use crate::censtats_structs::{FlattenedRun, GenomicInterval, RepeatRecord, Strand};
use crate::config::StatusConfig;
use crate::error::{CenstatsError, Result};
use crate::flatten::flatten_repeats;
use crate::interval_store::{overlap_size, IntervalStore};
use crate::merge::merge_intervals;
use crate::sorts::{chrom_name, group_by_contig, sort_by_coordinates};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CenStatus {
    Correct,
    Partial,
    Mismapped,
}

impl CenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CenStatus::Correct => "correct",
            CenStatus::Partial => "partial",
            CenStatus::Mismapped => "mismapped",
        }
    }
}

impl fmt::Display for CenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened summary of one contig's repeat track.
#[derive(Debug, Clone, PartialEq)]
pub struct ContigProfile {
    pub contig: String,
    /// `chrN` token of the contig name, if any.
    pub chrom: Option<String>,
    /// Total run length per repeat type.
    pub profile: BTreeMap<String, f64>,
    /// Length-weighted majority strand of the alpha-satellite records.
    pub alr_strand: Option<Strand>,
    /// Alpha-satellite runs longer than the HOR length threshold.
    pub hor_arrays: usize,
    /// Alpha-satellite coverage of the left and right contig edges.
    pub edge_alr_fraction: (f64, f64),
}

/// A reference centromere; only contigs named with a chromosome qualify.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceProfile {
    pub chrom: String,
    pub profile: ContigProfile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusCall {
    pub contig: String,
    /// Best reference chromosome, `rc-` prefixed when the query is reversed.
    pub final_chrom: String,
    pub status: CenStatus,
    pub reference: String,
    pub distance: f64,
    pub reversed: bool,
    pub hor_arrays: usize,
    pub reference_hor_arrays: usize,
}

/// Profile every reference contig that names a chromosome.
pub fn build_references(records: Vec<RepeatRecord>, config: &StatusConfig) -> Result<Vec<ReferenceProfile>> {
    config.check()?;
    let groups = group_by_contig(records, |r| r.contig.as_str());
    let mut references = groups
        .into_par_iter()
        .filter(|(contig, _)| chrom_name(contig).is_some())
        .map(|(contig, records)| {
            let profile = profile_contig(&contig, records, config)?;
            let chrom = profile.chrom.clone().unwrap_or_default();
            Ok(ReferenceProfile { chrom, profile })
        })
        .collect::<Result<Vec<_>>>()?;
    references.sort_by(|a, b| a.profile.contig.cmp(&b.profile.contig));
    info!("Built {} reference profile(s)", references.len());
    Ok(references)
}

/// Classify every query contig against `references`.
pub fn check_cens_status(
    records: Vec<RepeatRecord>,
    references: &[ReferenceProfile],
    config: &StatusConfig,
) -> Result<Vec<StatusCall>> {
    config.check()?;
    if references.is_empty() {
        return Err(CenstatsError::EmptyInput("reference track"));
    }

    let groups = group_by_contig(records, |r| r.contig.as_str());
    info!("Checking status of {} contig(s)", groups.len());

    let calls = groups
        .into_par_iter()
        .map(|(contig, records)| {
            let query = profile_contig(&contig, records, config)?;
            Ok(classify(&query, references, config))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(calls.into_iter().flatten().collect())
}

/// Flatten one contig and summarize it. Acrocentric contigs are trimmed to
/// their q-arm side before the profile is taken.
pub fn profile_contig(contig: &str, mut records: Vec<RepeatRecord>, config: &StatusConfig) -> Result<ContigProfile> {
    sort_by_coordinates(&mut records, |r| r.start, |r| r.end);
    let mut runs = flatten_repeats(&records, config.flatten)?;
    let chrom = chrom_name(contig).map(str::to_string);

    let hor_arrays = runs
        .iter()
        .filter(|run| run.rtype == config.alr_type && run.dst > config.hor_len_thr)
        .count();
    let edge_alr_fraction = edge_alr_fraction(&records, config)?;

    if chrom.as_ref().is_some_and(|c| config.acrocentrics.contains(c)) {
        if let Some(arm) = QArm::locate(&runs, &config.alr_type, config.arm_additional_bp) {
            runs.retain(|run| arm.keeps(run.start, run.end));
            records.retain(|r| arm.keeps(r.start, r.end));
        }
    }

    let mut profile: BTreeMap<String, f64> = BTreeMap::new();
    for run in &runs {
        *profile.entry(run.rtype.clone()).or_default() += run.dst as f64;
    }

    Ok(ContigProfile {
        contig: contig.to_string(),
        chrom,
        profile,
        alr_strand: majority_strand(records.iter().filter(|r| r.rtype == config.alr_type)),
        hor_arrays,
        edge_alr_fraction,
    })
}

fn classify(query: &ContigProfile, references: &[ReferenceProfile], config: &StatusConfig) -> Option<StatusCall> {
    if query.profile.is_empty() {
        warn!("{}: no repeats left to profile, skipping", query.contig);
        return None;
    }

    let restricted = config.restrict_13_21 && query.chrom.as_deref().is_some_and(is_13_or_21);
    let (best, distance) = references
        .iter()
        .filter(|r| !restricted || is_13_or_21(&r.chrom))
        .map(|r| (r, bray_curtis(&query.profile, &r.profile.profile)))
        .min_by(|(a, da), (b, db)| da.total_cmp(db).then_with(|| a.profile.contig.cmp(&b.profile.contig)))?;

    let (left, right) = query.edge_alr_fraction;
    let status = if query.chrom.as_ref().is_some_and(|c| *c != best.chrom) {
        CenStatus::Mismapped
    } else if left >= config.edge_perc_alr_thr || right >= config.edge_perc_alr_thr || distance > config.dst_perc_thr
    {
        CenStatus::Partial
    } else {
        CenStatus::Correct
    };

    let reversed = matches!(
        (query.alr_strand, best.profile.alr_strand),
        (Some(q), Some(r)) if q != r
    );
    let final_chrom = if reversed {
        format!("rc-{}", best.chrom)
    } else {
        best.chrom.clone()
    };
    debug!(
        "{}: {} vs {} (distance {distance:.4})",
        query.contig, status, best.profile.contig
    );

    Some(StatusCall {
        contig: query.contig.clone(),
        final_chrom,
        status,
        reference: best.profile.contig.clone(),
        distance,
        reversed,
        hor_arrays: query.hor_arrays,
        reference_hor_arrays: best.profile.hor_arrays,
    })
}

fn is_13_or_21(chrom: &str) -> bool {
    chrom == "chr13" || chrom == "chr21"
}

/// Bray-Curtis dissimilarity: 0 for identical profiles, 1 for disjoint ones.
pub fn bray_curtis(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    let mut diff = 0.0;
    let mut total = 0.0;
    for (rtype, &x) in a {
        let y = b.get(rtype).copied().unwrap_or(0.0);
        diff += (x - y).abs();
        total += x + y;
    }
    for (rtype, &y) in b {
        if !a.contains_key(rtype) {
            diff += y;
            total += y;
        }
    }
    if total == 0.0 {
        0.0
    } else {
        diff / total
    }
}

/// Length-weighted majority strand; ties go forward.
fn majority_strand<'a>(records: impl Iterator<Item = &'a RepeatRecord>) -> Option<Strand> {
    let mut forward = 0;
    let mut reverse = 0;
    let mut any = false;
    for r in records {
        any = true;
        match r.strand {
            Strand::Forward => forward += r.dst(),
            Strand::Reverse => reverse += r.dst(),
        }
    }
    match (any, reverse > forward) {
        (false, _) => None,
        (true, true) => Some(Strand::Reverse),
        (true, false) => Some(Strand::Forward),
    }
}

/// Fraction of each `edge_len` contig edge covered by alpha satellite.
fn edge_alr_fraction(records: &[RepeatRecord], config: &StatusConfig) -> Result<(f64, f64)> {
    let (Some(begin), Some(end)) = (
        records.iter().map(|r| r.start).min(),
        records.iter().map(|r| r.end).max(),
    ) else {
        return Ok((0.0, 0.0));
    };

    let alr: Vec<GenomicInterval<i64, ()>> = records
        .iter()
        .filter(|r| r.rtype == config.alr_type)
        .map(|r| GenomicInterval::new(r.start, r.end, ()))
        .collect();
    // Union of overlapping ALR calls so no base is counted twice.
    let covered: IntervalStore<i64, ()> = merge_intervals(&alr, 0, |_, _| true)?
        .into_iter()
        .map(|m| m.into_interval())
        .collect();

    let fraction = |start: i64, stop: i64| {
        let edge = GenomicInterval::new(start, stop, ());
        let bases: i64 = covered
            .overlap(start, stop)
            .into_iter()
            .map(|hit| overlap_size(hit, &edge))
            .sum();
        if stop > start {
            bases as f64 / (stop - start) as f64
        } else {
            0.0
        }
    };

    let left = fraction(begin, end.min(begin + config.edge_len));
    let right = fraction(begin.max(end - config.edge_len), end);
    Ok((left, right))
}

/// Side of an acrocentric contig holding the q-arm, relative to the
/// largest alpha-satellite run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QArm {
    /// Keep everything starting after this position.
    After(i64),
    /// Keep everything ending before this position.
    Before(i64),
}

impl QArm {
    fn locate(runs: &[FlattenedRun], alr_type: &str, additional_bp: i64) -> Option<QArm> {
        let span_start = runs.first()?.start;
        let span_end = runs.iter().map(|run| run.end).max()?;
        let mut largest: Option<&FlattenedRun> = None;
        for run in runs.iter().filter(|run| run.rtype == alr_type) {
            if largest.map_or(true, |l| run.dst > l.dst) {
                largest = Some(run);
            }
        }
        let alr = largest?;
        let midpoint = alr.start + (alr.end - alr.start) / 2;

        // The p-arm lies on the side of the contig the array is closer to.
        if midpoint - span_start < span_end - midpoint {
            Some(QArm::After(alr.start - additional_bp))
        } else {
            Some(QArm::Before(alr.end + additional_bp))
        }
    }

    fn keeps(&self, start: i64, end: i64) -> bool {
        match *self {
            QArm::After(pos) => start > pos,
            QArm::Before(pos) => end < pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(contig: &str, start: i64, end: i64, rtype: &str, strand: Strand) -> RepeatRecord {
        RepeatRecord {
            contig: contig.to_string(),
            start,
            end,
            strand,
            rtype: rtype.to_string(),
            rclass: "Satellite/centr".to_string(),
        }
    }

    /// A contig made of back-to-back blocks of the given types and lengths.
    fn track(contig: &str, blocks: &[(&str, i64)], strand: Strand) -> Vec<RepeatRecord> {
        let mut pos = 0;
        blocks
            .iter()
            .map(|&(rtype, len)| {
                let r = rec(contig, pos, pos + len, rtype, strand);
                pos += len;
                r
            })
            .collect()
    }

    fn small_edges() -> StatusConfig {
        StatusConfig {
            edge_len: 100,
            ..StatusConfig::default()
        }
    }

    fn reference_set(config: &StatusConfig) -> Vec<ReferenceProfile> {
        let mut records = track(
            "chm13_chr1:0-1000",
            &[("HSat2", 200), ("ALR/Alpha", 600), ("HSat3", 200)],
            Strand::Forward,
        );
        records.extend(track(
            "chm13_chr2:0-1000",
            &[("HSat1A", 500), ("ALR/Alpha", 300), ("L1", 200)],
            Strand::Forward,
        ));
        records.extend(track("unplaced_contig", &[("ALR/Alpha", 500)], Strand::Forward));
        build_references(records, config).unwrap()
    }

    #[test]
    fn bray_curtis_bounds() {
        let a: BTreeMap<String, f64> = [("A".to_string(), 10.0), ("B".to_string(), 5.0)].into();
        let b: BTreeMap<String, f64> = [("C".to_string(), 3.0)].into();
        assert_eq!(bray_curtis(&a, &a), 0.0);
        assert_eq!(bray_curtis(&a, &b), 1.0);
        let c: BTreeMap<String, f64> = [("A".to_string(), 10.0)].into();
        assert!((bray_curtis(&a, &c) - 5.0 / 25.0).abs() < 1e-12);
        assert_eq!(bray_curtis(&BTreeMap::new(), &BTreeMap::new()), 0.0);
    }

    #[test]
    fn references_require_chromosome_name() {
        let refs = reference_set(&small_edges());
        let chroms: Vec<_> = refs.iter().map(|r| r.chrom.as_str()).collect();
        assert_eq!(chroms, vec!["chr1", "chr2"]);
    }

    #[test]
    fn matching_contig_is_correct() {
        let config = small_edges();
        let refs = reference_set(&config);
        let query = track(
            "HG002_chr1_haplotype1-0000003",
            &[("HSat2", 210), ("ALR/Alpha", 590), ("HSat3", 200)],
            Strand::Forward,
        );
        let calls = check_cens_status(query, &refs, &config).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].status, CenStatus::Correct);
        assert_eq!(calls[0].final_chrom, "chr1");
        assert_eq!(calls[0].reference, "chm13_chr1:0-1000");
        assert!(calls[0].distance < 0.05);
    }

    #[test]
    fn wrong_chromosome_is_mismapped() {
        let config = small_edges();
        let refs = reference_set(&config);
        let query = track(
            "HG002_chr1_haplotype1-0000003",
            &[("HSat1A", 500), ("ALR/Alpha", 300), ("L1", 200)],
            Strand::Forward,
        );
        let calls = check_cens_status(query, &refs, &config).unwrap();
        assert_eq!(calls[0].status, CenStatus::Mismapped);
        assert_eq!(calls[0].final_chrom, "chr2");
    }

    #[test]
    fn alr_edge_makes_partial() {
        let config = small_edges();
        let refs = reference_set(&config);
        // Ends inside the array.
        let query = track(
            "HG002_chr1_haplotype1-0000003",
            &[("HSat2", 200), ("ALR/Alpha", 600)],
            Strand::Forward,
        );
        let calls = check_cens_status(query, &refs, &config).unwrap();
        assert_eq!(calls[0].final_chrom, "chr1");
        assert_eq!(calls[0].status, CenStatus::Partial);
    }

    #[test]
    fn opposite_alr_strand_is_reversed() {
        let config = small_edges();
        let refs = reference_set(&config);
        let query = track(
            "HG002_chr1_haplotype1-0000003",
            &[("HSat2", 200), ("ALR/Alpha", 600), ("HSat3", 200)],
            Strand::Reverse,
        );
        let calls = check_cens_status(query, &refs, &config).unwrap();
        assert!(calls[0].reversed);
        assert_eq!(calls[0].final_chrom, "rc-chr1");
    }

    #[test]
    fn restriction_limits_chr13_and_chr21() {
        let config = StatusConfig {
            restrict_13_21: true,
            acrocentrics: Default::default(),
            ..small_edges()
        };
        let mut records = track("ref_chr13", &[("HSat2", 400), ("ALR/Alpha", 600)], Strand::Forward);
        records.extend(track("ref_chr5", &[("HSat1A", 400), ("ALR/Alpha", 600)], Strand::Forward));
        let refs = build_references(records, &config).unwrap();

        let query = track("asm_chr21_h1", &[("HSat1A", 400), ("ALR/Alpha", 600)], Strand::Forward);
        let calls = check_cens_status(query.clone(), &refs, &config).unwrap();
        assert_eq!(calls[0].final_chrom, "chr13");

        let unrestricted = StatusConfig { restrict_13_21: false, ..config };
        let calls = check_cens_status(query, &refs, &unrestricted).unwrap();
        assert_eq!(calls[0].final_chrom, "chr5");
        assert_eq!(calls[0].status, CenStatus::Mismapped);
    }

    #[test]
    fn acrocentric_keeps_q_arm_side() {
        let config = StatusConfig {
            arm_additional_bp: 0,
            ..small_edges()
        };
        let records = track(
            "asm_chr13_h1",
            &[("HSat3", 100), ("ALR/Alpha", 600), ("SST1", 300), ("HSat1A", 2000)],
            Strand::Forward,
        );
        let profile = profile_contig("asm_chr13_h1", records, &config).unwrap();
        assert!(!profile.profile.contains_key("HSat3"));
        assert!(!profile.profile.contains_key("ALR/Alpha"));
        assert_eq!(profile.profile.get("HSat1A"), Some(&2000.0));
    }

    #[test]
    fn counts_hor_arrays_over_threshold() {
        let config = StatusConfig {
            hor_len_thr: 250,
            ..small_edges()
        };
        let records = track(
            "asm_chr1",
            &[
                ("ALR/Alpha", 300),
                ("HSat2", 100),
                ("HSat3", 100),
                ("ALR/Alpha", 200),
                ("L1", 10),
                ("ALR/Alpha", 400),
            ],
            Strand::Forward,
        );
        let profile = profile_contig("asm_chr1", records, &config).unwrap();
        // The 10 bp L1 is sandwiched and absorbed into one 610 bp run.
        assert_eq!(profile.hor_arrays, 2);
    }

    #[test]
    fn no_references_is_an_error() {
        let query = track("asm_chr1", &[("ALR/Alpha", 300)], Strand::Forward);
        let err = check_cens_status(query, &[], &StatusConfig::default()).unwrap_err();
        assert!(matches!(err, CenstatsError::EmptyInput(_)));
    }
}
