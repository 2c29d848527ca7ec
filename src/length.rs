//! HOR array length estimation from structural-variation rows.
//!
//! Per contig: drop short and dead HOR units, keep blocks of contiguous
//! units, then merge blocks into arrays with the gap-content voter vetoing
//! merges across non-satellite sequence.

use log::{debug, info};
use rayon::prelude::*;
use rustc_hash::FxHashMap;

use crate::censtats_structs::{GenomicInterval, HorRow, RepeatRecord, Strand};
use crate::config::LengthConfig;
use crate::error::Result;
use crate::gap_vote::GapContentVoter;
use crate::interval_store::IntervalStore;
use crate::merge::merge_intervals;
use crate::repeatmasker::contig_base_name;
use crate::sorts::{chrom_sort_key, group_by_contig, sort_by_coordinates};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayLength {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub length: i64,
    /// Number of HOR units folded into the array.
    pub hor_units: u32,
    pub strand: Option<Strand>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArrayLengths {
    pub arrays: Vec<ArrayLength>,
    /// Filled only when strand-split output was requested.
    pub stranded: Vec<ArrayLength>,
}

/// Estimate HOR array lengths for every contig in `rows`.
///
/// `repeats`, when given, supplies the RepeatMasker track used to veto
/// merges. Contigs are processed in parallel; output order does not depend
/// on scheduling.
pub fn hor_array_lengths(
    rows: Vec<HorRow>,
    repeats: Option<Vec<RepeatRecord>>,
    config: &LengthConfig,
    by_strand: bool,
) -> Result<ArrayLengths> {
    config.check()?;

    let repeats_by_contig: FxHashMap<String, Vec<RepeatRecord>> = repeats
        .map(|records| {
            group_by_contig(records, |r| contig_base_name(&r.contig))
                .into_iter()
                .collect()
        })
        .unwrap_or_default();
    let has_repeats = !repeats_by_contig.is_empty();

    let groups = group_by_contig(rows, |r| r.chrom.as_str());
    info!("Estimating HOR array lengths for {} contig(s)", groups.len());

    let per_contig = groups
        .into_par_iter()
        .map(|(chrom, rows)| {
            let repeats = if has_repeats {
                Some(
                    repeats_by_contig
                        .get(contig_base_name(&chrom))
                        .map(Vec::as_slice)
                        .unwrap_or(&[]),
                )
            } else {
                None
            };
            contig_array_lengths(&chrom, rows, repeats, config, by_strand)
        })
        .collect::<Result<Vec<_>>>()?;

    let mut out = ArrayLengths::default();
    for lengths in per_contig {
        out.arrays.extend(lengths.arrays);
        out.stranded.extend(lengths.stranded);
    }
    sort_for_output(&mut out.arrays);
    sort_for_output(&mut out.stranded);
    info!("Found {} HOR array(s)", out.arrays.len());
    Ok(out)
}

/// Chromosome number, then name, then start.
pub fn sort_for_output(arrays: &mut [ArrayLength]) {
    arrays.sort_by(|a, b| {
        chrom_sort_key(&a.chrom)
            .cmp(&chrom_sort_key(&b.chrom))
            .then_with(|| a.chrom.cmp(&b.chrom))
            .then_with(|| a.start.cmp(&b.start))
    });
}

/// Lengths for one contig. `repeats` is `Some` when a RepeatMasker track was
/// supplied at all, even if it has no records for this contig.
pub fn contig_array_lengths(
    chrom: &str,
    mut rows: Vec<HorRow>,
    repeats: Option<&[RepeatRecord]>,
    config: &LengthConfig,
    by_strand: bool,
) -> Result<ArrayLengths> {
    sort_by_coordinates(&mut rows, |r| r.start, |r| r.end);
    let total = rows.len();

    rows.retain(|r| monomer_count(r, config.monomer_len) >= config.min_hor_mons && r.is_live());
    let blocks = contiguous_blocks(rows, config.bp_merge_units, config.min_grp_hor_units);
    debug!(
        "{chrom}: {} of {total} HOR unit(s) kept in contiguous blocks",
        blocks.len()
    );

    let tree: Option<IntervalStore<i64, String>> = repeats.map(|records| {
        records
            .iter()
            .map(|r| GenomicInterval::new(r.start, r.end, r.rclass.clone()))
            .collect()
    });
    let voter = GapContentVoter::new(tree.as_ref(), &config.merge_rclasses);

    let mut out = ArrayLengths {
        arrays: merge_arrays(chrom, &blocks, None, &voter, config)?,
        stranded: Vec::new(),
    };

    if by_strand {
        let mut run_start = 0;
        for i in 1..=blocks.len() {
            if i == blocks.len() || blocks[i].strand != blocks[run_start].strand {
                let strand = blocks[run_start].strand;
                out.stranded
                    .extend(merge_arrays(chrom, &blocks[run_start..i], Some(strand), &voter, config)?);
                run_start = i;
            }
        }
    }

    Ok(out)
}

fn monomer_count(row: &HorRow, monomer_len: i64) -> i64 {
    ((row.end - row.start) as f64 / monomer_len as f64).round() as i64
}

/// Keeps runs of rows whose gap to the previous row is at most `max_gap`
/// and that hold at least `min_units` rows.
fn contiguous_blocks(rows: Vec<HorRow>, max_gap: i64, min_units: usize) -> Vec<HorRow> {
    let mut kept = Vec::with_capacity(rows.len());
    let mut block: Vec<HorRow> = Vec::new();

    for row in rows {
        let breaks = block.last().is_some_and(|prev| row.start - prev.end > max_gap);
        if breaks {
            if block.len() >= min_units {
                kept.append(&mut block);
            } else {
                block.clear();
            }
        }
        block.push(row);
    }
    if block.len() >= min_units {
        kept.append(&mut block);
    }

    kept
}

fn merge_arrays(
    chrom: &str,
    rows: &[HorRow],
    strand: Option<Strand>,
    voter: &GapContentVoter<i64>,
    config: &LengthConfig,
) -> Result<Vec<ArrayLength>> {
    let intervals: Vec<GenomicInterval<i64, ()>> = rows
        .iter()
        .map(|r| GenomicInterval::new(r.start, r.end, ()))
        .collect();
    let merged = merge_intervals(&intervals, config.bp_merge_blks, |current, next| {
        voter.may_merge(current, next)
    })?;

    Ok(merged
        .into_iter()
        .filter(|m| m.fold_count >= config.min_arr_hor_units)
        .map(|m| ArrayLength {
            chrom: chrom.to_string(),
            start: m.start,
            end: m.end,
            length: m.length(),
            hor_units: m.fold_count,
            strand,
        })
        .collect())
}
