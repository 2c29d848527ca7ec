use std::path::Path;
use std::sync::Arc;

use log::debug;
use polars::prelude::*;

use crate::censtats_structs::{HorRow, RepeatRecord, Strand};
use crate::config::RepeatTypeCollapser;
use crate::error::{CenstatsError, Result};
use crate::repeatmasker::{
    build_record, RawRepeatRow, RM_CLASS_COL, RM_CONTIG_COL, RM_END_COL, RM_START_COL, RM_STRAND_COL,
    RM_TYPE_COL,
};

/// A centromere length call, as written by the `length` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthRow {
    pub ctg: String,
    pub start: i64,
    pub end: i64,
    pub length: i64,
}

/// Reads the given columns of a headerless TSV, every field as a string.
/// `None` for an empty file.
fn read_tsv_columns(path: &Path, columns: &[usize]) -> Result<Option<DataFrame>> {
    if std::fs::metadata(path)?.len() == 0 {
        return Ok(None);
    }
    let parse_options = CsvParseOptions::default()
        .with_separator(b'\t')
        .with_truncate_ragged_lines(true);
    let df = CsvReadOptions::default()
        .with_has_header(false)
        .with_infer_schema_length(Some(0))
        .with_projection(Some(Arc::new(columns.to_vec())))
        .with_rechunk(true)
        .with_parse_options(parse_options)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    debug!("Read {} rows from {}", df.height(), path.display());
    Ok(Some(df))
}

fn str_column(df: &DataFrame, pos: usize) -> Result<&StringChunked> {
    let column = df.get_columns().get(pos).ok_or_else(|| CenstatsError::MalformedRecord {
        row: 0,
        reason: format!("missing column {}", pos + 1),
    })?;
    Ok(column.str()?)
}

fn parse_int(field: Option<&str>) -> Option<i64> {
    field?.trim().parse().ok()
}

fn require<'a>(row: usize, field: Option<&'a str>, name: &str) -> Result<&'a str> {
    field.map(str::trim).ok_or_else(|| CenstatsError::MalformedRecord {
        row,
        reason: format!("missing {name}"),
    })
}

fn coordinates(row: usize, start: Option<&str>, end: Option<&str>) -> Result<(i64, i64)> {
    let malformed = |reason: String| CenstatsError::MalformedRecord { row, reason };
    let start = parse_int(start).ok_or_else(|| malformed(format!("non-numeric start {:?}", start)))?;
    let end = parse_int(end).ok_or_else(|| malformed(format!("non-numeric end {:?}", end)))?;
    if end <= start {
        return Err(malformed(format!("end {end} <= start {start}")));
    }
    Ok((start, end))
}

/// RepeatMasker output converted to TSV, no header. Only contig, start,
/// end, strand, repeat and class/family are kept.
pub fn read_repeatmasker(path: &Path, collapser: &RepeatTypeCollapser) -> Result<Vec<RepeatRecord>> {
    let columns = [
        RM_CONTIG_COL,
        RM_START_COL,
        RM_END_COL,
        RM_STRAND_COL,
        RM_TYPE_COL,
        RM_CLASS_COL,
    ];
    let Some(df) = read_tsv_columns(path, &columns)? else {
        return Ok(Vec::new());
    };
    let contigs = str_column(&df, 0)?;
    let starts = str_column(&df, 1)?;
    let ends = str_column(&df, 2)?;
    let strands = str_column(&df, 3)?;
    let rtypes = str_column(&df, 4)?;
    let rclasses = str_column(&df, 5)?;

    let mut records = Vec::with_capacity(df.height());
    for (row, (((((contig, start), end), strand), rtype), rclass)) in contigs
        .into_iter()
        .zip(starts)
        .zip(ends)
        .zip(strands)
        .zip(rtypes)
        .zip(rclasses)
        .enumerate()
    {
        let raw = RawRepeatRow {
            contig: require(row, contig, "contig")?,
            start: parse_int(start),
            end: parse_int(end),
            strand: strand.map(str::trim).unwrap_or("+"),
            rtype: require(row, rtype, "repeat type")?,
            rclass: require(row, rclass, "repeat class")?,
        };
        records.push(build_record(row, raw, collapser)?);
    }
    Ok(records)
}

/// HOR structural-variation rows: `chrom, start, end, name, score, strand`.
pub fn read_hor_rows(path: &Path) -> Result<Vec<HorRow>> {
    let Some(df) = read_tsv_columns(path, &[0, 1, 2, 3, 4, 5])? else {
        return Ok(Vec::new());
    };
    let chroms = str_column(&df, 0)?;
    let starts = str_column(&df, 1)?;
    let ends = str_column(&df, 2)?;
    let names = str_column(&df, 3)?;
    let scores = str_column(&df, 4)?;
    let strands = str_column(&df, 5)?;

    let mut rows = Vec::with_capacity(df.height());
    for (row, (((((chrom, start), end), name), score), strand)) in chroms
        .into_iter()
        .zip(starts)
        .zip(ends)
        .zip(names)
        .zip(scores)
        .zip(strands)
        .enumerate()
    {
        let (start, end) = coordinates(row, start, end)?;
        let strand_field = require(row, strand, "strand")?;
        let strand = Strand::parse(strand_field).ok_or_else(|| CenstatsError::MalformedRecord {
            row,
            reason: format!("unknown strand {strand_field:?}"),
        })?;
        let score = score.and_then(|s| s.trim().parse::<f64>().ok()).unwrap_or(0.0);
        rows.push(HorRow {
            chrom: require(row, chrom, "chrom")?.to_string(),
            start,
            end,
            name: require(row, name, "name")?.to_string(),
            score,
            strand,
        });
    }
    Ok(rows)
}

/// Length calls: `ctg, start, end, length`.
pub fn read_length_rows(path: &Path) -> Result<Vec<LengthRow>> {
    let Some(df) = read_tsv_columns(path, &[0, 1, 2, 3])? else {
        return Ok(Vec::new());
    };
    let ctgs = str_column(&df, 0)?;
    let starts = str_column(&df, 1)?;
    let ends = str_column(&df, 2)?;
    let lengths = str_column(&df, 3)?;

    let mut rows = Vec::with_capacity(df.height());
    for (row, (((ctg, start), end), length)) in ctgs.into_iter().zip(starts).zip(ends).zip(lengths).enumerate() {
        let (start, end) = coordinates(row, start, end)?;
        let length = parse_int(length).ok_or_else(|| CenstatsError::MalformedRecord {
            row,
            reason: format!("non-numeric length {:?}", length),
        })?;
        rows.push(LengthRow {
            ctg: require(row, ctg, "ctg")?.to_string(),
            start,
            end,
            length,
        });
    }
    Ok(rows)
}
