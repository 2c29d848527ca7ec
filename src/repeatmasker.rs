//! RepeatMasker record construction: coordinate frame and type collapsing.

use crate::censtats_structs::{RepeatRecord, Strand};
use crate::config::RepeatTypeCollapser;
use crate::error::{CenstatsError, Result};

/// Column indices kept from a 15-column RepeatMasker table.
pub const RM_CONTIG_COL: usize = 4;
pub const RM_START_COL: usize = 5;
pub const RM_END_COL: usize = 6;
pub const RM_STRAND_COL: usize = 8;
pub const RM_TYPE_COL: usize = 9;
pub const RM_CLASS_COL: usize = 10;

/// Offset encoded in a `name:start-end` contig suffix, or zero.
pub fn contig_offset(contig: &str) -> i64 {
    contig
        .split_once(':')
        .and_then(|(_, range)| range.split_once('-'))
        .and_then(|(start, _)| start.parse().ok())
        .unwrap_or(0)
}

/// Contig name without its `:start-end` suffix.
pub fn contig_base_name(contig: &str) -> &str {
    contig.split_once(':').map_or(contig, |(name, _)| name)
}

/// Raw fields of one RepeatMasker row as read from the table.
#[derive(Debug, Clone, Copy)]
pub struct RawRepeatRow<'a> {
    pub contig: &'a str,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub strand: &'a str,
    pub rtype: &'a str,
    pub rclass: &'a str,
}

/// Validate one row, shift it into contig-absolute coordinates, and collapse
/// its repeat type.
pub fn build_record(row_idx: usize, raw: RawRepeatRow, collapser: &RepeatTypeCollapser) -> Result<RepeatRecord> {
    let malformed = |reason: String| CenstatsError::MalformedRecord { row: row_idx, reason };

    let start = raw.start.ok_or_else(|| malformed("missing or non-numeric start".to_string()))?;
    let end = raw.end.ok_or_else(|| malformed("missing or non-numeric end".to_string()))?;
    if end <= start {
        return Err(malformed(format!("end {end} <= start {start}")));
    }
    let strand = Strand::parse(raw.strand)
        .ok_or_else(|| malformed(format!("unknown strand {:?}", raw.strand)))?;
    let offset = contig_offset(raw.contig);

    Ok(RepeatRecord {
        contig: raw.contig.to_string(),
        start: start + offset,
        end: end + offset,
        strand,
        rtype: collapser.collapse(raw.rtype),
        rclass: raw.rclass.to_string(),
    })
}
