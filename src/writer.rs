use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::debug;
use polars::prelude::*;

use crate::entropy::EntropyWindow;
use crate::error::Result;
use crate::length::ArrayLength;
use crate::reader::LengthRow;
use crate::status::StatusCall;

/// Headerless TSV to `out`, or stdout when `out` is `None`.
pub fn write_tsv(df: &mut DataFrame, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            debug!("Writing {} rows to {}", df.height(), path.display());
            write_frame(BufWriter::new(File::create(path)?), df)
        }
        None => write_frame(io::stdout().lock(), df),
    }
}

fn write_frame<W: Write>(mut sink: W, df: &mut DataFrame) -> Result<()> {
    CsvWriter::new(&mut sink)
        .include_header(false)
        .with_separator(b'\t')
        .finish(df)?;
    sink.flush()?;
    Ok(())
}

/// `chrom, start, end, length, hor_units`, plus `strand` when `stranded`.
pub fn length_frame(arrays: &[ArrayLength], stranded: bool) -> Result<DataFrame> {
    let mut df = df!(
        "chrom" => arrays.iter().map(|a| a.chrom.as_str()).collect::<Vec<_>>(),
        "start" => arrays.iter().map(|a| a.start).collect::<Vec<_>>(),
        "end" => arrays.iter().map(|a| a.end).collect::<Vec<_>>(),
        "length" => arrays.iter().map(|a| a.length).collect::<Vec<_>>(),
        "hor_units" => arrays.iter().map(|a| a.hor_units).collect::<Vec<_>>(),
    )?;
    if stranded {
        let strands: Vec<&str> = arrays
            .iter()
            .map(|a| a.strand.map_or(".", |s| s.as_str()))
            .collect();
        df.with_column(Column::new("strand".into(), strands))?;
    }
    Ok(df)
}

/// `contig, final_chrom, status, reference, distance`.
pub fn status_frame(calls: &[StatusCall]) -> Result<DataFrame> {
    Ok(df!(
        "contig" => calls.iter().map(|c| c.contig.as_str()).collect::<Vec<_>>(),
        "final_chrom" => calls.iter().map(|c| c.final_chrom.as_str()).collect::<Vec<_>>(),
        "status" => calls.iter().map(|c| c.status.as_str()).collect::<Vec<_>>(),
        "reference" => calls.iter().map(|c| c.reference.as_str()).collect::<Vec<_>>(),
        "distance" => calls.iter().map(|c| c.distance).collect::<Vec<_>>(),
    )?)
}

/// `contig, start, end, shannon_index`.
pub fn entropy_frame(windows: &[EntropyWindow]) -> Result<DataFrame> {
    Ok(df!(
        "contig" => windows.iter().map(|w| w.contig.as_str()).collect::<Vec<_>>(),
        "start" => windows.iter().map(|w| w.start).collect::<Vec<_>>(),
        "end" => windows.iter().map(|w| w.end).collect::<Vec<_>>(),
        "shannon_index" => windows.iter().map(|w| w.shannon_index).collect::<Vec<_>>(),
    )?)
}

/// `ctg, start, end, length`, the same layout the length rows were read in.
pub fn length_rows_frame<'a, I>(rows: I) -> Result<DataFrame>
where
    I: IntoIterator<Item = &'a LengthRow>,
{
    let rows: Vec<&LengthRow> = rows.into_iter().collect();
    Ok(df!(
        "ctg" => rows.iter().map(|r| r.ctg.as_str()).collect::<Vec<_>>(),
        "start" => rows.iter().map(|r| r.start).collect::<Vec<_>>(),
        "end" => rows.iter().map(|r| r.end).collect::<Vec<_>>(),
        "length" => rows.iter().map(|r| r.length).collect::<Vec<_>>(),
    )?)
}

/// Paired calls side by side: left columns, then right columns.
pub fn paired_frame(pairs: &[(LengthRow, LengthRow)]) -> Result<DataFrame> {
    let left = length_rows_frame(pairs.iter().map(|(l, _)| l))?;
    let mut right = length_rows_frame(pairs.iter().map(|(_, r)| r))?;
    right.set_column_names(["ctg_right", "start_right", "end_right", "length_right"])?;
    Ok(left.hstack(right.get_columns())?)
}
