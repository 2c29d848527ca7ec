use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised while loading, merging, or classifying repeat tracks.
#[derive(Debug, Error)]
pub enum CenstatsError {
    /// Intervals handed to the merge engine were not sorted by start.
    #[error("intervals not sorted by start: position {position} starts at {start} after {previous_start}")]
    InputOrdering {
        position: usize,
        previous_start: i64,
        start: i64,
    },

    /// An operation that aggregates over a track was given no records.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// A tabular row with missing/non-numeric coordinates or `end <= start`.
    #[error("malformed record at row {row}: {reason}")]
    MalformedRecord { row: usize, reason: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("table error: {0}")]
    Polars(#[from] PolarsError),
}

pub type Result<T> = std::result::Result<T, CenstatsError>;
