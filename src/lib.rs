pub mod censtats_structs;
pub mod config;
pub mod entropy;
pub mod error;
pub mod flatten;
pub mod gap_vote;
pub mod interval_store;
pub mod length;
pub mod merge;
pub mod nonredundant;
pub mod reader;
pub mod repeatmasker;
pub mod sorts;
pub mod status;
pub mod writer;

pub use censtats_structs::{GenomicInterval, MergedInterval, PositionType};
pub use error::{CenstatsError, Result};
pub use interval_store::IntervalStore;
pub use merge::{merge_intervals, merge_with_policy};
