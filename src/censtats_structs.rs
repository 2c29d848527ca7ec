use std::fmt::Debug;
use std::hash::Hash;

use num_traits::{PrimInt, Signed};

/// Coordinate type accepted by the interval machinery.
pub trait PositionType:
    PrimInt + Signed + Hash + Copy + Debug + Default + radsort::Key + Send + Sync + 'static
{
}

impl<T> PositionType for T where
    T: PrimInt + Signed + Hash + Copy + Debug + Default + radsort::Key + Send + Sync + 'static
{
}

/// A half-open `[start, end)` range carrying a label.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenomicInterval<C, T> {
    pub start: C,
    pub end: C,
    pub label: T,
}

impl<C: PositionType, T> GenomicInterval<C, T> {
    pub fn new(start: C, end: C, label: T) -> Self {
        Self { start, end, label }
    }

    pub fn length(&self) -> C {
        self.end - self.start
    }

    #[inline]
    pub fn overlaps(&self, start: C, end: C) -> bool {
        self.start < end && start < self.end
    }
}

/// Output of the merge engine. `fold_count` is the number of source
/// intervals folded into this one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MergedInterval<C, T> {
    pub start: C,
    pub end: C,
    pub fold_count: u32,
    pub label: T,
}

impl<C: PositionType, T> MergedInterval<C, T> {
    pub fn singleton(interval: GenomicInterval<C, T>) -> Self {
        Self {
            start: interval.start,
            end: interval.end,
            fold_count: 1,
            label: interval.label,
        }
    }

    pub fn length(&self) -> C {
        self.end - self.start
    }

    pub fn into_interval(self) -> GenomicInterval<C, T> {
        GenomicInterval::new(self.start, self.end, self.label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    /// Accepts BED strands and the RepeatMasker complement marker `C`.
    pub fn parse(s: &str) -> Option<Strand> {
        match s.trim() {
            "+" => Some(Strand::Forward),
            "-" | "C" => Some(Strand::Reverse),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strand::Forward => "+",
            Strand::Reverse => "-",
        }
    }

    pub fn flip(self) -> Strand {
        match self {
            Strand::Forward => Strand::Reverse,
            Strand::Reverse => Strand::Forward,
        }
    }
}

/// One RepeatMasker annotation, coordinates already shifted to the
/// contig-absolute frame and `rtype` already collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatRecord {
    pub contig: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
    pub rtype: String,
    pub rclass: String,
}

impl RepeatRecord {
    pub fn dst(&self) -> i64 {
        self.end - self.start
    }
}

/// A maximal run of same-type repeats after denoising.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlattenedRun {
    pub start: i64,
    pub end: i64,
    pub rtype: String,
    pub dst: i64,
}

/// A HOR structural-variation row.
#[derive(Debug, Clone, PartialEq)]
pub struct HorRow {
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub name: String,
    pub score: f64,
    pub strand: Strand,
}

impl HorRow {
    /// Live HORs carry an `L` in their name, e.g. `S1C1/5/19H1L.6`.
    pub fn is_live(&self) -> bool {
        self.name.contains('L')
    }
}
