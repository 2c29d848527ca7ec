//! Tunable parameters for every driver. Defaults follow the values the
//! pipeline has been run with on human T2T assemblies; nothing downstream
//! reads these from global state.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{CenstatsError, Result};
use crate::flatten::FlattenPolicy;

/// Repeat classes that the merge engine may bridge.
pub const DEFAULT_MERGE_RCLASSES: [&str; 4] =
    ["Satellite/centr", "Satellite", "Simple_repeat", "Low_complexity"];

pub const ACROCENTRIC_CHROMOSOMES: [&str; 5] = ["chr13", "chr14", "chr15", "chr21", "chr22"];

/// Average alpha-satellite monomer length.
pub const MONOMER_LEN: i64 = 171;

pub const ALR_TYPE: &str = "ALR/Alpha";

/// Set of repeat types considered safe to merge across.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllowList(FxHashSet<String>);

impl AllowList {
    pub fn new<I, S>(types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(types.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, rtype: &str) -> bool {
        self.0.contains(rtype)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for AllowList {
    fn default() -> Self {
        Self::new(DEFAULT_MERGE_RCLASSES)
    }
}

/// Load-time normalization of RepeatMasker repeat names.
///
/// Applied in order: exact renames, substring removals (longest first),
/// DNA-transposon variants to `DNA`, then prefix collapsing.
#[derive(Debug, Clone)]
pub struct RepeatTypeCollapser {
    renames: FxHashMap<String, String>,
    strip: Vec<String>,
    dna_variants: Vec<String>,
    collapse_prefixes: Vec<String>,
}

impl RepeatTypeCollapser {
    pub fn new(
        renames: impl IntoIterator<Item = (String, String)>,
        strip: impl IntoIterator<Item = String>,
        dna_variants: impl IntoIterator<Item = String>,
        collapse_prefixes: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut strip: Vec<String> = strip.into_iter().collect();
        // "/hAT" must not eat the head of "/hAT-Charlie".
        strip.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        let mut dna_variants: Vec<String> = dna_variants.into_iter().collect();
        dna_variants.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        Self {
            renames: renames.into_iter().collect(),
            strip,
            dna_variants,
            collapse_prefixes: collapse_prefixes.into_iter().collect(),
        }
    }

    /// Leaves every type untouched.
    pub fn identity() -> Self {
        Self::new(
            Vec::<(String, String)>::new(),
            Vec::<String>::new(),
            Vec::<String>::new(),
            Vec::<String>::new(),
        )
    }

    pub fn collapse(&self, rtype: &str) -> String {
        if let Some(renamed) = self.renames.get(rtype) {
            return renamed.clone();
        }
        let mut collapsed = rtype.to_string();
        for pat in &self.strip {
            if collapsed.contains(pat.as_str()) {
                collapsed = collapsed.replace(pat.as_str(), "");
            }
        }
        for pat in &self.dna_variants {
            if collapsed.contains(pat.as_str()) {
                collapsed = collapsed.replace(pat.as_str(), "DNA");
            }
        }
        for prefix in &self.collapse_prefixes {
            if collapsed.len() > prefix.len() && collapsed.starts_with(prefix.as_str()) {
                collapsed = prefix.clone();
                break;
            }
        }
        collapsed
    }
}

impl Default for RepeatTypeCollapser {
    fn default() -> Self {
        let renames = [
            ("SAR", "HSat1A"),
            ("HSAT", "HSat1B"),
            ("HSATI", "HSat1B"),
            ("HSATII", "HSat2"),
            ("(CATTC)n", "HSat2"),
            ("(GAATG)n", "HSat2"),
            ("GSATX", "GSAT"),
        ];
        let strip = [
            "/ERVK", "/ERVL", "/ERV1", "/CR1", "/L1", "/L2", "/RTE-X", "/RTE-BovB", "/Gypsy",
            "-MaLR", "/Alu", "/Deu", "/MIR", "?", "/hAT", "/hAT-Blackjack", "/hAT-Charlie",
            "/hAT-Tip100", "/MULE-MuDR", "/PiggyBac", "/TcMar", "/TcMar-Mariner",
            "/TcMar-Tigger", "/Dong-R4", "/tRNA",
        ];
        let dna_variants = [
            "DNA-Tc2", "DNA-Blackjack", "DNA-Charlie", "DNA-Tigger", "DNA-Tip100",
        ];
        Self::new(
            renames
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string())),
            strip.into_iter().map(String::from),
            dna_variants.into_iter().map(String::from),
            ["LTR".to_string()],
        )
    }
}

#[derive(Debug, Clone)]
pub struct LengthConfig {
    /// Max gap between HOR units grouped into one contiguous block.
    pub bp_merge_units: i64,
    /// Max gap bridged when merging blocks into arrays.
    pub bp_merge_blks: i64,
    pub min_hor_mons: i64,
    pub min_grp_hor_units: usize,
    pub min_arr_hor_units: u32,
    pub monomer_len: i64,
    pub merge_rclasses: AllowList,
}

impl Default for LengthConfig {
    fn default() -> Self {
        Self {
            bp_merge_units: 256,
            bp_merge_blks: 7000,
            min_hor_mons: 2,
            min_grp_hor_units: 2,
            min_arr_hor_units: 10,
            monomer_len: MONOMER_LEN,
            merge_rclasses: AllowList::default(),
        }
    }
}

impl LengthConfig {
    pub fn check(&self) -> Result<()> {
        if self.bp_merge_units < 0 || self.bp_merge_blks < 0 {
            return Err(CenstatsError::InvalidParameter(
                "merge distances must be non-negative".to_string(),
            ));
        }
        if self.monomer_len <= 0 {
            return Err(CenstatsError::InvalidParameter(format!(
                "monomer length must be positive, got {}",
                self.monomer_len
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct StatusConfig {
    pub flatten: FlattenPolicy,
    /// Max Bray-Curtis distance to the best reference for a `Correct` call.
    pub dst_perc_thr: f64,
    pub edge_len: i64,
    pub edge_perc_alr_thr: f64,
    pub hor_len_thr: i64,
    /// Extra bases kept past the largest ALR run when trimming acrocentric arms.
    pub arm_additional_bp: i64,
    pub acrocentrics: FxHashSet<String>,
    pub alr_type: String,
    pub restrict_13_21: bool,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            flatten: FlattenPolicy::Neighbor,
            dst_perc_thr: 0.3,
            edge_len: 100_000,
            edge_perc_alr_thr: 0.7,
            hor_len_thr: 200_000,
            arm_additional_bp: 500_000,
            acrocentrics: ACROCENTRIC_CHROMOSOMES.iter().map(|c| c.to_string()).collect(),
            alr_type: ALR_TYPE.to_string(),
            restrict_13_21: false,
        }
    }
}

impl StatusConfig {
    pub fn check(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.dst_perc_thr) || !(0.0..=1.0).contains(&self.edge_perc_alr_thr) {
            return Err(CenstatsError::InvalidParameter(
                "status thresholds must lie in [0, 1]".to_string(),
            ));
        }
        if let FlattenPolicy::WindowMajority { window_size: 0 } = self.flatten {
            return Err(CenstatsError::InvalidParameter(
                "flatten window size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct EntropyConfig {
    pub window_size: i64,
    /// Repeat types left out of the composition.
    pub filter_repeats: FxHashSet<String>,
}

impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            window_size: 5000,
            filter_repeats: ["HSat1A", "Simple_repeat"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NonredundantConfig {
    pub bp_diff: i64,
}

impl Default for NonredundantConfig {
    fn default() -> Self {
        Self { bp_diff: 1000 }
    }
}
