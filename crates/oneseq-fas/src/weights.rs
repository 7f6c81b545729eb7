//! Feature weighting for FAS scoring.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How much each feature name counts towards the architecture score.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum WeightMode {
    /// Every feature name weighs the same.
    #[default]
    Uniform,
    /// Rarity weighting from the reference taxon's per-feature instance
    /// counts: `w_f = 1 / ln(e + count_f)`. Rare features weigh more.
    ReferenceCounts(BTreeMap<String, u64>),
}

impl WeightMode {
    /// Raw (unnormalized) weight of a feature name.
    pub fn weight(&self, name: &str) -> f64 {
        match self {
            WeightMode::Uniform => 1.0,
            WeightMode::ReferenceCounts(counts) => {
                let count = counts.get(name).copied().unwrap_or(0) as f64;
                1.0 / (std::f64::consts::E + count).ln()
            }
        }
    }
}
