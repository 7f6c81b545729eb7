//! Feature architecture similarity scoring.
//!
//! For a query architecture Q and target T, the directional score FAS(Q→T)
//! compares multiplicity and placement of every feature name on Q's greedy
//! path, weighted by the configured weight mode and normalized to [0, 1].
//! `score_pair` evaluates both directions (seed→ortholog and back) and
//! collects the per-instance rows the domains tables are written from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use oneseq_annotation::Architecture;

use crate::linearize::greedy_path;
use crate::weights::WeightMode;

/// Mixing factor between multiplicity (1 − λ) and positional (λ) scores.
pub const DEFAULT_LAMBDA: f64 = 0.3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FasConfig {
    pub lambda: f64,
    pub weights: WeightMode,
}

impl Default for FasConfig {
    fn default() -> Self {
        Self { lambda: DEFAULT_LAMBDA, weights: WeightMode::Uniform }
    }
}

/// One feature instance of either protein, as reported in the domains table
/// for one scoring direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainRow {
    pub protein_id: String,
    pub seq_len: usize,
    pub feature: String,
    pub start: usize,
    pub end: usize,
    /// Normalized weight of the feature name in this direction's query path;
    /// 0 for names off the query path.
    pub weight: f64,
    /// Whether this instance lies on its protein's greedy path.
    pub on_path: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectionReport {
    pub score: f64,
    pub rows: Vec<DomainRow>,
}

/// Forward is seed→ortholog, reverse is ortholog→seed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FasScores {
    pub forward: DirectionReport,
    pub reverse: DirectionReport,
}

pub struct FasScorer {
    config: FasConfig,
}

impl FasScorer {
    pub fn new(config: FasConfig) -> Self {
        Self { config }
    }

    pub fn score_pair(&self, seed: &Architecture, ortholog: &Architecture) -> FasScores {
        FasScores {
            forward: self.score_direction(seed, ortholog),
            reverse: self.score_direction(ortholog, seed),
        }
    }

    /// FAS(Q→T) plus the instance rows of both proteins.
    pub fn score_direction(&self, query: &Architecture, target: &Architecture) -> DirectionReport {
        let q_path = greedy_path(query, &self.config.weights);
        let t_path = greedy_path(target, &self.config.weights);

        // Instances per feature name, restricted to the paths.
        let q_by_name = instances_by_name(query, &q_path);
        let t_by_name = instances_by_name(target, &t_path);

        let score = if q_by_name.is_empty() {
            // Edge case: a featureless query matches a featureless target.
            if t_by_name.is_empty() {
                1.0
            } else {
                0.0
            }
        } else {
            let mut weighted_sum = 0.0;
            let mut weight_total = 0.0;
            for (name, q_instances) in &q_by_name {
                let w = self.config.weights.weight(name);
                let s = match t_by_name.get(name) {
                    Some(t_instances) => {
                        let ms = multiplicity_score(q_instances.len(), t_instances.len());
                        let ps = positional_score(
                            q_instances,
                            t_instances,
                            query.length,
                            target.length,
                        );
                        (1.0 - self.config.lambda) * ms + self.config.lambda * ps
                    }
                    None => 0.0,
                };
                trace!(name, score = s, weight = w, "feature name scored");
                weighted_sum += w * s;
                weight_total += w;
            }
            weighted_sum / weight_total
        };

        // Normalized weights over the query path for the output rows.
        let weight_total: f64 = q_by_name
            .keys()
            .map(|name| self.config.weights.weight(name))
            .sum();
        let row_weight = |name: &str| -> f64 {
            if weight_total > 0.0 && q_by_name.contains_key(name) {
                self.config.weights.weight(name) / weight_total
            } else {
                0.0
            }
        };

        let mut rows = Vec::new();
        for (arch, path) in [(query, &q_path), (target, &t_path)] {
            for (i, f) in arch.features.iter().enumerate() {
                rows.push(DomainRow {
                    protein_id: arch.protein_id.clone(),
                    seq_len: arch.length,
                    feature: f.name.clone(),
                    start: f.start,
                    end: f.end,
                    weight: row_weight(&f.name),
                    on_path: path.contains(&i),
                });
            }
        }

        DirectionReport { score, rows }
    }
}

type Instances = Vec<(usize, usize)>; // (start, end) in path order

fn instances_by_name(arch: &Architecture, path: &[usize]) -> BTreeMap<String, Instances> {
    let mut map: BTreeMap<String, Instances> = BTreeMap::new();
    for &i in path {
        let f = &arch.features[i];
        map.entry(f.name.clone()).or_default().push((f.start, f.end));
    }
    map
}

fn multiplicity_score(q: usize, t: usize) -> f64 {
    if q == 0 || t == 0 {
        return 0.0;
    }
    q.min(t) as f64 / q.max(t) as f64
}

/// Mean positional agreement over greedily matched instance pairs: instances
/// are paired in sequence order, each pair scores `1 − |relpos_Q − relpos_T|`
/// on relative center positions.
fn positional_score(q: &Instances, t: &Instances, q_len: usize, t_len: usize) -> f64 {
    let pairs = q.len().min(t.len());
    if pairs == 0 || q_len == 0 || t_len == 0 {
        return 0.0;
    }
    let rel = |inst: &(usize, usize), len: usize| -> f64 {
        (inst.0 as f64 + inst.1 as f64) / 2.0 / len as f64
    };
    (0..pairs)
        .map(|i| 1.0 - (rel(&q[i], q_len) - rel(&t[i], t_len)).abs())
        .sum::<f64>()
        / pairs as f64
}
