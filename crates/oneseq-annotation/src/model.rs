//! Feature architecture model.
//!
//! The unit of FAS scoring: a protein's architecture is the list of feature
//! instances detected on it, a taxon's annotation is every architecture of
//! its proteome plus the per-feature instance counts used for weighting.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use oneseq_common::error::Result;
use oneseq_common::taxon::TaxonSpec;

/// One feature instance. Coordinates are 1-based and inclusive, as in the
/// domains output tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub name: String,
    pub start: usize,
    pub end: usize,
    /// Detector-specific raw score (entropy, mean hydropathy, ...).
    pub score: f64,
}

impl Feature {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start) + 1
    }

    pub fn is_empty(&self) -> bool {
        self.end < self.start
    }

    /// Center position relative to the protein length, in [0, 1].
    pub fn relative_center(&self, protein_len: usize) -> f64 {
        if protein_len == 0 {
            return 0.0;
        }
        (self.start as f64 + self.end as f64) / 2.0 / protein_len as f64
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Architecture {
    pub protein_id: String,
    pub length: usize,
    pub features: Vec<Feature>,
}

impl Architecture {
    pub fn empty(protein_id: impl Into<String>, length: usize) -> Self {
        Self { protein_id: protein_id.into(), length, features: Vec::new() }
    }

    /// Instance count per feature name.
    pub fn feature_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for f in &self.features {
            *counts.entry(f.name.clone()).or_insert(0) += 1;
        }
        counts
    }
}

/// Everything `weight_dir/<SPEC>.json` stores for one taxon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonAnnotation {
    pub taxon: TaxonSpec,
    /// Keyed by protein id.
    pub architectures: BTreeMap<String, Architecture>,
    /// Total instance count per feature name across the proteome.
    pub feature_counts: BTreeMap<String, u64>,
}

impl TaxonAnnotation {
    pub fn new(taxon: TaxonSpec) -> Self {
        Self { taxon, architectures: BTreeMap::new(), feature_counts: BTreeMap::new() }
    }

    pub fn insert(&mut self, arch: Architecture) {
        for (name, n) in arch.feature_counts() {
            *self.feature_counts.entry(name).or_insert(0) += n;
        }
        self.architectures.insert(arch.protein_id.clone(), arch);
    }

    /// Recomputes `feature_counts` from the architectures. Used after
    /// merging imported annotations.
    pub fn rebuild_counts(&mut self) {
        self.feature_counts.clear();
        for arch in self.architectures.values() {
            for (name, n) in arch.feature_counts() {
                *self.feature_counts.entry(name).or_insert(0) += n;
            }
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        serde_json::to_writer(std::io::BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path.as_ref())?;
        Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
    }
}
