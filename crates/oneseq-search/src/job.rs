//! Search job definition.
//!
//! A job can be given entirely on the command line or loaded from a YAML or
//! JSON file (`oneSeq --job job.yaml`); flags override file values in the
//! CLI layer.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use oneseq_common::error::{OneSeqError, Result};
use oneseq_common::taxon::TaxonSpec;
use oneseq_taxonomy::TaxRank;

pub const DEFAULT_CORE_SIZE: usize = 6;
pub const DEFAULT_ACCEPT_THRESHOLD: f64 = 0.25;
pub const DEFAULT_COORTHOLOG_FACTOR: f64 = 0.75;
/// Prefilter depth: number of k-mer candidates handed to the aligner.
pub const DEFAULT_MAX_CANDIDATES: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreOptions {
    /// Total group size including the seed.
    pub size: usize,
    /// Smallest acceptable rank distance of a core taxon from the reference.
    pub min_dist: TaxRank,
    /// Largest acceptable rank distance.
    pub max_dist: TaxRank,
}

impl Default for CoreOptions {
    fn default() -> Self {
        Self { size: DEFAULT_CORE_SIZE, min_dist: TaxRank::Genus, max_dist: TaxRank::Kingdom }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Minimum normalized profile score for a hit to count.
    pub accept_threshold: f64,
    /// Co-orthologs must reach this fraction of the representative's raw
    /// score.
    pub coortholog_factor: f64,
    /// Drop co-orthologs, keep one ortholog per taxon.
    pub representative_only: bool,
    /// Reciprocity must hold against every core member's taxon, not just the
    /// reference.
    pub strict: bool,
    /// Accept a reciprocal best hit that is not the seed itself if it aligns
    /// to the seed above the accept threshold (a co-ortholog in the
    /// reference proteome).
    pub check_coorthologs_ref: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            accept_threshold: DEFAULT_ACCEPT_THRESHOLD,
            coortholog_factor: DEFAULT_COORTHOLOG_FACTOR,
            representative_only: false,
            strict: false,
            check_coorthologs_ref: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchJob {
    /// FASTA file holding the seed protein.
    pub seed_path: PathBuf,
    /// Record id within the seed file; default: first record.
    pub seed_id: Option<String>,
    /// Core group / output gene name; default: the seed id.
    pub group_name: Option<String>,
    /// Reference taxon the seed belongs to.
    pub ref_taxon: TaxonSpec,
    pub core: CoreOptions,
    pub search: SearchOptions,
    /// Compute FAS scores for accepted orthologs.
    pub fas: bool,
    /// Taxa to search; default: every registered taxon.
    pub search_taxa: Option<Vec<TaxonSpec>>,
    pub output_dir: PathBuf,
    /// 0 = one per CPU.
    pub workers: usize,
    /// Recompile the core group even if one exists on disk.
    pub force_core: bool,
}

impl Default for SearchJob {
    fn default() -> Self {
        Self {
            seed_path: PathBuf::from("seed.fa"),
            seed_id: None,
            group_name: None,
            // The reference proteome the shipped data package is built
            // around.
            ref_taxon: TaxonSpec { code: "HUMAN".into(), ncbi_id: 9606, version: 3 },
            core: CoreOptions::default(),
            search: SearchOptions::default(),
            fas: true,
            search_taxa: None,
            output_dir: PathBuf::from("oneseq_out"),
            workers: 0,
            force_core: false,
        }
    }
}

impl SearchJob {
    /// Loads a job file; YAML unless the extension is `.json`.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path.extension().map(|e| e == "json").unwrap_or(false);
        if is_json {
            Ok(serde_json::from_str(&text)?)
        } else {
            serde_yaml::from_str(&text)
                .map_err(|e| OneSeqError::Config(format!("cannot parse {}: {e}", path.display())))
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.search.accept_threshold) {
            return Err(OneSeqError::Config("accept_threshold must be in [0, 1]".into()));
        }
        if !(0.0..=1.0).contains(&self.search.coortholog_factor) {
            return Err(OneSeqError::Config("coortholog_factor must be in [0, 1]".into()));
        }
        if self.core.size < 1 {
            return Err(OneSeqError::Config("core size must be at least 1".into()));
        }
        if self.core.min_dist > self.core.max_dist {
            return Err(OneSeqError::Config("core min_dist exceeds max_dist".into()));
        }
        Ok(())
    }
}
