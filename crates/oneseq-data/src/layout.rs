//! Data-root directory layout.
//!
//! ```text
//! <data_root>/
//!   genome_dir/<SPEC>/<SPEC>.fa            proteome FASTA
//!   genome_dir/<SPEC>/<SPEC>.fa.checked    validation stamp
//!   genome_dir/<SPEC>/<SPEC>.fa.mapping    id mapping (only when ids changed)
//!   search_dir/<SPEC>.idx.json             k-mer index
//!   weight_dir/<SPEC>.json                 feature annotation
//!   core_orthologs/<GROUP>/<GROUP>.fa
//!   core_orthologs/<GROUP>/<GROUP>.profile.json
//!   taxonomy/nodes.tsv
//! ```

use std::path::{Path, PathBuf};

use tracing::warn;

use oneseq_common::taxon::TaxonSpec;
use oneseq_taxonomy::TaxonomyTable;

use crate::error::{DataError, Result};

pub const GENOME_DIR: &str = "genome_dir";
pub const SEARCH_DIR: &str = "search_dir";
pub const WEIGHT_DIR: &str = "weight_dir";
pub const CORE_DIR: &str = "core_orthologs";
pub const TAXONOMY_FILE: &str = "taxonomy/nodes.tsv";

#[derive(Debug, Clone)]
pub struct DataRoot {
    root: PathBuf,
}

impl DataRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Opens an existing data root; the genome directory must be present.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.join(GENOME_DIR).is_dir() {
            return Err(DataError::NotFound(format!(
                "{} is not a oneseq data root (no {GENOME_DIR}/)",
                root.display()
            )));
        }
        Ok(Self { root })
    }

    /// Creates the expected directory skeleton.
    pub fn ensure_layout(&self) -> Result<()> {
        for dir in [GENOME_DIR, SEARCH_DIR, WEIGHT_DIR, CORE_DIR, "taxonomy"] {
            std::fs::create_dir_all(self.root.join(dir))?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn genome_dir(&self) -> PathBuf {
        self.root.join(GENOME_DIR)
    }

    pub fn search_dir(&self) -> PathBuf {
        self.root.join(SEARCH_DIR)
    }

    pub fn weight_dir(&self) -> PathBuf {
        self.root.join(WEIGHT_DIR)
    }

    pub fn core_dir(&self) -> PathBuf {
        self.root.join(CORE_DIR)
    }

    pub fn taxonomy_file(&self) -> PathBuf {
        self.root.join(TAXONOMY_FILE)
    }

    pub fn taxon_dir(&self, spec: &TaxonSpec) -> PathBuf {
        self.genome_dir().join(spec.to_string())
    }

    pub fn genome_fasta(&self, spec: &TaxonSpec) -> PathBuf {
        self.taxon_dir(spec).join(format!("{spec}.fa"))
    }

    pub fn checked_stamp(&self, spec: &TaxonSpec) -> PathBuf {
        self.taxon_dir(spec).join(format!("{spec}.fa.checked"))
    }

    pub fn mapping_file(&self, spec: &TaxonSpec) -> PathBuf {
        self.taxon_dir(spec).join(format!("{spec}.fa.mapping"))
    }

    pub fn index_file(&self, spec: &TaxonSpec) -> PathBuf {
        self.search_dir().join(format!("{spec}.idx.json"))
    }

    pub fn weight_file(&self, spec: &TaxonSpec) -> PathBuf {
        self.weight_dir().join(format!("{spec}.json"))
    }

    pub fn group_dir(&self, group: &str) -> PathBuf {
        self.core_dir().join(group)
    }

    pub fn group_fasta(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(format!("{group}.fa"))
    }

    pub fn group_profile(&self, group: &str) -> PathBuf {
        self.group_dir(group).join(format!("{group}.profile.json"))
    }

    /// Registered taxa, from the genome directory names. Directories that do
    /// not parse as a taxon spec are skipped with a warning.
    pub fn list_taxa(&self) -> Result<Vec<TaxonSpec>> {
        let mut taxa = Vec::new();
        let dir = self.genome_dir();
        if !dir.is_dir() {
            return Ok(taxa);
        }
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            match name.parse::<TaxonSpec>() {
                Ok(spec) => taxa.push(spec),
                Err(e) => warn!("skipping {}: {e}", name),
            }
        }
        taxa.sort();
        Ok(taxa)
    }

    pub fn load_taxonomy(&self) -> Result<TaxonomyTable> {
        let path = self.taxonomy_file();
        if !path.is_file() {
            return Err(DataError::NotFound(format!(
                "taxonomy table {} missing",
                path.display()
            )));
        }
        Ok(TaxonomyTable::from_file(&path)?)
    }
}
