//! Filesystem repositories over the data root.
//!
//! Synchronous by design: callers in the async pipeline wrap access in
//! `spawn_blocking`. Each repository owns its `DataRoot` handle.

use chrono::Utc;
use tracing::{debug, info};

use oneseq_align::{KmerIndex, SequenceProfile};
use oneseq_annotation::TaxonAnnotation;
use oneseq_common::fasta::{self, FastaRecord};
use oneseq_common::taxon::TaxonSpec;

use crate::error::{DataError, Result};
use crate::layout::DataRoot;

// ── Genomes ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GenomeRepository {
    root: DataRoot,
}

impl GenomeRepository {
    pub fn new(root: DataRoot) -> Self {
        Self { root }
    }

    pub fn exists(&self, spec: &TaxonSpec) -> bool {
        self.root.genome_fasta(spec).is_file()
    }

    /// Writes the proteome, the optional id mapping, and the `.checked`
    /// stamp. Refuses to overwrite unless `force`.
    pub fn save(
        &self,
        spec: &TaxonSpec,
        records: &[FastaRecord],
        mapping: Option<&[(String, String)]>,
        force: bool,
    ) -> Result<()> {
        if self.exists(spec) && !force {
            return Err(DataError::AlreadyExists(format!("taxon {spec}")));
        }
        std::fs::create_dir_all(self.root.taxon_dir(spec))?;
        fasta::write_file(self.root.genome_fasta(spec), records)?;
        match mapping {
            Some(pairs) if !pairs.is_empty() => {
                let mut text = String::new();
                for (original, sanitized) in pairs {
                    text.push_str(original);
                    text.push('\t');
                    text.push_str(sanitized);
                    text.push('\n');
                }
                std::fs::write(self.root.mapping_file(spec), text)?;
            }
            _ => {
                // Stale mapping from a forced re-import must not survive.
                let _ = std::fs::remove_file(self.root.mapping_file(spec));
            }
        }
        self.stamp(spec)?;
        info!(taxon = %spec, proteins = records.len(), "genome stored");
        Ok(())
    }

    pub fn load(&self, spec: &TaxonSpec) -> Result<Vec<FastaRecord>> {
        let path = self.root.genome_fasta(spec);
        if !path.is_file() {
            return Err(DataError::NotFound(format!("genome for {spec}")));
        }
        Ok(fasta::read_file(&path)?)
    }

    /// Writes the `.checked` stamp with the current RFC 3339 time.
    pub fn stamp(&self, spec: &TaxonSpec) -> Result<()> {
        std::fs::write(self.root.checked_stamp(spec), Utc::now().to_rfc3339())?;
        Ok(())
    }

    pub fn remove(&self, spec: &TaxonSpec) -> Result<()> {
        let dir = self.root.taxon_dir(spec);
        if !dir.is_dir() {
            return Err(DataError::NotFound(format!("taxon {spec}")));
        }
        std::fs::remove_dir_all(dir)?;
        Ok(())
    }
}

// ── Search indexes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct IndexRepository {
    root: DataRoot,
}

impl IndexRepository {
    pub fn new(root: DataRoot) -> Self {
        Self { root }
    }

    pub fn exists(&self, spec: &TaxonSpec) -> bool {
        self.root.index_file(spec).is_file()
    }

    pub fn save(&self, spec: &TaxonSpec, index: &KmerIndex) -> Result<()> {
        std::fs::create_dir_all(self.root.search_dir())?;
        index.save(self.root.index_file(spec))?;
        debug!(taxon = %spec, sequences = index.num_sequences(), "index stored");
        Ok(())
    }

    pub fn load(&self, spec: &TaxonSpec) -> Result<KmerIndex> {
        let path = self.root.index_file(spec);
        if !path.is_file() {
            return Err(DataError::NotFound(format!("search index for {spec}")));
        }
        Ok(KmerIndex::load(&path)?)
    }
}

// ── Annotations ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AnnotationRepository {
    root: DataRoot,
}

impl AnnotationRepository {
    pub fn new(root: DataRoot) -> Self {
        Self { root }
    }

    pub fn exists(&self, spec: &TaxonSpec) -> bool {
        self.root.weight_file(spec).is_file()
    }

    pub fn save(&self, spec: &TaxonSpec, anno: &TaxonAnnotation) -> Result<()> {
        std::fs::create_dir_all(self.root.weight_dir())?;
        anno.save(self.root.weight_file(spec))?;
        Ok(())
    }

    pub fn load(&self, spec: &TaxonSpec) -> Result<TaxonAnnotation> {
        let path = self.root.weight_file(spec);
        if !path.is_file() {
            return Err(DataError::NotFound(format!("annotation for {spec}")));
        }
        Ok(TaxonAnnotation::load(&path)?)
    }
}

// ── Core ortholog groups ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CoreGroupRepository {
    root: DataRoot,
}

impl CoreGroupRepository {
    pub fn new(root: DataRoot) -> Self {
        Self { root }
    }

    pub fn exists(&self, group: &str) -> bool {
        self.root.group_fasta(group).is_file() && self.root.group_profile(group).is_file()
    }

    pub fn save(
        &self,
        group: &str,
        members: &[FastaRecord],
        profile: &SequenceProfile,
    ) -> Result<()> {
        std::fs::create_dir_all(self.root.group_dir(group))?;
        fasta::write_file(self.root.group_fasta(group), members)?;
        profile.save(self.root.group_profile(group))?;
        info!(group, members = members.len(), "core group stored");
        Ok(())
    }

    pub fn load_members(&self, group: &str) -> Result<Vec<FastaRecord>> {
        let path = self.root.group_fasta(group);
        if !path.is_file() {
            return Err(DataError::NotFound(format!("core group {group}")));
        }
        Ok(fasta::read_file(&path)?)
    }

    pub fn load_profile(&self, group: &str) -> Result<SequenceProfile> {
        let path = self.root.group_profile(group);
        if !path.is_file() {
            return Err(DataError::NotFound(format!("profile of core group {group}")));
        }
        Ok(SequenceProfile::load(&path)?)
    }

    pub fn remove(&self, group: &str) -> Result<()> {
        let dir = self.root.group_dir(group);
        if dir.is_dir() {
            std::fs::remove_dir_all(dir)?;
        }
        Ok(())
    }
}
