//! Installed-data validation (`checkData1s`).
//!
//! Walks the data root and reports everything a later search would trip
//! over. Findings are data, not failures: the caller decides the exit code
//! from the report's error count.

use std::collections::HashSet;
use std::fmt;

use tracing::info;

use oneseq_align::pairwise::{align_local, self_score, GapPenalties};
use oneseq_common::seq;
use oneseq_common::taxon::TaxonSpec;

use crate::error::Result;
use crate::layout::DataRoot;
use crate::repository::{AnnotationRepository, GenomeRepository, IndexRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => f.write_str("WARNING"),
            Severity::Error => f.write_str("ERROR"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CheckIssue {
    pub severity: Severity,
    /// Taxon the issue belongs to, if any.
    pub taxon: Option<String>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct CheckReport {
    pub issues: Vec<CheckIssue>,
    pub taxa_checked: usize,
}

impl CheckReport {
    fn push(&mut self, severity: Severity, taxon: Option<&TaxonSpec>, message: impl Into<String>) {
        self.issues.push(CheckIssue {
            severity,
            taxon: taxon.map(|t| t.to_string()),
            message: message.into(),
        });
    }

    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Warning).count()
    }

    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ValidateOptions {
    /// Re-run the aligner on each proteome's first protein and require the
    /// self alignment to recover the diagonal score.
    pub alignment_self_test: bool,
}

/// Validates every registered taxon plus the cross-cutting tables.
pub fn validate_data_root(root: &DataRoot, opts: ValidateOptions) -> Result<CheckReport> {
    let mut report = CheckReport::default();
    let genomes = GenomeRepository::new(root.clone());
    let indexes = IndexRepository::new(root.clone());
    let annotations = AnnotationRepository::new(root.clone());

    // Unparseable genome directory names.
    if root.genome_dir().is_dir() {
        for entry in std::fs::read_dir(root.genome_dir())? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                let name = entry.file_name().to_string_lossy().to_string();
                if name.parse::<TaxonSpec>().is_err() {
                    report.push(
                        Severity::Error,
                        None,
                        format!("genome_dir/{name} is not a valid taxon spec"),
                    );
                }
            }
        }
    }

    let taxa = root.list_taxa()?;
    report.taxa_checked = taxa.len();

    let taxonomy = match root.load_taxonomy() {
        Ok(table) => Some(table),
        Err(e) => {
            report.push(Severity::Warning, None, format!("taxonomy table unusable: {e}"));
            None
        }
    };

    for spec in &taxa {
        check_taxon(&mut report, root, &genomes, &indexes, &annotations, spec, opts);
        if let Some(table) = &taxonomy {
            if !table.contains(spec.ncbi_id) {
                report.push(
                    Severity::Warning,
                    Some(spec),
                    format!("ncbi id {} missing from taxonomy table", spec.ncbi_id),
                );
            }
        }
    }

    // Orphaned indexes and annotations.
    let known: HashSet<String> = taxa.iter().map(|t| t.to_string()).collect();
    for (dir, suffix, kind) in [
        (root.search_dir(), ".idx.json", "search index"),
        (root.weight_dir(), ".json", "annotation"),
    ] {
        if !dir.is_dir() {
            continue;
        }
        for entry in std::fs::read_dir(dir)? {
            let name = entry?.file_name().to_string_lossy().to_string();
            if let Some(stem) = name.strip_suffix(suffix) {
                if !known.contains(stem) {
                    report.push(
                        Severity::Warning,
                        None,
                        format!("orphaned {kind} {name}: no matching genome"),
                    );
                }
            }
        }
    }

    info!(
        taxa = report.taxa_checked,
        errors = report.error_count(),
        warnings = report.warning_count(),
        "data root validated"
    );
    Ok(report)
}

fn check_taxon(
    report: &mut CheckReport,
    root: &DataRoot,
    genomes: &GenomeRepository,
    indexes: &IndexRepository,
    annotations: &AnnotationRepository,
    spec: &TaxonSpec,
    opts: ValidateOptions,
) {
    let records = match genomes.load(spec) {
        Ok(records) => records,
        Err(e) => {
            report.push(Severity::Error, Some(spec), format!("proteome unreadable: {e}"));
            return;
        }
    };

    let mut ids: HashSet<&str> = HashSet::new();
    for rec in &records {
        if rec.seq.is_empty() {
            report.push(Severity::Error, Some(spec), format!("empty sequence for {}", rec.id));
        }
        if !ids.insert(rec.id.as_str()) {
            report.push(Severity::Error, Some(spec), format!("duplicate id {}", rec.id));
        }
        let illegal = seq::illegal_positions(&rec.seq);
        if !illegal.is_empty() {
            let what = if rec.seq[illegal[0]] == b'*' {
                "interior '*'"
            } else {
                "illegal residue"
            };
            report.push(
                Severity::Error,
                Some(spec),
                format!("{what} in {} at position {}", rec.id, illegal[0] + 1),
            );
        }
    }

    if !root.checked_stamp(spec).is_file() {
        report.push(Severity::Warning, Some(spec), "missing .checked stamp");
    }

    match indexes.load(spec) {
        Ok(index) => {
            if index.num_sequences() != records.len() {
                report.push(
                    Severity::Error,
                    Some(spec),
                    format!(
                        "search index has {} sequences, FASTA has {}",
                        index.num_sequences(),
                        records.len()
                    ),
                );
            }
        }
        Err(e) => {
            report.push(Severity::Error, Some(spec), format!("search index unusable: {e}"));
        }
    }

    match annotations.load(spec) {
        Ok(anno) => {
            for id in anno.architectures.keys() {
                if !ids.contains(id.as_str()) {
                    report.push(
                        Severity::Error,
                        Some(spec),
                        format!("annotation references unknown protein {id}"),
                    );
                    break;
                }
            }
        }
        Err(e) => {
            report.push(Severity::Error, Some(spec), format!("annotation unusable: {e}"));
        }
    }

    if opts.alignment_self_test {
        if let Some(rec) = records.iter().find(|r| !r.seq.is_empty()) {
            let expected = self_score(&rec.seq);
            let aligned = align_local(&rec.seq, &rec.seq, GapPenalties::default())
                .map(|a| a.score)
                .unwrap_or(0);
            if aligned != expected {
                report.push(
                    Severity::Error,
                    Some(spec),
                    format!("alignment self-test failed: {aligned} != {expected}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oneseq_align::KmerIndex;
    use oneseq_common::fasta::FastaRecord;

    fn spec() -> TaxonSpec {
        "TEST@1234@1".parse().unwrap()
    }

    fn seeded_root() -> (tempfile::TempDir, DataRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = DataRoot::new(dir.path());
        root.ensure_layout().unwrap();
        let records = vec![
            FastaRecord::new("p1", b"MKVLLTAEWQRSDDKHGF".to_vec()),
            FastaRecord::new("p2", b"ACDEFGHIKLMNPQRSTVWY".to_vec()),
        ];
        GenomeRepository::new(root.clone())
            .save(&spec(), &records, None, false)
            .unwrap();
        IndexRepository::new(root.clone())
            .save(&spec(), &KmerIndex::build(&records))
            .unwrap();
        AnnotationRepository::new(root.clone())
            .save(&spec(), &oneseq_annotation::annotate_proteome(&spec(), &records))
            .unwrap();
        std::fs::write(root.taxonomy_file(), "1\t1\tno rank\troot\n1234\t1\tspecies\tTest\n")
            .unwrap();
        (dir, root)
    }

    #[test]
    fn test_clean_root_passes() {
        let (_dir, root) = seeded_root();
        let report =
            validate_data_root(&root, ValidateOptions { alignment_self_test: true }).unwrap();
        assert!(report.is_ok(), "issues: {:?}", report.issues);
        assert_eq!(report.taxa_checked, 1);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_missing_index_is_error() {
        let (_dir, root) = seeded_root();
        std::fs::remove_file(root.index_file(&spec())).unwrap();
        let report = validate_data_root(&root, ValidateOptions::default()).unwrap();
        assert!(!report.is_ok());
    }

    #[test]
    fn test_interior_stop_is_error() {
        let (_dir, root) = seeded_root();
        let records = vec![FastaRecord::new("p1", b"MKV*LLT".to_vec())];
        GenomeRepository::new(root.clone())
            .save(&spec(), &records, None, true)
            .unwrap();
        let report = validate_data_root(&root, ValidateOptions::default()).unwrap();
        assert!(report
            .issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.message.contains("interior '*'")));
    }

    #[test]
    fn test_missing_stamp_is_warning() {
        let (_dir, root) = seeded_root();
        std::fs::remove_file(root.checked_stamp(&spec())).unwrap();
        let report = validate_data_root(&root, ValidateOptions::default()).unwrap();
        assert!(report.is_ok());
        assert!(report.warning_count() >= 1);
    }

    #[test]
    fn test_orphaned_index_is_warning() {
        let (_dir, root) = seeded_root();
        std::fs::write(root.search_dir().join("GHOST@1@1.idx.json"), "{}").unwrap();
        let report = validate_data_root(&root, ValidateOptions::default()).unwrap();
        assert!(report
            .issues
            .iter()
            .any(|i| i.severity == Severity::Warning && i.message.contains("orphaned")));
    }

    #[test]
    fn test_unknown_ncbi_id_is_warning() {
        let (_dir, root) = seeded_root();
        std::fs::write(root.taxonomy_file(), "1\t1\tno rank\troot\n").unwrap();
        let report = validate_data_root(&root, ValidateOptions::default()).unwrap();
        assert!(report
            .issues
            .iter()
            .any(|i| i.message.contains("missing from taxonomy table")));
    }

    #[test]
    fn test_bad_directory_name_is_error() {
        let (_dir, root) = seeded_root();
        std::fs::create_dir(root.genome_dir().join("lowercase@1@1")).unwrap();
        let report = validate_data_root(&root, ValidateOptions::default()).unwrap();
        assert!(!report.is_ok());
    }
}
