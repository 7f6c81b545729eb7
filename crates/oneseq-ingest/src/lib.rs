//! oneseq-ingest — taxon intake (`addTaxon1s`, `addTaxa1s`).
//!
//! One taxon at a time:
//!   1. parse the proteome FASTA
//!   2. strip trailing stops, reject illegal residues and empty sequences
//!   3. sanitize ids, write the mapping file when renames occurred
//!   4. store the proteome under `genome_dir` with a `.checked` stamp
//!   5. build and store the k-mer index (unless skipped)
//!   6. annotate, merge an externally supplied annotation file if given,
//!      and store the weight JSON (unless skipped)
//!
//! Batch intake runs the same steps per file; per-file failures are
//! collected, not fatal.

pub mod sanitize;

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use oneseq_align::KmerIndex;
use oneseq_annotation::TaxonAnnotation;
use oneseq_common::fasta;
use oneseq_common::seq;
use oneseq_common::taxon::TaxonSpec;
use oneseq_data::error::{DataError, Result};
use oneseq_data::{AnnotationRepository, DataRoot, GenomeRepository, IndexRepository};

#[derive(Debug, Clone)]
pub struct AddTaxonOptions {
    /// Taxon code; derived from the file name when absent.
    pub code: Option<String>,
    pub version: u32,
    pub build_index: bool,
    pub annotate: bool,
    /// Externally produced annotation JSON, merged over the built-in
    /// detectors by feature name.
    pub anno_file: Option<PathBuf>,
    pub force: bool,
}

impl Default for AddTaxonOptions {
    fn default() -> Self {
        Self {
            code: None,
            version: 1,
            build_index: true,
            annotate: true,
            anno_file: None,
            force: false,
        }
    }
}

/// Registers one proteome. Returns the spec it was stored under.
pub fn add_taxon(
    root: &DataRoot,
    fasta_path: &Path,
    ncbi_id: u32,
    opts: &AddTaxonOptions,
) -> Result<TaxonSpec> {
    let code = match &opts.code {
        Some(code) => code.clone(),
        None => {
            let stem = fasta_path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            sanitize::derive_code(&stem).ok_or_else(|| {
                DataError::Invalid(format!(
                    "cannot derive a taxon code from '{}', pass one explicitly",
                    fasta_path.display()
                ))
            })?
        }
    };
    let spec = TaxonSpec::new(code, ncbi_id, opts.version)?;

    let genomes = GenomeRepository::new(root.clone());
    if genomes.exists(&spec) && !opts.force {
        return Err(DataError::AlreadyExists(format!("taxon {spec}")));
    }

    let mut records = fasta::read_file(fasta_path)?;
    if records.is_empty() {
        return Err(DataError::Invalid(format!("{}: no sequences", fasta_path.display())));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for rec in &records {
        if !seen.insert(rec.id.as_str()) {
            return Err(DataError::Invalid(format!("duplicate id {}", rec.id)));
        }
    }
    for rec in &mut records {
        seq::strip_trailing_stop(&mut rec.seq);
        if rec.seq.is_empty() {
            return Err(DataError::Invalid(format!("empty sequence for {}", rec.id)));
        }
        if let Some(&pos) = seq::illegal_positions(&rec.seq).first() {
            return Err(DataError::Invalid(format!(
                "illegal residue '{}' in {} at position {}",
                rec.seq[pos] as char,
                rec.id,
                pos + 1
            )));
        }
    }

    let mapping = sanitize::sanitize_records(&mut records);
    if !mapping.is_empty() {
        info!(taxon = %spec, renamed = mapping.len(), "sanitized protein ids");
    }

    root.ensure_layout()?;
    genomes.save(&spec, &records, Some(&mapping), opts.force)?;

    if opts.build_index {
        IndexRepository::new(root.clone()).save(&spec, &KmerIndex::build(&records))?;
    }
    if opts.annotate || opts.anno_file.is_some() {
        let mut anno = if opts.annotate {
            oneseq_annotation::annotate_proteome(&spec, &records)
        } else {
            TaxonAnnotation::new(spec.clone())
        };
        if let Some(path) = &opts.anno_file {
            let imported = TaxonAnnotation::load(path)?;
            if imported.taxon != spec {
                return Err(DataError::Invalid(format!(
                    "{}: annotation is for {}, not {spec}",
                    path.display(),
                    imported.taxon
                )));
            }
            info!(taxon = %spec, proteins = imported.architectures.len(), "merging imported annotation");
            oneseq_annotation::merge_imported(&mut anno, imported);
        }
        AnnotationRepository::new(root.clone()).save(&spec, &anno)?;
    }
    Ok(spec)
}

/// One line of the batch mapping file:
/// `filename <TAB> ncbi_id [<TAB> code [<TAB> version]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxaMappingEntry {
    pub filename: String,
    pub ncbi_id: u32,
    pub code: Option<String>,
    pub version: Option<u32>,
}

pub fn parse_taxa_mapping(text: &str) -> Result<Vec<TaxaMappingEntry>> {
    let mut entries = Vec::new();
    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 || fields.len() > 4 {
            return Err(DataError::Invalid(format!(
                "mapping line {}: expected 2-4 tab-separated fields",
                lineno + 1
            )));
        }
        let ncbi_id: u32 = fields[1].parse().map_err(|_| {
            DataError::Invalid(format!("mapping line {}: bad ncbi id '{}'", lineno + 1, fields[1]))
        })?;
        let version = match fields.get(3) {
            Some(v) => Some(v.parse().map_err(|_| {
                DataError::Invalid(format!("mapping line {}: bad version '{v}'", lineno + 1))
            })?),
            None => None,
        };
        entries.push(TaxaMappingEntry {
            filename: fields[0].to_string(),
            ncbi_id,
            code: fields.get(2).map(|s| s.to_string()).filter(|s| !s.is_empty()),
            version,
        });
    }
    Ok(entries)
}

#[derive(Debug, Default)]
pub struct AddTaxaReport {
    pub added: Vec<TaxonSpec>,
    /// (filename, reason) per failed file.
    pub failures: Vec<(String, String)>,
}

/// Batch intake: every entry of the mapping file, sequentially, with a
/// progress bar on stderr.
pub fn add_taxa(
    root: &DataRoot,
    input_dir: &Path,
    mapping_path: &Path,
    opts: &AddTaxonOptions,
) -> Result<AddTaxaReport> {
    let text = std::fs::read_to_string(mapping_path)?;
    let entries = parse_taxa_mapping(&text)?;

    let bar = ProgressBar::new(entries.len() as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{prefix} [{bar:30}] {pos}/{len} {msg}")
    {
        bar.set_style(style);
    }
    bar.set_prefix("addTaxa1s");

    let mut report = AddTaxaReport::default();
    for entry in entries {
        bar.set_message(entry.filename.clone());
        let per_file = AddTaxonOptions {
            code: entry.code.clone().or_else(|| opts.code.clone()),
            version: entry.version.unwrap_or(opts.version),
            ..opts.clone()
        };
        match add_taxon(root, &input_dir.join(&entry.filename), entry.ncbi_id, &per_file) {
            Ok(spec) => report.added.push(spec),
            Err(e) => {
                warn!(file = %entry.filename, "intake failed: {e}");
                report.failures.push((entry.filename, e.to_string()));
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    info!(added = report.added.len(), failed = report.failures.len(), "batch intake done");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn setup() -> (tempfile::TempDir, DataRoot) {
        let dir = tempfile::tempdir().unwrap();
        let root = DataRoot::new(dir.path().join("data"));
        (dir, root)
    }

    fn write_fasta(dir: &Path, name: &str, text: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_add_taxon_full_intake() {
        let (dir, root) = setup();
        let fasta = write_fasta(dir.path(), "test_species.fa", ">sp|P1|X first\nMKVLLTAEWQRSDD*\n>p2\nACDEFGHIKLMNPQRSTVWY\n");
        let opts = AddTaxonOptions { code: Some("TEST".into()), ..Default::default() };
        let spec = add_taxon(&root, &fasta, 1234, &opts).unwrap();
        assert_eq!(spec.to_string(), "TEST@1234@1");

        let records = GenomeRepository::new(root.clone()).load(&spec).unwrap();
        assert_eq!(records[0].id, "sp_P1_X");
        // Trailing stop stripped.
        assert_eq!(records[0].seq, b"MKVLLTAEWQRSDD");
        assert!(root.mapping_file(&spec).is_file());
        assert!(root.checked_stamp(&spec).is_file());
        assert!(IndexRepository::new(root.clone()).exists(&spec));
        assert!(AnnotationRepository::new(root.clone()).exists(&spec));
    }

    #[test]
    fn test_add_taxon_derives_code_from_filename() {
        let (dir, root) = setup();
        let fasta = write_fasta(dir.path(), "mus_musculus.fa", ">p1\nMKVLLT\n");
        let spec = add_taxon(&root, &fasta, 10090, &AddTaxonOptions::default()).unwrap();
        assert_eq!(spec.code, "MUSMUSCULU");
    }

    #[test]
    fn test_add_taxon_rejects_interior_stop_and_refuses_overwrite() {
        let (dir, root) = setup();
        let bad = write_fasta(dir.path(), "bad.fa", ">p1\nMK*VL\n");
        let opts = AddTaxonOptions { code: Some("BAD".into()), ..Default::default() };
        assert!(matches!(add_taxon(&root, &bad, 1, &opts), Err(DataError::Invalid(_))));

        let good = write_fasta(dir.path(), "good.fa", ">p1\nMKVLLT\n");
        let opts = AddTaxonOptions { code: Some("GOOD".into()), ..Default::default() };
        add_taxon(&root, &good, 2, &opts).unwrap();
        assert!(matches!(
            add_taxon(&root, &good, 2, &opts),
            Err(DataError::AlreadyExists(_))
        ));
        let forced = AddTaxonOptions { force: true, ..opts };
        add_taxon(&root, &good, 2, &forced).unwrap();
    }

    #[test]
    fn test_skip_flags() {
        let (dir, root) = setup();
        let fasta = write_fasta(dir.path(), "skip.fa", ">p1\nMKVLLT\n");
        let opts = AddTaxonOptions {
            code: Some("SKIP".into()),
            build_index: false,
            annotate: false,
            ..Default::default()
        };
        let spec = add_taxon(&root, &fasta, 3, &opts).unwrap();
        assert!(!IndexRepository::new(root.clone()).exists(&spec));
        assert!(!AnnotationRepository::new(root).exists(&spec));
    }

    #[test]
    fn test_anno_file_merged_over_detectors() {
        use oneseq_annotation::{Architecture, Feature};

        let (dir, root) = setup();
        let fasta = write_fasta(dir.path(), "ext.fa", ">p1\nMKVLLTAEWQRSDD\n");

        let mut imported = TaxonAnnotation::new("EXT@77@1".parse().unwrap());
        imported.insert(Architecture {
            protein_id: "p1".into(),
            length: 14,
            features: vec![Feature {
                name: "pfam_kinase".into(),
                start: 1,
                end: 14,
                score: 0.0,
            }],
        });
        let anno_path = dir.path().join("ext.json");
        imported.save(&anno_path).unwrap();

        let opts = AddTaxonOptions {
            code: Some("EXT".into()),
            anno_file: Some(anno_path.clone()),
            ..Default::default()
        };
        let spec = add_taxon(&root, &fasta, 77, &opts).unwrap();
        let anno = AnnotationRepository::new(root.clone()).load(&spec).unwrap();
        assert_eq!(anno.feature_counts.get("pfam_kinase"), Some(&1));
        assert!(anno.architectures["p1"]
            .features
            .iter()
            .any(|f| f.name == "pfam_kinase"));

        // A file annotated for some other taxon is refused.
        let opts = AddTaxonOptions {
            code: Some("OTHER".into()),
            anno_file: Some(anno_path),
            ..Default::default()
        };
        assert!(matches!(
            add_taxon(&root, &fasta, 78, &opts),
            Err(DataError::Invalid(_))
        ));
    }

    #[test]
    fn test_anno_file_alone_skips_detectors() {
        let (dir, root) = setup();
        let fasta = write_fasta(dir.path(), "raw.fa", ">p1\nMKVLLTAEWQRSDD\n");
        let imported = TaxonAnnotation::new("RAW@88@1".parse().unwrap());
        let anno_path = dir.path().join("raw.json");
        imported.save(&anno_path).unwrap();

        let opts = AddTaxonOptions {
            code: Some("RAW".into()),
            annotate: false,
            anno_file: Some(anno_path),
            ..Default::default()
        };
        let spec = add_taxon(&root, &fasta, 88, &opts).unwrap();
        let anno = AnnotationRepository::new(root).load(&spec).unwrap();
        assert!(anno.architectures.is_empty());
    }

    #[test]
    fn test_parse_taxa_mapping() {
        let entries = parse_taxa_mapping(
            "# comment\nhuman.fa\t9606\tHUMAN\t3\nmouse.fa\t10090\n\nyeast.fa\t4932\tYEAST\n",
        )
        .unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].code.as_deref(), Some("HUMAN"));
        assert_eq!(entries[0].version, Some(3));
        assert_eq!(entries[1].code, None);
        assert!(parse_taxa_mapping("only_one_field\n").is_err());
        assert!(parse_taxa_mapping("f.fa\tnot_a_number\n").is_err());
    }

    #[test]
    fn test_add_taxa_collects_failures() {
        let (dir, root) = setup();
        write_fasta(dir.path(), "ok.fa", ">p1\nMKVLLT\n");
        write_fasta(dir.path(), "broken.fa", ">p1\nMK*VL\n");
        let mapping = write_fasta(
            dir.path(),
            "taxa.tsv",
            "ok.fa\t11\tOKTAX\nbroken.fa\t12\tBROKEN\nmissing.fa\t13\tMISS\n",
        );
        let report =
            add_taxa(&root, dir.path(), &mapping, &AddTaxonOptions::default()).unwrap();
        assert_eq!(report.added.len(), 1);
        assert_eq!(report.added[0].code, "OKTAX");
        assert_eq!(report.failures.len(), 2);
    }
}
