//! Merging the outputs of independent runs (`merge1sOutput`).
//!
//! Collects `*.phyloprofile`, `*.extended.fa`, `*_forward.domains` and
//! `*_reverse.domains` across the input directories and writes one merged
//! file per kind under the output prefix. Data rows are deduplicated
//! exactly; FASTA records are deduplicated by header. Input files of one
//! kind must agree on their header line.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use oneseq_common::error::{OneSeqError, Result};
use oneseq_common::fasta::{self, FastaRecord};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    pub phyloprofile_rows: usize,
    pub extended_records: usize,
    pub forward_domain_rows: usize,
    pub reverse_domain_rows: usize,
    pub inputs_merged: usize,
}

/// Merges every run output found under `inputs` into `<prefix>.*`.
/// `prefix` may carry a directory component; it is created as needed.
pub fn merge_outputs(inputs: &[PathBuf], prefix: &Path) -> Result<MergeReport> {
    if inputs.is_empty() {
        return Err(OneSeqError::Config("no input directories given".to_string()));
    }
    let mut report = MergeReport::default();

    if let Some(parent) = prefix.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let with_suffix = |suffix: &str| -> PathBuf {
        let mut name = prefix.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        name.push_str(suffix);
        prefix.with_file_name(name)
    };

    report.phyloprofile_rows = merge_tsv(
        &collect(inputs, |name| name.ends_with(".phyloprofile"))?,
        &with_suffix(".phyloprofile"),
    )?;
    report.forward_domain_rows = merge_tsv(
        &collect(inputs, |name| name.ends_with("_forward.domains"))?,
        &with_suffix("_forward.domains"),
    )?;
    report.reverse_domain_rows = merge_tsv(
        &collect(inputs, |name| name.ends_with("_reverse.domains"))?,
        &with_suffix("_reverse.domains"),
    )?;
    report.extended_records = merge_fasta(
        &collect(inputs, |name| name.ends_with(".extended.fa"))?,
        &with_suffix(".extended.fa"),
    )?;
    report.inputs_merged = inputs.len();

    info!(
        profiles = report.phyloprofile_rows,
        records = report.extended_records,
        "merge complete"
    );
    Ok(report)
}

fn collect(inputs: &[PathBuf], matches: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dir in inputs {
        if !dir.is_dir() {
            return Err(OneSeqError::Config(format!("{} is not a directory", dir.display())));
        }
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let name = path.file_name().map(|s| s.to_string_lossy().to_string());
            if let Some(name) = name {
                if path.is_file() && matches(&name) {
                    files.push(path);
                }
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Single header line, data rows deduplicated exactly, input order kept.
fn merge_tsv(files: &[PathBuf], out_path: &Path) -> Result<usize> {
    if files.is_empty() {
        return Ok(0);
    }
    let mut header: Option<Vec<String>> = None;
    let mut seen: HashSet<Vec<String>> = HashSet::new();
    let mut rows: Vec<Vec<String>> = Vec::new();

    for path in files {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .map_err(|e| OneSeqError::Other(e.into()))?;
        let this_header: Vec<String> = reader
            .headers()
            .map_err(|e| OneSeqError::Other(e.into()))?
            .iter()
            .map(|s| s.to_string())
            .collect();
        match &header {
            None => header = Some(this_header),
            Some(expected) if *expected != this_header => {
                return Err(OneSeqError::Config(format!(
                    "{}: header mismatch ({} vs {})",
                    path.display(),
                    this_header.join("\t"),
                    expected.join("\t")
                )));
            }
            Some(_) => {}
        }
        for record in reader.records() {
            let record = record.map_err(|e| OneSeqError::Other(e.into()))?;
            let row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            if seen.insert(row.clone()) {
                rows.push(row);
            }
        }
        debug!(file = %path.display(), "merged");
    }

    let mut out = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(out_path)
        .map_err(|e| OneSeqError::Other(e.into()))?;
    if let Some(header) = header {
        out.write_record(&header).map_err(|e| OneSeqError::Other(e.into()))?;
    }
    let count = rows.len();
    for row in rows {
        out.write_record(&row).map_err(|e| OneSeqError::Other(e.into()))?;
    }
    out.flush()?;
    Ok(count)
}

/// FASTA records deduplicated by header; the first occurrence wins.
fn merge_fasta(files: &[PathBuf], out_path: &Path) -> Result<usize> {
    if files.is_empty() {
        return Ok(0);
    }
    let mut seen: HashSet<String> = HashSet::new();
    let mut records: Vec<FastaRecord> = Vec::new();
    for path in files {
        for rec in fasta::read_file(path)? {
            if seen.insert(rec.id.clone()) {
                records.push(rec);
            }
        }
    }
    fasta::write_file(out_path, &records)?;
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &Path, name: &str, text: &str) {
        std::fs::write(dir.join(name), text).unwrap();
    }

    const PROFILE_HEADER: &str = "geneID\tncbiID\torthoID\tFAS_F\tFAS_R\n";

    #[test]
    fn test_merge_deduplicates_shared_rows() {
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();

        write(
            a.path(),
            "run1.phyloprofile",
            &format!("{PROFILE_HEADER}g\tncbi1\tg|A@1@1|p1|1\t1.0000\t1.0000\n"),
        );
        write(
            b.path(),
            "run2.phyloprofile",
            &format!(
                "{PROFILE_HEADER}g\tncbi1\tg|A@1@1|p1|1\t1.0000\t1.0000\ng\tncbi2\tg|B@2@1|p2|1\t0.5000\t0.4000\n"
            ),
        );
        write(a.path(), "run1.extended.fa", ">g|A@1@1|p1|1\nMKV\n");
        write(b.path(), "run2.extended.fa", ">g|A@1@1|p1|1\nMKV\n>g|B@2@1|p2|1\nMKL\n");

        let prefix = out.path().join("merged");
        let report =
            merge_outputs(&[a.path().to_path_buf(), b.path().to_path_buf()], &prefix).unwrap();
        assert_eq!(report.phyloprofile_rows, 2);
        assert_eq!(report.extended_records, 2);

        let merged = std::fs::read_to_string(out.path().join("merged.phyloprofile")).unwrap();
        assert_eq!(merged.lines().count(), 3); // header + 2 unique rows

        let fa = std::fs::read_to_string(out.path().join("merged.extended.fa")).unwrap();
        assert_eq!(fa.matches('>').count(), 2);
    }

    #[test]
    fn test_header_mismatch_is_error() {
        let a = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(a.path(), "x.phyloprofile", &format!("{PROFILE_HEADER}g\tncbi1\to\t1\t1\n"));
        write(a.path(), "y.phyloprofile", "wrong\theader\nrow\tdata\n");
        let result = merge_outputs(&[a.path().to_path_buf()], &out.path().join("m"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_kind_writes_nothing() {
        let a = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write(a.path(), "only.extended.fa", ">h\nMKV\n");
        let prefix = out.path().join("m");
        let report = merge_outputs(&[a.path().to_path_buf()], &prefix).unwrap();
        assert_eq!(report.phyloprofile_rows, 0);
        assert!(!out.path().join("m.phyloprofile").exists());
        assert!(out.path().join("m.extended.fa").exists());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        assert!(merge_outputs(&[], Path::new("out")).is_err());
    }
}
