//! Search-job output writers.
//!
//! For job `J` the output directory receives:
//!   - `J.extended.fa`      orthologs, headers `GROUP|TAXSPEC|PROTID|FLAG`
//!   - `J.phyloprofile`     TSV: geneID ncbiID orthoID FAS_F FAS_R
//!   - `J_forward.domains`  TSV: pairID orthoID seqLen feature start end weight pathFlag
//!   - `J_reverse.domains`  (same columns, ortholog→seed direction)

use std::path::{Path, PathBuf};

use csv::WriterBuilder;
use tracing::info;

use oneseq_common::error::{OneSeqError, Result};
use oneseq_common::fasta::{self, FastaRecord};
use oneseq_common::taxon::TaxonSpec;
use oneseq_fas::DomainRow;

pub const PHYLOPROFILE_HEADER: [&str; 5] = ["geneID", "ncbiID", "orthoID", "FAS_F", "FAS_R"];
pub const DOMAINS_HEADER: [&str; 8] =
    ["pairID", "orthoID", "seqLen", "feature", "start", "end", "weight", "pathFlag"];

/// One ortholog as it appears in the outputs.
#[derive(Debug, Clone)]
pub struct OrthologEntry {
    pub taxon: TaxonSpec,
    pub protein_id: String,
    pub seq: Vec<u8>,
    /// Representative ortholog of its taxon (flag 1) or co-ortholog (flag 0).
    pub representative: bool,
    pub fas_forward: Option<f64>,
    pub fas_reverse: Option<f64>,
    /// Per-direction feature rows from the FAS scorer; empty when FAS is off.
    pub forward_rows: Vec<DomainRow>,
    pub reverse_rows: Vec<DomainRow>,
}

impl OrthologEntry {
    /// `GROUP|TAXSPEC|PROTID|FLAG`.
    pub fn extended_id(&self, group: &str) -> String {
        format!(
            "{group}|{}|{}|{}",
            self.taxon,
            self.protein_id,
            if self.representative { 1 } else { 0 }
        )
    }
}

/// Paths of the four output files for one job name.
#[derive(Debug, Clone)]
pub struct OutputPaths {
    pub extended_fasta: PathBuf,
    pub phyloprofile: PathBuf,
    pub forward_domains: PathBuf,
    pub reverse_domains: PathBuf,
}

impl OutputPaths {
    pub fn new(dir: &Path, job: &str) -> Self {
        Self {
            extended_fasta: dir.join(format!("{job}.extended.fa")),
            phyloprofile: dir.join(format!("{job}.phyloprofile")),
            forward_domains: dir.join(format!("{job}_forward.domains")),
            reverse_domains: dir.join(format!("{job}_reverse.domains")),
        }
    }
}

fn format_fas(score: Option<f64>) -> String {
    match score {
        Some(s) => format!("{s:.4}"),
        None => "NA".to_string(),
    }
}

/// Writes all four outputs. `orthologs` should already be in the desired row
/// order (taxon, then representative first).
pub fn write_outputs(
    dir: &Path,
    job: &str,
    group: &str,
    orthologs: &[OrthologEntry],
) -> Result<OutputPaths> {
    std::fs::create_dir_all(dir)?;
    let paths = OutputPaths::new(dir, job);

    let records: Vec<FastaRecord> = orthologs
        .iter()
        .map(|o| FastaRecord::new(o.extended_id(group), o.seq.clone()))
        .collect();
    fasta::write_file(&paths.extended_fasta, &records)?;

    let mut profile = WriterBuilder::new()
        .delimiter(b'\t')
        .from_path(&paths.phyloprofile)
        .map_err(|e| OneSeqError::Other(e.into()))?;
    profile
        .write_record(PHYLOPROFILE_HEADER)
        .map_err(|e| OneSeqError::Other(e.into()))?;
    for o in orthologs {
        profile
            .write_record([
                group,
                &o.taxon.ncbi_label(),
                &o.extended_id(group),
                &format_fas(o.fas_forward),
                &format_fas(o.fas_reverse),
            ])
            .map_err(|e| OneSeqError::Other(e.into()))?;
    }
    profile.flush()?;

    for (path, direction) in [(&paths.forward_domains, true), (&paths.reverse_domains, false)] {
        let mut out = WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(path)
            .map_err(|e| OneSeqError::Other(e.into()))?;
        out.write_record(DOMAINS_HEADER)
            .map_err(|e| OneSeqError::Other(e.into()))?;
        for o in orthologs {
            let pair_id = format!("{group}#{}", o.extended_id(group));
            let rows = if direction { &o.forward_rows } else { &o.reverse_rows };
            for row in rows {
                out.write_record([
                    pair_id.as_str(),
                    &row.protein_id,
                    &row.seq_len.to_string(),
                    &row.feature,
                    &row.start.to_string(),
                    &row.end.to_string(),
                    &format!("{:.4}", row.weight),
                    if row.on_path { "Y" } else { "N" },
                ])
                .map_err(|e| OneSeqError::Other(e.into()))?;
            }
        }
        out.flush()?;
    }

    info!(job, group, orthologs = orthologs.len(), dir = %dir.display(), "outputs written");
    Ok(paths)
}
