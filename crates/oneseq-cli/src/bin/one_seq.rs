//! oneSeq — profile-based ortholog search for one seed protein.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;

use oneseq_cli::{init_tracing, open_data_root};
use oneseq_common::taxon::TaxonSpec;
use oneseq_search::{run_search, SearchJob};
use oneseq_taxonomy::TaxRank;

#[derive(Parser, Debug)]
#[command(name = "oneSeq", version, about = "Targeted ortholog search across a set of proteomes")]
struct Cli {
    /// Config file (else ONESEQ_CONFIG, else ./oneseq.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data root override.
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Job file (YAML or JSON); flags below override its fields.
    #[arg(long)]
    job: Option<PathBuf>,

    /// FASTA file with the seed protein.
    #[arg(long)]
    seed: Option<PathBuf>,

    /// Record id within the seed file (default: first record).
    #[arg(long)]
    seq_id: Option<String>,

    /// Name of the ortholog group and the output gene (default: the seed id).
    #[arg(long)]
    seq_name: Option<String>,

    /// Reference taxon the seed belongs to, as CODE@NCBIID@VERSION.
    #[arg(long)]
    ref_spec: Option<TaxonSpec>,

    /// Core group size including the seed.
    #[arg(long)]
    core_size: Option<usize>,

    /// Minimum taxonomic rank distance of core members to the reference.
    #[arg(long, value_parser = parse_rank)]
    min_dist: Option<TaxRank>,

    /// Maximum taxonomic rank distance of core members to the reference.
    #[arg(long, value_parser = parse_rank)]
    max_dist: Option<TaxRank>,

    /// Require reciprocity against every core member, not just the reference.
    #[arg(long)]
    strict: bool,

    /// Accept a hit whose best back-hit is a co-ortholog of the seed.
    #[arg(long)]
    check_coorthologs_ref: bool,

    /// Report only the representative ortholog per taxon.
    #[arg(long)]
    rep: bool,

    /// Skip feature architecture scoring.
    #[arg(long)]
    no_fas: bool,

    /// Restrict the search to these taxa (CODE@NCBIID@VERSION, repeatable).
    #[arg(long)]
    search_taxa: Vec<TaxonSpec>,

    /// Output directory.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Parallel taxa (0 = one per CPU).
    #[arg(long)]
    workers: Option<usize>,

    /// Recompile the core group even if one exists.
    #[arg(long)]
    force_core: bool,
}

fn parse_rank(s: &str) -> std::result::Result<TaxRank, String> {
    TaxRank::from_name(s).ok_or_else(|| format!("unknown taxonomic rank '{s}'"))
}

impl Cli {
    /// Job file as the base, flags layered on top.
    fn into_job(self, default_workers: usize) -> Result<SearchJob> {
        let mut job = match &self.job {
            Some(path) => SearchJob::from_file(path)
                .with_context(|| format!("reading job file {}", path.display()))?,
            None => SearchJob { workers: default_workers, ..SearchJob::default() },
        };
        if let Some(seed) = self.seed {
            job.seed_path = seed;
        } else if self.job.is_none() {
            bail!("either --seed or --job is required");
        }
        if self.seq_id.is_some() {
            job.seed_id = self.seq_id;
        }
        if self.seq_name.is_some() {
            job.group_name = self.seq_name;
        }
        if let Some(spec) = self.ref_spec {
            job.ref_taxon = spec;
        }
        if let Some(size) = self.core_size {
            job.core.size = size;
        }
        if let Some(rank) = self.min_dist {
            job.core.min_dist = rank;
        }
        if let Some(rank) = self.max_dist {
            job.core.max_dist = rank;
        }
        if self.strict {
            job.search.strict = true;
        }
        if self.check_coorthologs_ref {
            job.search.check_coorthologs_ref = true;
        }
        if self.rep {
            job.search.representative_only = true;
        }
        if self.no_fas {
            job.fas = false;
        }
        if !self.search_taxa.is_empty() {
            job.search_taxa = Some(self.search_taxa);
        }
        if let Some(out) = self.out {
            job.output_dir = out;
        }
        if let Some(workers) = self.workers {
            job.workers = workers;
        }
        if self.force_core {
            job.force_core = true;
        }
        Ok(job)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (config, root) = open_data_root(cli.config.as_deref(), cli.data_root.as_ref())?;
    let job = cli.into_job(config.effective_workers())?;

    let result = run_search(job, root, None).await?;

    println!(
        "{} group {} ({} core members)",
        style("oneSeq").green().bold(),
        style(&result.group).bold(),
        result.core_members
    );
    println!(
        "  {} ortholog(s) across {} taxa, {} below threshold, {} not reciprocal",
        result.orthologs_accepted,
        result.taxa_searched,
        result.rejected_below_threshold,
        result.rejected_not_reciprocal
    );
    for err in &result.errors {
        println!("  {} {err}", style("failed:").red());
    }
    println!(
        "  outputs in {} ({} ms)",
        style(result.output_dir.display()).bold(),
        result.duration_ms
    );

    if result.orthologs_accepted == 0 {
        bail!("no orthologs found for group {}", result.group);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_layer_over_defaults() {
        let cli = Cli::try_parse_from([
            "oneSeq",
            "--seed",
            "bard1.fa",
            "--seq-name",
            "BARD1",
            "--ref-spec",
            "MOUSE@10090@1",
            "--min-dist",
            "family",
            "--rep",
            "--no-fas",
            "--workers",
            "2",
        ])
        .unwrap();
        let job = cli.into_job(0).unwrap();
        assert_eq!(job.seed_path, PathBuf::from("bard1.fa"));
        assert_eq!(job.group_name.as_deref(), Some("BARD1"));
        assert_eq!(job.ref_taxon.to_string(), "MOUSE@10090@1");
        assert_eq!(job.core.min_dist, TaxRank::Family);
        assert!(job.search.representative_only);
        assert!(!job.fas);
        assert_eq!(job.workers, 2);
    }

    #[test]
    fn test_seed_or_job_is_required() {
        let cli = Cli::try_parse_from(["oneSeq"]).unwrap();
        assert!(cli.into_job(0).is_err());
    }

    #[test]
    fn test_bad_rank_is_rejected() {
        assert!(Cli::try_parse_from(["oneSeq", "--min-dist", "tribe"]).is_err());
    }
}
