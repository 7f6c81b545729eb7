//! addTaxa1s — batch proteome intake from a mapping file.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use console::style;

use oneseq_cli::{init_tracing, open_data_root};
use oneseq_ingest::{add_taxa, AddTaxonOptions};

#[derive(Parser, Debug)]
#[command(name = "addTaxa1s", version, about = "Add a batch of proteomes to the data root")]
struct Cli {
    /// Config file (else ONESEQ_CONFIG, else ./oneseq.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data root override.
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Directory holding the proteome FASTA files.
    #[arg(long)]
    input: PathBuf,

    /// Tab-separated mapping: filename, NCBI id, optional code, optional version.
    #[arg(long)]
    mapping: PathBuf,

    /// Skip building the k-mer search indexes.
    #[arg(long)]
    no_index: bool,

    /// Skip computing the feature annotations.
    #[arg(long)]
    no_anno: bool,

    /// Overwrite existing registrations.
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (_, root) = open_data_root(cli.config.as_deref(), cli.data_root.as_ref())?;
    let opts = AddTaxonOptions {
        code: None,
        version: 1,
        build_index: !cli.no_index,
        annotate: !cli.no_anno,
        anno_file: None,
        force: cli.force,
    };
    let report = add_taxa(&root, &cli.input, &cli.mapping, &opts)?;

    println!(
        "{} registered {} taxa, {} failed",
        style("addTaxa1s").green().bold(),
        report.added.len(),
        report.failures.len()
    );
    for (file, reason) in &report.failures {
        println!("  {} {file}: {reason}", style("failed:").red());
    }
    if report.added.is_empty() {
        bail!("no taxa were registered");
    }
    Ok(())
}
