//! addTaxon1s — register one proteome in the data root.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use console::style;

use oneseq_cli::{init_tracing, open_data_root};
use oneseq_ingest::{add_taxon, AddTaxonOptions};

#[derive(Parser, Debug)]
#[command(name = "addTaxon1s", version, about = "Add one proteome to the data root")]
struct Cli {
    /// Config file (else ONESEQ_CONFIG, else ./oneseq.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data root override.
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Proteome FASTA file.
    #[arg(long)]
    fasta: PathBuf,

    /// NCBI taxonomy id of the proteome.
    #[arg(long)]
    id: u32,

    /// Taxon code (default: derived from the file name).
    #[arg(long)]
    code: Option<String>,

    /// Proteome version.
    #[arg(long, default_value_t = 1)]
    version: u32,

    /// Skip building the k-mer search index.
    #[arg(long)]
    no_index: bool,

    /// Skip computing the feature annotation.
    #[arg(long)]
    no_anno: bool,

    /// Externally produced annotation JSON to merge in (replaces built-in
    /// features of the same name).
    #[arg(long)]
    anno_file: Option<PathBuf>,

    /// Overwrite an existing registration of the same taxon.
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let (_, root) = open_data_root(cli.config.as_deref(), cli.data_root.as_ref())?;
    let opts = AddTaxonOptions {
        code: cli.code,
        version: cli.version,
        build_index: !cli.no_index,
        annotate: !cli.no_anno,
        anno_file: cli.anno_file,
        force: cli.force,
    };
    let spec = add_taxon(&root, &cli.fasta, cli.id, &opts)?;

    println!("{} registered {}", style("addTaxon1s").green().bold(), style(&spec).bold());
    Ok(())
}
