//! merge1sOutput — combine the outputs of several runs into one set.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use console::style;

use oneseq_cli::init_tracing;
use oneseq_config::OneSeqConfig;
use oneseq_profile::merge_outputs;

#[derive(Parser, Debug)]
#[command(name = "merge1sOutput", version, about = "Merge oneSeq run outputs")]
struct Cli {
    /// Config file (else ONESEQ_CONFIG, else ./oneseq.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run output directory (repeatable).
    #[arg(long, required = true)]
    input: Vec<PathBuf>,

    /// Output prefix, e.g. `merged/all_groups`.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    // Merging works on plain paths; the config is only validated if named.
    let _ = OneSeqConfig::load(cli.config.as_deref())?;
    let report = merge_outputs(&cli.input, &cli.out)?;

    println!(
        "{} merged {} run(s) into {}.*",
        style("merge1sOutput").green().bold(),
        report.inputs_merged,
        cli.out.display()
    );
    println!(
        "  {} profile rows, {} sequences, {}/{} forward/reverse domain rows",
        report.phyloprofile_rows,
        report.extended_records,
        report.forward_domain_rows,
        report.reverse_domain_rows
    );
    Ok(())
}
