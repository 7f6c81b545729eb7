//! checkData1s — consistency checks for an installed data root.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use console::style;

use oneseq_cli::{init_tracing, open_data_root};
use oneseq_data::{validate_data_root, Severity, ValidateOptions};

#[derive(Parser, Debug)]
#[command(name = "checkData1s", version, about = "Validate an installed data root")]
struct Cli {
    /// Config file (else ONESEQ_CONFIG, else ./oneseq.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Data root override.
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Also re-run the aligner against each proteome (slow).
    #[arg(long)]
    reblast: bool,

    /// Print only the final verdict.
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<ExitCode> {
    init_tracing();
    let cli = Cli::parse();

    let (_, root) = open_data_root(cli.config.as_deref(), cli.data_root.as_ref())?;
    let report =
        validate_data_root(&root, ValidateOptions { alignment_self_test: cli.reblast })?;

    if !cli.quiet {
        for issue in &report.issues {
            let tag = match issue.severity {
                Severity::Error => style("ERROR").red().bold(),
                Severity::Warning => style("WARNING").yellow(),
            };
            match &issue.taxon {
                Some(taxon) => println!("{tag} [{taxon}] {}", issue.message),
                None => println!("{tag} {}", issue.message),
            }
        }
    }

    println!(
        "checked {} taxa: {} error(s), {} warning(s)",
        report.taxa_checked,
        report.error_count(),
        report.warning_count()
    );
    if report.is_ok() {
        println!("{}", style("data root is consistent").green());
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
