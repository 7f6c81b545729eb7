//! setup1s — download and install the oneSeq reference data package.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use console::style;
use dialoguer::Confirm;
use tracing::info;
use tracing_subscriber::EnvFilter;

use oneseq_config::{OneSeqConfig, DEFAULT_CONFIG_FILE};
use oneseq_setup::{
    download_package, fetch_sidecar_checksum, install_from_archive, verify_checksum, ScratchDir,
};

#[derive(Parser, Debug)]
#[command(name = "setup1s", version, about = "Install the oneSeq reference data package")]
struct Cli {
    /// Config file to read defaults from and record the install in.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Where to install the data (default: config value, then platform data dir).
    #[arg(long)]
    data_root: Option<PathBuf>,

    /// Package URL override.
    #[arg(long)]
    url: Option<String>,

    /// Expected SHA-256 of the package (default: the URL's .sha256 sidecar).
    #[arg(long)]
    sha256: Option<String>,

    /// Install from a local archive instead of downloading.
    #[arg(long)]
    offline: Option<PathBuf>,

    /// Replace an existing installation.
    #[arg(long)]
    force: bool,

    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("ONESEQ_LOG")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("oneseq=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut config = OneSeqConfig::load(cli.config.as_deref()).context("loading configuration")?;
    let data_root = cli.data_root.clone().unwrap_or_else(|| config.data_root.clone());
    let url = cli.url.clone().unwrap_or_else(|| config.package_url.clone());

    if data_root.join("genome_dir").exists() {
        if !cli.force {
            bail!(
                "{} already holds installed data; re-run with --force to replace it",
                data_root.display()
            );
        }
        let confirmed = cli.yes
            || Confirm::new()
                .with_prompt(format!("Replace the installed data at {}?", data_root.display()))
                .default(false)
                .interact()?;
        if !confirmed {
            println!("aborted");
            return Ok(());
        }
    }

    // The scratch directory is removed on drop, so early error returns
    // below do not leave a partial download behind.
    let tmp = ScratchDir::create(&data_root)?;
    let root = fetch_and_install(&cli, &url, &data_root, tmp.path()).await?;
    drop(tmp);

    config.data_root = data_root.clone();
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    config.save(&config_path)?;

    let taxa = root.list_taxa()?;
    println!(
        "{} installed {} taxa into {}",
        style("setup1s").green().bold(),
        taxa.len(),
        style(data_root.display()).bold()
    );
    println!("  configuration written to {}", config_path.display());
    Ok(())
}

async fn fetch_and_install(
    cli: &Cli,
    url: &str,
    data_root: &Path,
    tmp: &Path,
) -> Result<oneseq_data::DataRoot> {
    let archive = match &cli.offline {
        Some(path) => {
            if !path.is_file() {
                bail!("offline archive {} does not exist", path.display());
            }
            path.clone()
        }
        None => {
            println!("downloading {}", style(url).bold());
            download_package(url, &tmp.join("oneseq-data.tar.gz")).await?
        }
    };

    let expected = match &cli.sha256 {
        Some(hex) => Some(hex.clone()),
        None if cli.offline.is_none() => fetch_sidecar_checksum(url).await,
        None => None,
    };
    match expected {
        Some(hex) => {
            verify_checksum(&archive, &hex)?;
            info!("checksum verified");
        }
        None => println!(
            "{} no checksum available for the package, skipping verification",
            style("warning:").yellow()
        ),
    }

    install_from_archive(&archive, data_root, cli.force)
}
