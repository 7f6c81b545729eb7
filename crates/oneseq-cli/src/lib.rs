//! Shared plumbing for the oneSeq command line binaries: logging setup,
//! config resolution, and data root opening.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use oneseq_config::OneSeqConfig;
use oneseq_data::DataRoot;

/// Environment variable for the log filter, tried before `RUST_LOG`.
pub const LOG_ENV: &str = "ONESEQ_LOG";

/// Structured logging to stderr. `ONESEQ_LOG` wins over `RUST_LOG`;
/// default filter keeps the workspace at info.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("oneseq=info,warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config (`--config` > `ONESEQ_CONFIG` > `oneseq.toml` > defaults)
/// and opens the data root, letting a `--data-root` flag override the config.
pub fn open_data_root(
    config_path: Option<&Path>,
    data_root_flag: Option<&PathBuf>,
) -> Result<(OneSeqConfig, DataRoot)> {
    let config = OneSeqConfig::load(config_path).context("loading configuration")?;
    let root_path = data_root_flag.cloned().unwrap_or_else(|| config.data_root.clone());
    let root = DataRoot::open(&root_path).with_context(|| {
        format!(
            "no installed data found at {} (run setup1s first, or pass --data-root)",
            root_path.display()
        )
    })?;
    Ok((config, root))
}
