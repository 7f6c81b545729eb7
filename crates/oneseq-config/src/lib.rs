//! oneseq-config — `oneseq.toml` loading/saving and data-root resolution.
//!
//! Every binary resolves its configuration the same way:
//!   1. `--config <path>` if given
//!   2. `ONESEQ_CONFIG` environment variable
//!   3. `oneseq.toml` in the working directory
//!   4. built-in defaults (platform data dir)
//!
//! `.env` files are honoured for the environment variables.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use oneseq_common::error::{OneSeqError, Result};

pub const CONFIG_ENV: &str = "ONESEQ_CONFIG";
pub const DATA_ROOT_ENV: &str = "ONESEQ_DATA_ROOT";
pub const DEFAULT_CONFIG_FILE: &str = "oneseq.toml";

/// URL of the prepared data package installed by `setup1s`.
pub const DEFAULT_PACKAGE_URL: &str =
    "https://applbio.biologie.uni-frankfurt.de/download/oneseq/data_package.tar.gz";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OneSeqConfig {
    /// Root of the installed reference data (genomes, indexes, annotations).
    pub data_root: PathBuf,
    /// Where the data package is downloaded from.
    pub package_url: String,
    /// Default worker count for the search fan-out (0 = number of CPUs).
    pub workers: usize,
}

impl Default for OneSeqConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            package_url: DEFAULT_PACKAGE_URL.to_string(),
            workers: 0,
        }
    }
}

impl OneSeqConfig {
    /// Loads configuration following the resolution order above.
    /// A missing file is not an error unless it was named explicitly.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let _ = dotenvy::dotenv();

        let mut cfg = if let Some(path) = explicit {
            Self::from_file(path)?
        } else if let Ok(path) = env::var(CONFIG_ENV) {
            Self::from_file(Path::new(&path))?
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_FILE);
            if default_path.exists() {
                Self::from_file(default_path)?
            } else {
                debug!("no config file found, using defaults");
                Self::default()
            }
        };

        // Env override wins over whatever the file says.
        if let Ok(root) = env::var(DATA_ROOT_ENV) {
            cfg.data_root = PathBuf::from(root);
        }
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            OneSeqError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&text)
            .map_err(|e| OneSeqError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    pub fn save(&self, path: &Path) -> Result<Self> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| OneSeqError::Config(format!("cannot serialize config: {e}")))?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, text)?;
        Ok(self.clone())
    }

    /// Worker count with the `0 = auto` convention resolved.
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(4)
        } else {
            self.workers
        }
    }
}

/// Platform data dir + `oneseq`, falling back to `./oneseq-data`.
pub fn default_data_root() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("oneseq"))
        .unwrap_or_else(|| PathBuf::from("oneseq-data"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_toml_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oneseq.toml");
        let cfg = OneSeqConfig {
            data_root: PathBuf::from("/srv/oneseq"),
            package_url: "https://example.org/pkg.tar.gz".to_string(),
            workers: 8,
        };
        cfg.save(&path).unwrap();
        let back = OneSeqConfig::from_file(&path).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oneseq.toml");
        fs::write(&path, "data_root = \"/data/oneseq\"\n").unwrap();
        let cfg = OneSeqConfig::from_file(&path).unwrap();
        assert_eq!(cfg.data_root, PathBuf::from("/data/oneseq"));
        assert_eq!(cfg.package_url, DEFAULT_PACKAGE_URL);
        assert_eq!(cfg.workers, 0);
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        assert!(OneSeqConfig::from_file(Path::new("/nonexistent/oneseq.toml")).is_err());
    }

    #[test]
    fn test_effective_workers() {
        let cfg = OneSeqConfig { workers: 3, ..Default::default() };
        assert_eq!(cfg.effective_workers(), 3);
        let auto = OneSeqConfig { workers: 0, ..Default::default() };
        assert!(auto.effective_workers() >= 1);
    }
}
