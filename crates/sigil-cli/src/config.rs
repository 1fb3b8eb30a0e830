//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`. Flags override file values.
//!
//! ```yaml
//! ledger_dir: ~/.local/share/sigil/ledger
//! hash_version: v2
//! zk_key_dir: /etc/sigil/zk
//! ```

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use sigil_zkp::PoseidonVersion;

/// Ledger directory used when neither flag nor config names one.
pub const DEFAULT_LEDGER_DIR: &str = ".sigil/ledger";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub ledger_dir: Option<PathBuf>,
    /// `v1`, `v2` or a full version label.
    #[serde(default)]
    pub hash_version: Option<String>,
    #[serde(default)]
    pub zk_key_dir: Option<PathBuf>,
}

impl CliConfig {
    /// Load from `path`, or return the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&text)
            .with_context(|| format!("invalid config {}", path.display()))?;
        tracing::debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    pub fn hash_version(&self, flag: Option<PoseidonVersion>) -> Result<PoseidonVersion> {
        if let Some(v) = flag {
            return Ok(v);
        }
        match &self.hash_version {
            Some(s) => s.parse().map_err(|e| anyhow!("config hash_version: {e}")),
            None => Ok(PoseidonVersion::default()),
        }
    }

    pub fn ledger_dir(&self, flag: Option<&Path>) -> PathBuf {
        flag.map(Path::to_path_buf)
            .or_else(|| self.ledger_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LEDGER_DIR))
    }

    pub fn zk_key_dir(&self, flag: Option<&Path>) -> Option<PathBuf> {
        flag.map(Path::to_path_buf).or_else(|| self.zk_key_dir.clone())
    }
}
