//! Vault configuration
//!
//! Read from TOML. Lookup order: an explicit path, then
//! `~/.config/blockvault/config.toml` (platform equivalent), then defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const METADATA_FILE: &str = "metadata.vault";
pub const CONTENT_FILE: &str = "content.vault";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the two table files
    pub vault_dir: PathBuf,
    /// Flush both stores after every mutation
    pub sync_on_write: bool,
    /// zstd level for stored blobs
    pub compression_level: i32,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            vault_dir: default_vault_dir(),
            sync_on_write: true,
            compression_level: 3,
            log_filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Parse a config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if given, else from the default location if present
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Config::default()),
        }
    }

    pub fn with_vault_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.vault_dir = dir.into();
        self
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.vault_dir.join(METADATA_FILE)
    }

    pub fn content_path(&self) -> PathBuf {
        self.vault_dir.join(CONTENT_FILE)
    }

    pub fn validate(&self) -> Result<()> {
        let levels = zstd::compression_level_range();
        if !levels.contains(&self.compression_level) {
            return Err(Error::Config(format!(
                "compression_level {} outside {}..={}",
                self.compression_level,
                levels.start(),
                levels.end()
            )));
        }
        Ok(())
    }
}

/// `~/.config/blockvault/config.toml` or the platform equivalent
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("blockvault").join("config.toml"))
}

fn default_vault_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("blockvault"))
        .unwrap_or_else(|| PathBuf::from(".blockvault"))
}
