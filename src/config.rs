//! Inspection settings loaded from `config.json`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct InspectConfig {
    /// Upper bound on clusters followed per chain. The FAT size always
    /// bounds the walk; this can only lower it.
    pub max_chain_length: Option<u32>,
    /// Report deleted directory entries.
    pub include_deleted: bool,
    /// Compare every FAT copy against the first one.
    pub compare_fat_copies: bool,
    pub format: OutputFormat,
    /// `error`, `warn`, `info`, `debug` or `trace`.
    pub log_level: String,
}

impl Default for InspectConfig {
    fn default() -> Self {
        Self {
            max_chain_length: None,
            include_deleted: true,
            compare_fat_copies: true,
            format: OutputFormat::Text,
            log_level: "info".to_string(),
        }
    }
}

impl InspectConfig {
    /// Get the user config directory path
    pub fn user_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("fat-inspector"))
    }

    /// Get the user config file path
    pub fn user_config_path() -> Option<PathBuf> {
        Self::user_config_dir().map(|dir| dir.join("config.json"))
    }

    /// Load configuration from the first `config.json` found in the user
    /// config directory, the current directory, or next to the executable.
    /// Falls back to defaults when none exists or none parses.
    pub fn load() -> Self {
        let mut candidates = Vec::new();
        if let Some(user_config) = Self::user_config_path() {
            candidates.push(user_config);
        }
        candidates.push(PathBuf::from("config.json"));
        if let Some(exe_dir) = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
        {
            candidates.push(exe_dir.join("config.json"));
        }

        for path in candidates.iter().filter(|p| p.is_file()) {
            match Self::load_from_path(path) {
                Ok(config) => {
                    log::debug!("loaded configuration from {}", path.display());
                    return config;
                }
                Err(e) => log::warn!("ignoring {}: {e:#}", path.display()),
            }
        }

        Self::default()
    }

    /// Load an explicit configuration file. Unlike [`InspectConfig::load`],
    /// a missing or malformed file is an error.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid settings in {}", path.display()))?;
        Ok(config)
    }

    /// Reject values the inspector cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_chain_length == Some(0) {
            bail!("max_chain_length must be at least 1");
        }
        Ok(())
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
