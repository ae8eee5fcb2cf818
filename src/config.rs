//! Config module - Manages hotplug-indexer configuration (hotplug-indexer.toml).
//!
//! Configuration file contains:
//! - Index database location
//! - Progress reporting interval
//! - Block-device listing command
//! - Mount point exclusion rules

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default index database file, relative to the working directory.
pub const DEFAULT_DATABASE_NAME: &str = "storage_index.db";

/// Block-device listing command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LsblkConfig {
    /// Program to execute (looked up in PATH)
    #[serde(default = "default_lsblk_program")]
    pub program: String,
    /// Arguments requesting `mountpoint` and `hotplug` columns as JSON
    #[serde(default = "default_lsblk_args")]
    pub args: Vec<String>,
}

fn default_lsblk_program() -> String {
    "lsblk".to_string()
}

fn default_lsblk_args() -> Vec<String> {
    vec![
        "-o".to_string(),
        "mountpoint,hotplug".to_string(),
        "-J".to_string(),
    ]
}

impl Default for LsblkConfig {
    fn default() -> Self {
        Self {
            program: default_lsblk_program(),
            args: default_lsblk_args(),
        }
    }
}

/// Mount points that are never indexed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FilterConfig {
    /// Exact mount points to skip
    #[serde(default = "default_excluded_mounts")]
    pub excluded_mounts: Vec<String>,
    /// Mount point prefixes to skip
    #[serde(default = "default_system_prefixes")]
    pub system_prefixes: Vec<String>,
}

fn default_excluded_mounts() -> Vec<String> {
    vec!["/".to_string(), "/boot".to_string(), "/swap".to_string()]
}

fn default_system_prefixes() -> Vec<String> {
    vec!["/boot".to_string(), "/efi".to_string(), "/dev".to_string()]
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            excluded_mounts: default_excluded_mounts(),
            system_prefixes: default_system_prefixes(),
        }
    }
}

/// Main hotplug-indexer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Path to the SQLite index database
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Print a progress line every N indexed files (0 = never)
    #[serde(default = "default_progress_interval")]
    pub progress_interval: usize,

    /// Device listing command
    #[serde(default)]
    pub lsblk: LsblkConfig,

    /// Mount point filter
    #[serde(default)]
    pub filter: FilterConfig,
}

fn default_database_path() -> PathBuf {
    PathBuf::from(DEFAULT_DATABASE_NAME)
}

fn default_progress_interval() -> usize {
    100
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            progress_interval: default_progress_interval(),
            lsblk: LsblkConfig::default(),
            filter: FilterConfig::default(),
        }
    }
}

/// Get default config directory (~/.config/hotplug-indexer/).
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("hotplug-indexer"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get default config file path.
pub fn default_config_path() -> PathBuf {
    default_config_dir().join("hotplug-indexer.toml")
}

impl Config {
    /// Create config with a specific database path.
    pub fn with_database_path(database_path: PathBuf) -> Self {
        Self {
            database_path,
            ..Self::default()
        }
    }

    /// Load config from file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Cannot parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from default path, falling back to defaults when absent.
    pub fn load_default() -> Result<Self> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
