//! Application configuration.
//!
//! The configuration is loaded from a JSON file at
//! `$XDG_CONFIG_HOME/yabswitch/config.json`.  The top-level schema uses one
//! key per section so the file can grow additional sections later without
//! breaking backward compatibility.
//!
//! # Example
//!
//! ```json
//! {
//!   "daemon": { "program": "/opt/homebrew/bin/yabai" },
//!   "cache": { "staleness_ms": 300000 },
//!   "applications": { "directories": ["/Applications"] },
//!   "ranking": { "policy": "recency-pair" }
//! }
//! ```

use crate::command::RankingPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
///
/// Every field is optional; a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// How to reach the window-manager daemon.
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Cache location and staleness behavior.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Where installed applications are discovered.
    #[serde(default)]
    pub applications: ApplicationsConfig,

    /// Search-result ordering.
    #[serde(default)]
    pub ranking: RankingConfig,
}

/// How to reach the window-manager daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// Binary name or absolute path, resolved through `PATH` when bare.
    pub program: String,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self { program: "yabai".into() }
    }
}

/// Cache staleness behavior.
///
/// The same period drives both the staleness check on activation and the
/// background refresh tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// A cached snapshot older than this (milliseconds) triggers a refresh
    /// on activation.
    pub staleness_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        // Five minutes.
        Self { staleness_ms: 300_000 }
    }
}

/// Where installed applications are discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationsConfig {
    /// Directories scanned for `.app` bundles.
    pub directories: Vec<PathBuf>,
}

impl Default for ApplicationsConfig {
    fn default() -> Self {
        let mut directories = vec![
            PathBuf::from("/Applications"),
            PathBuf::from("/System/Applications"),
        ];
        if let Some(home) = dirs::home_dir() {
            directories.push(home.join("Applications"));
        }
        Self { directories }
    }
}

/// Search-result ordering.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    /// Policy used until the user switches it; the last choice persists in
    /// the cache and wins over this value.
    pub policy: RankingPolicy,
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
