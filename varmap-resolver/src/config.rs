//! Configuration for the resolution engine
//!
//! Bootstrap configuration is read once at startup from TOML.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--catalog`)
//! 2. Environment variables (`VARMAP_CONFIG`, `VARMAP_CATALOG`)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::Result;
use crate::parser::ParserConfig;
use crate::scorer::ScoringConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use varmap_common::config::{load_or_default, ConfigFileResolver, ConfigLocation, LoggingConfig};

/// Environment variable naming the catalog file
pub const CATALOG_ENV_VAR: &str = "VARMAP_CATALOG";

/// Engine configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Catalog snapshot file (JSON)
    #[serde(default)]
    pub catalog_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub scoring: ScoringConfig,

    #[serde(default)]
    pub parser: ParserConfig,

    #[serde(default)]
    pub resolution: ResolutionConfig,

    #[serde(default)]
    pub reload: ReloadConfig,
}

/// What to do when a listing names no mint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownMintPolicy {
    /// Fail with `IncompleteListing { missing: "mint" }`
    #[default]
    Refuse,
    /// Resolve in every mint group for the series and year
    SearchAllMints,
}

/// `[resolution]` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ResolutionConfig {
    #[serde(default)]
    pub unknown_mint_policy: UnknownMintPolicy,
}

/// `[reload]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReloadConfig {
    /// Catalog file poll interval in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl ReloadConfig {
    pub fn poll_interval(&self) -> Duration {
        // A zero interval would make tokio::time::interval panic
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

fn default_poll_interval_ms() -> u64 {
    2000
}

impl EngineConfig {
    /// Resolve and load the config file
    ///
    /// Returns the configuration together with where it came from (`None`
    /// when compiled defaults were used).
    ///
    /// # Errors
    /// A `--config` path that does not exist, or any malformed TOML file.
    pub fn load(cli_config: Option<&Path>) -> Result<(Self, Option<ConfigLocation>)> {
        let location = ConfigFileResolver::new().resolve(cli_config);
        let config: EngineConfig = load_or_default(location.as_ref())?;
        Ok((config, location))
    }

    /// Catalog path: `--catalog` beats `VARMAP_CATALOG` beats the TOML value
    pub fn catalog_path(&self, cli_catalog: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = cli_catalog {
            info!(path = %path.display(), "Catalog path from command line");
            return Some(path.to_path_buf());
        }

        if let Ok(value) = std::env::var(CATALOG_ENV_VAR) {
            if !value.trim().is_empty() {
                info!(path = %value, "Catalog path from {}", CATALOG_ENV_VAR);
                return Some(PathBuf::from(value));
            }
        }

        self.catalog_path.clone()
    }
}
