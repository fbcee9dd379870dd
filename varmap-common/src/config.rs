//! Configuration file resolution and TOML bootstrap loading
//!
//! Config file location follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`VARMAP_CONFIG`)
//! 3. Per-user config directory (`~/.config/varmap/varmap.toml` on Linux)
//! 4. Compiled defaults (no file at all)
//!
//! A missing config file never terminates startup: a warning is logged and
//! compiled defaults are used. The one exception is a path given explicitly on
//! the command line, which must exist.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "VARMAP_CONFIG";

/// Config file name inside the per-user config directory
pub const CONFIG_FILE_NAME: &str = "varmap.toml";

/// Logging configuration
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Compiled-in defaults used when no configuration is available
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    /// Default per-user config file location (None if the platform has no config dir)
    pub config_file: Option<PathBuf>,
    /// Default log level
    pub log_level: String,
}

impl CompiledDefaults {
    /// Defaults for the platform this binary was built for
    pub fn for_current_platform() -> Self {
        Self {
            config_file: dirs::config_dir().map(|d| d.join("varmap").join(CONFIG_FILE_NAME)),
            log_level: default_log_level(),
        }
    }
}

/// Where a config file path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
}

impl ConfigSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigSource::CommandLine => "command line",
            ConfigSource::Environment => "environment",
            ConfigSource::UserConfigDir => "user config dir",
        }
    }
}

/// Resolved config file location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLocation {
    pub path: PathBuf,
    pub source: ConfigSource,
}

/// Config file resolver
///
/// Applies the CLI → ENV → user config dir priority order. Returns `None`
/// when no candidate exists, meaning compiled defaults apply.
pub struct ConfigFileResolver {
    env_var_name: String,
    defaults: CompiledDefaults,
}

impl ConfigFileResolver {
    /// Create a resolver reading `VARMAP_CONFIG`
    pub fn new() -> Self {
        Self::with_env_var(CONFIG_ENV_VAR)
    }

    /// Create a resolver reading a custom environment variable
    pub fn with_env_var(env_var_name: &str) -> Self {
        Self {
            env_var_name: env_var_name.to_string(),
            defaults: CompiledDefaults::for_current_platform(),
        }
    }

    /// Resolve the config file location
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<ConfigLocation> {
        // Priority 1: Command-line argument
        if let Some(path) = cli_arg {
            return Some(ConfigLocation {
                path: path.to_path_buf(),
                source: ConfigSource::CommandLine,
            });
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some(ConfigLocation {
                    path: PathBuf::from(path),
                    source: ConfigSource::Environment,
                });
            }
        }

        // Priority 3: Per-user config directory, only if the file is there
        match &self.defaults.config_file {
            Some(path) if path.exists() => Some(ConfigLocation {
                path: path.clone(),
                source: ConfigSource::UserConfigDir,
            }),
            _ => None,
        }
    }
}

impl Default for ConfigFileResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a TOML file into `T`
///
/// # Errors
/// `Error::Io` if the file cannot be read, `Error::Config` if it is not valid TOML
/// for `T`.
pub fn load_toml_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML {} failed: {}", path.display(), e)))
}

/// Load configuration from a resolved location, falling back to defaults
///
/// Missing files degrade to `T::default()` with a warning, except when the
/// path was given on the command line.
pub fn load_or_default<T>(location: Option<&ConfigLocation>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(location) = location else {
        info!("No config file found, using compiled defaults");
        return Ok(T::default());
    };

    if !location.path.exists() {
        if location.source == ConfigSource::CommandLine {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                location.path.display()
            )));
        }
        warn!(
            path = %location.path.display(),
            source = location.source.as_str(),
            "Config file missing, using compiled defaults"
        );
        return Ok(T::default());
    }

    let config = load_toml_file(&location.path)?;
    info!(
        path = %location.path.display(),
        source = location.source.as_str(),
        "Loaded config file"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Sample {
        #[serde(default)]
        logging: LoggingConfig,
        #[serde(default)]
        name: Option<String>,
    }

    #[test]
    fn test_logging_config_defaults_to_info() {
        assert_eq!(LoggingConfig::default().level, "info");

        let parsed: Sample = toml::from_str("[logging]\n").unwrap();
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_cli_argument_wins() {
        let resolver = ConfigFileResolver::with_env_var("VARMAP_TEST_UNSET_CONFIG_VAR");
        let location = resolver.resolve(Some(Path::new("/tmp/explicit.toml"))).unwrap();
        assert_eq!(location.path, PathBuf::from("/tmp/explicit.toml"));
        assert_eq!(location.source, ConfigSource::CommandLine);
    }

    #[test]
    fn test_missing_cli_file_is_an_error() {
        let location = ConfigLocation {
            path: PathBuf::from("/nonexistent/varmap/explicit.toml"),
            source: ConfigSource::CommandLine,
        };
        let result: Result<Sample> = load_or_default(Some(&location));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_env_file_degrades_to_defaults() {
        let location = ConfigLocation {
            path: PathBuf::from("/nonexistent/varmap/env.toml"),
            source: ConfigSource::Environment,
        };
        let sample: Sample = load_or_default(Some(&location)).unwrap();
        assert!(sample.name.is_none());
        assert_eq!(sample.logging, LoggingConfig::default());
    }

    #[test]
    fn test_no_location_uses_defaults() {
        let sample: Sample = load_or_default(None).unwrap();
        assert!(sample.name.is_none());
    }
}
