//! Configuration loading and resolution
//!
//! Settings are resolved in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing TOML file is not fatal: a warning is logged and compiled
//! defaults apply. A TOML file that exists but cannot be parsed is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Compiled default for the catalog service base URL
pub const DEFAULT_CATALOG_URL: &str = "http://127.0.0.1:8080/api";

/// Compiled default debounce delay for query triggers
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;

/// Compiled default per-request HTTP timeout
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Environment variable overriding the catalog base URL
pub const ENV_CATALOG_URL: &str = "AERODEX_CATALOG_URL";

/// Environment variable overriding the TOML config file location
pub const ENV_CONFIG_PATH: &str = "AERODEX_CONFIG";

/// Environment variable overriding the content table location
pub const ENV_CONTENT_TABLE: &str = "AERODEX_CONTENT_TABLE";

/// Bootstrap configuration as stored in the TOML file
///
/// Every field is optional; absent fields fall through to environment
/// variables or compiled defaults.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Catalog service base URL, e.g. `https://catalog.example.com/api`
    #[serde(default)]
    pub catalog_url: Option<String>,

    /// HTTP request timeout in milliseconds
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Debounce delay in milliseconds
    #[serde(default)]
    pub debounce_ms: Option<u64>,

    /// Path to the supplementary content table (JSON)
    #[serde(default)]
    pub content_table: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub catalog_url: Option<String>,
    pub content_table: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
}

/// Fully resolved runtime configuration
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Catalog base URL without trailing slash
    pub catalog_url: String,
    pub request_timeout: Duration,
    pub debounce: Duration,
    pub content_table: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl CatalogConfig {
    /// Resolve configuration from CLI overrides, environment, TOML and defaults
    ///
    /// # Errors
    ///
    /// Returns `Error::Toml` if the TOML file exists but is malformed, and
    /// `Error::Config` for an unreadable file, a non-http(s) catalog URL or a
    /// zero request timeout.
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match resolve_config_path(overrides.config_path.as_deref()) {
            Some(path) => load_toml_config(&path)?,
            None => {
                warn!("No config file found, using compiled defaults");
                TomlConfig::default()
            }
        };

        let catalog_url = overrides
            .catalog_url
            .or_else(|| std::env::var(ENV_CATALOG_URL).ok())
            .or(toml_config.catalog_url)
            .unwrap_or_else(|| DEFAULT_CATALOG_URL.to_string());
        let catalog_url = validate_catalog_url(&catalog_url)?;

        let content_table = overrides
            .content_table
            .or_else(|| std::env::var(ENV_CONTENT_TABLE).ok().map(PathBuf::from))
            .or(toml_config.content_table);

        let debounce_ms = overrides
            .debounce_ms
            .or(toml_config.debounce_ms)
            .unwrap_or(DEFAULT_DEBOUNCE_MS);

        let request_timeout_ms = overrides
            .request_timeout_ms
            .or(toml_config.request_timeout_ms)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_MS);
        if request_timeout_ms == 0 {
            return Err(Error::Config(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }

        info!(catalog_url = %catalog_url, debounce_ms, request_timeout_ms, "Resolved catalog configuration");

        Ok(Self {
            catalog_url,
            request_timeout: Duration::from_millis(request_timeout_ms),
            debounce: Duration::from_millis(debounce_ms),
            content_table,
            logging: toml_config.logging,
        })
    }
}

/// Load and parse a TOML config file
///
/// A missing file yields `TomlConfig::default()` with a warning.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!("Config file not found: {}, using defaults", path.display());
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed ({}): {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content).map_err(|e| {
        warn!("Parse TOML failed: {}", path.display());
        Error::Toml(e)
    })?;

    info!("Loaded TOML configuration from {}", path.display());
    Ok(config)
}

/// Pick the config file location: CLI → ENV → platform default
fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(ENV_CONFIG_PATH) {
        return Some(PathBuf::from(path));
    }

    default_config_path().filter(|path| path.exists())
}

/// Platform config file location (`~/.config/aerodex/config.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("aerodex").join("config.toml"))
}

fn validate_catalog_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "Catalog URL must start with http:// or https://: {:?}",
            url
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_defaults() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert!(logging.file.is_none());
    }

    #[test]
    fn test_validate_catalog_url_strips_trailing_slash() {
        assert_eq!(
            validate_catalog_url("https://catalog.example.com/api/").unwrap(),
            "https://catalog.example.com/api"
        );
    }

    #[test]
    fn test_validate_catalog_url_rejects_other_schemes() {
        assert!(validate_catalog_url("ftp://catalog.example.com").is_err());
        assert!(validate_catalog_url("").is_err());
    }

    #[test]
    fn test_toml_partial_fields() {
        let config: TomlConfig = toml::from_str("debounce_ms = 250\n").unwrap();
        assert_eq!(config.debounce_ms, Some(250));
        assert!(config.catalog_url.is_none());
        assert_eq!(config.logging.level, "info");
    }
}
