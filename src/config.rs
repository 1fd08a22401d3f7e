//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMEWALK_CONFIG` (environment variable)
//! 2. `~/.config/mimewalk/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimewalk\config.toml` (Windows)
//! 3. Built-in defaults

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::mime::filter::{self, FilterTable};
use crate::session::DEFAULT_HEADERS;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "MIMEWALK_CONFIG";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// What `show` prints.
    pub display: DisplayConfig,
    /// External filter commands.
    pub filters: FiltersConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Display settings for `show`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Colon-separated header names shown above the body.
    pub headers: String,
    /// Print a form feed line between messages.
    pub page_break: bool,
}

/// Filter settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiltersConfig {
    /// Filter file (`type: command` lines). `$MAILFILTER` takes precedence.
    pub file: Option<PathBuf>,
    /// Extra filters by MIME type or top-level type; these win over the file.
    pub types: BTreeMap<String, String>,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            headers: DEFAULT_HEADERS.to_string(),
            page_break: true,
        }
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("mimewalk").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimewalk")
}

/// Build the filter table: the filter file, then `[filters.types]` on top.
///
/// An unreadable filter file is reported and treated as empty.
pub fn load_filters(config: &Config) -> FilterTable {
    let mut table = match filter::filter_file_path(config.filters.file.as_deref()) {
        Some(path) => FilterTable::load(&path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring filter file");
            FilterTable::new()
        }),
        None => FilterTable::new(),
    };

    let mut inline = FilterTable::new();
    for (mime_type, command) in &config.filters.types {
        inline.insert(mime_type.as_str(), command.as_str());
    }
    table.extend(inline);
    table
}
