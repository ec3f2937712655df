//! Configuration file parser for ~/.config/podsync/config.toml.
//!
//! The config file is optional: a missing or empty file yields `Config::default()`.
//! Unknown keys are accepted and logged as warnings, since they are usually typos.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User-Agent sent with every feed and directory request.
    pub user_agent: String,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Per-read timeout in seconds.
    pub read_timeout_secs: u64,

    /// Redirects followed before a request fails.
    pub max_redirects: usize,

    /// Largest feed document accepted, in bytes.
    pub max_feed_bytes: usize,

    /// Feeds fetched at once by a refresh of all subscriptions. 1 = sequential.
    pub max_concurrent_fetches: usize,

    /// Podcast directory search endpoint (iTunes Search API compatible).
    pub directory_url: String,

    /// Maximum number of directory search results requested.
    pub directory_limit: u32,

    /// SQLite database path. Defaults to `podsync.db` in the config directory.
    pub database: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user_agent: concat!("podsync/", env!("CARGO_PKG_VERSION")).to_string(),
            connect_timeout_secs: 30,
            read_timeout_secs: 30,
            max_redirects: 10,
            max_feed_bytes: 10 * 1024 * 1024,
            max_concurrent_fetches: 4,
            directory_url: "https://itunes.apple.com/search".to_string(),
            directory_limit: 20,
            database: None,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 9] = [
        "user_agent",
        "connect_timeout_secs",
        "read_timeout_secs",
        "max_redirects",
        "max_feed_bytes",
        "max_concurrent_fetches",
        "directory_url",
        "directory_limit",
        "database",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let mut config: Config = toml::from_str(&content)?;
        if config.max_concurrent_fetches == 0 {
            tracing::warn!("max_concurrent_fetches = 0 is not usable, fetching sequentially");
            config.max_concurrent_fetches = 1;
        }
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
