//! Sync engine configuration
//!
//! Provides the configuration types for the offline engine, a builder with
//! validation and loading from a TOML file.
//!
//! ```toml
//! server_url = "https://field.example.com"
//! request_timeout_ms = 10000
//! connectivity_debounce_ms = 3000
//! drain_interval_secs = 60
//! max_auto_attempts = 5      # 0 = retry automatically forever
//! backoff_base_ms = 5000
//! backoff_max_ms = 300000
//! data_dir = "/var/lib/sitesync"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default server URL
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000";

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Base URL of the field API
    pub server_url: String,
    /// Upper bound for a single network write
    pub request_timeout: Duration,
    /// How long "online" must hold before it is published
    pub connectivity_debounce: Duration,
    /// Periodic fallback drain interval
    pub drain_interval: Duration,
    /// Automatic replays of a transiently failed record; `None` = unlimited
    pub max_auto_attempts: Option<u32>,
    /// First backoff step after a failed replay
    pub backoff_base: Duration,
    /// Backoff ceiling
    pub backoff_max: Duration,
    /// Directory holding the local store; platform data dir when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            connectivity_debounce: Duration::from_secs(3),
            drain_interval: Duration::from_secs(60),
            max_auto_attempts: Some(5),
            backoff_base: Duration::from_secs(5),
            backoff_max: Duration::from_secs(300),
            data_dir: None,
        }
    }
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scheme_ok = self.server_url.starts_with("http://") || self.server_url.starts_with("https://");
        if !scheme_ok || reqwest::Url::parse(&self.server_url).is_err() {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("request_timeout must be non-zero"));
        }
        if self.drain_interval.is_zero() {
            return Err(ConfigError::InvalidValue("drain_interval must be non-zero"));
        }
        if self.backoff_base > self.backoff_max {
            return Err(ConfigError::InvalidValue("backoff_base exceeds backoff_max"));
        }
        Ok(())
    }

    /// Parse a TOML document on top of the defaults
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(input)?;
        file.into_builder().build()
    }

    /// Load a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&input)
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    server_url: Option<String>,
    request_timeout: Option<Duration>,
    connectivity_debounce: Option<Duration>,
    drain_interval: Option<Duration>,
    max_auto_attempts: Option<Option<u32>>,
    backoff_base: Option<Duration>,
    backoff_max: Option<Duration>,
    data_dir: Option<PathBuf>,
}

impl SyncConfigBuilder {
    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = Some(url.into());
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn connectivity_debounce(mut self, debounce: Duration) -> Self {
        self.connectivity_debounce = Some(debounce);
        self
    }

    pub fn drain_interval(mut self, interval: Duration) -> Self {
        self.drain_interval = Some(interval);
        self
    }

    /// `None` retries transient failures automatically forever
    pub fn max_auto_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_auto_attempts = Some(attempts);
        self
    }

    pub fn backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = Some(base);
        self.backoff_max = Some(max);
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();
        let config = SyncConfig {
            server_url: self
                .server_url
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.server_url),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            connectivity_debounce: self
                .connectivity_debounce
                .unwrap_or(defaults.connectivity_debounce),
            drain_interval: self.drain_interval.unwrap_or(defaults.drain_interval),
            max_auto_attempts: self.max_auto_attempts.unwrap_or(defaults.max_auto_attempts),
            backoff_base: self.backoff_base.unwrap_or(defaults.backoff_base),
            backoff_max: self.backoff_max.unwrap_or(defaults.backoff_max),
            data_dir: self.data_dir.or(defaults.data_dir),
        };
        config.validate()?;
        Ok(config)
    }
}

/// On-disk shape of the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    server_url: Option<String>,
    request_timeout_ms: Option<u64>,
    connectivity_debounce_ms: Option<u64>,
    drain_interval_secs: Option<u64>,
    max_auto_attempts: Option<u32>,
    backoff_base_ms: Option<u64>,
    backoff_max_ms: Option<u64>,
    data_dir: Option<PathBuf>,
}

impl ConfigFile {
    fn into_builder(self) -> SyncConfigBuilder {
        let defaults = SyncConfig::default();
        let mut builder = SyncConfig::builder();
        if let Some(url) = self.server_url {
            builder = builder.server_url(url);
        }
        if let Some(ms) = self.request_timeout_ms {
            builder = builder.request_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.connectivity_debounce_ms {
            builder = builder.connectivity_debounce(Duration::from_millis(ms));
        }
        if let Some(secs) = self.drain_interval_secs {
            builder = builder.drain_interval(Duration::from_secs(secs));
        }
        if let Some(attempts) = self.max_auto_attempts {
            builder = builder.max_auto_attempts((attempts > 0).then_some(attempts));
        }
        if self.backoff_base_ms.is_some() || self.backoff_max_ms.is_some() {
            builder = builder.backoff(
                self.backoff_base_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.backoff_base),
                self.backoff_max_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.backoff_max),
            );
        }
        if let Some(dir) = self.data_dir {
            builder = builder.data_dir(dir);
        }
        builder
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("invalid value: {0}")]
    InvalidValue(&'static str),
    #[error("cannot parse configuration: {0}")]
    Parse(String),
    #[error("cannot read configuration: {0}")]
    Io(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
