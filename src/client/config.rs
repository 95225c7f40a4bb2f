use crate::shared::config::{ConfigError, SyncConfig, SyncConfigBuilder};
use std::path::Path;

/// Environment variable overriding the server URL
pub const ENV_SERVER_URL: &str = "SITESYNC_SERVER_URL";
/// Environment variable overriding the store directory
pub const ENV_DATA_DIR: &str = "SITESYNC_DATA_DIR";
/// Environment variable carrying the bearer token
pub const ENV_AUTH_TOKEN: &str = "SITESYNC_AUTH_TOKEN";

/// Client configuration: engine settings plus session credentials.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sync: SyncConfig,
    token: Option<String>,
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builder(builder: SyncConfigBuilder) -> Result<Self, ConfigError> {
        Ok(Self {
            sync: builder.build()?,
            token: None,
        })
    }

    pub fn from_sync_config(sync: SyncConfig) -> Self {
        Self { sync, token: None }
    }

    /// Defaults, overridden by `SITESYNC_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_sync_config(SyncConfig::default()).apply_env()
    }

    /// TOML file, overridden by `SITESYNC_*` environment variables
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_sync_config(SyncConfig::load(path)?).apply_env()
    }

    fn apply_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(url) = std::env::var(ENV_SERVER_URL) {
            self.sync.server_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
            self.sync.data_dir = Some(dir.into());
        }
        self.token = std::env::var(ENV_AUTH_TOKEN).ok().filter(|t| !t.is_empty());
        self.sync.validate()?;
        Ok(self)
    }

    /// Set the bearer token
    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    /// Get the bearer token
    pub fn get_token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    /// Clear the token (logout)
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    pub fn server_url(&self) -> &str {
        &self.sync.server_url
    }

    pub fn sync(&self) -> &SyncConfig {
        &self.sync
    }
}
