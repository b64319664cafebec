//! Configuration management for the Eventdesk client.

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::{CoreError, CoreResult, Paths};

/// Default backend API URL (can be overridden at compile time via the
/// EVENTDESK_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("EVENTDESK_API_URL") {
    Some(url) => url,
    None => "https://demo.eventdesk.io",
};

/// Default publishable API key (can be overridden at compile time via the
/// EVENTDESK_PUBLISHABLE_KEY env var).
pub const DEFAULT_PUBLISHABLE_KEY: &str = match option_env!("EVENTDESK_PUBLISHABLE_KEY") {
    Some(key) => key,
    None => "demo-publishable-key",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Backend project API URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Publishable API key (public, safe to expose).
    #[serde(default = "default_publishable_key")]
    pub publishable_key: String,
    /// Feed channel URL. Derived from `api_url` when absent.
    #[serde(default)]
    pub feed_url: Option<String>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_publishable_key() -> String {
    DEFAULT_PUBLISHABLE_KEY.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            publishable_key: DEFAULT_PUBLISHABLE_KEY.to_string(),
            feed_url: None,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from the
    /// environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults.
    /// `api_url` and `publishable_key` are compile-time only and always
    /// use the built-in defaults, regardless of what's in the file.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        // Force compile-time values (never from the config file)
        config.api_url = DEFAULT_API_URL.to_string();
        config.publishable_key = DEFAULT_PUBLISHABLE_KEY.to_string();

        // Environment variables can only override the log level
        config.load_from_env();

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the config file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables. Only the log
    /// level is runtime-overridable.
    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("EVENTDESK_LOG_LEVEL") {
            self.log_level = log_level;
        }
    }

    /// Get the API URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    /// The feed channel URL: explicit when configured, otherwise derived
    /// from the API URL (`https://` becomes `wss://`, path `/feed/v1`).
    pub fn feed_url(&self) -> CoreResult<String> {
        if let Some(url) = &self.feed_url {
            return Ok(url.clone());
        }
        let mut url = self.api_url()?;
        let scheme = if url.scheme() == "http" { "ws" } else { "wss" };
        url.set_scheme(scheme)
            .map_err(|_| CoreError::Path(format!("cannot derive feed URL from {}", self.api_url)))?;
        url.set_path("/feed/v1");
        Ok(url.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.publishable_key, DEFAULT_PUBLISHABLE_KEY);
        assert!(config.feed_url.is_none());
    }

    #[test]
    fn test_config_load_from_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");

        let config_json = r#"{
            "log_level": "debug"
        }"#;

        std::fs::write(&config_path, config_json).unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_config_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let mut config = Config::default();
        config.log_level = "trace".to_string();

        config.save(&paths).unwrap();

        let loaded = Config::load(&paths).unwrap();
        assert_eq!(loaded.log_level, "trace");
    }

    #[test]
    fn test_config_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_feed_url_derivation() {
        let mut config = Config::default();
        config.api_url = "https://proj.example.co".to_string();
        assert_eq!(config.feed_url().unwrap(), "wss://proj.example.co/feed/v1");

        config.api_url = "http://localhost:54321".to_string();
        assert_eq!(config.feed_url().unwrap(), "ws://localhost:54321/feed/v1");
    }

    #[test]
    fn test_feed_url_explicit_wins() {
        let mut config = Config::default();
        config.feed_url = Some("wss://feed.elsewhere.io/v2".to_string());
        assert_eq!(config.feed_url().unwrap(), "wss://feed.elsewhere.io/v2");
    }

    #[test]
    fn test_config_invalid_url() {
        let mut config = Config::default();
        config.api_url = "not a valid url".to_string();
        assert!(config.api_url().is_err());
    }
}
