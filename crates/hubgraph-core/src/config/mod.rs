//! Configuration management for HubGraph.
//!
//! Configuration is loaded from multiple sources with the following priority:
//! 1. Command-line flags (applied by the binary, highest priority)
//! 2. Environment variables
//! 3. Project-local `hubgraph.toml` file
//! 4. User config `~/.config/hubgraph/config.toml`
//! 5. Built-in defaults (lowest priority)

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

mod defaults;

pub use defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API configuration.
    pub github: GitHubConfig,

    /// Poll loop configuration.
    pub poll: PollConfig,

    /// Query server configuration.
    pub server: ServerConfig,
}

impl Config {
    /// Load configuration from default locations.
    ///
    /// Searches for config in order:
    /// 1. `./hubgraph.toml` (project local)
    /// 2. `~/.config/hubgraph/config.toml` (user config)
    /// 3. Falls back to defaults
    ///
    /// Environment overrides are applied in every case.
    pub fn load() -> Result<Self, ConfigError> {
        if Path::new("hubgraph.toml").exists() {
            return Self::from_file("hubgraph.toml");
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("hubgraph").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        let mut config = Self::default();
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("HUBGRAPH_TOKEN").or_else(|_| std::env::var("GITHUB_TOKEN")) {
            if !token.is_empty() {
                self.github.token = Some(token);
            }
        }
        if let Ok(url) = std::env::var("HUBGRAPH_API_URL") {
            self.github.api_url = url;
        }

        if let Ok(pages) = std::env::var("HUBGRAPH_PAGES") {
            if let Ok(n) = pages.parse() {
                self.poll.pages = n;
            }
        }
        if let Ok(delay) = std::env::var("HUBGRAPH_DELAY") {
            if let Ok(n) = delay.parse() {
                self.poll.delay_secs = Some(n);
            }
        }

        if let Ok(port) = std::env::var("HUBGRAPH_PORT") {
            if let Ok(n) = port.parse() {
                self.server.port = n;
            }
        }
    }

    /// Check the values that would make the poll loop misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.github.api_url.trim().is_empty() {
            return Err(ConfigError::Invalid("github.api_url must not be empty".into()));
        }
        if self.poll.pages == 0 {
            return Err(ConfigError::Invalid("poll.pages must be at least 1".into()));
        }
        if self.poll.delay_secs == Some(0) {
            return Err(ConfigError::Invalid("poll.delay_secs must be greater than 0".into()));
        }
        Ok(())
    }

    /// Create a default config file content as a string.
    pub fn default_config_string() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Upstream API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// Base URL of the REST API.
    pub api_url: String,

    /// Personal access token. Raises the quota from 60 to 5000 req/hr.
    #[serde(skip_serializing)]
    pub token: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// User agent header value.
    pub user_agent: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl GitHubConfig {
    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Poll loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// How many event pages to read per run.
    pub pages: u32,

    /// Fixed delay between refreshes. When unset, the API's suggested
    /// poll interval (scaled by page count) is used.
    pub delay_secs: Option<u64>,

    /// Seconds to wait past a rate-limit reset.
    pub rate_limit_margin_secs: u64,

    /// Maximum whole-run restarts after hitting the rate limit.
    pub max_rate_limit_restarts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            pages: DEFAULT_PAGES,
            delay_secs: None,
            rate_limit_margin_secs: DEFAULT_RATE_LIMIT_MARGIN_SECS,
            max_rate_limit_restarts: DEFAULT_MAX_RATE_LIMIT_RESTARTS,
        }
    }
}

/// Query server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Optional directory of static front-end files served at `/`.
    pub public_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            public_dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert_eq!(config.poll.pages, DEFAULT_PAGES);
        assert_eq!(config.server.port, DEFAULT_PORT);
        assert!(config.poll.delay_secs.is_none());
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(toml_str.contains("[github]"));
        assert!(toml_str.contains("[poll]"));
        assert!(toml_str.contains("[server]"));
    }

    #[test]
    fn test_token_not_serialized() {
        let mut config = Config::default();
        config.github.token = Some("ghp_secret".to_string());
        let toml_str = toml::to_string_pretty(&config).unwrap();
        assert!(!toml_str.contains("ghp_secret"));
    }

    #[test]
    fn test_validate_rejects_zero_pages() {
        let mut config = Config::default();
        config.poll.pages = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_zero_delay() {
        let mut config = Config::default();
        config.poll.delay_secs = Some(0);
        assert!(config.validate().is_err());

        config.poll.delay_secs = Some(30);
        assert!(config.validate().is_ok());
    }
}
