//! Configuration file handling

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::paths::config_path;
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Base URL overrides keyed by suite name
    #[serde(default)]
    pub base_urls: HashMap<String, String>,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Runner settings
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Schema lookup settings
    #[serde(default)]
    pub schemas: SchemaConfig,
}

/// HTTP client settings
#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("restcheck/", env!("CARGO_PKG_VERSION")).to_string()
}

/// Runner settings
#[derive(Debug, Deserialize)]
pub struct RunnerConfig {
    /// Maximum number of scenarios in flight at once
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
        }
    }
}

fn default_jobs() -> usize {
    1
}

/// Schema lookup settings
#[derive(Debug, Deserialize, Default)]
pub struct SchemaConfig {
    /// Extra directory searched for schema documents
    pub dir: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = config_path() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Self::default())
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| super::Error::file_read(path, &e))?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        if config.runner.jobs == 0 {
            return Err(super::Error::ConfigParse(
                "runner.jobs must be at least 1".to_string(),
            ));
        }
        if config.http.timeout_secs == 0 {
            return Err(super::Error::ConfigParse(
                "http.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Get the base URL override for a suite, if configured
    pub fn base_url(&self, suite: &str) -> Option<&str> {
        self.base_urls.get(suite).map(String::as_str)
    }
}
