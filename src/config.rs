//! Client configuration.
//!
//! Loaded from a TOML file, a TOML string, or `MEILISEARCH_*` environment
//! variables.
//!
//! ```toml
//! url = "http://localhost:7700"
//! api_key = "masterKey"
//! poll_interval_ms = 50
//! task_timeout_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::poller::WaitOptions;

/// Connection and polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the service.
    #[serde(default = "default_url")]
    pub url: String,

    /// API key sent as a bearer token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Delay between two polls of the same task.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum time to wait for one task to become terminal.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_ms: u64,

    /// Timeout of a single HTTP request.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_url() -> String {
    "http://localhost:7700".to_string()
}

fn default_poll_interval() -> u64 {
    50
}

fn default_task_timeout() -> u64 {
    5_000
}

fn default_request_timeout() -> u64 {
    30_000 // 30 seconds
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            api_key: None,
            poll_interval_ms: default_poll_interval(),
            task_timeout_ms: default_task_timeout(),
            request_timeout_ms: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientConfig {
    /// Configuration for `url` with every other setting defaulted.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Set the API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Load configuration from environment variables.
    ///
    /// - `MEILISEARCH_URL` - base URL
    /// - `MEILISEARCH_API_KEY` - API key
    /// - `MEILISEARCH_POLL_INTERVAL_MS` - poll interval
    /// - `MEILISEARCH_TASK_TIMEOUT_MS` - task timeout
    ///
    /// Unset variables keep their defaults; unparsable numbers are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("MEILISEARCH_URL") {
            config.url = url;
        }
        if let Some(key) = lookup("MEILISEARCH_API_KEY") {
            config.api_key = Some(key);
        }
        if let Some(ms) = lookup("MEILISEARCH_POLL_INTERVAL_MS") {
            config.poll_interval_ms = parse_millis("MEILISEARCH_POLL_INTERVAL_MS", &ms)?;
        }
        if let Some(ms) = lookup("MEILISEARCH_TASK_TIMEOUT_MS") {
            config.task_timeout_ms = parse_millis("MEILISEARCH_TASK_TIMEOUT_MS", &ms)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Reject zero intervals and timeouts.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Configuration(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.task_timeout_ms == 0 {
            return Err(Error::Configuration(
                "task_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Poll cadence and timeout as [`WaitOptions`].
    pub fn wait_options(&self) -> WaitOptions {
        WaitOptions::new(
            Duration::from_millis(self.poll_interval_ms),
            Duration::from_millis(self.task_timeout_ms),
        )
    }

    /// HTTP request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn parse_millis(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| Error::Configuration(format!("{key}={value:?} is not a number: {e}")))
}
