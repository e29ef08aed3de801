//! Configuration types for the tally server.
//!
//! Configuration is read from an optional JSON file; every field has a
//! default so a file only needs to name what it changes. Command-line flags
//! are applied on top by the binary.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_common::{Error, Result};
use tally_kv::RetryPolicy;
use tally_protocol::DEFAULT_MAX_LINE_LENGTH;

/// Top-level server configuration.
///
/// # Examples
///
/// ```
/// use tally_server::{RetryConfig, ServerConfig};
///
/// let config = ServerConfig {
///     listen_addr: "0.0.0.0:7878".to_string(),
///     max_line_length: 4096,
///     retry: RetryConfig::default(),
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address for client connections.
    /// Default: "127.0.0.1:7878"
    pub listen_addr: String,

    /// Longest accepted request line in bytes, terminator excluded.
    /// Default: 8192
    pub max_line_length: usize,

    /// Retry behaviour for storage transactions.
    pub retry: RetryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7878".to_string(),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            retry: RetryConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Missing fields take their defaults. The result is not validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigError(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&text)
            .map_err(|e| Error::ConfigError(format!("{}: {e}", path.display())))
    }

    /// Parse a configuration from JSON text.
    pub fn from_json(text: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Validates the server configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `listen_addr` is empty or has no port
    /// - `max_line_length` is 0
    /// - the retry section is invalid
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.listen_addr.is_empty() {
            return Err("listen_addr cannot be empty".to_string());
        }

        if !self.listen_addr.contains(':') {
            return Err("listen_addr must contain port (e.g., '127.0.0.1:7878')".to_string());
        }

        if self.max_line_length == 0 {
            return Err("max_line_length must be > 0".to_string());
        }

        self.retry.validate()
    }
}

/// Retry settings for the transactional mutator, in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per transaction, the first included.
    /// Default: 5
    pub max_attempts: u32,

    /// Sleep before the first retry.
    /// Default: 5ms
    pub initial_backoff_ms: u64,

    /// Cap for the doubling backoff.
    /// Default: 100ms
    pub max_backoff_ms: u64,

    /// Deadline for one transaction including retries.
    /// Default: 2000ms
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryPolicy::default().into()
    }
}

impl RetryConfig {
    /// Validates the retry configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `max_attempts` is 0
    /// - `initial_backoff_ms` > `max_backoff_ms`
    /// - `timeout_ms` is 0
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be > 0".to_string());
        }

        if self.initial_backoff_ms > self.max_backoff_ms {
            return Err(format!(
                "retry.initial_backoff_ms ({}) must be <= retry.max_backoff_ms ({})",
                self.initial_backoff_ms, self.max_backoff_ms
            ));
        }

        if self.timeout_ms == 0 {
            return Err("retry.timeout_ms must be > 0".to_string());
        }

        Ok(())
    }
}

impl From<RetryPolicy> for RetryConfig {
    fn from(policy: RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            initial_backoff_ms: policy.initial_backoff.as_millis() as u64,
            max_backoff_ms: policy.max_backoff.as_millis() as u64,
            timeout_ms: policy.timeout.as_millis() as u64,
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}
