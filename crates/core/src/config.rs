//! Client configuration.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Uploader configuration, loaded from a TOML file and `CASTUP_*` variables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the podcast API (e.g., "https://api.example.com").
    #[serde(default)]
    pub server_url: String,
    /// Bearer token sent with every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Maximum audio bytes per request.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Per-request overhead added to the progress denominator.
    #[serde(default)]
    pub request_overhead_bytes: u64,
    /// Retry behaviour for failed chunk requests.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Per-request timeout in seconds. No timeout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Encode the chunk label into the audio file name as well as sending
    /// it as separate form fields. Needed by servers that reassemble by
    /// file name.
    #[serde(default = "default_legacy_chunk_labels")]
    pub legacy_chunk_labels: bool,
    /// Size of the slices the audio part is streamed in; progress is
    /// reported once per slice.
    #[serde(default = "default_progress_granularity")]
    pub progress_granularity: usize,
}

/// Retry settings as they appear in configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_chunk_size() -> u64 {
    crate::DEFAULT_CHUNK_SIZE
}

fn default_legacy_chunk_labels() -> bool {
    true
}

fn default_progress_granularity() -> usize {
    64 * 1024
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1_000
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: String::new(),
            token: None,
            chunk_size: default_chunk_size(),
            request_overhead_bytes: 0,
            retry: RetryConfig::default(),
            request_timeout_secs: None,
            legacy_chunk_labels: default_legacy_chunk_labels(),
            progress_granularity: default_progress_granularity(),
        }
    }
}

impl ClientConfig {
    /// Per-request timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Check `chunk_size` against the accepted bounds.
    pub fn validate_chunk_size(&self) -> Result<(), String> {
        if !(crate::MIN_CHUNK_SIZE..=crate::MAX_CHUNK_SIZE).contains(&self.chunk_size) {
            return Err(format!(
                "chunk_size must be between {} and {} (got {})",
                crate::MIN_CHUNK_SIZE,
                crate::MAX_CHUNK_SIZE,
                self.chunk_size
            ));
        }
        Ok(())
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.server_url.trim().is_empty() {
            return Err("server_url is required".to_string());
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(format!(
                "server_url must start with http:// or https:// (got {})",
                self.server_url
            ));
        }
        self.validate_chunk_size()?;
        if self.retry.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        if self.retry.initial_backoff_ms > self.retry.max_backoff_ms {
            return Err("retry.initial_backoff_ms must not exceed retry.max_backoff_ms".to_string());
        }
        if self.progress_granularity == 0 {
            return Err("progress_granularity must be greater than 0".to_string());
        }
        if self.request_timeout_secs == Some(0) {
            return Err("request_timeout_secs must be greater than 0".to_string());
        }
        Ok(())
    }
}
