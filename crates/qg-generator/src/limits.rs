//! Rate limits for the generation service.
//!
//! [`RateLimitConfig`] is the static policy; [`RateLimitState`] is the
//! per-run window bookkeeping the pipeline threads through its loop.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Rate limiting and retry policy.
///
/// Every field has a default, so a JSON file only needs the fields it
/// overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RateLimitConfig {
    /// Requests allowed before the pipeline waits out a window
    pub max_requests_per_window: u32,
    /// Length of the cooldown window in seconds
    pub window_seconds: u64,
    /// Pause after each successful request in seconds
    pub inter_request_delay_seconds: u64,
    /// Total attempts per specification (1 means no retry)
    pub max_retries_per_item: u32,
    /// Backoff after attempt k is `backoff_base_seconds^k` seconds
    pub backoff_base_seconds: u64,
}

impl Default for RateLimitConfig {
    /// Free-tier quota: one request per minute, a single attempt.
    fn default() -> Self {
        Self {
            max_requests_per_window: 1,
            window_seconds: 60,
            inter_request_delay_seconds: 1,
            max_retries_per_item: 1,
            backoff_base_seconds: 2,
        }
    }
}

impl RateLimitConfig {
    /// Paid-tier quota: 15 requests per window, no pacing, 5 attempts.
    pub fn relaxed() -> Self {
        Self {
            max_requests_per_window: 15,
            inter_request_delay_seconds: 0,
            max_retries_per_item: 5,
            ..Default::default()
        }
    }

    /// Load from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations under which no request could ever be sent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_requests_per_window == 0 {
            return Err(ConfigError::Invalid(
                "max_requests_per_window must be at least 1".to_string(),
            ));
        }
        if self.max_retries_per_item == 0 {
            return Err(ConfigError::Invalid(
                "max_retries_per_item must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    #[must_use]
    pub fn inter_request_delay(&self) -> Duration {
        Duration::from_secs(self.inter_request_delay_seconds)
    }

    /// Wait after a throttled attempt `attempt` (counted from 0).
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        Duration::from_secs(self.backoff_base_seconds.saturating_pow(attempt))
    }
}

/// Window bookkeeping for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitState {
    /// Requests accepted since the window last reset. Throttled and
    /// failed requests are not counted.
    pub requests_since_reset: u32,
    /// Clock reading when the current window began
    pub window_start: Duration,
}

impl RateLimitState {
    pub fn new(now: Duration) -> Self {
        Self {
            requests_since_reset: 0,
            window_start: now,
        }
    }

    /// Whether the next specification must wait for a fresh window.
    #[must_use]
    pub fn window_exhausted(&self, limits: &RateLimitConfig) -> bool {
        self.requests_since_reset >= limits.max_requests_per_window
    }

    /// Count one accepted request.
    pub fn record_request(&mut self) {
        self.requests_since_reset = self.requests_since_reset.saturating_add(1);
    }

    pub fn reset(&mut self, now: Duration) {
        debug_assert!(now >= self.window_start, "Clock went backwards");
        self.requests_since_reset = 0;
        self.window_start = now;
    }
}

/// Rate limit configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read limits file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse limits file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid rate limits: {0}")]
    Invalid(String),
}
