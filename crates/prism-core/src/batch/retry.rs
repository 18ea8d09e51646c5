//! Retry policy and the decision function consulted after a failed attempt.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Patterns used when a policy does not list any of its own.
pub const DEFAULT_RETRYABLE_PATTERNS: &[&str] =
    &["rate limit", "rate_limit", "timeout", "timed out", "429", "503"];

/// Largest accepted `max_retries`.
pub const MAX_RETRIES_LIMIT: u32 = 5;

/// Accepted range for `retry_delay_ms`.
pub const RETRY_DELAY_RANGE_MS: (u64, u64) = (100, 60_000);

/// Retry policy shared read-only by every job of a batch.
///
/// Patterns are matched as case-insensitive substrings of the error message,
/// so existing policy files containing raw text such as `"429"` keep working.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Maximum number of retries after the first attempt.
    #[serde(default = "default_max_retries", alias = "max_retries")]
    pub max_retries: u32,
    /// Fixed delay before every retry, in milliseconds.
    #[serde(default = "default_retry_delay_ms", alias = "retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Substrings marking an error as transient. Empty means the built-in set.
    #[serde(default, alias = "retryable_error_patterns")]
    pub retryable_error_patterns: Vec<String>,
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            retryable_error_patterns: Vec::new(),
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy.
    pub fn new(max_retries: u32, retry_delay_ms: u64, patterns: Vec<String>) -> Self {
        Self { max_retries, retry_delay_ms, retryable_error_patterns: patterns }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    /// Delay to wait before the next attempt. Always the configured value.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Whether `message` matches one of the retryable patterns.
    pub fn is_retryable(&self, message: &str) -> bool {
        let message = message.to_lowercase();
        if self.retryable_error_patterns.is_empty() {
            DEFAULT_RETRYABLE_PATTERNS.iter().any(|p| message.contains(p))
        } else {
            self.retryable_error_patterns
                .iter()
                .any(|p| message.contains(&p.to_lowercase()))
        }
    }

    /// See [`should_retry`].
    pub fn should_retry(&self, message: &str, attempt_index: u32) -> bool {
        should_retry(message, attempt_index, self)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(format!(
                "maxRetries must be between 0 and {}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            ));
        }
        let (min, max) = RETRY_DELAY_RANGE_MS;
        if !(min..=max).contains(&self.retry_delay_ms) {
            return Err(format!(
                "retryDelayMs must be between {} and {}, got {}",
                min, max, self.retry_delay_ms
            ));
        }
        Ok(())
    }
}

/// Decide whether a failed attempt should be retried.
///
/// `attempt_index` is 0 for the first attempt. Returns true iff another
/// attempt is still allowed and the message matches a retryable pattern.
pub fn should_retry(message: &str, attempt_index: u32, policy: &RetryPolicy) -> bool {
    attempt_index < policy.max_retries && policy.is_retryable(message)
}
