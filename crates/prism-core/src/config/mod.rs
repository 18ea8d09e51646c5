//! Configuration for Prism.
//!
//! Loaded from a TOML file with `[api]`, `[defaults]`, `[batch]` and `[retry]`
//! sections. Every section and key is optional.

use crate::batch::cost::DEFAULT_MODEL;
use crate::batch::input::BatchDefaults;
use crate::batch::retry::RetryPolicy;
use crate::batch::scheduler::DEFAULT_GRACE_PERIOD;
use crate::batch::types::BatchOptions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The file is not valid TOML for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// `[api]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API base URL; `None` uses the provider's default.
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Per-request HTTP timeout in seconds.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { base_url: None, api_key_env: "XAI_API_KEY".to_string(), request_timeout_secs: None }
    }
}

/// `[defaults]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Model for jobs that name none.
    pub model: String,
    /// Resolution for jobs that name none.
    pub resolution: Option<String>,
    /// Aspect ratio for generate jobs that name none.
    pub aspect_ratio: Option<String>,
    /// Output directory for batches that name none.
    pub output_dir: PathBuf,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            resolution: None,
            aspect_ratio: None,
            output_dir: PathBuf::from("images"),
        }
    }
}

/// `[batch]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Maximum concurrent jobs.
    pub max_concurrent: usize,
    /// Batch timeout in milliseconds.
    pub timeout_ms: u64,
    /// Wait after the timeout before unfinished jobs are cancelled.
    pub grace_period_ms: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let options = BatchOptions::default();
        Self {
            max_concurrent: options.max_concurrent,
            timeout_ms: options.timeout_ms,
            grace_period_ms: DEFAULT_GRACE_PERIOD.as_millis() as u64,
        }
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismConfig {
    /// API settings.
    pub api: ApiConfig,
    /// Job defaults.
    pub defaults: DefaultsConfig,
    /// Batch limits.
    pub batch: BatchConfig,
    /// Retry policy.
    pub retry: RetryPolicy,
}

impl PrismConfig {
    /// Load configuration from a TOML file.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate TOML content.
    ///
    /// # Errors
    /// Returns error if the content is not valid TOML or a value is out of range.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        self.batch_options().validate().map_err(ConfigError::Invalid)?;
        self.retry.validate().map_err(ConfigError::Invalid)?;
        if self.defaults.model.trim().is_empty() {
            return Err(ConfigError::Invalid("defaults.model must not be empty".to_string()));
        }
        if self.api.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "api.request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Concurrency and timeout from the `[batch]` section.
    pub fn batch_options(&self) -> BatchOptions {
        BatchOptions::new(self.batch.max_concurrent, self.batch.timeout_ms)
    }

    /// Defaults handed to the batch file loader.
    pub fn batch_defaults(&self) -> BatchDefaults {
        BatchDefaults {
            model: self.defaults.model.clone(),
            resolution: self.defaults.resolution.clone(),
            aspect_ratio: self.defaults.aspect_ratio.clone(),
            output_dir: self.defaults.output_dir.clone(),
            options: self.batch_options(),
            retry_policy: self.retry.clone(),
        }
    }

    /// Post-timeout grace period for the scheduler.
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.batch.grace_period_ms)
    }

    /// Per-request HTTP timeout, if configured.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.request_timeout_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = PrismConfig::default();
        assert_eq!(config.defaults.model, DEFAULT_MODEL);
        assert_eq!(config.api.api_key_env, "XAI_API_KEY");
        assert_eq!(config.batch_options(), BatchOptions::default());
        assert_eq!(config.grace_period(), DEFAULT_GRACE_PERIOD);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_all_sections() {
        let config = PrismConfig::from_toml_str(
            r#"
            [api]
            base_url = "http://localhost:9000/v1"
            request_timeout_secs = 30

            [defaults]
            model = "grok-2-image"
            aspect_ratio = "1:1"
            output_dir = "renders"

            [batch]
            max_concurrent = 5
            timeout_ms = 120000
            grace_period_ms = 500

            [retry]
            max_retries = 4
            retry_delay_ms = 250
            retryable_error_patterns = ["overloaded"]
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url.as_deref(), Some("http://localhost:9000/v1"));
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.grace_period(), Duration::from_millis(500));

        let defaults = config.batch_defaults();
        assert_eq!(defaults.model, "grok-2-image");
        assert_eq!(defaults.aspect_ratio.as_deref(), Some("1:1"));
        assert_eq!(defaults.output_dir, PathBuf::from("renders"));
        assert_eq!(defaults.options, BatchOptions::new(5, 120_000));
        assert_eq!(defaults.retry_policy.max_retries, 4);
        assert_eq!(defaults.retry_policy.retryable_error_patterns, vec!["overloaded"]);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = PrismConfig::from_toml_str("[batch]\nmax_concurrent = 1\n").unwrap();
        assert_eq!(config.batch.max_concurrent, 1);
        assert_eq!(config.batch.timeout_ms, BatchOptions::default().timeout_ms);
        assert_eq!(config.retry, RetryPolicy::default());
    }

    #[test]
    fn test_out_of_range_values_rejected() {
        for content in [
            "[batch]\nmax_concurrent = 0\n",
            "[batch]\ntimeout_ms = 100\n",
            "[retry]\nmax_retries = 6\n",
            "[retry]\nretry_delay_ms = 10\n",
            "[api]\nrequest_timeout_secs = 0\n",
        ] {
            let result = PrismConfig::from_toml_str(content);
            assert!(matches!(result, Err(ConfigError::Invalid(_))), "accepted: {content}");
        }
    }

    #[test]
    fn test_invalid_toml() {
        assert!(matches!(PrismConfig::from_toml_str("[batch"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let temp = TempDir::new().unwrap();
        let config = PrismConfig::load(temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, PrismConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("prism.toml");
        std::fs::write(&path, "[defaults]\nmodel = \"grok-2-image\"\n").unwrap();

        let config = PrismConfig::load(&path).unwrap();
        assert_eq!(config.defaults.model, "grok-2-image");
    }
}
