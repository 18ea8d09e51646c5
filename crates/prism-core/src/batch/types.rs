//! Data types for batch processing.

use crate::batch::cost::{self, CostEstimate, DEFAULT_MODEL};
use crate::batch::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use prism_abstraction::ImageSource;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Accepted range for `max_concurrent`.
pub const MAX_CONCURRENT_RANGE: (usize, usize) = (1, 10);

/// Accepted range for `timeout_ms`.
pub const TIMEOUT_RANGE_MS: (u64, u64) = (1_000, 3_600_000);

/// Accepted range for a job's image count.
pub const IMAGE_COUNT_RANGE: (u8, u8) = (1, 10);

/// Kind-specific parameters of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JobKind {
    /// Create new images from the prompt.
    Generate {
        /// Aspect ratio such as "16:9".
        aspect_ratio: Option<String>,
        /// Output resolution.
        resolution: Option<String>,
    },
    /// Modify an existing image. Carries no aspect ratio.
    Edit {
        /// Output resolution.
        resolution: Option<String>,
        /// The image being edited.
        source: ImageSource,
    },
}

/// One requested unit of work, immutable once scheduling starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSpec {
    /// Prompt text (non-empty).
    pub prompt: String,
    /// Model override; `None` uses the batch default.
    pub model: Option<String>,
    /// Number of images requested (1..=10).
    pub image_count: u8,
    /// Resolved output path for the first image.
    pub output_path: PathBuf,
    /// Generate or edit parameters.
    #[serde(flatten)]
    pub kind: JobKind,
}

impl JobSpec {
    /// A single-image generate job with no model override.
    pub fn generate(prompt: impl Into<String>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            image_count: 1,
            output_path: output_path.into(),
            kind: JobKind::Generate { aspect_ratio: None, resolution: None },
        }
    }

    /// A single-image edit job with no model override.
    pub fn edit(
        prompt: impl Into<String>,
        source: ImageSource,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            model: None,
            image_count: 1,
            output_path: output_path.into(),
            kind: JobKind::Edit { resolution: None, source },
        }
    }

    /// Set the model override.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the number of images.
    #[must_use]
    pub fn with_image_count(mut self, image_count: u8) -> Self {
        self.image_count = image_count;
        self
    }

    /// Whether this job edits an existing image.
    pub fn is_edit(&self) -> bool {
        matches!(self.kind, JobKind::Edit { .. })
    }

    /// The model this job runs with.
    pub fn effective_model<'a>(&'a self, default_model: &'a str) -> &'a str {
        self.model.as_deref().unwrap_or(default_model)
    }
}

/// Concurrency and timeout settings for one batch run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    /// Maximum number of jobs executing at once.
    pub max_concurrent: usize,
    /// Wall-clock budget for the whole batch, in milliseconds.
    pub timeout_ms: u64,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self { max_concurrent: 3, timeout_ms: 600_000 }
    }
}

impl BatchOptions {
    /// Create new batch options.
    pub fn new(max_concurrent: usize, timeout_ms: u64) -> Self {
        Self { max_concurrent, timeout_ms }
    }

    /// The batch timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        let (min, max) = MAX_CONCURRENT_RANGE;
        if !(min..=max).contains(&self.max_concurrent) {
            return Err(format!(
                "maxConcurrent must be between {} and {}, got {}",
                min, max, self.max_concurrent
            ));
        }
        let (min, max) = TIMEOUT_RANGE_MS;
        if !(min..=max).contains(&self.timeout_ms) {
            return Err(format!(
                "timeoutMs must be between {} and {}, got {}",
                min, max, self.timeout_ms
            ));
        }
        Ok(())
    }
}

/// A validated batch ready to estimate or run.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Jobs in their original order.
    pub jobs: Vec<JobSpec>,
    /// Model used by jobs without an override.
    pub default_model: String,
    /// Retry policy shared by all jobs.
    pub retry_policy: RetryPolicy,
    /// Concurrency and timeout.
    pub options: BatchOptions,
}

impl Batch {
    /// Create a batch with default model, policy and options.
    pub fn new(jobs: Vec<JobSpec>) -> Self {
        Self {
            jobs,
            default_model: DEFAULT_MODEL.to_string(),
            retry_policy: RetryPolicy::default(),
            options: BatchOptions::default(),
        }
    }

    /// Set the default model.
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Set concurrency and timeout.
    #[must_use]
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Estimate the cost of running every job. Performs no I/O.
    pub fn estimate(&self) -> CostEstimate {
        cost::estimate(&self.jobs, &self.default_model)
    }
}

/// Terminal classification of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JobOutcome {
    /// Images were produced and saved.
    Completed {
        /// Saved files, one per image.
        output_paths: Vec<PathBuf>,
        /// Time from the first attempt to success.
        duration_ms: u64,
        /// Prompt as rewritten by the service.
        #[serde(skip_serializing_if = "Option::is_none")]
        revised_prompt: Option<String>,
        /// Number of attempts made, including the successful one.
        attempts: u32,
    },
    /// Every allowed attempt failed, or the error was not retryable.
    Failed {
        /// Message of the final error.
        last_error: String,
        /// Time from the first attempt to giving up.
        duration_ms: u64,
        /// Number of attempts made.
        attempts: u32,
    },
    /// No outcome was recorded before the batch deadline.
    Cancelled {
        /// Why the job was cancelled (e.g. "timeout").
        reason: String,
    },
}

impl JobOutcome {
    /// Whether this is a `Completed` outcome.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Whether this is a `Failed` outcome.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether this is a `Cancelled` outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Attempts made, or 0 for cancelled jobs.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. } | Self::Failed { attempts, .. } => *attempts,
            Self::Cancelled { .. } => 0,
        }
    }
}

/// An outcome tagged with the 1-based index of its job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    /// 1-based position of the job in the batch.
    pub index: usize,
    /// What happened to it.
    #[serde(flatten)]
    pub outcome: JobOutcome,
}

/// How a batch run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchState {
    /// Every job finished before the deadline.
    Completed,
    /// The deadline fired first; unfinished jobs were swept into `Cancelled`.
    TimedOut,
}

/// Aggregate result of one batch run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    /// Number of completed jobs.
    pub succeeded: usize,
    /// Number of failed jobs.
    pub failed: usize,
    /// Number of cancelled jobs.
    pub cancelled: usize,
    /// One entry per job, sorted by index.
    pub results: Vec<JobResult>,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the report was produced.
    pub finished_at: DateTime<Utc>,
    /// Total wall-clock duration.
    pub duration_ms: u64,
    /// Terminal state of the run.
    pub state: BatchState,
    /// Estimate over the full job list, regardless of outcomes.
    pub estimate: CostEstimate,
}

impl BatchReport {
    /// Total number of jobs reported.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// Whether every job completed.
    pub fn is_complete_success(&self) -> bool {
        self.failed == 0 && self.cancelled == 0
    }
}
