//! Batch file parsing and validation.
//!
//! A batch file is either a JSON object with batch-level settings, a bare JSON
//! array of jobs, or plain text with one generate prompt per line. Every value
//! is range-checked here so the scheduler can assume valid input.

use crate::batch::cost::DEFAULT_MODEL;
use crate::batch::error::BatchError;
use crate::batch::formats::{InputFormat, detect_format};
use crate::batch::retry::RetryPolicy;
use crate::batch::types::{Batch, BatchOptions, IMAGE_COUNT_RANGE, JobKind, JobSpec};
use prism_abstraction::ImageSource;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Settings applied when the batch file does not specify them.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDefaults {
    /// Model for jobs and batches that name none.
    pub model: String,
    /// Resolution for jobs that name none.
    pub resolution: Option<String>,
    /// Aspect ratio for generate jobs that name none.
    pub aspect_ratio: Option<String>,
    /// Directory that relative and generated output paths land in.
    pub output_dir: PathBuf,
    /// Concurrency and timeout.
    pub options: BatchOptions,
    /// Retry policy.
    pub retry_policy: RetryPolicy,
}

impl Default for BatchDefaults {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            resolution: None,
            aspect_ratio: None,
            output_dir: PathBuf::from("images"),
            options: BatchOptions::default(),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Values that take precedence over the batch file (e.g. CLI flags).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOverrides {
    /// Output directory.
    pub output_dir: Option<PathBuf>,
    /// Maximum concurrent jobs.
    pub max_concurrent: Option<usize>,
    /// Batch timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// On-disk shape of a JSON batch file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BatchFile {
    /// Jobs in order.
    #[serde(default)]
    pub jobs: Vec<JobEntry>,
    /// Output directory.
    pub output_dir: Option<PathBuf>,
    /// Maximum concurrent jobs.
    pub max_concurrent: Option<usize>,
    /// Batch timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Per-batch defaults.
    #[serde(default)]
    pub defaults: FileDefaults,
    /// Retry policy.
    pub retry_policy: Option<RetryPolicy>,
}

/// The `defaults` section of a batch file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileDefaults {
    /// Default model.
    pub model: Option<String>,
    /// Default resolution.
    pub resolution: Option<String>,
    /// Default aspect ratio for generate jobs.
    pub aspect_ratio: Option<String>,
}

/// One job as written in a batch file.
///
/// Setting one of the image source fields makes the job an edit.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct JobEntry {
    /// Prompt text.
    pub prompt: String,
    /// Model override.
    pub model: Option<String>,
    /// Number of images.
    #[serde(alias = "imageCount")]
    pub n: Option<u8>,
    /// Aspect ratio (generate only).
    pub aspect_ratio: Option<String>,
    /// Resolution.
    pub resolution: Option<String>,
    /// Output path, relative to the output directory unless absolute.
    pub output: Option<PathBuf>,
    /// Local source image.
    pub image_path: Option<PathBuf>,
    /// Base64 source image or data URI.
    pub image_base64: Option<String>,
    /// Remote source image.
    pub image_url: Option<String>,
}

impl BatchFile {
    /// Validate the file and resolve it into a runnable batch.
    pub fn into_batch(
        self,
        defaults: &BatchDefaults,
        overrides: &BatchOverrides,
    ) -> Result<Batch, BatchError> {
        if self.jobs.is_empty() {
            return Err(BatchError::EmptyBatch);
        }

        let options = BatchOptions {
            max_concurrent: overrides
                .max_concurrent
                .or(self.max_concurrent)
                .unwrap_or(defaults.options.max_concurrent),
            timeout_ms: overrides
                .timeout_ms
                .or(self.timeout_ms)
                .unwrap_or(defaults.options.timeout_ms),
        };
        options.validate().map_err(BatchError::InvalidConfig)?;

        let retry_policy = self.retry_policy.unwrap_or_else(|| defaults.retry_policy.clone());
        retry_policy.validate().map_err(BatchError::InvalidConfig)?;

        let output_dir = overrides
            .output_dir
            .clone()
            .or(self.output_dir)
            .unwrap_or_else(|| defaults.output_dir.clone());
        let job_defaults = JobDefaults {
            resolution: self.defaults.resolution.or_else(|| defaults.resolution.clone()),
            aspect_ratio: self.defaults.aspect_ratio.or_else(|| defaults.aspect_ratio.clone()),
            output_dir: &output_dir,
        };

        let jobs = self
            .jobs
            .into_iter()
            .enumerate()
            .map(|(offset, entry)| resolve_job(offset + 1, entry, &job_defaults))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Batch {
            jobs,
            default_model: self.defaults.model.unwrap_or_else(|| defaults.model.clone()),
            retry_policy,
            options,
        })
    }
}

struct JobDefaults<'a> {
    resolution: Option<String>,
    aspect_ratio: Option<String>,
    output_dir: &'a Path,
}

fn resolve_job(
    index: usize,
    entry: JobEntry,
    defaults: &JobDefaults<'_>,
) -> Result<JobSpec, BatchError> {
    let invalid = |reason: String| BatchError::InvalidJob { index, reason };

    if entry.prompt.trim().is_empty() {
        return Err(invalid("prompt is empty".to_string()));
    }

    let image_count = entry.n.unwrap_or(1);
    let (min, max) = IMAGE_COUNT_RANGE;
    if !(min..=max).contains(&image_count) {
        return Err(invalid(format!("n must be between {min} and {max}, got {image_count}")));
    }

    let mut sources = Vec::new();
    if let Some(path) = entry.image_path {
        sources.push(ImageSource::Path(path));
    }
    if let Some(data) = entry.image_base64 {
        sources.push(ImageSource::Base64(data));
    }
    if let Some(url) = entry.image_url {
        sources.push(ImageSource::Url(url));
    }
    if sources.len() > 1 {
        return Err(invalid(
            "only one of imagePath, imageBase64 or imageUrl may be set".to_string(),
        ));
    }

    let resolution = entry.resolution.or_else(|| defaults.resolution.clone());
    let kind = match sources.pop() {
        Some(source) => {
            if entry.aspect_ratio.is_some() {
                return Err(invalid("edit jobs cannot set aspectRatio".to_string()));
            }
            JobKind::Edit { resolution, source }
        }
        None => JobKind::Generate {
            aspect_ratio: entry.aspect_ratio.or_else(|| defaults.aspect_ratio.clone()),
            resolution,
        },
    };

    let output_path = match entry.output {
        Some(path) if path.is_absolute() => path,
        Some(path) => defaults.output_dir.join(path),
        None => defaults.output_dir.join(format!("image-{index:03}.png")),
    };

    Ok(JobSpec { prompt: entry.prompt, model: entry.model, image_count, output_path, kind })
}

/// Parse batch file content in any supported format.
pub fn parse_batch_str(
    content: &str,
    defaults: &BatchDefaults,
    overrides: &BatchOverrides,
) -> Result<Batch, BatchError> {
    let file = match detect_format(content)? {
        InputFormat::JsonObject => serde_json::from_str::<BatchFile>(content)
            .map_err(|e| BatchError::InvalidConfig(format!("Invalid JSON: {e}")))?,
        InputFormat::JsonArray => {
            let jobs = serde_json::from_str::<Vec<JobEntry>>(content)
                .map_err(|e| BatchError::InvalidConfig(format!("Invalid JSON: {e}")))?;
            BatchFile { jobs, ..BatchFile::default() }
        }
        InputFormat::LineDelimited => {
            BatchFile { jobs: parse_line_delimited(content), ..BatchFile::default() }
        }
    };

    file.into_batch(defaults, overrides)
}

/// Read and parse a batch file.
pub fn parse_batch_file(
    file_path: &Path,
    defaults: &BatchDefaults,
    overrides: &BatchOverrides,
) -> Result<Batch, BatchError> {
    let content = std::fs::read_to_string(file_path).map_err(|e| {
        BatchError::InvalidConfig(format!("Failed to read file {}: {}", file_path.display(), e))
    })?;

    parse_batch_str(&content, defaults, overrides)
}

/// Each non-empty line that is not a `#` comment becomes a generate prompt.
fn parse_line_delimited(content: &str) -> Vec<JobEntry> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| JobEntry { prompt: line.to_string(), ..JobEntry::default() })
        .collect()
}
