//! Error types for batch processing.

use thiserror::Error;

/// Errors raised while loading a batch, before any job is scheduled.
///
/// Failures of individual jobs never surface here; they are recorded as
/// outcomes in the batch report.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BatchError {
    /// The batch or one of its jobs has an invalid shape or out-of-range value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A specific job entry is invalid.
    #[error("Job {index} is invalid: {reason}")]
    InvalidJob {
        /// 1-based index of the offending job.
        index: usize,
        /// Why the job was rejected.
        reason: String,
    },

    /// The batch contains no jobs.
    #[error("Batch contains no jobs")]
    EmptyBatch,
}
