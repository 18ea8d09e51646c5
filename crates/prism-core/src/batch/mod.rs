//! Batch execution of image generation and edit jobs.
//!
//! A [`Batch`] is loaded from a batch file ([`input`]), priced without I/O
//! ([`cost`]) and run by the [`BatchScheduler`], which admits jobs through a
//! [`ConcurrencyLimiter`] and hands each one to a [`JobExecutor`].

pub mod cost;
pub mod error;
pub mod executor;
pub mod formats;
pub mod input;
pub mod limiter;
pub mod retry;
pub mod scheduler;
pub mod types;

pub use cost::{
    CostBreakdownEntry, CostEstimate, DEFAULT_MODEL, ModelPricing, estimate, is_known_model,
    pricing_for,
};
pub use error::BatchError;
pub use executor::JobExecutor;
pub use formats::{InputFormat, detect_format};
pub use input::{BatchDefaults, BatchOverrides, parse_batch_file, parse_batch_str};
pub use limiter::{ConcurrencyLimiter, LimiterPermit};
pub use retry::{RetryPolicy, should_retry};
pub use scheduler::BatchScheduler;
pub use types::{
    Batch, BatchOptions, BatchReport, BatchState, JobKind, JobOutcome, JobResult, JobSpec,
};
