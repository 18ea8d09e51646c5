//! Prism Core - batch execution engine for image generation.
//!
//! This crate provides:
//! - Batch file loading and validation
//! - Cost estimation
//! - Concurrency-limited, retrying, deadline-bound batch runs
//! - Configuration management
//!
//! # Example
//!
//! ```rust,no_run
//! use prism_core::{BatchOverrides, BatchScheduler, PrismConfig, parse_batch_file};
//! use prism_models::MockImageOperation;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PrismConfig::load("prism.toml")?;
//! let batch = parse_batch_file(
//!     Path::new("batch.json"),
//!     &config.batch_defaults(),
//!     &BatchOverrides::default(),
//! )?;
//! println!("Estimated cost: ${:.3}", batch.estimate().estimated_cost_max);
//!
//! let scheduler = BatchScheduler::new(Arc::new(MockImageOperation::new()))
//!     .with_grace_period(config.grace_period());
//! let report = scheduler.run(&batch).await;
//! println!("{} of {} jobs succeeded", report.succeeded, report.total());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;

pub use batch::{
    Batch, BatchDefaults, BatchError, BatchOptions, BatchOverrides, BatchReport, BatchScheduler,
    BatchState, CostEstimate, JobOutcome, JobResult, JobSpec, RetryPolicy, parse_batch_file,
    parse_batch_str,
};
pub use config::{ConfigError, PrismConfig};
