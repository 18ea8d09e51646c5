//! Run command implementation.

use super::load_batch;
use crate::ui;
use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;
use prism_abstraction::ImageOperation;
use prism_core::{BatchOverrides, BatchScheduler, PrismConfig};
use prism_models::{MockImageOperation, XaiImageClient};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Image engine backing a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    /// xAI image API
    Xai,
    /// Offline placeholder images
    Mock,
}

/// Flags of the run command.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub engine: Engine,
    pub concurrency: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub output_dir: Option<PathBuf>,
    pub json: bool,
}

/// Run a batch file and print its report.
///
/// Returns whether every job completed.
pub async fn execute(batch_file: &Path, options: RunOptions, config: &PrismConfig) -> Result<bool> {
    let overrides = BatchOverrides {
        output_dir: options.output_dir,
        max_concurrent: options.concurrency,
        timeout_ms: options.timeout_ms,
    };
    let batch = load_batch(batch_file, config, &overrides)?;
    let operation = build_operation(options.engine, config)?;

    if !options.json {
        println!("{}", "prism run".bold().cyan());
        println!();
        println!("  {} Batch file: {}", "✓".green(), batch_file.display());
        println!("  {} Engine: {}", "✓".green(), operation.provider_id().cyan());
        println!(
            "  {} Jobs: {} (max {} concurrent, timeout {}ms)",
            "✓".green(),
            batch.jobs.len(),
            batch.options.max_concurrent,
            batch.options.timeout_ms
        );
        println!();
        println!("{}", "Starting batch execution...".bold());
    }

    info!(batch_file = %batch_file.display(), engine = ?options.engine, "Running batch");
    let scheduler = BatchScheduler::new(operation).with_grace_period(config.grace_period());
    let report = scheduler.run(&batch).await;

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::render_summary(&report);
    }

    Ok(report.is_complete_success())
}

fn build_operation(engine: Engine, config: &PrismConfig) -> Result<Arc<dyn ImageOperation>> {
    match engine {
        Engine::Mock => Ok(Arc::new(MockImageOperation::new())),
        Engine::Xai => {
            let mut client = XaiImageClient::from_env(&config.api.api_key_env)
                .context("The xai engine needs an API key")?;
            if let Some(base_url) = &config.api.base_url {
                client = client.with_base_url(base_url.clone());
            }
            if let Some(timeout) = config.request_timeout() {
                client = client.with_timeout(timeout)?;
            }
            Ok(Arc::new(client))
        }
    }
}
