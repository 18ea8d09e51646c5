//! Command implementations for Prism CLI.

pub mod estimate;
pub mod run;

use anyhow::{Context, Result};
use prism_core::{Batch, BatchOverrides, PrismConfig, parse_batch_file};
use std::path::Path;

/// Load and validate a batch file using config defaults.
fn load_batch(path: &Path, config: &PrismConfig, overrides: &BatchOverrides) -> Result<Batch> {
    parse_batch_file(path, &config.batch_defaults(), overrides)
        .with_context(|| format!("Failed to load batch file: {}", path.display()))
}
