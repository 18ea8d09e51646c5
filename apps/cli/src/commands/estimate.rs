//! Estimate command implementation.

use super::load_batch;
use crate::ui;
use anyhow::Result;
use prism_core::{BatchOverrides, PrismConfig};
use std::path::Path;

/// Print the cost estimate of a batch file. Writes no images.
pub fn execute(batch_file: &Path, json: bool, config: &PrismConfig) -> Result<()> {
    let batch = load_batch(batch_file, config, &BatchOverrides::default())?;
    let estimate = batch.estimate();

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
    } else {
        ui::render_estimate(&estimate, &batch.default_model);
    }
    Ok(())
}
