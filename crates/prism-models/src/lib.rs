//! Image operation implementations for Prism.
//!
//! This crate provides concrete implementations of the `ImageOperation` trait.
//!
//! # Supported Providers
//!
//! - **Mock**: Offline runs and testing (writes placeholder images)
//! - **xAI**: `grok-imagine-image` and friends (API key required)

pub mod xai;

use async_trait::async_trait;
use prism_abstraction::{
    EditRequest, GenerateRequest, ImageError, ImageOperation, ImageOutput, ImageSource,
    numbered_output_paths,
};
use std::path::{Path, PathBuf};
use tracing::debug;

pub use xai::XaiImageClient;

/// A transparent 1x1 PNG.
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
    0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
];

/// A mock implementation of the `ImageOperation` trait.
///
/// Writes [`PLACEHOLDER_PNG`] to every output path without touching the network.
#[derive(Debug, Default, Clone)]
pub struct MockImageOperation;

impl MockImageOperation {
    /// Creates a new `MockImageOperation`.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    async fn write_placeholders(output_path: &Path, count: u8) -> Result<Vec<PathBuf>, ImageError> {
        let paths = numbered_output_paths(output_path, count);
        for path in &paths {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| ImageError::Local(format!("Failed to create directory: {e}")))?;
            }
            tokio::fs::write(path, PLACEHOLDER_PNG).await.map_err(|e| {
                ImageError::Local(format!("Failed to write {}: {e}", path.display()))
            })?;
        }
        Ok(paths)
    }
}

#[async_trait]
impl ImageOperation for MockImageOperation {
    async fn generate(&self, request: &GenerateRequest) -> Result<ImageOutput, ImageError> {
        debug!(model = %request.model, n = request.image_count, "MockImageOperation generating");

        let saved_paths =
            Self::write_placeholders(&request.output_path, request.image_count).await?;
        Ok(ImageOutput {
            saved_paths,
            revised_prompt: Some(format!("Mock rendering of: {}", request.prompt)),
        })
    }

    async fn edit(&self, request: &EditRequest) -> Result<ImageOutput, ImageError> {
        debug!(model = %request.model, n = request.image_count, "MockImageOperation editing");

        if let ImageSource::Path(source) = &request.source {
            if !source.exists() {
                return Err(ImageError::Local(format!(
                    "Failed to read source image {}",
                    source.display()
                )));
            }
        }

        let saved_paths =
            Self::write_placeholders(&request.output_path, request.image_count).await?;
        Ok(ImageOutput { saved_paths, revised_prompt: None })
    }

    fn provider_id(&self) -> &str {
        "mock"
    }
}
