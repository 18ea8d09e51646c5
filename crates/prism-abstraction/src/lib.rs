//! Image operation abstraction layer for Prism.
//!
//! This module defines the capability the batch engine calls for every job:
//! generating new images from a prompt, or editing an existing source image.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Represents an error that can occur while running an image operation.
///
/// Retry decisions are made against the rendered message, so the `Display`
/// output of each variant is part of the contract.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageError {
    /// The remote service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Remote {
        /// HTTP status code (401, 403, 400, 429, 5xx, ...).
        status: u16,
        /// Response body or provider message.
        message: String,
    },

    /// Local I/O failure while reading a source image or saving output.
    #[error("Local error: {0}")]
    Local(String),

    /// The request never produced a response (connection, DNS, timeout).
    #[error("Network error: {0}")]
    Request(String),
}

impl ImageError {
    /// Returns the HTTP status for remote errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Reference to the image an edit job starts from.
///
/// The engine treats this as an opaque handle; only the operation
/// implementation reads or decodes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageSource {
    /// A local file.
    Path(PathBuf),
    /// Raw base64 data or a `data:` URI.
    Base64(String),
    /// A remotely hosted image.
    Url(String),
}

/// Parameters for a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// The prompt to render.
    pub prompt: String,
    /// Model identifier (e.g. "grok-imagine-image").
    pub model: String,
    /// Number of images to produce (1..=10).
    pub image_count: u8,
    /// Aspect ratio such as "16:9".
    pub aspect_ratio: Option<String>,
    /// Output resolution such as "1k".
    pub resolution: Option<String>,
    /// Where the first (or only) image is written.
    pub output_path: PathBuf,
}

/// Parameters for an edit request.
///
/// Edits never carry an aspect ratio; the source image determines it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// The edit instruction.
    pub prompt: String,
    /// Model identifier.
    pub model: String,
    /// Number of images to produce (1..=10).
    pub image_count: u8,
    /// Output resolution.
    pub resolution: Option<String>,
    /// Image being edited.
    pub source: ImageSource,
    /// Where the first (or only) image is written.
    pub output_path: PathBuf,
}

/// Result of a successful operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageOutput {
    /// Files written, one per image, in the order the service returned them.
    pub saved_paths: Vec<PathBuf>,
    /// The prompt as rewritten by the service, if it reported one.
    pub revised_prompt: Option<String>,
}

/// A trait for services that can generate and edit images.
///
/// Implementations write image bytes to disk as part of a successful call.
/// All implementations must be `Send + Sync` so one instance can be shared by
/// every job of a batch.
#[async_trait]
pub trait ImageOperation: Send + Sync {
    /// Generates new images from a prompt.
    ///
    /// # Errors
    /// Returns an `ImageError` if the request fails or the output cannot be saved.
    async fn generate(&self, request: &GenerateRequest) -> Result<ImageOutput, ImageError>;

    /// Edits a source image according to a prompt.
    ///
    /// # Errors
    /// Returns an `ImageError` if the source cannot be read, the request fails,
    /// or the output cannot be saved.
    async fn edit(&self, request: &EditRequest) -> Result<ImageOutput, ImageError>;

    /// Returns a short identifier for logging (e.g. "xai", "mock").
    fn provider_id(&self) -> &str;
}

/// Expands an output path into one path per image.
///
/// A single image keeps the path as given; several images are numbered
/// `stem-1.ext`, `stem-2.ext`, ... next to it.
pub fn numbered_output_paths(base: &Path, count: u8) -> Vec<PathBuf> {
    if count <= 1 {
        return vec![base.to_path_buf()];
    }

    let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let extension = base.extension().map(|e| e.to_string_lossy().into_owned());

    (1..=count)
        .map(|n| {
            let file_name = match &extension {
                Some(ext) => format!("{stem}-{n}.{ext}"),
                None => format!("{stem}-{n}"),
            };
            base.with_file_name(file_name)
        })
        .collect()
}
