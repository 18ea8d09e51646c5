//! xAI image API implementation.
//!
//! This module provides an implementation of the `ImageOperation` trait for
//! xAI's `/images/generations` and `/images/edits` endpoints.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use prism_abstraction::{
    EditRequest, GenerateRequest, ImageError, ImageOperation, ImageOutput, ImageSource,
    numbered_output_paths,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, error, warn};

/// Default xAI API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.x.ai/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "XAI_API_KEY";

/// xAI image client.
#[derive(Debug, Clone)]
pub struct XaiImageClient {
    /// The API key for authentication.
    api_key: String,
    /// The base URL for the xAI API.
    base_url: String,
    /// HTTP client for making requests.
    client: Client,
}

impl XaiImageClient {
    /// Creates a new client using the key in `XAI_API_KEY`.
    ///
    /// # Errors
    /// Returns an `ImageError` if the API key is not set.
    pub fn new() -> Result<Self, ImageError> {
        Self::from_env(API_KEY_ENV)
    }

    /// Creates a new client, reading the API key from the named variable.
    ///
    /// # Errors
    /// Returns an `ImageError` if the variable is not set.
    #[allow(clippy::disallowed_methods)] // env::var is needed for API key loading
    pub fn from_env(var: &str) -> Result<Self, ImageError> {
        let api_key = env::var(var).map_err(|_| {
            ImageError::Local(format!("{var} environment variable not set"))
        })?;
        Ok(Self::with_api_key(api_key))
    }

    /// Creates a new client with an explicit API key.
    #[must_use]
    pub fn with_api_key(api_key: String) -> Self {
        Self { api_key, base_url: DEFAULT_BASE_URL.to_string(), client: Client::new() }
    }

    /// Points the client at a different API root.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Applies a per-request timeout.
    ///
    /// # Errors
    /// Returns an `ImageError` if the HTTP client cannot be built.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, ImageError> {
        self.client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ImageError::Request(format!("Failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    /// Returns the configured API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_images<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<XaiImageResponse, ImageError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, endpoint = endpoint, "Failed to send request to xAI API");
                request_error(&e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = %status, error = %error_text, "xAI API returned error status");
            return Err(ImageError::Remote {
                status: status.as_u16(),
                message: extract_error_message(&error_text),
            });
        }

        response.json::<XaiImageResponse>().await.map_err(|e| {
            error!(error = %e, "Failed to parse xAI API response");
            ImageError::Remote {
                status: status.as_u16(),
                message: format!("Failed to parse response: {e}"),
            }
        })
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, ImageError> {
        let response = self.client.get(url).send().await.map_err(|e| request_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Remote {
                status: status.as_u16(),
                message: format!("Failed to download generated image from {url}"),
            });
        }
        let bytes = response.bytes().await.map_err(|e| request_error(&e))?;
        Ok(bytes.to_vec())
    }

    /// Writes the returned images to the paths numbered for the requested count.
    ///
    /// Images beyond `requested` are ignored. A short response fills the first
    /// paths only.
    async fn save_images(
        &self,
        response: XaiImageResponse,
        output_path: &Path,
        requested: u8,
    ) -> Result<ImageOutput, ImageError> {
        if response.data.is_empty() {
            return Err(ImageError::Remote {
                status: 200,
                message: "Response contained no images".to_string(),
            });
        }
        if response.data.len() != usize::from(requested) {
            warn!(
                requested = requested,
                returned = response.data.len(),
                "Image count in response differs from request"
            );
        }

        let mut paths = numbered_output_paths(output_path, requested);
        paths.truncate(response.data.len());
        let revised_prompt = response.data.iter().find_map(|d| d.revised_prompt.clone());

        for (item, path) in response.data.into_iter().zip(&paths) {
            let bytes = match (item.b64_json, item.url) {
                (Some(encoded), _) => STANDARD.decode(encoded.trim()).map_err(|e| {
                    ImageError::Local(format!("Failed to decode image data: {e}"))
                })?,
                (None, Some(url)) => self.download(&url).await?,
                (None, None) => {
                    return Err(ImageError::Remote {
                        status: 200,
                        message: "Response image has neither b64_json nor url".to_string(),
                    });
                }
            };
            write_image(path, &bytes).await?;
        }

        Ok(ImageOutput { saved_paths: paths, revised_prompt })
    }
}

#[async_trait]
impl ImageOperation for XaiImageClient {
    async fn generate(&self, request: &GenerateRequest) -> Result<ImageOutput, ImageError> {
        debug!(
            model = %request.model,
            n = request.image_count,
            prompt_len = request.prompt.len(),
            "XaiImageClient generating images"
        );

        let body = XaiGenerateRequest {
            model: &request.model,
            prompt: &request.prompt,
            n: request.image_count,
            response_format: "b64_json",
            aspect_ratio: request.aspect_ratio.as_deref(),
            resolution: request.resolution.as_deref(),
        };

        let response = self.post_images("images/generations", &body).await?;
        self.save_images(response, &request.output_path, request.image_count).await
    }

    async fn edit(&self, request: &EditRequest) -> Result<ImageOutput, ImageError> {
        debug!(
            model = %request.model,
            n = request.image_count,
            prompt_len = request.prompt.len(),
            "XaiImageClient editing image"
        );

        // Fails before any network traffic if the source is unusable.
        let image_url = source_to_url(&request.source).await?;

        let body = XaiEditRequest {
            model: &request.model,
            prompt: &request.prompt,
            n: request.image_count,
            response_format: "b64_json",
            resolution: request.resolution.as_deref(),
            image: XaiImageRef { url: image_url, kind: "image_url" },
        };

        let response = self.post_images("images/edits", &body).await?;
        self.save_images(response, &request.output_path, request.image_count).await
    }

    fn provider_id(&self) -> &str {
        "xai"
    }
}

fn request_error(e: &reqwest::Error) -> ImageError {
    if e.is_timeout() {
        ImageError::Request(format!("request timeout: {e}"))
    } else {
        ImageError::Request(e.to_string())
    }
}

/// Pulls the human-readable message out of an error body when it is JSON.
fn extract_error_message(body: &str) -> String {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(body) else {
        return body.to_string();
    };
    let message = match value.get("error") {
        Some(serde_json::Value::String(s)) => Some(s.clone()),
        Some(obj) => obj.get("message").and_then(|m| m.as_str()).map(str::to_string),
        None => value.get("message").and_then(|m| m.as_str()).map(str::to_string),
    };
    message.unwrap_or_else(|| body.to_string())
}

/// Resolves an edit source into something the API accepts as `image.url`.
pub(crate) async fn source_to_url(source: &ImageSource) -> Result<String, ImageError> {
    match source {
        ImageSource::Path(path) => {
            let mime = mime_for_path(path)?;
            let bytes = tokio::fs::read(path).await.map_err(|e| {
                ImageError::Local(format!("Failed to read source image {}: {e}", path.display()))
            })?;
            Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
        }
        ImageSource::Base64(data) => {
            let data = data.trim();
            let payload = match data.strip_prefix("data:") {
                Some(rest) => rest.split_once(',').map(|(_, p)| p).ok_or_else(|| {
                    ImageError::Local("Malformed data URI for source image".to_string())
                })?,
                None => data,
            };
            STANDARD.decode(payload).map_err(|e| {
                ImageError::Local(format!("Source image is not valid base64: {e}"))
            })?;
            if data.starts_with("data:") {
                Ok(data.to_string())
            } else {
                Ok(format!("data:image/png;base64,{data}"))
            }
        }
        ImageSource::Url(url) => Ok(url.clone()),
    }
}

fn mime_for_path(path: &Path) -> Result<&'static str, ImageError> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => Ok("image/png"),
        "jpg" | "jpeg" => Ok("image/jpeg"),
        "webp" => Ok("image/webp"),
        "gif" => Ok("image/gif"),
        _ => Err(ImageError::Local(format!(
            "Unsupported source image type: {}",
            path.display()
        ))),
    }
}

async fn write_image(path: &Path, bytes: &[u8]) -> Result<(), ImageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            ImageError::Local(format!("Failed to create directory {}: {e}", parent.display()))
        })?;
    }
    tokio::fs::write(path, bytes)
        .await
        .map_err(|e| ImageError::Local(format!("Failed to write {}: {e}", path.display())))
}

// xAI API request/response structures

#[derive(Debug, Serialize)]
struct XaiGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    aspect_ratio: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct XaiEditRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    response_format: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution: Option<&'a str>,
    image: XaiImageRef,
}

#[derive(Debug, Serialize)]
struct XaiImageRef {
    url: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct XaiImageResponse {
    data: Vec<XaiImageData>,
}

#[derive(Debug, Deserialize)]
struct XaiImageData {
    b64_json: Option<String>,
    url: Option<String>,
    revised_prompt: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extract_error_message_variants() {
        assert_eq!(extract_error_message("plain text"), "plain text");
        assert_eq!(extract_error_message(r#"{"error": "Too many requests"}"#), "Too many requests");
        assert_eq!(
            extract_error_message(r#"{"error": {"message": "bad size", "code": 400}}"#),
            "bad size"
        );
        assert_eq!(extract_error_message(r#"{"other": 1}"#), r#"{"other": 1}"#);
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let client = XaiImageClient::with_api_key("k".to_string()).with_base_url("http://x/v1/");
        assert_eq!(client.base_url(), "http://x/v1");
        assert_eq!(client.provider_id(), "xai");
    }

    #[tokio::test]
    async fn test_source_to_url_base64_is_wrapped() {
        let url = source_to_url(&ImageSource::Base64("aGVsbG8=".to_string())).await.unwrap();
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");

        let data_uri = "data:image/jpeg;base64,aGVsbG8=".to_string();
        let url = source_to_url(&ImageSource::Base64(data_uri.clone())).await.unwrap();
        assert_eq!(url, data_uri);
    }

    #[tokio::test]
    async fn test_source_to_url_rejects_invalid_base64() {
        let result = source_to_url(&ImageSource::Base64("not base64!!".to_string())).await;
        assert!(matches!(result, Err(ImageError::Local(_))));
    }

    #[tokio::test]
    async fn test_source_to_url_missing_file_fails_fast() {
        let source = ImageSource::Path(PathBuf::from("/nonexistent/source.png"));
        let err = source_to_url(&source).await.unwrap_err();
        assert!(err.to_string().contains("Failed to read source image"));
    }

    #[tokio::test]
    async fn test_source_to_url_reads_local_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("in.jpg");
        std::fs::write(&path, b"hello").unwrap();

        let url = source_to_url(&ImageSource::Path(path)).await.unwrap();
        assert_eq!(url, "data:image/jpeg;base64,aGVsbG8=");
    }

    #[test]
    fn test_mime_for_unknown_extension() {
        assert!(mime_for_path(Path::new("a.tiff")).is_err());
        assert_eq!(mime_for_path(Path::new("a.PNG")).unwrap(), "image/png");
    }
}
