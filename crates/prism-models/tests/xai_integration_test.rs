//! Integration tests for the xAI image client against a mock HTTP server.

use prism_abstraction::{EditRequest, GenerateRequest, ImageError, ImageOperation, ImageSource};
use prism_models::XaiImageClient;
use tempfile::TempDir;

fn generate_request(dir: &TempDir, n: u8) -> GenerateRequest {
    GenerateRequest {
        prompt: "a red fox in snow".to_string(),
        model: "grok-imagine-image".to_string(),
        image_count: n,
        aspect_ratio: Some("1:1".to_string()),
        resolution: None,
        output_path: dir.path().join("fox.png"),
    }
}

#[tokio::test]
async fn test_generate_saves_decoded_images() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());

    let mock = server
        .mock("POST", "/v1/images/generations")
        .match_header("authorization", "Bearer test-key")
        .match_body(mockito::Matcher::PartialJson(serde_json::json!({
            "model": "grok-imagine-image",
            "n": 2,
            "response_format": "b64_json",
            "aspect_ratio": "1:1",
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"data": [
                {"b64_json": "aGVsbG8=", "revised_prompt": "A red fox standing in fresh snow"},
                {"b64_json": "d29ybGQ="}
            ]}"#,
        )
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = XaiImageClient::with_api_key("test-key".to_string()).with_base_url(base_url);
    let output = client.generate(&generate_request(&dir, 2)).await.unwrap();

    mock.assert_async().await;
    assert_eq!(output.saved_paths.len(), 2);
    assert_eq!(std::fs::read(dir.path().join("fox-1.png")).unwrap(), b"hello");
    assert_eq!(std::fs::read(dir.path().join("fox-2.png")).unwrap(), b"world");
    assert_eq!(output.revised_prompt.as_deref(), Some("A red fox standing in fresh snow"));
}

#[tokio::test]
async fn test_short_response_keeps_requested_numbering() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());

    let _mock = server
        .mock("POST", "/v1/images/generations")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"b64_json": "aGVsbG8="}]}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = XaiImageClient::with_api_key("test-key".to_string()).with_base_url(base_url);
    let output = client.generate(&generate_request(&dir, 2)).await.unwrap();

    assert_eq!(output.saved_paths, vec![dir.path().join("fox-1.png")]);
    assert_eq!(std::fs::read(dir.path().join("fox-1.png")).unwrap(), b"hello");
    assert!(!dir.path().join("fox.png").exists());
    assert!(!dir.path().join("fox-2.png").exists());
}

#[tokio::test]
async fn test_extra_images_beyond_request_are_ignored() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());

    let _mock = server
        .mock("POST", "/v1/images/generations")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"data": [{"b64_json": "aGVsbG8="}, {"b64_json": "d29ybGQ="}]}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = XaiImageClient::with_api_key("test-key".to_string()).with_base_url(base_url);
    let output = client.generate(&generate_request(&dir, 1)).await.unwrap();

    assert_eq!(output.saved_paths, vec![dir.path().join("fox.png")]);
    assert_eq!(std::fs::read(dir.path().join("fox.png")).unwrap(), b"hello");
    assert!(!dir.path().join("fox-1.png").exists());
}

#[tokio::test]
async fn test_generate_rate_limit_maps_to_remote_error() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());

    let _mock = server
        .mock("POST", "/v1/images/generations")
        .with_status(429)
        .with_body(r#"{"error": "Rate limit exceeded"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = XaiImageClient::with_api_key("test-key".to_string()).with_base_url(base_url);
    let err = client.generate(&generate_request(&dir, 1)).await.unwrap_err();

    assert_eq!(
        err,
        ImageError::Remote { status: 429, message: "Rate limit exceeded".to_string() }
    );
    assert!(err.to_string().contains("429"));
    assert!(!dir.path().join("fox.png").exists());
}

#[tokio::test]
async fn test_generate_downloads_url_results() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());
    let image_url = format!("{}/files/fox.png", server.url());

    let _api = server
        .mock("POST", "/v1/images/generations")
        .with_status(200)
        .with_body(format!(r#"{{"data": [{{"url": "{image_url}"}}]}}"#))
        .create_async()
        .await;
    let _file = server
        .mock("GET", "/files/fox.png")
        .with_status(200)
        .with_body("png-bytes")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let client = XaiImageClient::with_api_key("test-key".to_string()).with_base_url(base_url);
    let output = client.generate(&generate_request(&dir, 1)).await.unwrap();

    assert_eq!(output.saved_paths, vec![dir.path().join("fox.png")]);
    assert_eq!(std::fs::read(dir.path().join("fox.png")).unwrap(), b"png-bytes");
    assert!(output.revised_prompt.is_none());
}

#[tokio::test]
async fn test_edit_sends_data_uri_for_local_source() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());

    let dir = TempDir::new().unwrap();
    let source = dir.path().join("source.png");
    std::fs::write(&source, b"hello").unwrap();

    let mock = server
        .mock("POST", "/v1/images/edits")
        .match_body(mockito::Matcher::PartialJsonString(
            r#"{"image": {"url": "data:image/png;base64,aGVsbG8=", "type": "image_url"}}"#
                .to_string(),
        ))
        .with_status(200)
        .with_body(r#"{"data": [{"b64_json": "ZWRpdGVk"}]}"#)
        .create_async()
        .await;

    let client = XaiImageClient::with_api_key("test-key".to_string()).with_base_url(base_url);
    let request = EditRequest {
        prompt: "add a hat".to_string(),
        model: "grok-imagine-image".to_string(),
        image_count: 1,
        resolution: None,
        source: ImageSource::Path(source),
        output_path: dir.path().join("edited.png"),
    };
    let output = client.edit(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(std::fs::read(&output.saved_paths[0]).unwrap(), b"edited");
}

#[tokio::test]
async fn test_edit_unreadable_source_never_calls_api() {
    let mut server = mockito::Server::new_async().await;
    let base_url = format!("{}/v1", server.url());

    let mock = server.mock("POST", "/v1/images/edits").expect(0).create_async().await;

    let dir = TempDir::new().unwrap();
    let client = XaiImageClient::with_api_key("test-key".to_string()).with_base_url(base_url);
    let request = EditRequest {
        prompt: "add a hat".to_string(),
        model: "grok-imagine-image".to_string(),
        image_count: 1,
        resolution: None,
        source: ImageSource::Path(dir.path().join("missing.png")),
        output_path: dir.path().join("edited.png"),
    };

    let err = client.edit(&request).await.unwrap_err();
    assert!(matches!(err, ImageError::Local(_)));
    mock.assert_async().await;
}
