//! Graph uploader integration tests against a mock HTTP server.
//!
//! Covers the token flows, site resolution, the single-PUT path and the
//! chunked upload session path including chunk rejection.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tempfile::TempDir;
use wiremock::{
    matchers::{header, method, path, path_regex},
    Mock, MockServer, ResponseTemplate,
};

use reportrelay_core::retry::RetryConfig;
use reportrelay_core::upload::{
    GraphUploader, UploadClient, UploadConfig, UploadError, UploadMode, Uploader,
};

const SITE_URL: &str = "https://contoso.sharepoint.com/sites/Reports";
const PRIMARY_TOKEN_PATH: &str = "/contoso.onmicrosoft.com/oauth2/v2.0/token";
const LEGACY_TOKEN_PATH: &str = "/common/oauth2/token";

fn config(server: &MockServer) -> UploadConfig {
    let mut config = UploadConfig::new(SITE_URL, "bot@contoso.com", "secret")
        .with_endpoints(server.uri(), server.uri())
        .with_transfer_sizes(1024, 1000)
        .with_retry(
            RetryConfig::upload().with_delays(Duration::from_millis(1), Duration::from_millis(5)),
        );
    config.folder_path = "Reports".to_string();
    config
}

fn write_file(dir: &TempDir, name: &str, size: usize) -> PathBuf {
    let path = dir.path().join(name);
    let content: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, content).unwrap();
    path
}

async fn mount_token(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(PRIMARY_TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "primary-token", "expires_in": 3600})),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path_regex(r"^/sites/contoso\.sharepoint\.com:/sites/Reports$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "site-123"})))
        .mount(server)
        .await;
}

async fn mount_session(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path_regex(r"^/sites/site-123/drive/root:/Reports/big\.xlsx:/createUploadSession$"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"uploadUrl": format!("{}/upload/session", server.uri())})),
        )
        .mount(server)
        .await;
}

async fn mount_chunks(server: &MockServer) {
    Mock::given(method("PUT"))
        .and(path("/upload/session"))
        .respond_with(ResponseTemplate::new(202).set_body_json(json!({
            "id": "item-big",
            "webUrl": "https://contoso.sharepoint.com/sites/Reports/big.xlsx"
        })))
        .mount(server)
        .await;
}

async fn content_ranges(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|r| r.method.as_str() == "PUT" && r.url.path() == "/upload/session")
        .filter_map(|r| {
            r.headers
                .get("content-range")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}

#[tokio::test]
async fn test_small_file_uses_single_put() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_site(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r"^/sites/site-123/drive/root:/Reports/small\.xlsx:/content$"))
        .and(header("authorization", "Bearer primary-token"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "item-small"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "small.xlsx", 800);

    let uploader = GraphUploader::new(config(&server)).unwrap();
    let receipt = uploader.upload(&file).await.unwrap();

    assert_eq!(receipt.mode, UploadMode::Simple);
    assert_eq!(receipt.size, 800);
    assert_eq!(receipt.chunks, 1);
    assert_eq!(receipt.item_id.as_deref(), Some("item-small"));
    assert_eq!(receipt.remote_path, "Reports/small.xlsx");
}

#[tokio::test]
async fn test_large_file_is_chunked() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_site(&server).await;
    mount_session(&server).await;
    mount_chunks(&server).await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "big.xlsx", 2500);

    let uploader = GraphUploader::new(config(&server)).unwrap();
    let receipt = uploader.upload(&file).await.unwrap();

    assert_eq!(receipt.mode, UploadMode::Session);
    // ceil(2500 / 1000) chunk PUTs, the last one ending at byte 2499.
    assert_eq!(receipt.chunks, 3);
    assert_eq!(
        content_ranges(&server).await,
        vec![
            "bytes 0-999/2500".to_string(),
            "bytes 1000-1999/2500".to_string(),
            "bytes 2000-2499/2500".to_string(),
        ]
    );
    assert_eq!(receipt.item_id.as_deref(), Some("item-big"));
}

#[tokio::test]
async fn test_chunk_requests_carry_no_bearer_token() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_site(&server).await;
    mount_session(&server).await;
    mount_chunks(&server).await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "big.xlsx", 1500);

    GraphUploader::new(config(&server))
        .unwrap()
        .upload(&file)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let chunk_puts: Vec<_> = requests
        .iter()
        .filter(|r| r.url.path() == "/upload/session")
        .collect();
    assert_eq!(chunk_puts.len(), 2);
    assert!(chunk_puts
        .iter()
        .all(|r| r.headers.get("authorization").is_none()));
}

#[tokio::test]
async fn test_rejected_chunk_aborts_upload() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_site(&server).await;
    mount_session(&server).await;
    Mock::given(method("PUT"))
        .and(path("/upload/session"))
        .respond_with(ResponseTemplate::new(416))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "big.xlsx", 2500);

    let err = GraphUploader::new(config(&server))
        .unwrap()
        .upload(&file)
        .await
        .unwrap_err();

    match err {
        UploadError::ChunkRejected { status, range } => {
            assert_eq!(status, 416);
            assert_eq!(range, "bytes 0-999/2500");
        }
        other => panic!("expected ChunkRejected, got {:?}", other),
    }
    // No further chunk was sent after the rejection.
    assert_eq!(content_ranges(&server).await.len(), 1);
}

#[tokio::test]
async fn test_retry_after_rejected_chunk_starts_new_session() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_site(&server).await;
    mount_session(&server).await;
    Mock::given(method("PUT"))
        .and(path("/upload/session"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_chunks(&server).await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "big.xlsx", 2500);

    let upload_config = config(&server);
    let retry = upload_config.retry.clone();
    let uploader = Arc::new(GraphUploader::new(upload_config).unwrap());
    let client = UploadClient::new(uploader, retry);

    let outcome = client.upload(&file).await;

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.state.attempts, 2);

    let requests = server.received_requests().await.unwrap();
    let sessions = requests
        .iter()
        .filter(|r| r.url.path().ends_with(":/createUploadSession"))
        .count();
    assert_eq!(sessions, 2);

    // The second session starts again from byte 0.
    assert_eq!(
        content_ranges(&server).await,
        vec![
            "bytes 0-999/2500".to_string(),
            "bytes 0-999/2500".to_string(),
            "bytes 1000-1999/2500".to_string(),
            "bytes 2000-2499/2500".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_token_falls_back_to_legacy_endpoint() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(PRIMARY_TOKEN_PATH))
        .respond_with(ResponseTemplate::new(400).set_body_string("AADSTS50126"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(LEGACY_TOKEN_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access_token": "legacy-token", "expires_in": "3599"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/sites/contoso\.sharepoint\.com:/sites/Reports$"))
        .and(header("authorization", "Bearer legacy-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "site-123"})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path_regex(r":/content$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "item"})))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "small.xlsx", 10);

    let receipt = GraphUploader::new(config(&server))
        .unwrap()
        .upload(&file)
        .await
        .unwrap();
    assert_eq!(receipt.mode, UploadMode::Simple);
}

#[tokio::test]
async fn test_both_token_flows_failing_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid_grant"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "small.xlsx", 10);

    let err = GraphUploader::new(config(&server))
        .unwrap()
        .upload(&file)
        .await
        .unwrap_err();
    assert!(matches!(err, UploadError::Authentication { .. }));
}

#[tokio::test]
async fn test_token_is_cached_between_uploads() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_site(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r":/content$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "item"})))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "small.xlsx", 10);

    let uploader = GraphUploader::new(config(&server)).unwrap();
    uploader.upload(&file).await.unwrap();
    uploader.upload(&file).await.unwrap();
}

#[tokio::test]
async fn test_rejected_token_is_refreshed_on_retry() {
    let server = MockServer::start().await;
    mount_token(&server, 2).await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/sites/contoso\.sharepoint\.com:/sites/Reports$"))
        .respond_with(ResponseTemplate::new(401).set_body_string("InvalidAuthenticationToken"))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_site(&server).await;
    Mock::given(method("PUT"))
        .and(path_regex(r":/content$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "item"})))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let file = write_file(&dir, "small.xlsx", 10);

    let upload_config = config(&server);
    let retry = upload_config.retry.clone();
    let uploader = Arc::new(GraphUploader::new(upload_config).unwrap());
    let client = UploadClient::new(uploader, retry);

    let outcome = client.upload(&file).await;

    assert!(outcome.result.is_ok());
    assert_eq!(outcome.state.attempts, 2);
}

#[tokio::test]
async fn test_connection_check_tolerates_missing_folder() {
    let server = MockServer::start().await;
    mount_token(&server, 1).await;
    mount_site(&server).await;
    Mock::given(method("GET"))
        .and(path("/sites/site-123/drive/root:/Reports"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let uploader = GraphUploader::new(config(&server)).unwrap();
    assert!(uploader.test_connection().await.is_ok());
}
