use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use content_planner::config::StorageConfig;
use content_planner::infrastructure::{ObjectStorage, PresignedUpload, S3Storage};
use content_planner::media_interface::{create_media_router, MediaInterface};
use content_planner::{AppError, AppResult};

#[derive(Default)]
struct RecordingStorage {
    deleted: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStorage for RecordingStorage {
    async fn presign_upload(&self, key: &str, content_type: &str) -> AppResult<PresignedUpload> {
        Ok(PresignedUpload {
            upload_url: format!("https://storage.test/media/{}?ct={}", key, content_type),
            public_url: format!("https://cdn.test/{}", key),
            key: key.to_string(),
        })
    }

    async fn delete_object(&self, key: &str) -> AppResult<()> {
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }
}

fn app(storage: Option<Arc<dyn ObjectStorage>>) -> Router {
    create_media_router(MediaInterface::new(storage))
}

fn with_storage(storage: &Arc<RecordingStorage>) -> Router {
    let storage: Arc<dyn ObjectStorage> = storage.clone();
    app(Some(storage))
}

async fn post(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_generate_upload_url_returns_urls_and_key() {
    let storage = Arc::new(RecordingStorage::default());
    let body = json!({
        "key": "clients/c1/2024-06/post.jpg",
        "contentType": "image/jpeg",
        "clientId": "c1"
    });

    let (status, json) = post(
        with_storage(&storage),
        "/functions/v1/generate-upload-url",
        &body.to_string(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["key"], "clients/c1/2024-06/post.jpg");
    assert_eq!(json["publicUrl"], "https://cdn.test/clients/c1/2024-06/post.jpg");
    assert!(json["uploadUrl"].as_str().unwrap().contains("ct=image/jpeg"));
}

#[tokio::test]
async fn test_missing_fields_are_bad_request() {
    let storage = Arc::new(RecordingStorage::default());
    let (status, json) = post(
        with_storage(&storage),
        "/functions/v1/generate-upload-url",
        r#"{"key": "a.jpg"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "bad_request");
    assert_eq!(json["message"], "Missing required fields: contentType, clientId");
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() {
    let storage = Arc::new(RecordingStorage::default());
    let (status, json) = post(with_storage(&storage), "/functions/v1/delete-file", "{not json").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_traversal_key_is_rejected_before_storage() {
    let storage = Arc::new(RecordingStorage::default());
    let (status, _) = post(
        with_storage(&storage),
        "/functions/v1/delete-file",
        r#"{"key": "../other-client/post.jpg"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(storage.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_unconfigured_storage_does_not_leak_details() {
    let (status, json) = post(
        app(None),
        "/functions/v1/generate-upload-url",
        r#"{"key": "a.jpg", "contentType": "image/png", "clientId": "c1"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "configuration_error");
    assert!(!json["message"].as_str().unwrap().contains("storage"));
}

#[tokio::test]
async fn test_delete_file_succeeds() {
    let storage = Arc::new(RecordingStorage::default());
    let (status, json) = post(
        with_storage(&storage),
        "/functions/v1/delete-file",
        r#"{"key": "clients/c1/old.mp4"}"#,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json, json!({"success": true}));
    assert_eq!(*storage.deleted.lock().unwrap(), vec!["clients/c1/old.mp4".to_string()]);
}

#[tokio::test]
async fn test_cors_preflight_is_answered() {
    let response = app(None)
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/functions/v1/generate-upload-url")
                .header("origin", "https://planner.example.com")
                .header("access-control-request-method", "POST")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .contains_key("access-control-allow-origin"));
}

fn s3(endpoint: String) -> S3Storage {
    S3Storage::from_config(&StorageConfig {
        endpoint: Some(endpoint),
        bucket: Some("media".into()),
        access_key_id: Some("AKID".into()),
        secret_access_key: Some("secret".into()),
        region: "auto".into(),
        public_url: Some("https://cdn.test".into()),
        url_expiry_secs: 300,
    })
    .unwrap()
}

#[tokio::test]
async fn test_s3_delete_treats_missing_object_as_deleted() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/media/clients/c1/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    s3(server.uri()).delete_object("clients/c1/gone.jpg").await.unwrap();
}

#[tokio::test]
async fn test_s3_rejected_credentials_are_configuration_errors() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = s3(server.uri()).delete_object("a.jpg").await.unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
}
