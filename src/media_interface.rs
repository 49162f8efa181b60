// Media functions - presigned upload URLs and file deletion for the
// object store that holds post media.

use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info, instrument};

use crate::{
    error::{AppError, AppResult},
    infrastructure::{ObjectStorage, PresignedUpload},
};

static KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._\-/]{0,1023}$").expect("valid storage key pattern")
});
static CONTENT_TYPE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w.+-]+/[\w.+-]+$").expect("valid content type pattern"));

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateUploadUrlRequest {
    pub key: Option<String>,
    pub content_type: Option<String>,
    pub client_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeleteFileRequest {
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteFileResponse {
    pub success: bool,
}

/// Media function state. `storage` is absent when the storage settings are
/// incomplete; every call then fails with a configuration error.
#[derive(Clone)]
pub struct MediaInterface {
    storage: Option<Arc<dyn ObjectStorage>>,
}

impl MediaInterface {
    pub fn new(storage: Option<Arc<dyn ObjectStorage>>) -> Self {
        Self { storage }
    }

    fn storage(&self) -> AppResult<&Arc<dyn ObjectStorage>> {
        self.storage.as_ref().ok_or_else(|| {
            error!("media function called without storage configuration");
            AppError::Configuration("object storage is not configured".to_string())
        })
    }

    #[instrument(skip(self, request))]
    pub async fn generate_upload_url(
        &self,
        request: GenerateUploadUrlRequest,
    ) -> AppResult<PresignedUpload> {
        let key = required(request.key);
        let content_type = required(request.content_type);
        let client_id = required(request.client_id);

        let (key, content_type, client_id) = match (key, content_type, client_id) {
            (Some(k), Some(c), Some(id)) => (k, c, id),
            (k, c, id) => {
                let missing: Vec<&str> = [
                    ("key", k.is_none()),
                    ("contentType", c.is_none()),
                    ("clientId", id.is_none()),
                ]
                .into_iter()
                .filter(|(_, absent)| *absent)
                .map(|(name, _)| name)
                .collect();
                return Err(AppError::BadRequest(format!(
                    "Missing required fields: {}",
                    missing.join(", ")
                )));
            }
        };

        validate_key(&key)?;
        if !CONTENT_TYPE_PATTERN.is_match(&content_type) {
            return Err(AppError::Validation(format!(
                "Invalid content type: {}",
                content_type
            )));
        }

        let upload = self.storage()?.presign_upload(&key, &content_type).await?;
        info!("upload URL issued for client {} key {}", client_id, key);
        Ok(upload)
    }

    #[instrument(skip(self, request))]
    pub async fn delete_file(&self, request: DeleteFileRequest) -> AppResult<DeleteFileResponse> {
        let key = required(request.key)
            .ok_or_else(|| AppError::BadRequest("Missing required fields: key".to_string()))?;
        validate_key(&key)?;

        self.storage()?.delete_object(&key).await?;
        info!("deleted media object {}", key);
        Ok(DeleteFileResponse { success: true })
    }
}

fn required(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Object keys are relative paths without traversal segments.
pub fn validate_key(key: &str) -> AppResult<()> {
    let traversal = key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if traversal || !KEY_PATTERN.is_match(key) {
        return Err(AppError::Validation(format!("Invalid storage key: {}", key)));
    }
    Ok(())
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {}", e)))
}

async fn generate_upload_url_handler(
    State(media): State<MediaInterface>,
    body: Bytes,
) -> AppResult<Json<PresignedUpload>> {
    let request = parse_body(&body)?;
    Ok(Json(media.generate_upload_url(request).await?))
}

async fn delete_file_handler(
    State(media): State<MediaInterface>,
    body: Bytes,
) -> AppResult<Json<DeleteFileResponse>> {
    let request = parse_body(&body)?;
    Ok(Json(media.delete_file(request).await?))
}

async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Routes for the media functions, mounted under `/functions/v1`. Browsers
/// call them cross-origin, so CORS preflight is answered here.
pub fn create_media_router(media: MediaInterface) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/functions/v1/generate-upload-url", post(generate_upload_url_handler))
        .route("/functions/v1/delete-file", post(delete_file_handler))
        .layer(CorsLayer::permissive())
        .with_state(media)
}
