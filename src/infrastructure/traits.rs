use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::EntityKind;

/// Keyed CRUD against the remote relational store.
///
/// Rows are wire-shaped JSON (snake_case, nullable columns). Failures are
/// typed: `Auth`, `NotFound`, `Validation`, `Timeout`, `Transient`.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get(&self, kind: EntityKind, id: Uuid) -> AppResult<Value>;
    /// Rows whose scope column equals `scope`; unscoped kinds ignore it.
    async fn list(&self, kind: EntityKind, scope: &str) -> AppResult<Vec<Value>>;
    async fn create(&self, kind: EntityKind, row: Value) -> AppResult<Value>;
    async fn update(&self, kind: EntityKind, id: Uuid, changes: Value) -> AppResult<Value>;
    /// Deleting an absent row succeeds.
    async fn delete(&self, kind: EntityKind, id: Uuid) -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresignedUpload {
    pub upload_url: String,
    pub public_url: String,
    pub key: String,
}

/// Object storage for media files.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn presign_upload(&self, key: &str, content_type: &str) -> AppResult<PresignedUpload>;
    /// Removing an absent object succeeds.
    async fn delete_object(&self, key: &str) -> AppResult<()>;
}
