// Store decorators - cross-cutting behaviour composed around a RemoteStore

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::infrastructure::traits::RemoteStore;
use crate::models::EntityKind;

/// Bounds every remote call with a deadline. An elapsed deadline becomes
/// `AppError::Timeout`; the remote operation itself may still complete.
#[derive(Debug)]
pub struct TimeoutStore<S> {
    inner: S,
    timeout: Duration,
}

impl<S: RemoteStore> TimeoutStore<S> {
    pub fn new(inner: S, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    async fn bounded<T, F>(&self, operation: &str, kind: EntityKind, call: F) -> AppResult<T>
    where
        F: Future<Output = AppResult<T>>,
    {
        let started = Instant::now();
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => {
                debug!("{} {} finished in {:?}", operation, kind, started.elapsed());
                result
            }
            Err(_) => {
                warn!("{} {} timed out after {:?}", operation, kind, self.timeout);
                Err(AppError::Timeout(format!(
                    "{} {} did not complete within {}ms",
                    operation,
                    kind,
                    self.timeout.as_millis()
                )))
            }
        }
    }
}

#[async_trait]
impl<S: RemoteStore> RemoteStore for TimeoutStore<S> {
    #[instrument(skip(self))]
    async fn get(&self, kind: EntityKind, id: Uuid) -> AppResult<Value> {
        self.bounded("get", kind, self.inner.get(kind, id)).await
    }

    #[instrument(skip(self))]
    async fn list(&self, kind: EntityKind, scope: &str) -> AppResult<Vec<Value>> {
        self.bounded("list", kind, self.inner.list(kind, scope)).await
    }

    #[instrument(skip(self, row))]
    async fn create(&self, kind: EntityKind, row: Value) -> AppResult<Value> {
        self.bounded("create", kind, self.inner.create(kind, row)).await
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, kind: EntityKind, id: Uuid, changes: Value) -> AppResult<Value> {
        self.bounded("update", kind, self.inner.update(kind, id, changes))
            .await
    }

    #[instrument(skip(self))]
    async fn delete(&self, kind: EntityKind, id: Uuid) -> AppResult<()> {
        self.bounded("delete", kind, self.inner.delete(kind, id)).await
    }
}
