use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::services::mutation_service::MutationReconciler;

#[derive(Debug, Clone, Default)]
struct MutationState {
    pending: usize,
    error: Option<AppError>,
}

/// `{ mutate, is_pending, error }` handle for one mutation site.
///
/// The operation runs on its own task, so a caller that stops waiting
/// (navigation, timeout) does not interrupt rollback or settle-time
/// invalidation. Serialising mutations of the same entity is up to the
/// caller, e.g. by checking `is_pending` first.
#[derive(Clone)]
pub struct MutationHandle {
    reconciler: Arc<MutationReconciler>,
    state: Arc<RwLock<MutationState>>,
}

impl MutationHandle {
    pub fn new(reconciler: Arc<MutationReconciler>) -> Self {
        Self {
            reconciler,
            state: Arc::new(RwLock::new(MutationState::default())),
        }
    }

    pub async fn mutate<F, Fut, R>(&self, operation: F) -> AppResult<R>
    where
        F: FnOnce(Arc<MutationReconciler>) -> Fut,
        Fut: Future<Output = AppResult<R>> + Send + 'static,
        R: Send + 'static,
    {
        {
            let mut state = self.state.write().await;
            state.pending += 1;
            state.error = None;
        }

        let state = self.state.clone();
        let work = operation(self.reconciler.clone());
        let task = tokio::spawn(async move {
            let result = work.await;
            let mut state = state.write().await;
            state.pending = state.pending.saturating_sub(1);
            state.error = result.as_ref().err().cloned();
            result
        });

        match task.await {
            Ok(result) => result,
            Err(join_err) => Err(AppError::Internal(format!(
                "mutation task failed: {}",
                join_err
            ))),
        }
    }

    pub async fn is_pending(&self) -> bool {
        self.state.read().await.pending > 0
    }

    /// The failure of the most recent mutation, if it failed.
    pub async fn error(&self) -> Option<AppError> {
        self.state.read().await.error.clone()
    }

    pub async fn reset(&self) {
        self.state.write().await.error = None;
    }
}
