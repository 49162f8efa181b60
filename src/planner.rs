// Planner - the unified entry point: one cache shared by cached reads and
// the mutation reconciler, plus the calendar view built on top of them.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::{
    config::{CacheConfig, Config},
    error::{AppError, AppResult},
    infrastructure::{QueryCache, QueryClient, RemoteStore, Repository, RestStore, TimeoutStore},
    models::{ContentFilters, ContentItem, EventItem},
    services::{project, CalendarProjection, MutationHandle, MutationReconciler},
};

#[derive(Clone)]
pub struct Planner {
    queries: QueryClient,
    reconciler: Arc<MutationReconciler>,
}

impl Planner {
    pub fn new(store: Arc<dyn RemoteStore>, cache_config: CacheConfig) -> Self {
        let cache = Arc::new(QueryCache::new(cache_config));
        let repository = Repository::new(store);
        Self {
            queries: QueryClient::new(cache.clone(), repository.clone()),
            reconciler: Arc::new(MutationReconciler::new(cache, repository)),
        }
    }

    /// Planner over the hosted REST store, every call bounded by the
    /// configured timeout.
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let (url, api_key) = match (&config.remote.url, &config.remote.api_key) {
            (Some(url), Some(key)) => (url.clone(), key.clone()),
            _ => {
                return Err(AppError::Configuration(
                    "REMOTE_URL and REMOTE_API_KEY must both be set".to_string(),
                ))
            }
        };
        let store = TimeoutStore::new(RestStore::new(url, api_key), config.remote.timeout());
        info!("planner using remote store with {:?} timeout", config.remote.timeout());
        Ok(Self::new(Arc::new(store), config.cache.clone()))
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    pub fn reconciler(&self) -> Arc<MutationReconciler> {
        self.reconciler.clone()
    }

    /// A fresh mutation handle sharing this planner's cache.
    pub fn mutation(&self) -> MutationHandle {
        MutationHandle::new(self.reconciler.clone())
    }

    /// Reads the client's content and events through the cache and projects
    /// them onto the month containing `month`.
    pub async fn calendar(
        &self,
        client_id: Option<Uuid>,
        month: NaiveDate,
        filters: &ContentFilters,
    ) -> AppResult<CalendarProjection> {
        let Some(client_id) = client_id else {
            return Ok(project(&[], &[], None, month, filters));
        };
        let scope = client_id.to_string();
        let (content, events) = futures::try_join!(
            self.queries.list::<ContentItem>(&scope),
            self.queries.list::<EventItem>(&scope)
        )?;
        Ok(project(&content, &events, Some(client_id), month, filters))
    }

    /// Session teardown.
    pub async fn end_session(&self) {
        self.queries.cache().clear().await;
    }
}
