use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::infrastructure::cache_layer::{QueryCache, QueryKey};
use crate::infrastructure::repository::Repository;
use crate::models::Entity;

/// Cached typed reads. Lists and details are stored under their canonical
/// keys in semantic (camelCase) form.
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<QueryCache>,
    repository: Repository,
}

impl QueryClient {
    pub fn new(cache: Arc<QueryCache>, repository: Repository) -> Self {
        Self { cache, repository }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    pub async fn list<T: Entity>(&self, scope: &str) -> AppResult<Vec<T>> {
        let key = QueryKey::list(T::KIND, scope);
        let value = self
            .cache
            .fetch_query(key, || async {
                let items: Vec<T> = self.repository.list(scope).await?;
                Ok(serde_json::to_value(items)?)
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    pub async fn detail<T: Entity>(&self, id: Uuid) -> AppResult<T> {
        let key = QueryKey::detail(T::KIND, id);
        let value = self
            .cache
            .fetch_query(key, || async {
                let item: T = self.repository.get(id).await?;
                Ok(serde_json::to_value(item)?)
            })
            .await?;
        Ok(serde_json::from_value(value)?)
    }
}
