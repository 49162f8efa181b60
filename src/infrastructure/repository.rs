use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::infrastructure::traits::RemoteStore;
use crate::models::{Entity, EntityPatch};

/// Typed access to the remote store: converts between wire rows and
/// semantic entities.
#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn RemoteStore>,
}

impl Repository {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> Arc<dyn RemoteStore> {
        self.store.clone()
    }

    pub async fn get<T: Entity>(&self, id: Uuid) -> AppResult<T> {
        let row = self.store.get(T::KIND, id).await?;
        T::from_row_value(row)
    }

    pub async fn list<T: Entity>(&self, scope: &str) -> AppResult<Vec<T>> {
        self.store
            .list(T::KIND, scope)
            .await?
            .into_iter()
            .map(T::from_row_value)
            .collect()
    }

    pub async fn create<T: Entity>(&self, entity: &T) -> AppResult<T> {
        let row = self.store.create(T::KIND, entity.to_row_value()?).await?;
        T::from_row_value(row)
    }

    pub async fn update<T, P>(&self, id: Uuid, patch: &P) -> AppResult<T>
    where
        T: Entity,
        P: EntityPatch<T>,
    {
        let row = self.store.update(T::KIND, id, patch.changeset()?).await?;
        T::from_row_value(row)
    }

    pub async fn delete<T: Entity>(&self, id: Uuid) -> AppResult<()> {
        self.store.delete(T::KIND, id).await
    }
}
