// Mutation reconciler - optimistic cache patches around remote writes.
//
// Ordering for every optimistic write: cancel in-flight reads for the
// touched keys, snapshot them, patch, then issue the remote call. On failure
// the snapshots are restored verbatim. On settle, success or failure, the
// touched keys are invalidated so the next read refetches.

use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::AppResult;
use crate::infrastructure::cache_layer::{CacheEntry, QueryCache, QueryKey};
use crate::infrastructure::repository::Repository;
use crate::models::{
    AdminTask, AdminTaskPatch, Client, ClientPatch, ContentComment, ContentItem,
    ContentItemPatch, ContentStatus, Entity, EntityKind, EntityPatch, EventColor, EventItem,
    EventItemPatch, EventRequest, EventRequestPatch, Notification, NotificationPatch,
    RequestStatus, TaskStatus, UNSCOPED,
};

/// Pre-patch state of every cache region a mutation touched.
#[derive(Debug, Default)]
pub struct Snapshot {
    entries: Vec<(QueryKey, Option<CacheEntry>)>,
}

impl Snapshot {
    pub async fn capture(cache: &QueryCache, keys: &[QueryKey]) -> Self {
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            entries.push((key.clone(), cache.snapshot(key).await));
        }
        Self { entries }
    }

    /// Puts every captured entry back. Keys that were not cached had nothing
    /// patched, so they are left alone.
    pub async fn restore(self, cache: &QueryCache) {
        for (key, entry) in self.entries {
            match entry {
                Some(entry) => cache.restore(key, entry).await,
                None => debug!("no snapshot for {}, nothing to roll back", key),
            }
        }
    }
}

fn patch_value<T, P>(value: &mut Value, patch: &P) -> AppResult<()>
where
    T: Entity,
    P: EntityPatch<T>,
{
    let mut entity: T = serde_json::from_value(value.clone())?;
    patch.apply(&mut entity);
    *value = serde_json::to_value(&entity)?;
    Ok(())
}

fn has_id(value: &Value, id: &str) -> bool {
    value.get("id").and_then(Value::as_str) == Some(id)
}

/// Cached views derived from another kind's data.
fn dependent_keys(kind: EntityKind) -> Vec<QueryKey> {
    match kind {
        // Client badges count pending and total content.
        EntityKind::Content => vec![QueryKey::list(EntityKind::Client, UNSCOPED)],
        _ => Vec::new(),
    }
}

pub struct MutationReconciler {
    cache: Arc<QueryCache>,
    repository: Repository,
}

impl MutationReconciler {
    pub fn new(cache: Arc<QueryCache>, repository: Repository) -> Self {
        Self { cache, repository }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }

    async fn cancel(&self, keys: &[QueryKey]) {
        for key in keys {
            self.cache.cancel_queries(key).await;
        }
    }

    async fn settle(&self, kind: EntityKind, keys: &[QueryKey]) {
        for key in keys.iter().cloned().chain(dependent_keys(kind)) {
            self.cache.invalidate(&key).await;
        }
    }

    /// Optimistically patches the detail entry and the matching list element,
    /// then writes. The remote response is not written into the cache.
    #[instrument(skip(self, patch), fields(kind = %T::KIND))]
    pub async fn update<T, P>(&self, id: Uuid, scope: &str, patch: &P) -> AppResult<T>
    where
        T: Entity,
        P: EntityPatch<T>,
    {
        let keys = [QueryKey::detail(T::KIND, id), QueryKey::list(T::KIND, scope)];

        self.cancel(&keys).await;
        let snapshot = Snapshot::capture(&self.cache, &keys).await;

        if let Err(err) = self
            .cache
            .update_query_data(&keys[0], |value| patch_value::<T, P>(value, patch))
            .await
        {
            warn!("skipping optimistic patch of {}: {}", keys[0], err);
        }

        let id_str = id.to_string();
        if let Err(err) = self
            .cache
            .update_query_data(&keys[1], |value| {
                if let Value::Array(items) = value {
                    for item in items.iter_mut().filter(|item| has_id(item, &id_str)) {
                        patch_value::<T, P>(item, patch)?;
                    }
                }
                Ok(())
            })
            .await
        {
            warn!("skipping optimistic patch of {}: {}", keys[1], err);
        }

        let result = self.repository.update::<T, P>(id, patch).await;
        match &result {
            Ok(_) => info!("updated {} {}", T::KIND, id),
            Err(err) => {
                warn!("update of {} {} failed, rolling back: {}", T::KIND, id, err);
                snapshot.restore(&self.cache).await;
            }
        }

        self.settle(T::KIND, &keys).await;
        result
    }

    /// Creates without touching existing cache entries; the owning list is
    /// invalidated on settle so the next read includes the new entity.
    #[instrument(skip(self, entity), fields(kind = %T::KIND))]
    pub async fn create<T: Entity>(&self, entity: &T) -> AppResult<T> {
        let keys = [QueryKey::list(T::KIND, entity.scope())];

        let result = self.repository.create(entity).await;
        match &result {
            Ok(created) => info!("created {} {}", T::KIND, created.id()),
            Err(err) => warn!("create of {} failed: {}", T::KIND, err),
        }

        self.settle(T::KIND, &keys).await;
        result
    }

    /// Deletes, optionally removing the element from the cached list first
    /// with the same snapshot and rollback discipline as `update`.
    #[instrument(skip(self), fields(kind = %T::KIND))]
    pub async fn delete<T: Entity>(&self, id: Uuid, scope: &str, optimistic: bool) -> AppResult<()> {
        let keys = [QueryKey::detail(T::KIND, id), QueryKey::list(T::KIND, scope)];

        let snapshot = if optimistic {
            self.cancel(&keys).await;
            let snapshot = Snapshot::capture(&self.cache, &keys).await;
            let id_str = id.to_string();
            self.cache
                .update_query_data(&keys[1], |value| {
                    if let Value::Array(items) = value {
                        items.retain(|item| !has_id(item, &id_str));
                    }
                    Ok(())
                })
                .await?;
            Some(snapshot)
        } else {
            None
        };

        let result = self.repository.delete::<T>(id).await;
        match &result {
            Ok(()) => info!("deleted {} {}", T::KIND, id),
            Err(err) => {
                warn!("delete of {} {} failed: {}", T::KIND, id, err);
                if let Some(snapshot) = snapshot {
                    snapshot.restore(&self.cache).await;
                }
            }
        }

        self.settle(T::KIND, &keys).await;
        result
    }

    pub async fn update_content(
        &self,
        item_id: Uuid,
        client_id: Uuid,
        patch: &ContentItemPatch,
    ) -> AppResult<ContentItem> {
        self.update::<ContentItem, _>(item_id, &client_id.to_string(), patch)
            .await
    }

    /// Client approval or rejection of a content item.
    pub async fn review_content(
        &self,
        item_id: Uuid,
        client_id: Uuid,
        status: ContentStatus,
    ) -> AppResult<ContentItem> {
        self.update_content(item_id, client_id, &ContentItemPatch::review(status))
            .await
    }

    pub async fn delete_content(&self, item_id: Uuid, client_id: Uuid) -> AppResult<()> {
        self.delete::<ContentItem>(item_id, &client_id.to_string(), true)
            .await
    }

    pub async fn add_comment(&self, comment: &ContentComment) -> AppResult<ContentComment> {
        self.create(comment).await
    }

    pub async fn mark_notification_read(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Notification> {
        self.update::<Notification, _>(id, &user_id.to_string(), &NotificationPatch::mark_read())
            .await
    }

    /// Marks each notification read in turn, stopping at the first failure.
    pub async fn mark_all_notifications_read(
        &self,
        user_id: Uuid,
        unread: &[Uuid],
    ) -> AppResult<usize> {
        for id in unread {
            self.mark_notification_read(*id, user_id).await?;
        }
        Ok(unread.len())
    }

    /// Kanban drag-and-drop.
    pub async fn move_task(
        &self,
        task_id: Uuid,
        owner_id: Uuid,
        status: TaskStatus,
        sort_order: i32,
    ) -> AppResult<AdminTask> {
        self.update::<AdminTask, _>(
            task_id,
            &owner_id.to_string(),
            &AdminTaskPatch::move_to(status, sort_order),
        )
        .await
    }

    pub async fn reschedule_event(
        &self,
        event_id: Uuid,
        client_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<EventItem> {
        self.update::<EventItem, _>(
            event_id,
            &client_id.to_string(),
            &EventItemPatch::reschedule(date),
        )
        .await
    }

    /// Name, avatar or monthly theme changes from the client settings page.
    pub async fn update_client(&self, client_id: Uuid, patch: &ClientPatch) -> AppResult<Client> {
        self.update::<Client, _>(client_id, UNSCOPED, patch).await
    }

    /// Approves a client's event request and schedules the event.
    ///
    /// Two writes: the request is marked approved first. If creating the
    /// event then fails, the request stays approved without an event and
    /// the error is returned; calling again creates the event.
    pub async fn approve_event_request(
        &self,
        request: &EventRequest,
        color: EventColor,
    ) -> AppResult<EventItem> {
        self.update::<EventRequest, _>(
            request.id,
            &request.scope(),
            &EventRequestPatch::review(RequestStatus::Approved),
        )
        .await?;
        self.create(&request.to_event(color)).await
    }

    pub async fn reject_event_request(&self, request: &EventRequest) -> AppResult<EventRequest> {
        self.update::<EventRequest, _>(
            request.id,
            &request.scope(),
            &EventRequestPatch::review(RequestStatus::Rejected),
        )
        .await
    }
}
