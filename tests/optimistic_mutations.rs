use async_trait::async_trait;
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

use content_planner::config::CacheConfig;
use content_planner::infrastructure::{QueryKey, RemoteStore, SqliteStore};
use content_planner::models::{
    AdminTask, AuthorRole, Client, ClientPatch, ContentComment, ContentFilters, ContentItem,
    ContentItemPatch, ContentStatus, ContentType, EntityKind, EventColor, EventItem, EventRequest,
    Notification, NotificationKind, Platform, RequestStatus, TaskStatus, UNSCOPED,
};
use content_planner::{AppError, AppResult, Planner};

/// SQLite store whose writes can be failed or held until released. Held
/// list reads take their rows first, so they return pre-write data.
struct ControlledStore {
    inner: SqliteStore,
    fail_writes: AtomicBool,
    fail_creates: AtomicBool,
    hold_writes: AtomicBool,
    release: Notify,
    writes: AtomicUsize,
    hold_reads: AtomicBool,
    read_release: Notify,
    reads: AtomicUsize,
}

impl ControlledStore {
    async fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteStore::new_in_memory().await.unwrap(),
            fail_writes: AtomicBool::new(false),
            fail_creates: AtomicBool::new(false),
            hold_writes: AtomicBool::new(false),
            release: Notify::new(),
            writes: AtomicUsize::new(0),
            hold_reads: AtomicBool::new(false),
            read_release: Notify::new(),
            reads: AtomicUsize::new(0),
        })
    }

    async fn gate(&self) -> AppResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.hold_writes.load(Ordering::SeqCst) {
            self.release.notified().await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::Transient("connection reset".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for ControlledStore {
    async fn get(&self, kind: EntityKind, id: Uuid) -> AppResult<Value> {
        self.inner.get(kind, id).await
    }

    async fn list(&self, kind: EntityKind, scope: &str) -> AppResult<Vec<Value>> {
        let rows = self.inner.list(kind, scope).await?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.hold_reads.load(Ordering::SeqCst) {
            self.read_release.notified().await;
        }
        Ok(rows)
    }

    async fn create(&self, kind: EntityKind, row: Value) -> AppResult<Value> {
        self.gate().await?;
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(AppError::Transient("insert failed".into()));
        }
        self.inner.create(kind, row).await
    }

    async fn update(&self, kind: EntityKind, id: Uuid, changes: Value) -> AppResult<Value> {
        self.gate().await?;
        self.inner.update(kind, id, changes).await
    }

    async fn delete(&self, kind: EntityKind, id: Uuid) -> AppResult<()> {
        self.gate().await?;
        self.inner.delete(kind, id).await
    }
}

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn planner_with_content() -> (Planner, Arc<ControlledStore>, ContentItem) {
    let store = ControlledStore::new().await;
    let planner = Planner::new(store.clone(), CacheConfig::default());
    let item = ContentItem::new(
        Uuid::new_v4(),
        ContentType::Post,
        Platform::Instagram,
        Some(ymd(2024, 6, 3)),
    )
    .with_caption("Summer launch")
    .with_status(ContentStatus::Pending);
    planner.reconciler().create(&item).await.unwrap();
    (planner, store, item)
}

fn list_key(item: &ContentItem) -> QueryKey {
    QueryKey::list(EntityKind::Content, item.client_id.to_string())
}

#[tokio::test]
async fn test_patch_is_visible_before_the_write_completes() {
    let (planner, store, item) = planner_with_content().await;
    let scope = item.client_id.to_string();
    planner.queries().list::<ContentItem>(&scope).await.unwrap();
    planner.queries().detail::<ContentItem>(item.id).await.unwrap();

    store.hold_writes.store(true, Ordering::SeqCst);
    let reconciler = planner.reconciler();
    let (id, client) = (item.id, item.client_id);
    let write = tokio::spawn(async move {
        reconciler
            .update_content(id, client, &ContentItemPatch::caption("Summer launch v2"))
            .await
    });

    while store.writes.load(Ordering::SeqCst) < 2 {
        tokio::task::yield_now().await;
    }
    let cache = planner.queries().cache();
    let list = cache.get_query_data(&list_key(&item)).await.unwrap();
    assert_eq!(list[0]["caption"], "Summer launch v2");
    let detail = cache
        .get_query_data(&QueryKey::detail(EntityKind::Content, item.id))
        .await
        .unwrap();
    assert_eq!(detail["caption"], "Summer launch v2");

    store.release.notify_one();
    let updated = write.await.unwrap().unwrap();
    assert_eq!(updated.caption, "Summer launch v2");
    assert!(cache.is_stale(&list_key(&item)).await);

    let reread: Vec<ContentItem> = planner.queries().list(&scope).await.unwrap();
    assert_eq!(reread[0].caption, "Summer launch v2");
}

async fn wait_for(counter: &AtomicUsize, target: usize) {
    while counter.load(Ordering::SeqCst) < target {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_read_during_write_sees_patch_on_previously_settled_entry() {
    let (planner, store, item) = planner_with_content().await;
    let scope = item.client_id.to_string();
    let reconciler = planner.reconciler();
    planner.queries().list::<ContentItem>(&scope).await.unwrap();

    // First edit settles and leaves the list invalidated.
    reconciler
        .update_content(item.id, item.client_id, &ContentItemPatch::caption("v2"))
        .await
        .unwrap();
    let cache = planner.queries().cache().clone();
    assert!(cache.is_stale(&list_key(&item)).await);

    store.hold_writes.store(true, Ordering::SeqCst);
    let (id, client) = (item.id, item.client_id);
    let write = tokio::spawn(async move {
        reconciler
            .update_content(id, client, &ContentItemPatch::caption("v3"))
            .await
    });
    wait_for(&store.writes, 3).await;

    let during: Vec<ContentItem> = planner.queries().list(&scope).await.unwrap();
    assert_eq!(during[0].caption, "v3");
    let cached = cache.get_query_data(&list_key(&item)).await.unwrap();
    assert_eq!(cached[0]["caption"], "v3");

    store.release.notify_one();
    write.await.unwrap().unwrap();
    let settled: Vec<ContentItem> = planner.queries().list(&scope).await.unwrap();
    assert_eq!(settled[0].caption, "v3");
}

#[tokio::test]
async fn test_update_supersedes_read_already_in_flight() {
    let (planner, store, item) = planner_with_content().await;
    let scope = item.client_id.to_string();
    let cache = planner.queries().cache().clone();
    planner.queries().list::<ContentItem>(&scope).await.unwrap();
    cache.invalidate(&list_key(&item)).await;

    store.hold_reads.store(true, Ordering::SeqCst);
    let queries = planner.queries().clone();
    let read_scope = scope.clone();
    let read = tokio::spawn(async move { queries.list::<ContentItem>(&read_scope).await });
    wait_for(&store.reads, 2).await;
    store.hold_reads.store(false, Ordering::SeqCst);

    store.hold_writes.store(true, Ordering::SeqCst);
    let reconciler = planner.reconciler();
    let (id, client) = (item.id, item.client_id);
    let write = tokio::spawn(async move {
        reconciler
            .update_content(id, client, &ContentItemPatch::caption("edited"))
            .await
    });
    wait_for(&store.writes, 2).await;

    // The held read carries the pre-write row; it must not land in the cache.
    store.read_release.notify_one();
    let read_result = read.await.unwrap().unwrap();
    assert_eq!(read_result[0].caption, "edited");
    let cached = cache.get_query_data(&list_key(&item)).await.unwrap();
    assert_eq!(cached[0]["caption"], "edited");

    store.release.notify_one();
    write.await.unwrap().unwrap();
    let cached = cache.get_query_data(&list_key(&item)).await.unwrap();
    assert_eq!(cached[0]["caption"], "edited");
}

#[tokio::test]
async fn test_optimistic_delete_supersedes_read_already_in_flight() {
    let (planner, store, item) = planner_with_content().await;
    let scope = item.client_id.to_string();
    let cache = planner.queries().cache().clone();
    planner.queries().list::<ContentItem>(&scope).await.unwrap();
    cache.invalidate(&list_key(&item)).await;

    store.hold_reads.store(true, Ordering::SeqCst);
    let queries = planner.queries().clone();
    let read_scope = scope.clone();
    let read = tokio::spawn(async move { queries.list::<ContentItem>(&read_scope).await });
    wait_for(&store.reads, 2).await;
    store.hold_reads.store(false, Ordering::SeqCst);

    store.hold_writes.store(true, Ordering::SeqCst);
    let reconciler = planner.reconciler();
    let (id, client) = (item.id, item.client_id);
    let delete = tokio::spawn(async move { reconciler.delete_content(id, client).await });
    wait_for(&store.writes, 2).await;

    store.read_release.notify_one();
    assert!(read.await.unwrap().unwrap().is_empty());
    let cached = cache.get_query_data(&list_key(&item)).await.unwrap();
    assert_eq!(cached, serde_json::json!([]));

    store.release.notify_one();
    delete.await.unwrap().unwrap();
    let remaining: Vec<ContentItem> = planner.queries().list(&scope).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_failed_write_restores_cache_exactly() {
    let (planner, store, item) = planner_with_content().await;
    let scope = item.client_id.to_string();
    planner.queries().list::<ContentItem>(&scope).await.unwrap();
    planner.queries().detail::<ContentItem>(item.id).await.unwrap();

    let cache = planner.queries().cache();
    let detail_key = QueryKey::detail(EntityKind::Content, item.id);
    let list_before = cache.get_query_data(&list_key(&item)).await;
    let detail_before = cache.get_query_data(&detail_key).await;

    store.fail_writes.store(true, Ordering::SeqCst);
    let err = planner
        .reconciler()
        .review_content(item.id, item.client_id, ContentStatus::Approved)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Transient(_)));
    assert_eq!(cache.get_query_data(&list_key(&item)).await, list_before);
    assert_eq!(cache.get_query_data(&detail_key).await, detail_before);
    // Settled keys refetch on next read even after a failure.
    assert!(cache.is_stale(&detail_key).await);

    store.fail_writes.store(false, Ordering::SeqCst);
    let current: ContentItem = planner.queries().detail(item.id).await.unwrap();
    assert_eq!(current.status, ContentStatus::Pending);
}

#[tokio::test]
async fn test_rollback_without_cached_data_leaves_cache_empty() {
    let (planner, store, item) = planner_with_content().await;
    store.fail_writes.store(true, Ordering::SeqCst);

    let result = planner
        .reconciler()
        .update_content(item.id, item.client_id, &ContentItemPatch::caption("x"))
        .await;

    assert!(result.is_err());
    assert!(planner.queries().cache().get_query_data(&list_key(&item)).await.is_none());
}

#[tokio::test]
async fn test_content_write_invalidates_client_badges() {
    let (planner, _store, item) = planner_with_content().await;
    let client = Client::new("Acme Coffee");
    planner.reconciler().create(&client).await.unwrap();
    planner.queries().list::<Client>(UNSCOPED).await.unwrap();
    let clients_key = QueryKey::list(EntityKind::Client, UNSCOPED);
    assert!(!planner.queries().cache().is_stale(&clients_key).await);

    planner
        .reconciler()
        .review_content(item.id, item.client_id, ContentStatus::Approved)
        .await
        .unwrap();

    assert!(planner.queries().cache().is_stale(&clients_key).await);
}

#[tokio::test]
async fn test_create_invalidates_owning_list() {
    let (planner, _store, item) = planner_with_content().await;
    let cache = planner.queries().cache().clone();
    planner
        .queries()
        .list::<ContentComment>(&item.id.to_string())
        .await
        .unwrap();

    let comment = ContentComment::new(
        item.id,
        Uuid::new_v4(),
        AuthorRole::Client,
        "Dana",
        "Love this one",
    );
    planner.reconciler().add_comment(&comment).await.unwrap();

    let key = QueryKey::list(EntityKind::Comment, item.id.to_string());
    assert!(cache.is_stale(&key).await);
    let comments: Vec<ContentComment> =
        planner.queries().list(&item.id.to_string()).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].message, "Love this one");
}

#[tokio::test]
async fn test_optimistic_delete_rolls_back_on_failure() {
    let (planner, store, item) = planner_with_content().await;
    let scope = item.client_id.to_string();
    planner.queries().list::<ContentItem>(&scope).await.unwrap();
    let before = planner.queries().cache().get_query_data(&list_key(&item)).await;

    store.fail_writes.store(true, Ordering::SeqCst);
    assert!(planner
        .reconciler()
        .delete_content(item.id, item.client_id)
        .await
        .is_err());
    assert_eq!(planner.queries().cache().get_query_data(&list_key(&item)).await, before);

    store.fail_writes.store(false, Ordering::SeqCst);
    planner
        .reconciler()
        .delete_content(item.id, item.client_id)
        .await
        .unwrap();
    let remaining: Vec<ContentItem> = planner.queries().list(&scope).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn test_mutation_handle_reports_error_and_pending() {
    let (planner, store, item) = planner_with_content().await;
    let handle = planner.mutation();
    assert!(!handle.is_pending().await);

    store.fail_writes.store(true, Ordering::SeqCst);
    let (id, client) = (item.id, item.client_id);
    let result = handle
        .mutate(move |reconciler| async move {
            reconciler
                .review_content(id, client, ContentStatus::Rejected)
                .await
        })
        .await;

    assert!(result.is_err());
    assert!(!handle.is_pending().await);
    let err = handle.error().await.unwrap();
    assert!(err.is_retryable());
    handle.reset().await;
    assert!(handle.error().await.is_none());
}

#[tokio::test]
async fn test_rollback_completes_when_caller_stops_waiting() {
    let (planner, store, item) = planner_with_content().await;
    let scope = item.client_id.to_string();
    planner.queries().list::<ContentItem>(&scope).await.unwrap();
    let before = planner.queries().cache().get_query_data(&list_key(&item)).await;

    store.hold_writes.store(true, Ordering::SeqCst);
    store.fail_writes.store(true, Ordering::SeqCst);
    let handle = planner.mutation();
    let (id, client) = (item.id, item.client_id);
    let abandoned = tokio::time::timeout(
        Duration::from_millis(20),
        handle.mutate(move |reconciler| async move {
            reconciler
                .update_content(id, client, &ContentItemPatch::caption("abandoned"))
                .await
        }),
    )
    .await;
    assert!(abandoned.is_err());

    store.release.notify_one();
    while handle.is_pending().await {
        tokio::task::yield_now().await;
    }
    assert_eq!(planner.queries().cache().get_query_data(&list_key(&item)).await, before);
    assert!(handle.error().await.is_some());
}

#[tokio::test]
async fn test_notifications_and_tasks() {
    let store = ControlledStore::new().await;
    let planner = Planner::new(store.clone(), CacheConfig::default());
    let user = Uuid::new_v4();
    let first = Notification::new(
        user,
        NotificationKind::ContentApproved,
        "Approved",
        "Your post was approved",
    );
    let second = Notification::new(
        user,
        NotificationKind::PublishReminder,
        "Reminder",
        "Reel goes live tomorrow",
    );
    planner.reconciler().create(&first).await.unwrap();
    planner.reconciler().create(&second).await.unwrap();

    let marked = planner
        .reconciler()
        .mark_all_notifications_read(user, &[first.id, second.id])
        .await
        .unwrap();
    assert_eq!(marked, 2);
    let all: Vec<Notification> = planner.queries().list(&user.to_string()).await.unwrap();
    assert!(all.iter().all(|n| n.read));

    let task = AdminTask::new(user, "Shoot reels", 0);
    planner.reconciler().create(&task).await.unwrap();
    let moved = planner
        .reconciler()
        .move_task(task.id, user, TaskStatus::Done, 3)
        .await
        .unwrap();
    assert_eq!(moved.status, TaskStatus::Done);
    assert_eq!(moved.sort_order, 3);
}

#[tokio::test]
async fn test_approving_event_request_schedules_event() {
    let store = ControlledStore::new().await;
    let planner = Planner::new(store.clone(), CacheConfig::default());
    let client = Uuid::new_v4();
    let request = EventRequest::new(client, "Store opening", ymd(2024, 6, 21));
    planner.reconciler().create(&request).await.unwrap();

    let event = planner
        .reconciler()
        .approve_event_request(&request, EventColor::Green)
        .await
        .unwrap();
    assert_eq!(event.date, ymd(2024, 6, 21));

    let requests: Vec<EventRequest> = planner.queries().list(&client.to_string()).await.unwrap();
    assert_eq!(requests[0].status, RequestStatus::Approved);

    let projection = planner
        .calendar(Some(client), ymd(2024, 6, 1), &ContentFilters::default())
        .await
        .unwrap();
    let june_21 = projection.day(ymd(2024, 6, 21)).unwrap();
    let titles: Vec<&str> = june_21.events.iter().map(|e: &EventItem| e.title.as_str()).collect();
    assert_eq!(titles, vec!["Store opening"]);
}

#[tokio::test]
async fn test_end_session_clears_cache() {
    let (planner, _store, item) = planner_with_content().await;
    planner
        .calendar(Some(item.client_id), ymd(2024, 6, 1), &ContentFilters::default())
        .await
        .unwrap();
    assert!(!planner.queries().cache().is_empty().await);

    planner.end_session().await;
    assert!(planner.queries().cache().is_empty().await);
}

#[tokio::test]
async fn test_approval_stays_recorded_when_event_insert_fails() {
    let store = ControlledStore::new().await;
    let planner = Planner::new(store.clone(), CacheConfig::default());
    let client = Uuid::new_v4();
    let request = EventRequest::new(client, "Pop-up market", ymd(2024, 7, 13));
    planner.reconciler().create(&request).await.unwrap();

    store.fail_creates.store(true, Ordering::SeqCst);
    let err = planner
        .reconciler()
        .approve_event_request(&request, EventColor::Orange)
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let requests: Vec<EventRequest> = planner.queries().list(&client.to_string()).await.unwrap();
    assert_eq!(requests[0].status, RequestStatus::Approved);
    let events: Vec<EventItem> = planner.queries().list(&client.to_string()).await.unwrap();
    assert!(events.is_empty());

    store.fail_creates.store(false, Ordering::SeqCst);
    planner
        .reconciler()
        .approve_event_request(&request, EventColor::Orange)
        .await
        .unwrap();
    let events: Vec<EventItem> = planner.queries().list(&client.to_string()).await.unwrap();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn test_rescheduled_event_moves_day() {
    let store = ControlledStore::new().await;
    let planner = Planner::new(store.clone(), CacheConfig::default());
    let client = Uuid::new_v4();
    let event = EventItem::new(client, "Photo shoot", ymd(2024, 6, 12), EventColor::Purple);
    planner.reconciler().create(&event).await.unwrap();
    planner
        .calendar(Some(client), ymd(2024, 6, 1), &ContentFilters::default())
        .await
        .unwrap();

    let moved = planner
        .reconciler()
        .reschedule_event(event.id, client, ymd(2024, 6, 14))
        .await
        .unwrap();
    assert_eq!(moved.date, ymd(2024, 6, 14));

    let projection = planner
        .calendar(Some(client), ymd(2024, 6, 1), &ContentFilters::default())
        .await
        .unwrap();
    assert!(projection.day(ymd(2024, 6, 12)).unwrap().events.is_empty());
    assert_eq!(projection.day(ymd(2024, 6, 14)).unwrap().events.len(), 1);
}

#[tokio::test]
async fn test_client_settings_update_patches_cached_list() {
    let store = ControlledStore::new().await;
    let planner = Planner::new(store.clone(), CacheConfig::default());
    let client = Client::new("Acme Coffee");
    planner.reconciler().create(&client).await.unwrap();
    planner.queries().list::<Client>(UNSCOPED).await.unwrap();

    store.fail_writes.store(true, Ordering::SeqCst);
    let patch = ClientPatch {
        monthly_theme: Some(Some("Summer roast".into())),
        ..ClientPatch::default()
    };
    assert!(planner.reconciler().update_client(client.id, &patch).await.is_err());
    let cached = planner
        .queries()
        .cache()
        .get_query_data(&QueryKey::list(EntityKind::Client, UNSCOPED))
        .await
        .unwrap();
    assert!(cached[0]["monthlyTheme"].is_null());

    store.fail_writes.store(false, Ordering::SeqCst);
    let updated = planner.reconciler().update_client(client.id, &patch).await.unwrap();
    assert_eq!(updated.monthly_theme.as_deref(), Some("Summer roast"));
    let clients: Vec<Client> = planner.queries().list(UNSCOPED).await.unwrap();
    assert_eq!(clients[0].monthly_theme.as_deref(), Some("Summer roast"));
}
