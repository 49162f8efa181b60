// Domain models - semantic entities, their wire rows, and patches

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::error::AppResult;

pub mod client;
pub mod comment;
pub mod content;
pub mod event;
pub mod filters;
pub mod notification;
pub mod task;

pub use client::{Client, ClientPatch, ClientRow, ClientStats};
pub use comment::{AuthorRole, ContentComment, ContentCommentRow};
pub use content::{
    ContentItem, ContentItemPatch, ContentItemRow, ContentStatus, ContentType, GridDisplay,
    MediaKind, MediaRef, Platform,
};
pub use event::{
    EventColor, EventItem, EventItemPatch, EventItemRow, EventRequest, EventRequestPatch,
    EventRequestRow, RequestStatus,
};
pub use filters::ContentFilters;
pub use notification::{Notification, NotificationKind, NotificationPatch, NotificationRow};
pub use task::{AdminTask, AdminTaskPatch, AdminTaskRow, TaskPriority, TaskStatus};

/// Scope value used for collections that are not partitioned by owner.
pub const UNSCOPED: &str = "all";

/// Remote collections the planner reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Content,
    Event,
    EventRequest,
    Client,
    Comment,
    AdminTask,
    Notification,
}

/// Ordering the remote store applies to list reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOrder {
    pub column: &'static str,
    pub descending: bool,
}

impl EntityKind {
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::Content => "content_items",
            EntityKind::Event => "events",
            EntityKind::EventRequest => "event_requests",
            EntityKind::Client => "clients",
            EntityKind::Comment => "content_comments",
            EntityKind::AdminTask => "admin_tasks",
            EntityKind::Notification => "notifications",
        }
    }

    /// Column that partitions list reads, if any.
    pub fn scope_column(&self) -> Option<&'static str> {
        match self {
            EntityKind::Content | EntityKind::Event | EntityKind::EventRequest => {
                Some("client_id")
            }
            EntityKind::Comment => Some("content_id"),
            EntityKind::AdminTask => Some("owner_id"),
            EntityKind::Notification => Some("user_id"),
            EntityKind::Client => None,
        }
    }

    pub fn list_order(&self) -> ListOrder {
        let (column, descending) = match self {
            EntityKind::Content => ("date", false),
            EntityKind::Event => ("date", false),
            EntityKind::EventRequest => ("requested_date", false),
            EntityKind::Client => ("name", false),
            EntityKind::Comment => ("created_at", false),
            EntityKind::AdminTask => ("sort_order", false),
            EntityKind::Notification => ("created_at", true),
        };
        ListOrder { column, descending }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table())
    }
}

/// A durable entity owned by the remote store.
///
/// The semantic form serialises in camelCase and is what the query cache
/// holds; `Row` is the snake_case wire shape with nullable columns.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    type Row: Serialize + DeserializeOwned + From<Self> + Into<Self> + Send;

    const KIND: EntityKind;

    fn id(&self) -> Uuid;

    /// Value of the kind's scope column for this entity.
    fn scope(&self) -> String;

    fn to_row_value(&self) -> AppResult<Value> {
        Ok(serde_json::to_value(Self::Row::from(self.clone()))?)
    }

    fn from_row_value(row: Value) -> AppResult<Self> {
        let row: Self::Row = serde_json::from_value(row)?;
        Ok(row.into())
    }
}

/// A partial update for an entity.
///
/// `apply` patches the semantic entity in place; `changeset` renders the
/// same change in wire column names for the remote store.
pub trait EntityPatch<T: Entity>: Send + Sync {
    fn apply(&self, entity: &mut T);

    fn changeset(&self) -> AppResult<Value>;
}

/// Serialises a patch struct whose serde names already match wire columns.
pub(crate) fn wire_changeset<P: Serialize>(patch: &P) -> AppResult<Value> {
    Ok(serde_json::to_value(patch)?)
}
