use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{wire_changeset, Entity, EntityKind, EntityPatch};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    ContentPending,
    PublishReminder,
    ContentApproved,
    NewRequest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub content_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            title: title.into(),
            message: message.into(),
            content_id: None,
            client_id: None,
            read: false,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub content_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub read: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            kind: row.kind,
            title: row.title,
            message: row.message,
            content_id: row.content_id,
            client_id: row.client_id,
            read: row.read.unwrap_or(false),
            created_at: row.created_at,
        }
    }
}

impl From<Notification> for NotificationRow {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            kind: n.kind,
            title: n.title,
            message: n.message,
            content_id: n.content_id,
            client_id: n.client_id,
            read: Some(n.read),
            created_at: n.created_at,
        }
    }
}

impl Entity for Notification {
    type Row = NotificationRow;

    const KIND: EntityKind = EntityKind::Notification;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> String {
        self.user_id.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotificationPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read: Option<bool>,
}

impl NotificationPatch {
    pub fn mark_read() -> Self {
        Self { read: Some(true) }
    }
}

impl EntityPatch<Notification> for NotificationPatch {
    fn apply(&self, n: &mut Notification) {
        if let Some(read) = self.read {
            n.read = read;
        }
    }

    fn changeset(&self) -> AppResult<serde_json::Value> {
        wire_changeset(self)
    }
}
