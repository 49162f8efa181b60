use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Entity, EntityKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorRole {
    Admin,
    Client,
}

/// Review comment left on a content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentComment {
    pub id: Uuid,
    pub content_id: Uuid,
    pub author_id: Uuid,
    pub author_role: AuthorRole,
    pub author_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentComment {
    pub fn new(
        content_id: Uuid,
        author_id: Uuid,
        author_role: AuthorRole,
        author_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content_id,
            author_id,
            author_role,
            author_name: author_name.into(),
            message: message.into(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCommentRow {
    pub id: Uuid,
    pub content_id: Uuid,
    pub author_id: Uuid,
    pub author_role: AuthorRole,
    pub author_name: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContentCommentRow> for ContentComment {
    fn from(row: ContentCommentRow) -> Self {
        Self {
            id: row.id,
            content_id: row.content_id,
            author_id: row.author_id,
            author_role: row.author_role,
            author_name: row.author_name.unwrap_or_default(),
            message: row.message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ContentComment> for ContentCommentRow {
    fn from(c: ContentComment) -> Self {
        Self {
            id: c.id,
            content_id: c.content_id,
            author_id: c.author_id,
            author_role: c.author_role,
            author_name: Some(c.author_name),
            message: c.message,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

impl Entity for ContentComment {
    type Row = ContentCommentRow;

    const KIND: EntityKind = EntityKind::Comment;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> String {
        self.content_id.to_string()
    }
}
