use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{wire_changeset, ContentItem, Entity, EntityKind, EntityPatch, UNSCOPED};
use crate::error::AppResult;

/// An agency client. The counters are derived and never authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub monthly_theme: Option<String>,
    pub pending_approvals: u32,
    pub total_content: u32,
}

impl Client {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            avatar_url: None,
            monthly_theme: None,
            pending_approvals: 0,
            total_content: 0,
        }
    }

    /// Overwrites the derived counters from the client's content.
    pub fn with_stats(mut self, stats: ClientStats) -> Self {
        self.pending_approvals = stats.pending_approvals;
        self.total_content = stats.total_content;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClientStats {
    pub pending_approvals: u32,
    pub total_content: u32,
}

impl ClientStats {
    pub fn from_content(client_id: Uuid, content: &[ContentItem]) -> Self {
        content
            .iter()
            .filter(|item| item.client_id == client_id)
            .fold(Self::default(), |mut stats, item| {
                stats.total_content += 1;
                if item.is_pending() {
                    stats.pending_approvals += 1;
                }
                stats
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRow {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
    pub monthly_theme: Option<String>,
    pub pending_approvals: Option<u32>,
    pub total_content: Option<u32>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            avatar_url: row.avatar_url,
            monthly_theme: row.monthly_theme,
            pending_approvals: row.pending_approvals.unwrap_or(0),
            total_content: row.total_content.unwrap_or(0),
        }
    }
}

impl From<Client> for ClientRow {
    fn from(client: Client) -> Self {
        Self {
            id: client.id,
            name: client.name,
            avatar_url: client.avatar_url,
            monthly_theme: client.monthly_theme,
            pending_approvals: Some(client.pending_approvals),
            total_content: Some(client.total_content),
        }
    }
}

impl Entity for Client {
    type Row = ClientRow;

    const KIND: EntityKind = EntityKind::Client;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> String {
        UNSCOPED.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClientPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monthly_theme: Option<Option<String>>,
}

impl EntityPatch<Client> for ClientPatch {
    fn apply(&self, client: &mut Client) {
        if let Some(name) = &self.name {
            client.name = name.clone();
        }
        if let Some(avatar) = &self.avatar_url {
            client.avatar_url = avatar.clone();
        }
        if let Some(theme) = &self.monthly_theme {
            client.monthly_theme = theme.clone();
        }
    }

    fn changeset(&self) -> AppResult<serde_json::Value> {
        wire_changeset(self)
    }
}
