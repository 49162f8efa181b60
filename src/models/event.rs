use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{wire_changeset, Entity, EntityKind, EntityPatch};
use crate::error::AppResult;

/// Calendar marker colors offered for agency events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventColor {
    Red,
    Orange,
    Yellow,
    Green,
    Blue,
    Purple,
    Pink,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventItem {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub color: EventColor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventItem {
    pub fn new(client_id: Uuid, title: impl Into<String>, date: NaiveDate, color: EventColor) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            title: title.into(),
            description: None,
            date,
            color,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventItemRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub color: EventColor,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventItemRow> for EventItem {
    fn from(row: EventItemRow) -> Self {
        Self {
            id: row.id,
            client_id: row.client_id,
            title: row.title,
            description: row.description,
            date: row.date,
            color: row.color,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<EventItem> for EventItemRow {
    fn from(event: EventItem) -> Self {
        Self {
            id: event.id,
            client_id: event.client_id,
            title: event.title,
            description: event.description,
            date: event.date,
            color: event.color,
            created_at: event.created_at,
            updated_at: event.updated_at,
        }
    }
}

impl Entity for EventItem {
    type Row = EventItemRow;

    const KIND: EntityKind = EntityKind::Event;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> String {
        self.client_id.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<EventColor>,
}

impl EventItemPatch {
    /// Drag of an event to another calendar day.
    pub fn reschedule(date: NaiveDate) -> Self {
        Self {
            date: Some(date),
            ..Self::default()
        }
    }
}

impl EntityPatch<EventItem> for EventItemPatch {
    fn apply(&self, event: &mut EventItem) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(description) = &self.description {
            event.description = description.clone();
        }
        if let Some(date) = self.date {
            event.date = date;
        }
        if let Some(color) = self.color {
            event.color = color;
        }
    }

    fn changeset(&self) -> AppResult<serde_json::Value> {
        wire_changeset(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// An event a client asked the agency to schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub requested_date: NaiveDate,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventRequest {
    pub fn new(client_id: Uuid, title: impl Into<String>, requested_date: NaiveDate) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            title: title.into(),
            requested_date,
            description: None,
            status: RequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    /// The event an approved request turns into.
    pub fn to_event(&self, color: EventColor) -> EventItem {
        let mut event = EventItem::new(self.client_id, self.title.clone(), self.requested_date, color);
        event.description = self.description.clone();
        event
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRequestRow {
    pub id: Uuid,
    pub client_id: Uuid,
    pub title: String,
    pub requested_date: NaiveDate,
    pub description: Option<String>,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<EventRequestRow> for EventRequest {
    fn from(row: EventRequestRow) -> Self {
        Self {
            id: row.id,
            client_id: row.client_id,
            title: row.title,
            requested_date: row.requested_date,
            description: row.description,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<EventRequest> for EventRequestRow {
    fn from(request: EventRequest) -> Self {
        Self {
            id: request.id,
            client_id: request.client_id,
            title: request.title,
            requested_date: request.requested_date,
            description: request.description,
            status: request.status,
            created_at: request.created_at,
            updated_at: request.updated_at,
        }
    }
}

impl Entity for EventRequest {
    type Row = EventRequestRow;

    const KIND: EntityKind = EntityKind::EventRequest;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> String {
        self.client_id.to_string()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventRequestPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequestStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_date: Option<NaiveDate>,
}

impl EventRequestPatch {
    pub fn review(status: RequestStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }
}

impl EntityPatch<EventRequest> for EventRequestPatch {
    fn apply(&self, request: &mut EventRequest) {
        if let Some(status) = self.status {
            request.status = status;
        }
        if let Some(date) = self.requested_date {
            request.requested_date = date;
        }
    }

    fn changeset(&self) -> AppResult<serde_json::Value> {
        wire_changeset(self)
    }
}
