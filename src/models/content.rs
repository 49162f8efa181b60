use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{wire_changeset, Entity, EntityKind, EntityPatch};
use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Post,
    Story,
    Reel,
    Carousel,
}

impl ContentType {
    /// Types shown in the Instagram-style grid preview.
    pub fn is_grid_eligible(&self) -> bool {
        matches!(self, ContentType::Post | ContentType::Reel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Published,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Instagram,
    Tiktok,
    Facebook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    pub url: String,
    pub media_type: MediaKind,
    pub cover_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

/// Crop/pan state from the grid editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridDisplay {
    pub order: Option<i32>,
    pub zoom: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for GridDisplay {
    fn default() -> Self {
        Self {
            order: None,
            zoom: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// A planned post, story, reel or carousel.
///
/// Items without a `date` can still show in the grid preview but never on
/// the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: Uuid,
    pub client_id: Uuid,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub platform: Platform,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub caption: String,
    pub media: Vec<MediaRef>,
    pub grid: GridDisplay,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentItem {
    pub fn new(
        client_id: Uuid,
        content_type: ContentType,
        platform: Platform,
        date: Option<NaiveDate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            client_id,
            content_type,
            status: ContentStatus::Draft,
            platform,
            date,
            time: None,
            caption: String::new(),
            media: Vec::new(),
            grid: GridDisplay::default(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_status(mut self, status: ContentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn is_pending(&self) -> bool {
        self.status == ContentStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaRefRow {
    pub url: String,
    #[serde(rename = "type")]
    pub media_type: MediaKind,
    pub cover_url: Option<String>,
    pub thumbnail_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItemRow {
    pub id: Uuid,
    pub client_id: Uuid,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub status: ContentStatus,
    pub platform: Platform,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
    pub caption: Option<String>,
    #[serde(default)]
    pub media: Option<Vec<MediaRefRow>>,
    pub grid_order: Option<i32>,
    pub grid_zoom: Option<f64>,
    pub grid_offset_x: Option<f64>,
    pub grid_offset_y: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ContentItemRow> for ContentItem {
    fn from(row: ContentItemRow) -> Self {
        let media = row
            .media
            .unwrap_or_default()
            .into_iter()
            .map(|m| MediaRef {
                url: m.url,
                media_type: m.media_type,
                cover_url: m.cover_url,
                thumbnail_url: m.thumbnail_url,
            })
            .collect();

        Self {
            id: row.id,
            client_id: row.client_id,
            content_type: row.content_type,
            status: row.status,
            platform: row.platform,
            date: row.date,
            time: row.time,
            caption: row.caption.unwrap_or_default(),
            media,
            grid: GridDisplay {
                order: row.grid_order,
                zoom: row.grid_zoom.unwrap_or(1.0),
                offset_x: row.grid_offset_x.unwrap_or(0.0),
                offset_y: row.grid_offset_y.unwrap_or(0.0),
            },
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl From<ContentItem> for ContentItemRow {
    fn from(item: ContentItem) -> Self {
        let media = item
            .media
            .into_iter()
            .map(|m| MediaRefRow {
                url: m.url,
                media_type: m.media_type,
                cover_url: m.cover_url,
                thumbnail_url: m.thumbnail_url,
            })
            .collect();

        Self {
            id: item.id,
            client_id: item.client_id,
            content_type: item.content_type,
            status: item.status,
            platform: item.platform,
            date: item.date,
            time: item.time,
            caption: Some(item.caption),
            media: Some(media),
            grid_order: item.grid.order,
            grid_zoom: Some(item.grid.zoom),
            grid_offset_x: Some(item.grid.offset_x),
            grid_offset_y: Some(item.grid.offset_y),
            notes: item.notes,
            created_at: item.created_at,
            updated_at: item.updated_at,
        }
    }
}

impl Entity for ContentItem {
    type Row = ContentItemRow;

    const KIND: EntityKind = EntityKind::Content;

    fn id(&self) -> Uuid {
        self.id
    }

    fn scope(&self) -> String {
        self.client_id.to_string()
    }
}

/// Partial update of a content item. Serde names are wire columns.
///
/// `date`/`time`/`notes` use a nested `Option` so a patch can clear them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentItemPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ContentStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<Option<NaiveTime>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_order: Option<Option<i32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_zoom: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_offset_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grid_offset_y: Option<f64>,
}

impl ContentItemPatch {
    pub fn caption(caption: impl Into<String>) -> Self {
        Self {
            caption: Some(caption.into()),
            ..Self::default()
        }
    }

    /// Client approval or rejection.
    pub fn review(status: ContentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn reschedule(date: Option<NaiveDate>, time: Option<NaiveTime>) -> Self {
        Self {
            date: Some(date),
            time: Some(time),
            ..Self::default()
        }
    }

    pub fn grid_position(zoom: f64, offset_x: f64, offset_y: f64) -> Self {
        Self {
            grid_zoom: Some(zoom),
            grid_offset_x: Some(offset_x),
            grid_offset_y: Some(offset_y),
            ..Self::default()
        }
    }
}

impl EntityPatch<ContentItem> for ContentItemPatch {
    fn apply(&self, item: &mut ContentItem) {
        if let Some(content_type) = self.content_type {
            item.content_type = content_type;
        }
        if let Some(status) = self.status {
            item.status = status;
        }
        if let Some(platform) = self.platform {
            item.platform = platform;
        }
        if let Some(date) = self.date {
            item.date = date;
        }
        if let Some(time) = self.time {
            item.time = time;
        }
        if let Some(caption) = &self.caption {
            item.caption = caption.clone();
        }
        if let Some(notes) = &self.notes {
            item.notes = notes.clone();
        }
        if let Some(order) = self.grid_order {
            item.grid.order = order;
        }
        if let Some(zoom) = self.grid_zoom {
            item.grid.zoom = zoom;
        }
        if let Some(x) = self.grid_offset_x {
            item.grid.offset_x = x;
        }
        if let Some(y) = self.grid_offset_y {
            item.grid.offset_y = y;
        }
    }

    fn changeset(&self) -> AppResult<serde_json::Value> {
        wire_changeset(self)
    }
}
