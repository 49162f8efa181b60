use serde::{Deserialize, Serialize};

use super::{ContentItem, ContentStatus, ContentType, Platform};

/// Active calendar filters. Client-side only, never persisted.
///
/// Every facet is applied independently and the result is their
/// conjunction. `select_type` and `set_pending_only` keep the type facet and
/// the pending-only switch mutually exclusive for the filter bar, but
/// `matches` does not depend on that.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFilters {
    pub types: Option<Vec<ContentType>>,
    pub statuses: Option<Vec<ContentStatus>>,
    pub platforms: Option<Vec<Platform>>,
    pub pending_approval_only: bool,
}

impl ContentFilters {
    pub fn matches(&self, item: &ContentItem) -> bool {
        if let Some(types) = &self.types {
            if !types.contains(&item.content_type) {
                return false;
            }
        }
        if let Some(statuses) = &self.statuses {
            if !statuses.contains(&item.status) {
                return false;
            }
        }
        if let Some(platforms) = &self.platforms {
            if !platforms.contains(&item.platform) {
                return false;
            }
        }
        if self.pending_approval_only && item.status != ContentStatus::Pending {
            return false;
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_none()
            && self.statuses.is_none()
            && self.platforms.is_none()
            && !self.pending_approval_only
    }

    /// Filter-bar selection of a single type; clears pending-only.
    pub fn select_type(&mut self, content_type: Option<ContentType>) {
        self.types = content_type.map(|t| vec![t]);
        if self.types.is_some() {
            self.pending_approval_only = false;
        }
    }

    /// Filter-bar pending-only switch; clears the type selection.
    pub fn set_pending_only(&mut self, enabled: bool) {
        self.pending_approval_only = enabled;
        if enabled {
            self.types = None;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
