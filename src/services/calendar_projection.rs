// Calendar projection - derives the month grid and the grid-preview feed
// from a client's content and events. Pure and recomputed on every call.

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{ContentFilters, ContentItem, EventItem};

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub in_current_month: bool,
    pub content: Vec<ContentItem>,
    pub events: Vec<EventItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarProjection {
    /// Sunday-to-Saturday weeks covering the month; length is a multiple of 7.
    pub days: Vec<CalendarDay>,
    /// Filtered posts and reels, newest date first. Equal dates keep input
    /// order and undated items come last.
    pub grid_feed: Vec<ContentItem>,
    /// Pending items for the client, ignoring the active filters.
    pub pending_count: usize,
}

impl CalendarProjection {
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay]> {
        self.days.chunks(7)
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// Projects content and events for `client_id` onto the month containing
/// `month`.
///
/// Without a client the grid is still laid out but every collection is
/// empty.
pub fn project(
    content: &[ContentItem],
    events: &[EventItem],
    client_id: Option<Uuid>,
    month: NaiveDate,
    filters: &ContentFilters,
) -> CalendarProjection {
    let client_content: Vec<&ContentItem> = match client_id {
        Some(id) => content.iter().filter(|item| item.client_id == id).collect(),
        None => Vec::new(),
    };
    let client_events: Vec<&EventItem> = match client_id {
        Some(id) => events.iter().filter(|event| event.client_id == id).collect(),
        None => Vec::new(),
    };

    let pending_count = client_content.iter().filter(|item| item.is_pending()).count();

    let filtered: Vec<&ContentItem> = client_content
        .into_iter()
        .filter(|item| filters.matches(item))
        .collect();

    let mut content_by_date: HashMap<NaiveDate, Vec<ContentItem>> = HashMap::new();
    for item in &filtered {
        if let Some(date) = item.date {
            content_by_date.entry(date).or_default().push((*item).clone());
        }
    }
    let mut events_by_date: HashMap<NaiveDate, Vec<EventItem>> = HashMap::new();
    for event in client_events {
        events_by_date.entry(event.date).or_default().push(event.clone());
    }

    let (first, last) = month_bounds(month);
    let days = grid_span(month)
        .map(|date| CalendarDay {
            date,
            in_current_month: date >= first && date <= last,
            content: content_by_date.remove(&date).unwrap_or_default(),
            events: events_by_date.remove(&date).unwrap_or_default(),
        })
        .collect();

    let mut grid_feed: Vec<ContentItem> = filtered
        .into_iter()
        .filter(|item| item.content_type.is_grid_eligible())
        .cloned()
        .collect();
    // sort_by is stable, so equal dates keep their input order.
    grid_feed.sort_by(|a, b| b.date.cmp(&a.date));

    CalendarProjection {
        days,
        grid_feed,
        pending_count,
    }
}

/// First and last day of the month containing `date`.
pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = date.with_day(1).unwrap_or(date);
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first);
    (first, last)
}

/// Every date from the Sunday on or before the 1st to the Saturday on or
/// after the last day of the month.
pub fn grid_span(month: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    let (first, last) = month_bounds(month);
    let lead = i64::from(first.weekday().num_days_from_sunday());
    let trail = i64::from(6 - last.weekday().num_days_from_sunday());
    let start = first - chrono::Duration::days(lead);
    let end = last + chrono::Duration::days(trail);
    start.iter_days().take_while(move |d| *d <= end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_grid_rows_follow_the_real_calendar() {
        // June 2024 starts on a Saturday and ends on a Sunday.
        assert_eq!(grid_span(ymd(2024, 6, 15)).count(), 42);
        // August 2024 runs Thursday to Saturday.
        assert_eq!(grid_span(ymd(2024, 8, 1)).count(), 35);
        // February 2015 starts on a Sunday and ends on a Saturday.
        assert_eq!(grid_span(ymd(2015, 2, 10)).count(), 28);
    }

    #[test]
    fn test_grid_shape_for_every_month_of_a_decade() {
        for year in 2020..2030 {
            for month in 1..=12 {
                let days: Vec<NaiveDate> = grid_span(ymd(year, month, 1)).collect();
                assert_eq!(days.len() % 7, 0, "{}-{}", year, month);
                assert_eq!(days[0].weekday(), Weekday::Sun);
                assert_eq!(days[days.len() - 1].weekday(), Weekday::Sat);
                for pair in days.windows(2) {
                    assert_eq!(pair[0].succ_opt(), Some(pair[1]));
                }
            }
        }
    }

    #[test]
    fn test_month_bounds_handles_december_and_leap_years() {
        assert_eq!(month_bounds(ymd(2023, 12, 9)), (ymd(2023, 12, 1), ymd(2023, 12, 31)));
        assert_eq!(month_bounds(ymd(2024, 2, 29)), (ymd(2024, 2, 1), ymd(2024, 2, 29)));
    }

    #[test]
    fn test_missing_client_yields_empty_collections() {
        let projection = project(&[], &[], None, ymd(2024, 6, 1), &ContentFilters::default());
        assert_eq!(projection.days.len(), 42);
        assert!(projection.days.iter().all(|d| d.content.is_empty() && d.events.is_empty()));
        assert!(projection.grid_feed.is_empty());
        assert_eq!(projection.pending_count, 0);
    }
}
