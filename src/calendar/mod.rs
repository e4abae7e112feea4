// Calendar integration module
// One configured calendar, one authoritative feed of upcoming events.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

use crate::error::AppResult;
use crate::models::CalendarEvent;

pub mod google;

pub use google::GoogleCalendarClient;

/// Authoritative source of upcoming events for a single calendar.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CalendarSource: Send + Sync {
    /// Snapshot of events starting at or after `time_min`, ordered by
    /// start ascending, recurring series expanded into single instances,
    /// capped at `max_results` entries.
    async fn fetch_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> AppResult<Vec<CalendarEvent>>;
}
