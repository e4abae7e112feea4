use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Start or end of a calendar entry in the shape Google's API ships it:
/// timed entries carry `dateTime`, all-day entries carry a bare `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
}

impl EventTime {
    pub fn timed(at: DateTime<Utc>) -> Self {
        Self {
            date_time: Some(at),
            date: None,
        }
    }

    pub fn all_day(day: NaiveDate) -> Self {
        Self {
            date_time: None,
            date: Some(day),
        }
    }

    pub fn instant(&self) -> Option<DateTime<Utc>> {
        self.date_time
    }

    /// Total ordering key so timed and all-day entries sort together.
    /// All-day entries sort at midnight UTC; entries with neither field
    /// sink to the end.
    pub fn sort_key(&self) -> DateTime<Utc> {
        if let Some(at) = self.date_time {
            return at;
        }
        match self.date {
            Some(day) => day.and_time(NaiveTime::MIN).and_utc(),
            None => DateTime::<Utc>::MAX_UTC,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub etag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub start: EventTime,
    #[serde(default)]
    pub end: EventTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
}

impl CalendarEvent {
    pub fn title(&self) -> &str {
        self.summary.as_deref().unwrap_or("Untitled Event")
    }

    /// True for all-day entries, and for malformed entries with no usable
    /// start at all. Neither kind participates in timed notification logic.
    pub fn is_all_day(&self) -> bool {
        self.start.date_time.is_none()
    }

    pub fn start_instant(&self) -> Option<DateTime<Utc>> {
        self.start.instant()
    }

    pub fn end_instant(&self) -> Option<DateTime<Utc>> {
        self.end.instant()
    }

    /// Whole minutes until the start, as a true floor: 90 seconds out is 1,
    /// one second past the start is -1. `None` for all-day entries.
    pub fn minutes_to_start(&self, now: DateTime<Utc>) -> Option<i64> {
        self.start_instant()
            .map(|start| (start - now).num_seconds().div_euclid(60))
    }

    /// Whether the entry is strictly past its end; one ending exactly at
    /// `now` is still live. All-day entries never count as ended here; they
    /// are excluded from timed pruning.
    pub fn is_ended(&self, now: DateTime<Utc>) -> bool {
        match self.end_instant() {
            Some(end) => end < now,
            None => false,
        }
    }

    /// Whether the entry is still ahead of `now`. Timed entries compare
    /// instants; all-day entries count once their date is past today (UTC).
    pub fn starts_after(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_instant() {
            return start > now;
        }
        match self.start.date {
            Some(day) => day > now.date_naive(),
            None => false,
        }
    }
}
