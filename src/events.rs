use std::collections::HashSet;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::alerts::IgnoredSet;
use crate::error::{AppError, AppResult};
use crate::models::{CalendarEvent, MergeOutcome};
use crate::storage::{BlobStore, EVENTS_KEY};

/// The current known set of upcoming events, rebuilt wholesale from every
/// successful fetch and cached to disk between runs.
///
/// Invariant: at most one entry per event id. Display order is recomputed
/// at render time; the stored order is whatever the feed sent.
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<CalendarEvent>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from raw entries, dropping duplicate ids (first one
    /// wins, matching feed order).
    pub fn from_events(events: Vec<CalendarEvent>) -> Self {
        let mut store = Self::new();
        store.events = dedup_by_id(events);
        store
    }

    /// Reads the cached snapshot. Missing or corrupt caches degrade to an
    /// empty store; this never fails the process.
    pub fn load(blobs: &dyn BlobStore) -> Self {
        match blobs.load(EVENTS_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Vec<CalendarEvent>>(&bytes) {
                Ok(events) => {
                    info!("Loaded {} cached events", events.len());
                    Self::from_events(events)
                }
                Err(e) => {
                    warn!("Event cache is corrupt, starting empty: {}", e);
                    Self::new()
                }
            },
            Ok(None) => Self::new(),
            Err(e) => {
                warn!("Could not read event cache, starting empty: {}", e);
                Self::new()
            }
        }
    }

    pub fn persist(&self, blobs: &dyn BlobStore) -> AppResult<()> {
        let bytes = serde_json::to_vec(&self.events)
            .map_err(|e| AppError::storage(format!("failed to encode event cache: {}", e)))?;
        blobs.save(EVENTS_KEY, &bytes)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[CalendarEvent] {
        &self.events
    }

    /// Replaces the store with a freshly fetched authoritative snapshot and
    /// reports the diff against what was there before.
    ///
    /// `removed` only lists events that vanished unexpectedly: ones whose
    /// start is still ahead and whose id is not suppressed. Entries that
    /// simply elapsed out of the query window are not worth announcing.
    pub fn merge(
        &mut self,
        fetched: Vec<CalendarEvent>,
        ignored: &IgnoredSet,
        now: DateTime<Utc>,
    ) -> MergeOutcome {
        let fetched = dedup_by_id(fetched);
        let previous_len = self.events.len();

        let added: Vec<CalendarEvent> = fetched
            .iter()
            .filter(|e| self.find_by_id(&e.id).is_none())
            .cloned()
            .collect();

        let updated = fetched
            .iter()
            .filter(|e| {
                self.find_by_id(&e.id)
                    .map_or(false, |prev| prev.etag != e.etag)
            })
            .count();

        let fetched_ids: HashSet<&str> = fetched.iter().map(|e| e.id.as_str()).collect();
        let removed: Vec<CalendarEvent> = self
            .events
            .iter()
            .filter(|e| {
                !fetched_ids.contains(e.id.as_str())
                    && e.starts_after(now)
                    && !ignored.contains(&e.id)
            })
            .cloned()
            .collect();

        let changed = !added.is_empty()
            || !removed.is_empty()
            || updated > 0
            || fetched.len() != previous_len;

        debug!(
            "Merged snapshot: {} fetched, {} added, {} removed, {} updated",
            fetched.len(),
            added.len(),
            removed.len(),
            updated
        );

        self.events = fetched;
        MergeOutcome {
            added,
            removed,
            updated,
            changed,
        }
    }

    /// Drops timed entries that have fully elapsed. All-day entries are
    /// left alone.
    pub fn prune_past(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.events.len();
        self.events.retain(|e| !e.is_ended(now));
        let pruned = before - self.events.len();
        if pruned > 0 {
            debug!("Pruned {} elapsed events", pruned);
        }
        pruned
    }

    /// Events in display order: start ascending, all-day entries at their
    /// date's midnight.
    pub fn sorted_by_start(&self) -> Vec<&CalendarEvent> {
        let mut items: Vec<&CalendarEvent> = self.events.iter().collect();
        items.sort_by_key(|e| e.start.sort_key());
        items
    }

    pub fn find_by_id(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    /// Tray items carry the etag as their correlation key; resolve it back
    /// to the event it was rendered from.
    pub fn find_by_etag(&self, etag: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|e| e.etag == etag)
    }
}

fn dedup_by_id(events: Vec<CalendarEvent>) -> Vec<CalendarEvent> {
    let mut seen = HashSet::new();
    let mut events = events;
    events.retain(|e| seen.insert(e.id.clone()));
    events
}
