use std::collections::{HashSet, VecDeque};
use std::hash::Hash;
use std::str::FromStr;

use chrono::{DateTime, Local, Utc};
use log::{debug, info};

use crate::audio::Chime;
use crate::error::AppError;
use crate::events::EventStore;
use crate::models::{CalendarEvent, Milestone};
use crate::notify::Notifier;

/// Default cap on ledger growth. Generous for a personal calendar; the
/// point is an upper bound on a long-running process, not tight packing.
pub const DEFAULT_LEDGER_CAPACITY: usize = 4096;

/// Insertion-ordered set with a hard size cap; when full, the oldest
/// entry is evicted to make room.
#[derive(Debug)]
pub struct BoundedSet<T> {
    entries: HashSet<T>,
    order: VecDeque<T>,
    capacity: usize,
}

impl<T: Eq + Hash + Clone> BoundedSet<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashSet::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Returns true when the value was not already present.
    pub fn insert(&mut self, value: T) -> bool {
        if self.entries.contains(&value) {
            return false;
        }
        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(value.clone());
        self.entries.insert(value);
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.entries.contains(value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which (event revision, milestone) pairs have already been announced.
pub type NotifiedLedger = BoundedSet<(String, Milestone)>;

/// Event ids that must never be announced again for this process.
pub type IgnoredSet = BoundedSet<String>;

/// How many announcements a single event instance gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyPolicy {
    /// One announcement per milestone per event revision.
    #[default]
    PerMilestone,
    /// One announcement total per event instance; after the first alert
    /// the event id is suppressed outright.
    OnceOnly,
}

impl FromStr for NotifyPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "per-milestone" | "per_milestone" => Ok(Self::PerMilestone),
            "once-only" | "once_only" => Ok(Self::OnceOnly),
            other => Err(AppError::config(format!(
                "unknown notify policy '{}' (expected per-milestone or once-only)",
                other
            ))),
        }
    }
}

/// One announcement the scheduler has decided to make.
#[derive(Debug, Clone)]
pub struct DueAlert {
    pub event: CalendarEvent,
    pub milestone: Milestone,
    pub minutes_to_start: i64,
}

/// Walks the store on every tick and decides which (event, milestone)
/// pairs are due, deduplicating against its ledgers.
///
/// The ledgers are keyed so that an upstream edit (new etag) re-arms an
/// event for fresh announcements, while an unchanged event fires at most
/// once per milestone no matter how often ticks overlap.
#[derive(Debug)]
pub struct NotificationScheduler {
    notified: NotifiedLedger,
    ignored: IgnoredSet,
    policy: NotifyPolicy,
}

impl NotificationScheduler {
    pub fn new(policy: NotifyPolicy) -> Self {
        Self::with_ledger_capacity(policy, DEFAULT_LEDGER_CAPACITY)
    }

    pub fn with_ledger_capacity(policy: NotifyPolicy, capacity: usize) -> Self {
        Self {
            notified: NotifiedLedger::with_capacity(capacity),
            ignored: IgnoredSet::with_capacity(capacity),
            policy,
        }
    }

    pub fn policy(&self) -> NotifyPolicy {
        self.policy
    }

    /// The suppression set, consulted by the store when classifying
    /// removals.
    pub fn ignored(&self) -> &IgnoredSet {
        &self.ignored
    }

    /// Scans the store at `now` and claims every due (etag, milestone)
    /// pair in the ledger. Claimed pairs are returned exactly once across
    /// all ticks, which is what makes overlapping ticks safe.
    pub fn due_alerts(&mut self, store: &EventStore, now: DateTime<Utc>) -> Vec<DueAlert> {
        let mut due = Vec::new();
        for event in store.events() {
            if event.is_all_day() {
                continue;
            }
            let end = match event.end_instant() {
                Some(end) => end,
                None => {
                    debug!("Skipping event {} with no timed end", event.id);
                    continue;
                }
            };
            if end <= now {
                continue;
            }
            if self.ignored.contains(&event.id) {
                continue;
            }
            let minutes = match event.minutes_to_start(now) {
                Some(minutes) => minutes,
                None => continue,
            };
            let milestone = match Milestone::classify(minutes) {
                Some(milestone) => milestone,
                None => continue,
            };
            let key = (event.etag.clone(), milestone);
            if self.notified.contains(&key) {
                continue;
            }
            self.notified.insert(key);
            if self.policy == NotifyPolicy::OnceOnly {
                self.ignored.insert(event.id.clone());
            }
            due.push(DueAlert {
                event: event.clone(),
                milestone,
                minutes_to_start: minutes,
            });
        }
        due
    }

    /// One scheduler tick: announce everything due at `now`. Returns the
    /// number of alerts fired.
    pub fn run_tick(
        &mut self,
        store: &EventStore,
        now: DateTime<Utc>,
        notifier: &dyn Notifier,
        chime: &dyn Chime,
    ) -> usize {
        let due = self.due_alerts(store, now);
        for alert in &due {
            info!(
                "Notifying about '{}' ({:?}, {} min to start)",
                alert.event.title(),
                alert.milestone,
                alert.minutes_to_start
            );
            notifier.notify(
                &alert_title(&alert.event, alert.milestone, alert.minutes_to_start),
                &alert_body(&alert.event),
            );
            chime.play(alert.milestone.clip());
        }
        due.len()
    }
}

/// "09:30 - 10:00: Event starting in 3 minutes", clock times in local time.
pub fn alert_title(event: &CalendarEvent, milestone: Milestone, minutes_to_start: i64) -> String {
    format!(
        "{} - {}: {}",
        format_clock(event.start_instant()),
        format_clock(event.end_instant()),
        milestone.label(minutes_to_start)
    )
}

/// Location (when present) followed by the event title.
pub fn alert_body(event: &CalendarEvent) -> String {
    format!(
        "{} {}",
        event.location.as_deref().unwrap_or(""),
        event.title()
    )
    .trim()
    .to_string()
}

fn format_clock(at: Option<DateTime<Utc>>) -> String {
    at.map(|t| t.with_timezone(&Local).format("%H:%M").to_string())
        .unwrap_or_default()
}
