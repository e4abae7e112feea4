use std::sync::Arc;

use chrono::Utc;
use log::{error, info};

use crate::calendar::CalendarSource;
use crate::models::CycleOutcome;
use crate::tray;
use crate::AppState;

/// Drives one fetch-merge-notify-persist cycle against the shared state.
///
/// Everything that can go wrong inside a cycle is converted to a log line
/// or a user-visible notification; nothing propagates out. The next timer
/// tick is always allowed to try again.
pub struct Reconciler {
    source: Arc<dyn CalendarSource>,
    state: Arc<AppState>,
    max_results: u32,
}

impl Reconciler {
    pub fn new(source: Arc<dyn CalendarSource>, state: Arc<AppState>, max_results: u32) -> Self {
        Self {
            source,
            state,
            max_results,
        }
    }

    pub async fn run_cycle(&self) -> CycleOutcome {
        let now = Utc::now();

        // The fetch is awaited before taking the state lock so scheduler
        // ticks keep firing while the network is slow.
        let fetched = match self.source.fetch_events(now, self.max_results).await {
            Ok(events) => events,
            Err(e) => {
                error!("Fetch cycle failed: {}", e);
                self.state
                    .effects
                    .notifier
                    .notify("Error while fetching events", &e.to_string());
                return CycleOutcome::failure(e.to_string());
            }
        };
        let fetched_count = fetched.len();

        let mut core = self.state.core.lock().unwrap();
        let core = &mut *core;
        let pruned = core.store.prune_past(now);
        let outcome = core.store.merge(fetched, core.scheduler.ignored(), now);

        let effects = &self.state.effects;
        if !outcome.added.is_empty() {
            let summaries: Vec<&str> = outcome.added.iter().map(|e| e.title()).collect();
            info!("New events fetched: {}", summaries.join(", "));
            effects
                .notifier
                .notify("New events fetched", &summaries.join(", "));
        }
        for event in &outcome.removed {
            info!("Event removed upstream: {}", event.title());
            effects.notifier.notify("Event removed", event.title());
        }

        let mut alerts_fired = 0;
        if outcome.changed || pruned > 0 {
            effects.tray.render(&tray::build_items(&core.store));
            // Catch events that arrived already inside an alert window
            // without waiting for the next timer tick.
            alerts_fired = core.scheduler.run_tick(
                &core.store,
                now,
                effects.notifier.as_ref(),
                effects.chime.as_ref(),
            );
            if let Err(e) = core.store.persist(effects.blobs.as_ref()) {
                error!("Failed to persist event cache: {}", e);
            }
        }

        let result = CycleOutcome::success(fetched_count, &outcome, pruned, alerts_fired);
        info!(
            "Reconcile cycle complete: {} fetched, {} added, {} removed, {} updated",
            result.fetched, result.added, result.removed, result.updated
        );
        result
    }
}
