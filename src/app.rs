use std::sync::Arc;

use chrono::Utc;
use log::{debug, info};
use tokio::time::sleep;

use crate::auth::{self, TokenStore};
use crate::config::Config;
use crate::sync::Reconciler;
use crate::tray;
use crate::AppState;

/// Runs the fetch and tick loops until shutdown is signalled.
///
/// The two cadences live in separate tasks so a pending fetch never delays
/// a scheduler tick; the state mutex serializes merges against ticks and
/// the notification ledger absorbs any overlap. Both loops wake early on
/// shutdown.
pub async fn run(
    state: Arc<AppState>,
    tokens: Arc<TokenStore>,
    reconciler: Reconciler,
    config: &Config,
) {
    if !tokens.is_authorized() {
        let authorized = auth::await_authorization(
            &tokens,
            &config.client_id,
            &config.redirect_uri,
            state.effects.notifier.as_ref(),
            &state.shutdown,
        )
        .await;
        if !authorized {
            info!("Shutdown before authorization completed");
            return;
        }
    }

    // Draw the tray from the cached snapshot so the menu is useful before
    // the first fetch completes.
    {
        let core = state.core.lock().unwrap();
        state.effects.tray.render(&tray::build_items(&core.store));
    }

    info!("Starting calendar monitor");
    reconciler.run_cycle().await;

    let fetch_interval = config.fetch_interval;
    let fetch_shutdown = state.shutdown.clone();
    let fetch_loop = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sleep(fetch_interval) => {}
                _ = fetch_shutdown.cancelled() => break,
            }
            if fetch_shutdown.is_cancelled() {
                break;
            }
            reconciler.run_cycle().await;
        }
        info!("Fetch loop stopped");
    });

    loop {
        if state.shutdown.is_cancelled() {
            info!("Shutdown signal received, stopping tick loop");
            break;
        }

        {
            let mut core = state.core.lock().unwrap();
            let core = &mut *core;
            let fired = core.scheduler.run_tick(
                &core.store,
                Utc::now(),
                state.effects.notifier.as_ref(),
                state.effects.chime.as_ref(),
            );
            if fired > 0 {
                debug!("Scheduler tick fired {} alerts", fired);
            }
        }

        tokio::select! {
            _ = sleep(config.tick_interval) => {}
            _ = state.shutdown.cancelled() => {
                info!("Shutdown signal received during sleep, stopping tick loop");
                break;
            }
        }
    }

    let _ = fetch_loop.await;
    info!("Calendar monitor stopped gracefully");
}
