use chrono::Local;
use log::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::events::EventStore;
use crate::models::CalendarEvent;
use crate::utils::extract_meeting_link;

/// One row of the tray menu. `key` is the event's etag; a click hands the
/// key back so the originating event can be looked up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrayItem {
    pub title: String,
    pub key: String,
}

/// Rebuilds the tray menu from scratch. Implementations decide what a
/// "menu" is; the core only produces rows.
#[cfg_attr(test, automock)]
pub trait TrayRenderer: Send + Sync {
    fn render(&self, items: &[TrayItem]);
}

/// Headless renderer that logs the menu instead of drawing it. Keeps the
/// pipeline intact on machines without a tray (servers, CI).
#[derive(Debug, Default)]
pub struct LogTray;

impl TrayRenderer for LogTray {
    fn render(&self, items: &[TrayItem]) {
        info!("Tray menu rebuilt with {} entries", items.len());
        for item in items {
            debug!("  {}", item.title);
        }
    }
}

/// Opens a URL outside the process; clicking a tray row lands here.
#[cfg_attr(test, automock)]
pub trait Launcher: Send + Sync {
    fn open(&self, url: &str);
}

/// Hands URLs to the platform opener (browser, or the Teams app when one
/// is registered for the link). Failures are logged and dropped.
#[derive(Debug, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, url: &str) {
        if let Err(e) = open::that(url) {
            warn!("Failed to open {}: {}", url, e);
        }
    }
}

/// Menu rows for the current store: timed events only, start ascending,
/// clock times rendered in local time. The end's date is shown only when
/// it differs from the start's.
pub fn build_items(store: &EventStore) -> Vec<TrayItem> {
    store
        .sorted_by_start()
        .into_iter()
        .filter(|event| !event.is_all_day())
        .filter_map(tray_item)
        .collect()
}

fn tray_item(event: &CalendarEvent) -> Option<TrayItem> {
    let start = event.start_instant()?.with_timezone(&Local);
    let end = event.end_instant()?.with_timezone(&Local);

    let end_part = if end.date_naive() == start.date_naive() {
        end.format("%H:%M").to_string()
    } else {
        end.format("%Y-%m-%d %H:%M").to_string()
    };

    Some(TrayItem {
        title: format!(
            "{} - {}: {}",
            start.format("%Y-%m-%d %H:%M"),
            end_part,
            event.title()
        ),
        key: event.etag.clone(),
    })
}

/// Resolves a clicked row back to its event and opens the best link it
/// has: an embedded meeting-join URL first, the calendar page otherwise.
pub fn handle_click(store: &EventStore, key: &str, launcher: &dyn Launcher) {
    let event = match store.find_by_etag(key) {
        Some(event) => event,
        None => {
            debug!("Tray item {} no longer resolves to an event", key);
            return;
        }
    };

    if let Some(link) =
        extract_meeting_link(event.description.as_deref(), event.location.as_deref())
    {
        info!("Opening {} link for '{}'", link.platform, event.title());
        launcher.open(&link.url);
    } else if let Some(html_link) = event.html_link.as_deref() {
        info!(
            "No meeting link found for '{}', opening calendar page",
            event.title()
        );
        launcher.open(html_link);
    } else {
        warn!("No link to open for '{}'", event.title());
    }
}
