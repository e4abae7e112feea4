// Caltray Library
// Exposes core functionality for testing and reuse
// Google Calendar polling, milestone alerts, tray rendering

pub mod alerts;
pub mod app;
pub mod audio;
pub mod auth;
pub mod calendar;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod notify;
pub mod storage;
pub mod sync;
pub mod tray;
pub mod utils;

// Re-export commonly used types
pub use alerts::{NotificationScheduler, NotifyPolicy};
pub use audio::{AudioManager, Chime, SoundFiles};
pub use error::{AppError, AppResult};
pub use events::EventStore;
pub use models::*;
pub use storage::{BlobStore, FileStore};
pub use sync::Reconciler;

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;

use crate::notify::Notifier;
use crate::tray::{Launcher, TrayRenderer};

/// Mutable calendar state behind a single lock so a reconcile cycle and a
/// scheduler tick never observe each other halfway through.
pub struct Core {
    pub store: EventStore,
    pub scheduler: NotificationScheduler,
}

/// Side-effect surfaces, as trait objects so tests can substitute recorders.
pub struct Effects {
    pub notifier: Arc<dyn Notifier>,
    pub chime: Arc<dyn Chime>,
    pub tray: Arc<dyn TrayRenderer>,
    pub blobs: Arc<dyn BlobStore>,
    pub launcher: Arc<dyn Launcher>,
}

/// Application state shared across the application
pub struct AppState {
    pub core: Mutex<Core>,
    pub effects: Effects,
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(store: EventStore, scheduler: NotificationScheduler, effects: Effects) -> Self {
        Self {
            core: Mutex::new(Core { store, scheduler }),
            effects,
            shutdown: CancellationToken::new(),
        }
    }

    /// Resolves a tray menu click against the current snapshot.
    pub fn handle_tray_click(&self, key: &str) {
        let core = self.core.lock().unwrap();
        tray::handle_click(&core.store, key, self.effects.launcher.as_ref());
    }
}
