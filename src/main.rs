// Caltray - personal Google Calendar notifier
// Main entry point for the background tray process

use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use log::{error, info, warn};

use caltray::alerts::NotificationScheduler;
use caltray::audio::AudioManager;
use caltray::auth::TokenStore;
use caltray::calendar::GoogleCalendarClient;
use caltray::config::Config;
use caltray::notify::DesktopNotifier;
use caltray::storage::FileStore;
use caltray::tray::{LogTray, SystemLauncher};
use caltray::utils::logging::init_logging;
use caltray::{app, AppState, Effects, EventStore, Reconciler};

#[derive(Parser, Debug)]
#[command(name = "caltray", version, about = "Polls Google Calendar and raises desktop alerts")]
struct Args {
    /// Drop stored tokens and walk through authorization again
    #[arg(long)]
    login: bool,
    /// Start from an empty event cache instead of the persisted snapshot
    #[arg(long)]
    refresh: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _ = init_logging();

    info!("Starting caltray");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Configuration error: {}", e);
            eprintln!("Configuration error: {}", e);
            eprintln!("Set GOOGLE_CLIENT_ID and try again.");
            std::process::exit(1);
        }
    };

    let blobs: Arc<FileStore> = match FileStore::new(config.data_dir.clone()) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Failed to prepare data directory: {}", e);
            eprintln!("Failed to prepare data directory: {}", e);
            std::process::exit(1);
        }
    };

    let tokens = Arc::new(TokenStore::new(blobs.clone()));
    if args.login {
        info!("Clearing stored tokens for re-authorization");
        if let Err(e) = tokens.clear() {
            warn!("Failed to clear stored tokens: {}", e);
        }
    }

    let store = if args.refresh {
        info!("Starting with an empty event cache");
        EventStore::new()
    } else {
        let mut store = EventStore::load(blobs.as_ref());
        let dropped = store.prune_past(Utc::now());
        if dropped > 0 {
            info!("Dropped {} ended events from the cached snapshot", dropped);
        }
        store
    };

    let audio = Arc::new(AudioManager::new());
    audio.set_volume(config.volume);
    if let Err(e) = AudioManager::ensure_sound_directory() {
        warn!("Could not prepare sound directory: {}", e);
    }

    let effects = Effects {
        notifier: Arc::new(DesktopNotifier),
        chime: audio,
        tray: Arc::new(LogTray),
        blobs: blobs.clone(),
        launcher: Arc::new(SystemLauncher),
    };

    let scheduler = NotificationScheduler::new(config.notify_policy);
    let state = Arc::new(AppState::new(store, scheduler, effects));

    let source = match GoogleCalendarClient::new(config.calendar_id.clone(), tokens.clone()) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            error!("Failed to build calendar client: {}", e);
            eprintln!("Failed to build calendar client: {}", e);
            std::process::exit(1);
        }
    };

    // Ctrl-C flips the shutdown token; the monitor loop drains on its own.
    let shutdown = state.shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, shutting down");
            shutdown.cancel();
        }
    });

    let reconciler = Reconciler::new(source, state.clone(), config.max_results);
    app::run(state, tokens, reconciler, &config).await;

    info!("caltray stopped");
}
