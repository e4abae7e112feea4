//! Runtime configuration, read from the environment at startup.
//!
//! Only `GOOGLE_CLIENT_ID` is required; everything else has a sensible
//! default. Invalid optional values are logged and replaced with their
//! default rather than failing startup.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use log::warn;

use crate::alerts::NotifyPolicy;
use crate::error::{AppError, AppResult};
use crate::storage::FileStore;

const DEFAULT_REDIRECT_URI: &str = "http://localhost:9080/oauth2callback";
const DEFAULT_FETCH_INTERVAL_SECS: u64 = 900;
const DEFAULT_TICK_INTERVAL_SECS: u64 = 30;
const DEFAULT_MAX_RESULTS: u32 = 10;
const DEFAULT_VOLUME: f32 = 0.7;

#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth client id for the consent URL. The one setting with no default.
    pub client_id: String,
    /// Calendar to poll; `primary` is the account's main calendar.
    pub calendar_id: String,
    /// Where the external OAuth helper listens for the consent redirect.
    pub redirect_uri: String,
    /// How often the reconciler polls the calendar.
    pub fetch_interval: Duration,
    /// How often the scheduler checks for due alerts.
    pub tick_interval: Duration,
    /// Page size for event fetches.
    pub max_results: u32,
    /// How many announcements one event instance gets.
    pub notify_policy: NotifyPolicy,
    /// Chime volume, 0.0 through 1.0.
    pub volume: f32,
    /// Directory holding the token and event blobs.
    pub data_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        let client_id = env::var("GOOGLE_CLIENT_ID")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::config("GOOGLE_CLIENT_ID must be set"))?;

        let notify_policy = match env::var("CALTRAY_NOTIFY_POLICY") {
            Ok(raw) => match raw.parse::<NotifyPolicy>() {
                Ok(policy) => policy,
                Err(e) => {
                    warn!("{}, using per-milestone", e);
                    NotifyPolicy::default()
                }
            },
            Err(_) => NotifyPolicy::default(),
        };

        let data_dir = env::var("CALTRAY_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| FileStore::default_dir());

        Ok(Self {
            client_id,
            calendar_id: env_or("GOOGLE_CALENDAR_ID", "primary"),
            redirect_uri: env_or("CALTRAY_REDIRECT_URI", DEFAULT_REDIRECT_URI),
            fetch_interval: Duration::from_secs(env_parsed(
                "CALTRAY_FETCH_INTERVAL_SECS",
                DEFAULT_FETCH_INTERVAL_SECS,
            )),
            tick_interval: Duration::from_secs(env_parsed(
                "CALTRAY_TICK_INTERVAL_SECS",
                DEFAULT_TICK_INTERVAL_SECS,
            )),
            max_results: env_parsed("CALTRAY_MAX_RESULTS", DEFAULT_MAX_RESULTS),
            notify_policy,
            volume: env_parsed("CALTRAY_VOLUME", DEFAULT_VOLUME).clamp(0.0, 1.0),
            data_dir,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parsed<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy + std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring invalid {} value '{}', using {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}
