use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use url::form_urlencoded;

use crate::error::{AppError, AppResult};
use crate::notify::Notifier;
use crate::storage::{BlobStore, TOKENS_KEY};

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";

/// How often the token blob is re-checked while waiting for a first-time
/// authorization to complete.
const AUTH_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// The slice of the token blob this process cares about. The blob is
/// written by the OAuth helper and may carry extra fields (expiry, scope);
/// those are preserved on disk and ignored here.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoredTokens {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Read-side view of the persisted token blob. Reads go to the blob store
/// every time so tokens refreshed by an external helper are picked up
/// without a restart.
pub struct TokenStore {
    blobs: Arc<dyn BlobStore>,
}

impl TokenStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Current token payload; missing or corrupt blobs read as empty.
    pub fn current(&self) -> StoredTokens {
        match self.blobs.load(TOKENS_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(tokens) => tokens,
                Err(e) => {
                    warn!("Token blob is corrupt, treating as unauthorized: {}", e);
                    StoredTokens::default()
                }
            },
            Ok(None) => StoredTokens::default(),
            Err(e) => {
                warn!("Could not read token blob: {}", e);
                StoredTokens::default()
            }
        }
    }

    pub fn access_token(&self) -> Option<String> {
        self.current().access_token
    }

    pub fn is_authorized(&self) -> bool {
        self.access_token().is_some()
    }

    /// Wipes stored tokens so the next authorization starts from scratch.
    pub fn clear(&self) -> AppResult<()> {
        let bytes = serde_json::to_vec(&StoredTokens::default())
            .map_err(|e| AppError::storage(format!("failed to encode empty tokens: {}", e)))?;
        self.blobs.save(TOKENS_KEY, &bytes)
    }
}

/// The Google consent page URL the user must visit to grant read-only
/// calendar access. The code exchange itself is the OAuth helper's job.
pub fn consent_url(client_id: &str, redirect_uri: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("scope", CALENDAR_SCOPE)
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .finish();
    format!("{}?{}", AUTH_ENDPOINT, query)
}

/// Parks the process until tokens appear in the store or shutdown is
/// requested. The consent URL is surfaced once, on the console and as a
/// notification. Returns true once authorized, false on shutdown.
pub async fn await_authorization(
    tokens: &TokenStore,
    client_id: &str,
    redirect_uri: &str,
    notifier: &dyn Notifier,
    shutdown: &CancellationToken,
) -> bool {
    let url = consent_url(client_id, redirect_uri);
    info!("Authorization required. Visit this URL to grant calendar access:");
    info!("{}", url);
    notifier.notify(
        "caltray",
        "Authorize the app by visiting the URL in the console.",
    );

    loop {
        if tokens.is_authorized() {
            info!("Authorization detected, resuming");
            return true;
        }
        tokio::select! {
            _ = tokio::time::sleep(AUTH_POLL_INTERVAL) => {}
            _ = shutdown.cancelled() => return false,
        }
    }
}
