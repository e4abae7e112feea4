// Google Calendar API v3 client (read-only events.list)

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::auth::TokenStore;
use crate::calendar::CalendarSource;
use crate::error::{AppError, AppResult};
use crate::models::CalendarEvent;
use crate::utils::retry::{retry_with_exponential_backoff, RetryConfig};

const API_BASE: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Deserialize)]
struct EventsPage {
    #[serde(default)]
    items: Vec<CalendarEvent>,
}

/// Fetches upcoming events for one calendar over the REST API, with a
/// bounded request timeout and retry on transient failures.
///
/// The bearer token is re-read from the token store on every fetch, so an
/// external refresh (or a first-time authorization finishing mid-run)
/// takes effect on the next cycle without a restart.
pub struct GoogleCalendarClient {
    http: Client,
    calendar_id: String,
    tokens: Arc<TokenStore>,
    retry: RetryConfig,
}

impl GoogleCalendarClient {
    pub fn new(calendar_id: impl Into<String>, tokens: Arc<TokenStore>) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("caltray/0.1")
            .build()?;

        Ok(Self {
            http,
            calendar_id: calendar_id.into(),
            tokens,
            retry: RetryConfig::default(),
        })
    }

    fn events_url(&self, time_min: DateTime<Utc>, max_results: u32) -> AppResult<Url> {
        let mut url = Url::parse(API_BASE)
            .map_err(|e| AppError::fetch(format!("invalid API base URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::fetch("API base URL cannot hold a path"))?
            .extend(["calendars", &self.calendar_id, "events"]);
        url.query_pairs_mut()
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime")
            .append_pair(
                "timeMin",
                &time_min.format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            )
            .append_pair("maxResults", &max_results.to_string());
        Ok(url)
    }

    async fn fetch_page(&self, url: Url, token: &str) -> anyhow::Result<Vec<CalendarEvent>> {
        let response = self.http.get(url).bearer_auth(token).send().await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "Failed to fetch calendar events: {}",
                response.status()
            ));
        }

        let page: EventsPage = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse calendar response: {}", e))?;
        Ok(page.items)
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    async fn fetch_events(
        &self,
        time_min: DateTime<Utc>,
        max_results: u32,
    ) -> AppResult<Vec<CalendarEvent>> {
        let token = self
            .tokens
            .access_token()
            .ok_or_else(|| AppError::auth("no access token on file"))?;
        let url = self.events_url(time_min, max_results)?;
        debug!("Fetching events from {}", url);

        let events =
            retry_with_exponential_backoff(&self.retry, || self.fetch_page(url.clone(), &token))
                .await
                .map_err(|e| AppError::fetch(e.to_string()))?;

        info!(
            "Fetched {} events from calendar {}",
            events.len(),
            self.calendar_id
        );
        Ok(events)
    }
}
