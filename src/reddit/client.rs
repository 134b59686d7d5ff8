use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::constants::{feed_url, FEED_RATE_LIMIT_DELAY};
use crate::models::RedditGameEntry;
use crate::reddit::extractor::GameEntryExtractor;
use crate::reddit::GameSource;
use crate::utils::http;

/// Validates a listing payload and returns its `data.children` array.
pub(crate) fn listing_children(payload: &Value) -> Option<&[Value]> {
    if payload.get("kind").and_then(Value::as_str) != Some("Listing") {
        return None;
    }
    payload
        .get("data")?
        .get("children")?
        .as_array()
        .map(Vec::as_slice)
}

pub struct RedditClient {
    url: String,
    client: Option<reqwest::Client>,
    extractor: GameEntryExtractor,
    min_request_spacing: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RedditClient {
    pub fn new() -> Self {
        Self::with_url(feed_url(), http::get_client())
    }

    pub fn with_url(url: impl Into<String>, client: Option<reqwest::Client>) -> Self {
        Self {
            url: url.into(),
            client,
            extractor: GameEntryExtractor::new(),
            min_request_spacing: FEED_RATE_LIMIT_DELAY,
            last_request: Mutex::new(None),
        }
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let ready_at = previous + self.min_request_spacing;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch_listing(&self) -> Option<Value> {
        let client = self.client.as_ref()?;
        self.wait_for_rate_limit().await;

        match http::get_json(client, &self.url).await {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::debug!("[Reddit] Feed fetch failed: {}", e);
                None
            }
        }
    }

    pub fn parse_payload(&self, payload: &Value) -> Vec<RedditGameEntry> {
        match listing_children(payload) {
            Some(children) => self.extractor.extract(children),
            None => {
                tracing::debug!("[Reddit] Ignoring feed payload with unexpected shape");
                Vec::new()
            }
        }
    }
}

impl Default for RedditClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GameSource for RedditClient {
    async fn list_games(&self) -> Vec<RedditGameEntry> {
        let Some(payload) = self.fetch_listing().await else {
            return Vec::new();
        };
        self.parse_payload(&payload)
    }
}
