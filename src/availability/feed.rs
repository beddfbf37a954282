//! Remote calendar feed fetching

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::AppError;

use super::ical::{parse_calendar, FeedEvent};

#[derive(Debug, Clone, thiserror::Error)]
pub enum FeedError {
    #[error("Calendar feed {url} unavailable: {reason}")]
    Unavailable { url: String, reason: String },
}

impl From<FeedError> for AppError {
    fn from(err: FeedError) -> Self {
        AppError::Dependency(err.to_string())
    }
}

/// Source of external calendar events. Implementations own their timeout
/// policy and must not retry.
#[async_trait]
pub trait CalendarFeed: Send + Sync {
    async fn fetch_events(&self, url: &str) -> Result<Vec<FeedEvent>, FeedError>;
}

/// Fetches iCalendar feeds over HTTP.
#[derive(Clone)]
pub struct HttpCalendarFeed {
    client: Client,
    timeout: Duration,
}

impl HttpCalendarFeed {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    async fn fetch_text(&self, url: &str) -> Result<String, FeedError> {
        let unavailable = |reason: &str| FeedError::Unavailable {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .header("Accept", "text/calendar, text/plain;q=0.9, */*;q=0.1")
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, url = %url, "Calendar fetch request failed");
                if e.is_timeout() {
                    unavailable("timed out")
                } else {
                    unavailable("request failed")
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            tracing::error!(status = %status, url = %url, "Calendar fetch returned non-success status");
            return Err(unavailable(&format!("status {status}")));
        }

        resp.text().await.map_err(|e| {
            tracing::error!(error = %e, url = %url, "Calendar body read failed");
            unavailable("body read failed")
        })
    }
}

#[async_trait]
impl CalendarFeed for HttpCalendarFeed {
    async fn fetch_events(&self, url: &str) -> Result<Vec<FeedEvent>, FeedError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FeedError::Unavailable {
                url: String::new(),
                reason: "empty URL".to_string(),
            });
        }

        let text = self.fetch_text(url).await?;
        if !text.contains("BEGIN:VCALENDAR") {
            tracing::warn!(url = %url, "Calendar feed did not return iCalendar data");
            return Err(FeedError::Unavailable {
                url: url.to_string(),
                reason: "response is not an iCalendar document".to_string(),
            });
        }

        let events = parse_calendar(&text);
        tracing::debug!(url = %url, events = events.len(), "Calendar feed parsed");
        Ok(events)
    }
}
