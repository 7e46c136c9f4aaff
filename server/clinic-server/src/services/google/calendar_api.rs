//! Google Calendar v3 REST client for the user's primary calendar

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

pub const PRIMARY_EVENTS_URL: &str = "https://www.googleapis.com/calendar/v3/calendars/primary/events";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsPage {
    #[serde(default)]
    pub items: Vec<Value>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CalendarApi: Send + Sync {
    /// One page of `events.list`, ordered by last update
    async fn list_events(&self, access_token: &str, page_token: Option<String>) -> ApiResult<EventsPage>;
    async fn insert_event(&self, access_token: &str, event: &Value) -> ApiResult<Value>;
    async fn patch_event(&self, access_token: &str, event_id: &str, event: &Value) -> ApiResult<Value>;
}

#[derive(Debug, Clone)]
pub struct GoogleCalendarClient {
    http: Client,
    events_url: String,
}

impl GoogleCalendarClient {
    pub fn new() -> ApiResult<Self> {
        Self::with_events_url(PRIMARY_EVENTS_URL)
    }

    pub fn with_events_url(events_url: impl Into<String>) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            http,
            events_url: events_url.into(),
        })
    }

    fn event_url(&self, event_id: &str) -> ApiResult<Url> {
        let mut url = Url::parse(&self.events_url)
            .map_err(|e| ApiError::configuration(format!("Invalid calendar URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::configuration("Calendar URL cannot be a base"))?
            .push(event_id);
        Ok(url)
    }
}

async fn ensure_success(response: Response, action: &str) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), body = %body, action, "Google Calendar request failed");
    Err(ApiError::network(format!(
        "Google Calendar {} failed with status {}",
        action,
        status.as_u16()
    )))
}

fn transport_error(action: &str, error: reqwest::Error) -> ApiError {
    ApiError::network(format!("Google Calendar {} failed: {}", action, error))
}

#[async_trait]
impl CalendarApi for GoogleCalendarClient {
    async fn list_events(&self, access_token: &str, page_token: Option<String>) -> ApiResult<EventsPage> {
        let mut query: Vec<(&str, String)> = vec![
            ("singleEvents", "true".to_string()),
            ("maxResults", "2500".to_string()),
            ("orderBy", "updated".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http
            .get(&self.events_url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error("list", e))?;

        ensure_success(response, "list")
            .await?
            .json::<EventsPage>()
            .await
            .map_err(|e| transport_error("list", e))
    }

    async fn insert_event(&self, access_token: &str, event: &Value) -> ApiResult<Value> {
        let response = self
            .http
            .post(&self.events_url)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .json(event)
            .send()
            .await
            .map_err(|e| transport_error("insert", e))?;

        ensure_success(response, "insert")
            .await?
            .json::<Value>()
            .await
            .map_err(|e| transport_error("insert", e))
    }

    async fn patch_event(&self, access_token: &str, event_id: &str, event: &Value) -> ApiResult<Value> {
        let response = self
            .http
            .patch(self.event_url(event_id)?)
            .bearer_auth(access_token)
            .query(&[("sendUpdates", "all")])
            .json(event)
            .send()
            .await
            .map_err(|e| transport_error("patch", e))?;

        ensure_success(response, "patch")
            .await?
            .json::<Value>()
            .await
            .map_err(|e| transport_error("patch", e))
    }
}
