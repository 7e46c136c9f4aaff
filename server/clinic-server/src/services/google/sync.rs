//! Calendar synchronization
//!
//! Pull: every connected user's primary calendar is listed and cached in
//! `google_events`. Push: appointments are mirrored as calendar events on a
//! best-effort basis. Access tokens are refreshed on demand with the
//! encrypted refresh token kept in `google_credentials`.

use super::calendar_api::CalendarApi;
use super::oauth::GoogleOAuthProvider;
use super::payload::{event_patch_body, parse_event};
use super::store::{CachedEvent, CredentialUpdate, EventUpdate, GoogleStore};
use crate::error::{ApiError, ApiResult};
use auth_oauth::{GoogleTokens, GOOGLE_CALENDAR_SCOPE};
use chrono::{DateTime, Duration, Utc};
use crypto::TokenCipher;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Stored tokens closer than this to expiry are refreshed first
const REFRESH_MARGIN_SECS: i64 = 60;
/// Expiry assumed when Google does not report one
const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 55;

/// Fields a client may change on a cached event
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CachedEventChanges {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Clone)]
pub struct CalendarSync {
    store: Arc<dyn GoogleStore>,
    api: Arc<dyn CalendarApi>,
    oauth: Arc<dyn GoogleOAuthProvider>,
    cipher: Arc<TokenCipher>,
}

impl CalendarSync {
    pub fn new(
        store: Arc<dyn GoogleStore>,
        api: Arc<dyn CalendarApi>,
        oauth: Arc<dyn GoogleOAuthProvider>,
        cipher: Arc<TokenCipher>,
    ) -> Self {
        Self {
            store,
            api,
            oauth,
            cipher,
        }
    }

    pub async fn has_credentials(&self, user_id: Uuid) -> ApiResult<bool> {
        Ok(self.store.credential(user_id).await?.is_some())
    }

    /// Persist tokens from the consent callback. Google omits the refresh
    /// token on repeated consents, in which case the stored one is kept.
    pub async fn store_tokens(&self, user_id: Uuid, tokens: GoogleTokens) -> ApiResult<()> {
        if tokens.access_token.is_empty() {
            return Err(ApiError::bad_request("Google did not return an access token"));
        }

        let existing = self.store.credential(user_id).await?;

        let refresh_token = match (tokens.refresh_token.filter(|t| !t.is_empty()), &existing) {
            (Some(token), _) => token,
            (None, Some(credential)) => self.cipher.decrypt(&credential.refresh_token)?,
            (None, None) => {
                return Err(ApiError::bad_request("Google did not return a refresh token"))
            }
        };

        let scope = tokens
            .scope
            .or_else(|| existing.map(|c| c.scope))
            .unwrap_or_else(|| GOOGLE_CALENDAR_SCOPE.to_string());

        self.store
            .save_credential(CredentialUpdate {
                user_id,
                access_token: tokens.access_token,
                refresh_token: self.cipher.encrypt(&refresh_token)?,
                expires_at: tokens.expires_at.unwrap_or_else(default_expiry),
                scope,
            })
            .await?;

        info!(user_id = %user_id, "Google account connected");
        Ok(())
    }

    /// Access token for the user's calendar, refreshed when about to expire.
    pub async fn valid_access_token(&self, user_id: Uuid) -> ApiResult<String> {
        let credential = self
            .store
            .credential(user_id)
            .await?
            .ok_or_else(|| ApiError::not_found_with("Google account not connected"))?;

        if credential.expires_at > Utc::now() + Duration::seconds(REFRESH_MARGIN_SECS) {
            return Ok(credential.access_token);
        }

        debug!(user_id = %user_id, "Refreshing Google access token");
        let refresh_token = self.cipher.decrypt(&credential.refresh_token)?;
        let tokens = self.oauth.refresh(&refresh_token).await?;

        if tokens.access_token.is_empty() {
            return Err(ApiError::bad_request("Unable to refresh Google access token"));
        }

        let rotated = match tokens.refresh_token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => self.cipher.encrypt(token)?,
            None => credential.refresh_token,
        };

        self.store
            .save_credential(CredentialUpdate {
                user_id,
                access_token: tokens.access_token.clone(),
                refresh_token: rotated,
                expires_at: tokens.expires_at.unwrap_or_else(default_expiry),
                scope: tokens.scope.unwrap_or(credential.scope),
            })
            .await?;

        Ok(tokens.access_token)
    }

    /// Pull the user's primary calendar into the event cache. Returns the
    /// number of cached events written.
    pub async fn sync_user(&self, user_id: Uuid) -> ApiResult<usize> {
        let access_token = self.valid_access_token(user_id).await?;
        let mut page_token: Option<String> = None;
        let mut written = 0;

        loop {
            let page = self.api.list_events(&access_token, page_token.take()).await?;
            let now = Utc::now();

            for event in &page.items {
                let Some(upsert) = parse_event(user_id, event, now) else {
                    continue;
                };
                self.store.upsert_event(upsert).await?;
                written += 1;
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(user_id = %user_id, events = written, "Calendar synchronized");
        Ok(written)
    }

    /// Sync every connected user in turn. A failing user is logged and
    /// skipped. Returns how many users synced successfully.
    pub async fn sync_all(&self) -> usize {
        let users = match self.store.users_with_credentials().await {
            Ok(users) => users,
            Err(e) => {
                warn!(error = %e, "Could not list users with Google credentials");
                return 0;
            }
        };

        let mut synced = 0;
        for user_id in users {
            match self.sync_user(user_id).await {
                Ok(_) => synced += 1,
                Err(e) => warn!(user_id = %user_id, error = %e, "Calendar sync failed for user"),
            }
        }
        synced
    }

    pub async fn create_event(&self, user_id: Uuid, event: &Value) -> ApiResult<Value> {
        let access_token = self.valid_access_token(user_id).await?;
        self.api.insert_event(&access_token, event).await
    }

    pub async fn patch_event(&self, user_id: Uuid, event_id: &str, event: &Value) -> ApiResult<Value> {
        let access_token = self.valid_access_token(user_id).await?;
        self.api.patch_event(&access_token, event_id, event).await
    }

    /// Mirror an appointment on the user's calendar.
    ///
    /// Returns the id of a newly created event, which the caller stores on
    /// the appointment. Nothing here fails the caller: users without a
    /// connected account are skipped and Google errors are only logged.
    pub async fn sync_appointment(
        &self,
        user_id: Uuid,
        existing_event_id: Option<&str>,
        event: &Value,
    ) -> Option<String> {
        match self.has_credentials(user_id).await {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Could not check Google credentials");
                return None;
            }
        }

        if let Some(event_id) = existing_event_id.filter(|id| !id.is_empty()) {
            match self.patch_event(user_id, event_id, event).await {
                Ok(_) => return None,
                Err(e) => warn!(
                    user_id = %user_id,
                    event_id,
                    error = %e,
                    "Updating calendar event failed, creating a new one"
                ),
            }
        }

        match self.create_event(user_id, event).await {
            Ok(created) => created
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Creating calendar event failed");
                None
            }
        }
    }

    pub async fn list_cached_events(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> ApiResult<Vec<CachedEvent>> {
        self.store.list_events(user_id, from, to, limit).await
    }

    /// Apply changes to a cached event: Google first, then the cache.
    pub async fn update_cached_event(
        &self,
        user_id: Uuid,
        google_event_id: &str,
        changes: CachedEventChanges,
    ) -> ApiResult<CachedEvent> {
        let existing = self
            .store
            .find_event(user_id, google_event_id)
            .await?
            .ok_or_else(|| ApiError::not_found_with("Evento do Google não encontrado"))?;

        let update = EventUpdate {
            summary: changes.summary.unwrap_or(existing.summary),
            description: changes.description.or(existing.description),
            start_time: changes.start_time.unwrap_or(existing.start_time),
            end_time: changes.end_time.unwrap_or(existing.end_time),
        };

        let body = event_patch_body(
            &update.summary,
            update.description.as_deref(),
            update.start_time,
            update.end_time,
        );

        let access_token = self.valid_access_token(user_id).await?;
        self.api
            .patch_event(&access_token, google_event_id, &body)
            .await
            .map_err(|e| match e {
                ApiError::Network { .. } => e,
                other => ApiError::network(other.to_string()),
            })?;

        self.store.update_event(existing.id, update).await
    }
}

fn default_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES)
}

impl std::fmt::Debug for CalendarSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalendarSync").finish_non_exhaustive()
    }
}
