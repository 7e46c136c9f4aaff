//! Google Calendar integration
//!
//! Everything that talks to Google or to the credential tables sits behind
//! a trait ([`GoogleOAuthProvider`], [`CalendarApi`], [`GoogleStore`]) so the
//! sync rules can be tested without network or database.

pub mod calendar_api;
pub mod oauth;
pub mod payload;
pub mod poller;
pub mod store;
pub mod sync;

pub use calendar_api::{CalendarApi, EventsPage, GoogleCalendarClient};
pub use oauth::GoogleOAuthProvider;
pub use payload::{appointment_event_body, AppointmentEvent};
pub use poller::spawn_calendar_poller;
pub use store::{CachedEvent, GoogleStore, PgGoogleStore};
pub use sync::{CachedEventChanges, CalendarSync};

use crate::config::AppConfig;
use crate::error::ApiResult;
use auth_oauth::{GoogleOAuthClient, StateCodec};
use crypto::TokenCipher;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;

/// Google connect flow and calendar sync, present only when OAuth is configured
#[derive(Clone)]
pub struct GoogleServices {
    pub oauth: Arc<dyn GoogleOAuthProvider>,
    pub state_codec: StateCodec,
    pub sync: CalendarSync,
    pub success_redirect: Option<String>,
}

impl GoogleServices {
    /// Wire the services from configuration. Returns `Ok(None)` when the
    /// Google client id, secret or redirect URI is missing.
    pub fn from_config(config: &AppConfig, pool: PgPool) -> ApiResult<Option<Self>> {
        let Some(oauth_config) = config.google_oauth_config() else {
            return Ok(None);
        };

        let oauth: Arc<dyn GoogleOAuthProvider> = Arc::new(GoogleOAuthClient::new(oauth_config)?);
        let cipher = Arc::new(TokenCipher::from_key_source(
            config.google_token_encryption_key.expose_secret(),
        )?);
        let sync = CalendarSync::new(
            Arc::new(PgGoogleStore::new(pool)),
            Arc::new(GoogleCalendarClient::new()?),
            oauth.clone(),
            cipher,
        );

        Ok(Some(Self {
            oauth,
            state_codec: StateCodec::new(config.google_oauth_state_secret.expose_secret()),
            sync,
            success_redirect: config
                .google_oauth_success_redirect
                .clone()
                .filter(|url| !url.is_empty()),
        }))
    }
}

impl std::fmt::Debug for GoogleServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleServices")
            .field("state_codec", &self.state_codec)
            .field("success_redirect", &self.success_redirect)
            .finish_non_exhaustive()
    }
}
