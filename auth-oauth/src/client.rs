use crate::error::{OAuthError, OAuthResult};
use crate::models::{GoogleOAuthConfig, GoogleTokens};
use chrono::{DateTime, Utc};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, RedirectUrl, RefreshToken,
    Scope, TokenResponse, TokenUrl,
};
use tracing::{debug, warn};

/// Google OAuth 2.0 client for the authorization code flow
#[derive(Debug, Clone)]
pub struct GoogleOAuthClient {
    inner: BasicClient,
    scopes: Vec<String>,
}

impl GoogleOAuthClient {
    pub fn new(config: GoogleOAuthConfig) -> OAuthResult<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(OAuthError::Configuration(
                "Google client id and secret are required".to_string(),
            ));
        }

        let inner = BasicClient::new(
            ClientId::new(config.client_id),
            Some(ClientSecret::new(config.client_secret)),
            AuthUrl::new(config.auth_url)?,
            Some(TokenUrl::new(config.token_url)?),
        )
        .set_redirect_uri(RedirectUrl::new(config.redirect_uri)?);

        Ok(Self {
            inner,
            scopes: config.scopes,
        })
    }

    /// Consent URL carrying the given state. Requests offline access and
    /// forces the consent screen so Google always returns a refresh token.
    pub fn authorize_url(&self, state: &str) -> String {
        let state = state.to_string();
        let mut request = self.inner.authorize_url(move || CsrfToken::new(state));
        for scope in &self.scopes {
            request = request.add_scope(Scope::new(scope.clone()));
        }

        let (url, _) = request
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .url();

        url.to_string()
    }

    pub async fn exchange_code(&self, code: &str) -> OAuthResult<GoogleTokens> {
        if code.is_empty() {
            return Err(OAuthError::InvalidRequest(
                "authorization code is empty".to_string(),
            ));
        }

        let response = self
            .inner
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                warn!(error = %e, "Google code exchange failed");
                OAuthError::ExternalProviderError(e.to_string())
            })?;

        debug!("Google authorization code exchanged");
        Ok(tokens_from_response(&response, Utc::now()))
    }

    pub async fn refresh(&self, refresh_token: &str) -> OAuthResult<GoogleTokens> {
        let response = self
            .inner
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                warn!(error = %e, "Google token refresh failed");
                OAuthError::ExternalProviderError(e.to_string())
            })?;

        debug!("Google access token refreshed");
        Ok(tokens_from_response(&response, Utc::now()))
    }
}

fn tokens_from_response(response: &BasicTokenResponse, now: DateTime<Utc>) -> GoogleTokens {
    let expires_at = response
        .expires_in()
        .and_then(|ttl| chrono::Duration::from_std(ttl).ok())
        .map(|ttl| now + ttl);

    let scope = response.scopes().map(|scopes| {
        scopes
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    });

    GoogleTokens {
        access_token: response.access_token().secret().clone(),
        refresh_token: response.refresh_token().map(|t| t.secret().clone()),
        expires_at,
        scope,
    }
}
