//! OAuth port used by the connect flow and token refresh

use async_trait::async_trait;
use auth_oauth::{GoogleOAuthClient, GoogleTokens, OAuthResult};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GoogleOAuthProvider: Send + Sync {
    fn authorize_url(&self, state: &str) -> String;
    async fn exchange_code(&self, code: &str) -> OAuthResult<GoogleTokens>;
    async fn refresh(&self, refresh_token: &str) -> OAuthResult<GoogleTokens>;
}

#[async_trait]
impl GoogleOAuthProvider for GoogleOAuthClient {
    fn authorize_url(&self, state: &str) -> String {
        GoogleOAuthClient::authorize_url(self, state)
    }

    async fn exchange_code(&self, code: &str) -> OAuthResult<GoogleTokens> {
        GoogleOAuthClient::exchange_code(self, code).await
    }

    async fn refresh(&self, refresh_token: &str) -> OAuthResult<GoogleTokens> {
        GoogleOAuthClient::refresh(self, refresh_token).await
    }
}
