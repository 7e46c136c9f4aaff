use thiserror::Error;

#[derive(Error, Debug)]
pub enum OAuthError {
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("External provider error: {0}")]
    ExternalProviderError(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("JWT error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl From<url::ParseError> for OAuthError {
    fn from(err: url::ParseError) -> Self {
        OAuthError::Configuration(err.to_string())
    }
}

pub type OAuthResult<T> = std::result::Result<T, OAuthError>;
