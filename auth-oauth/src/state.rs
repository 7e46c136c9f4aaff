//! Signed `state` parameter for the Google consent round trip.
//!
//! The state is an HS256 JWT carrying the user that started the flow and
//! where the browser should land afterwards, so the public callback can
//! trust it without server-side session storage.

use crate::error::{OAuthError, OAuthResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_LIFETIME_MINUTES: i64 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateClaims {
    pub user_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct StateCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    lifetime: Duration,
}

impl StateCodec {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            lifetime: Duration::minutes(DEFAULT_LIFETIME_MINUTES),
        }
    }

    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn sign(&self, user_id: Uuid, redirect_url: Option<String>) -> OAuthResult<String> {
        let now = Utc::now();
        let claims = StateClaims {
            user_id,
            redirect_url,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    pub fn verify(&self, token: &str) -> OAuthResult<StateClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<StateClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| OAuthError::InvalidState(e.to_string()))
    }
}

impl std::fmt::Debug for StateCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateCodec")
            .field("lifetime", &self.lifetime)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let codec = StateCodec::new("state-secret-for-tests");
        let user_id = Uuid::new_v4();

        let token = codec
            .sign(user_id, Some("http://localhost:3000/agenda".to_string()))
            .unwrap();
        let claims = codec.verify(&token).unwrap();

        assert_eq!(claims.user_id, user_id);
        assert_eq!(
            claims.redirect_url.as_deref(),
            Some("http://localhost:3000/agenda")
        );
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn test_claims_are_camel_case() {
        let claims = StateClaims {
            user_id: Uuid::nil(),
            redirect_url: Some("/x".to_string()),
            iat: 1,
            exp: 2,
        };
        let json = serde_json::to_value(&claims).unwrap();

        assert!(json.get("userId").is_some());
        assert!(json.get("redirectUrl").is_some());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = StateCodec::new("first-secret-value")
            .sign(Uuid::new_v4(), None)
            .unwrap();

        assert!(matches!(
            StateCodec::new("second-secret-value").verify(&token),
            Err(OAuthError::InvalidState(_))
        ));
    }

    #[test]
    fn test_expired_state_rejected() {
        let codec = StateCodec::new("state-secret-for-tests").with_lifetime(Duration::seconds(-30));
        let token = codec.sign(Uuid::new_v4(), None).unwrap();

        assert!(matches!(
            codec.verify(&token),
            Err(OAuthError::InvalidState(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = StateCodec::new("state-secret-for-tests");

        assert!(matches!(
            codec.verify("not.a.jwt"),
            Err(OAuthError::InvalidState(_))
        ));
    }
}
