//! JWT access tokens

use crate::auth::Role;
use crate::error::{ApiError, ApiResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub access_token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

/// Parse token lifetimes such as `3600`, `45s`, `30m`, `1h` or `7d`.
pub fn parse_expires_in(value: &str) -> ApiResult<Duration> {
    let value = value.trim();
    let invalid = || ApiError::configuration(format!("Invalid JWT_EXPIRES_IN value: {:?}", value));

    let (digits, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (value.get(..idx).unwrap_or(""), Some(c)),
        Some(_) => (value, None),
        None => return Err(invalid()),
    };

    let amount: i64 = digits.trim().parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    match unit.map(|c| c.to_ascii_lowercase()) {
        None | Some('s') => Ok(Duration::seconds(amount)),
        Some('m') => Ok(Duration::minutes(amount)),
        Some('h') => Ok(Duration::hours(amount)),
        Some('d') => Ok(Duration::days(amount)),
        Some(_) => Err(invalid()),
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user_id: Uuid, role: Role) -> ApiResult<IssuedToken> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        let access_token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| ApiError::internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.ttl.num_seconds(),
        })
    }

    pub fn verify(&self, token: &str) -> ApiResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "Rejected access token");
                ApiError::authentication("Invalid or expired token")
            })
    }
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expires_in() {
        assert_eq!(parse_expires_in("3600").unwrap(), Duration::seconds(3600));
        assert_eq!(parse_expires_in("45s").unwrap(), Duration::seconds(45));
        assert_eq!(parse_expires_in("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_expires_in("1h").unwrap(), Duration::hours(1));
        assert_eq!(parse_expires_in("7d").unwrap(), Duration::days(7));
    }

    #[test]
    fn test_parse_expires_in_rejects_garbage() {
        for value in ["", "h", "-5m", "0", "10w", "abc"] {
            assert!(parse_expires_in(value).is_err(), "{:?} accepted", value);
        }
    }

    #[test]
    fn test_issue_and_verify() {
        let keys = JwtKeys::new("test-secret-with-enough-length", Duration::hours(1));
        let user_id = Uuid::new_v4();

        let issued = keys.issue(user_id, Role::Medico).unwrap();
        assert_eq!(issued.expires_in, 3600);

        let claims = keys.verify(&issued.access_token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Medico);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let keys = JwtKeys::new("test-secret-with-enough-length", Duration::hours(1));
        let other = JwtKeys::new("another-secret-entirely-here", Duration::hours(1));

        let issued = keys.issue(Uuid::new_v4(), Role::Admin).unwrap();
        let err = other.verify(&issued.access_token).unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = JwtKeys::new("test-secret-with-enough-length", Duration::seconds(-120));
        let issued = keys.issue(Uuid::new_v4(), Role::Admin).unwrap();

        assert!(keys.verify(&issued.access_token).is_err());
    }
}
