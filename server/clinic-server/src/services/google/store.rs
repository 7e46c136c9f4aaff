//! Persistence of Google credentials and cached calendar events

use crate::error::ApiResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct GoogleCredential {
    pub id: Uuid,
    pub user_id: Uuid,
    pub access_token: String,
    /// AES-256-GCM sealed refresh token
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialUpdate {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub scope: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CachedEvent {
    pub id: Uuid,
    pub user_id: Uuid,
    pub google_event_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub updated_at_google: DateTime<Utc>,
    #[schema(value_type = Object)]
    pub raw_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventUpsert {
    pub user_id: Uuid,
    pub google_event_id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub updated_at_google: DateTime<Utc>,
    pub raw_payload: serde_json::Value,
}

/// New values for a cached event after a successful patch on Google
#[derive(Debug, Clone, PartialEq)]
pub struct EventUpdate {
    pub summary: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GoogleStore: Send + Sync {
    async fn credential(&self, user_id: Uuid) -> ApiResult<Option<GoogleCredential>>;
    async fn save_credential(&self, update: CredentialUpdate) -> ApiResult<()>;
    async fn users_with_credentials(&self) -> ApiResult<Vec<Uuid>>;
    async fn upsert_event(&self, event: EventUpsert) -> ApiResult<()>;
    async fn find_event(&self, user_id: Uuid, google_event_id: &str) -> ApiResult<Option<CachedEvent>>;
    async fn list_events(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> ApiResult<Vec<CachedEvent>>;
    async fn update_event(&self, id: Uuid, update: EventUpdate) -> ApiResult<CachedEvent>;
}

#[derive(Debug, Clone)]
pub struct PgGoogleStore {
    pool: PgPool,
}

impl PgGoogleStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GoogleStore for PgGoogleStore {
    async fn credential(&self, user_id: Uuid) -> ApiResult<Option<GoogleCredential>> {
        let credential = sqlx::query_as::<_, GoogleCredential>(
            r#"
            SELECT id, user_id, access_token, refresh_token, expires_at, scope
            FROM google_credentials
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(credential)
    }

    async fn save_credential(&self, update: CredentialUpdate) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO google_credentials (user_id, access_token, refresh_token, expires_at, scope)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id) DO UPDATE SET
                access_token = EXCLUDED.access_token,
                refresh_token = EXCLUDED.refresh_token,
                expires_at = EXCLUDED.expires_at,
                scope = EXCLUDED.scope,
                updated_at = NOW()
            "#,
        )
        .bind(update.user_id)
        .bind(update.access_token)
        .bind(update.refresh_token)
        .bind(update.expires_at)
        .bind(update.scope)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn users_with_credentials(&self) -> ApiResult<Vec<Uuid>> {
        let users = sqlx::query_scalar::<_, Uuid>(
            "SELECT user_id FROM google_credentials ORDER BY created_at",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn upsert_event(&self, event: EventUpsert) -> ApiResult<()> {
        sqlx::query(
            r#"
            INSERT INTO google_events (
                user_id, google_event_id, summary, description,
                start_time, end_time, updated_at_google, raw_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (user_id, google_event_id) DO UPDATE SET
                summary = EXCLUDED.summary,
                description = EXCLUDED.description,
                start_time = EXCLUDED.start_time,
                end_time = EXCLUDED.end_time,
                updated_at_google = EXCLUDED.updated_at_google,
                raw_payload = EXCLUDED.raw_payload,
                updated_at = NOW()
            "#,
        )
        .bind(event.user_id)
        .bind(event.google_event_id)
        .bind(event.summary)
        .bind(event.description)
        .bind(event.start_time)
        .bind(event.end_time)
        .bind(event.updated_at_google)
        .bind(event.raw_payload)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_event(&self, user_id: Uuid, google_event_id: &str) -> ApiResult<Option<CachedEvent>> {
        let event = sqlx::query_as::<_, CachedEvent>(
            r#"
            SELECT * FROM google_events
            WHERE user_id = $1 AND google_event_id = $2
            "#,
        )
        .bind(user_id)
        .bind(google_event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn list_events(
        &self,
        user_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: i64,
    ) -> ApiResult<Vec<CachedEvent>> {
        let events = sqlx::query_as::<_, CachedEvent>(
            r#"
            SELECT * FROM google_events
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR start_time >= $2)
              AND ($3::timestamptz IS NULL OR end_time <= $3)
            ORDER BY start_time ASC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(from)
        .bind(to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn update_event(&self, id: Uuid, update: EventUpdate) -> ApiResult<CachedEvent> {
        let event = sqlx::query_as::<_, CachedEvent>(
            r#"
            UPDATE google_events SET
                summary = $2,
                description = $3,
                start_time = $4,
                end_time = $5,
                updated_at_google = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.summary)
        .bind(update.description)
        .bind(update.start_time)
        .bind(update.end_time)
        .fetch_one(&self.pool)
        .await?;

        Ok(event)
    }
}
