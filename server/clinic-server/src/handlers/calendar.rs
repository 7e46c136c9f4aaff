use crate::auth::{require_roles, Role};
use crate::error::ApiResult;
use crate::handlers::google::google_services;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::services::google::{CachedEvent, CachedEventChanges};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

const DEFAULT_EVENT_LIMIT: i64 = 200;

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEventsParams {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    #[validate(range(min = 1))]
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventsMeta {
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventsResponse {
    pub items: Vec<CachedEvent>,
    pub meta: EventsMeta,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEventRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[validate(length(max = 255))]
    pub summary: Option<String>,
    pub description: Option<String>,
}

impl From<UpdateEventRequest> for CachedEventChanges {
    fn from(req: UpdateEventRequest) -> Self {
        CachedEventChanges {
            summary: req.summary,
            description: req.description,
            start_time: req.start_time,
            end_time: req.end_time,
        }
    }
}

/// Cached events of the current user's calendar, by start time
#[utoipa::path(
    get,
    path = "/api/calendar/events",
    params(ListEventsParams),
    responses(
        (status = 200, description = "Cached events", body = EventsResponse),
        (status = 503, description = "Google integration not configured")
    ),
    tag = "calendar",
    security(("bearer_auth" = []))
)]
pub async fn list_events(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListEventsParams>,
) -> ApiResult<Json<EventsResponse>> {
    require_roles(&user, Role::ALL)?;
    params.validate()?;
    let google = google_services(&state)?;

    let items = google
        .sync
        .list_cached_events(
            user.id,
            params.from,
            params.to,
            params.limit.unwrap_or(DEFAULT_EVENT_LIMIT),
        )
        .await?;
    let total = items.len();

    Ok(Json(EventsResponse {
        items,
        meta: EventsMeta { total },
    }))
}

/// Change a cached event on Google, then in the cache
#[utoipa::path(
    patch,
    path = "/api/calendar/events/{googleEventId}",
    params(("googleEventId" = String, Path, description = "Google event ID")),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Updated event", body = CachedEvent),
        (status = 404, description = "Event not cached"),
        (status = 502, description = "Google rejected the change"),
        (status = 503, description = "Google integration not configured")
    ),
    tag = "calendar",
    security(("bearer_auth" = []))
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(google_event_id): Path<String>,
    Json(req): Json<UpdateEventRequest>,
) -> ApiResult<Json<CachedEvent>> {
    require_roles(&user, Role::ALL)?;
    req.validate()?;
    let google = google_services(&state)?;

    let event = google
        .sync
        .update_cached_event(user.id, &google_event_id, req.into())
        .await?;

    tracing::info!(user_id = %user.id, google_event_id = %google_event_id, "Calendar event updated");
    Ok(Json(event))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_summary_length() {
        let req: UpdateEventRequest =
            serde_json::from_value(json!({ "summary": "x".repeat(256) })).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_request_into_changes() {
        let req: UpdateEventRequest = serde_json::from_value(json!({
            "startTime": "2026-05-04T12:00:00Z",
            "description": "Retorno"
        }))
        .unwrap();

        let changes = CachedEventChanges::from(req);
        assert!(changes.summary.is_none());
        assert_eq!(changes.description.as_deref(), Some("Retorno"));
        assert!(changes.start_time.is_some());
        assert!(changes.end_time.is_none());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let params = ListEventsParams {
            limit: Some(0),
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
