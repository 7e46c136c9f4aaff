use crate::auth::{require_roles, Role};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::services::google::GoogleServices;
use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const CONNECTED_MESSAGE: &str =
    "Conta Google conectada com sucesso. Você já pode fechar esta janela.";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AuthorizeParams {
    /// Where the browser lands after consent
    pub redirect_url: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthorizeResponse {
    pub url: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub user_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl CallbackResponse {
    fn connected(user_id: Uuid, redirect_url: Option<String>) -> Self {
        let message = match redirect_url {
            Some(_) => None,
            None => Some(CONNECTED_MESSAGE.to_string()),
        };
        Self {
            user_id,
            redirect_url,
            message,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub connected: bool,
}

/// Google services, or 503 when OAuth is not configured
pub(crate) fn google_services(state: &AppState) -> ApiResult<&GoogleServices> {
    state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::unavailable("Google integration is not configured"))
}

/// Consent URL for connecting the current user's Google Calendar
#[utoipa::path(
    get,
    path = "/api/google/authorize",
    params(AuthorizeParams),
    responses(
        (status = 200, description = "Consent URL", body = AuthorizeResponse),
        (status = 503, description = "Google integration not configured")
    ),
    tag = "google",
    security(("bearer_auth" = []))
)]
pub async fn authorize(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<AuthorizeParams>,
) -> ApiResult<Json<AuthorizeResponse>> {
    require_roles(&user, Role::ALL)?;
    let google = google_services(&state)?;

    let redirect = params
        .redirect_url
        .filter(|url| !url.is_empty())
        .or_else(|| google.success_redirect.clone());
    let signed_state = google.state_codec.sign(user.id, redirect)?;

    Ok(Json(AuthorizeResponse {
        url: google.oauth.authorize_url(&signed_state),
    }))
}

/// Consent callback called by Google; no bearer token
#[utoipa::path(
    get,
    path = "/api/google/callback",
    params(CallbackParams),
    responses(
        (status = 200, description = "Account connected", body = CallbackResponse),
        (status = 400, description = "Missing or invalid code/state"),
        (status = 503, description = "Google integration not configured")
    ),
    tag = "google"
)]
pub async fn callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackParams>,
) -> ApiResult<Json<CallbackResponse>> {
    let google = google_services(&state)?;

    let (Some(code), Some(signed_state)) = (
        params.code.filter(|c| !c.is_empty()),
        params.state.filter(|s| !s.is_empty()),
    ) else {
        return Err(ApiError::bad_request("Missing code or state returned by Google"));
    };

    let claims = google.state_codec.verify(&signed_state)?;
    let tokens = google.oauth.exchange_code(&code).await?;
    google.sync.store_tokens(claims.user_id, tokens).await?;

    match google.sync.sync_user(claims.user_id).await {
        Ok(cached) => tracing::info!(user_id = %claims.user_id, cached, "Initial calendar pull done"),
        Err(e) => tracing::warn!(user_id = %claims.user_id, error = %e, "Initial calendar pull failed"),
    }

    Ok(Json(CallbackResponse::connected(
        claims.user_id,
        claims.redirect_url,
    )))
}

#[utoipa::path(
    get,
    path = "/api/google/status",
    responses((status = 200, description = "Whether the user connected Google", body = StatusResponse)),
    tag = "google",
    security(("bearer_auth" = []))
)]
pub async fn status(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<StatusResponse>> {
    require_roles(&user, Role::ALL)?;

    let connected = match &state.google {
        Some(google) => google.sync.has_credentials(user.id).await?,
        None => false,
    };

    Ok(Json(StatusResponse { connected }))
}
