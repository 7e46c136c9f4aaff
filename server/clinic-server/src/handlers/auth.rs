use crate::auth::{verify_password, IssuedToken};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::services::{UserProfile, UserRecord};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

/// Login request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[schema(example = json!({
    "email": "medico@clinica.com",
    "password": "senhaSegura123"
}))]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must have at least 8 characters"))]
    pub password: String,
}

/// User together with a fresh access token
#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserProfile,
    pub tokens: IssuedToken,
}

fn auth_payload(state: &AppState, user: &UserRecord) -> ApiResult<AuthResponse> {
    let profile = user.profile()?;
    let tokens = state.jwt.issue(user.id, profile.role)?;
    Ok(AuthResponse {
        user: profile,
        tokens,
    })
}

async fn load_profile(state: &AppState, user: &CurrentUser) -> ApiResult<UserRecord> {
    state
        .users
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::authentication("User no longer exists"))
}

/// Authenticate with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Valid credentials", body = AuthResponse),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    req.validate()?;

    let user = state
        .users
        .find_by_email(req.email.trim())
        .await?
        .filter(|user| verify_password(&req.password, &user.password_hash))
        .ok_or_else(|| {
            tracing::info!("Login rejected");
            ApiError::authentication("Invalid credentials")
        })?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(auth_payload(&state, &user)?))
}

/// Current user with a refreshed token
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Authenticated user", body = AuthResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth",
    security(("bearer_auth" = []))
)]
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> ApiResult<Json<AuthResponse>> {
    let record = load_profile(&state, &user).await?;
    Ok(Json(auth_payload(&state, &record)?))
}

/// Current user profile
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Authenticated user", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    tag = "users",
    security(("bearer_auth" = []))
)]
pub async fn current_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<UserProfile>> {
    let record = load_profile(&state, &user).await?;
    Ok(Json(record.profile()?))
}
