use crate::auth::{require_roles, Role};
use crate::error::ApiResult;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use axum::{extract::State, Json};
use prescription_engine::{DrugInteractionChecker, InteractionWarning, SampleInteractionChecker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInteractionsRequest {
    #[validate(length(min = 1, message = "At least one medication is required"))]
    pub medication_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckInteractionsResponse {
    pub interactions: Vec<InteractionWarning>,
}

/// Names in request order; ids missing from the catalogue keep their id
fn ordered_names(ids: &[Uuid], known: &HashMap<Uuid, String>) -> Vec<String> {
    ids.iter()
        .map(|id| known.get(id).cloned().unwrap_or_else(|| id.to_string()))
        .collect()
}

/// Check a set of medications against the sample interaction table
#[utoipa::path(
    post,
    path = "/api/drug-interactions",
    request_body = CheckInteractionsRequest,
    responses(
        (status = 200, description = "Interactions found", body = CheckInteractionsResponse),
        (status = 400, description = "No medication given")
    ),
    tag = "drug-interactions",
    security(("bearer_auth" = []))
)]
pub async fn check_interactions(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CheckInteractionsRequest>,
) -> ApiResult<Json<CheckInteractionsResponse>> {
    require_roles(&user, Role::ALL)?;
    req.validate()?;

    let rows: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM medications WHERE id = ANY($1)")
            .bind(&req.medication_ids)
            .fetch_all(&state.db)
            .await?;
    let names = ordered_names(&req.medication_ids, &rows.into_iter().collect());

    let interactions = SampleInteractionChecker.check(&names).await;
    tracing::debug!(
        medications = names.len(),
        interactions = interactions.len(),
        "Drug interaction check"
    );

    Ok(Json(CheckInteractionsResponse { interactions }))
}
