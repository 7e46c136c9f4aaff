use crate::auth::{require_roles, Role};
use crate::error::{ApiError, ApiResult};
use crate::handlers::patients::ensure_patient_exists;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AllergySeverity {
    #[default]
    Leve,
    Moderada,
    Grave,
}

impl AllergySeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllergySeverity::Leve => "leve",
            AllergySeverity::Moderada => "moderada",
            AllergySeverity::Grave => "grave",
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Allergy {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub substance: String,
    pub reaction: Option<String>,
    #[schema(example = "moderada")]
    pub severity: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAllergyRequest {
    #[validate(length(min = 1, max = 180))]
    #[schema(example = "Dipirona")]
    pub substance: String,
    #[validate(length(max = 200))]
    pub reaction: Option<String>,
    #[serde(default)]
    pub severity: AllergySeverity,
}

#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/allergies",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Known allergies", body = Vec<Allergy>),
        (status = 404, description = "Patient not found")
    ),
    tag = "allergies",
    security(("bearer_auth" = []))
)]
pub async fn list_allergies(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Allergy>>> {
    require_roles(&user, Role::ALL)?;
    ensure_patient_exists(&state, patient_id).await?;

    let allergies = sqlx::query_as::<_, Allergy>(
        "SELECT * FROM allergies WHERE patient_id = $1 ORDER BY substance ASC",
    )
    .bind(patient_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(allergies))
}

#[utoipa::path(
    post,
    path = "/api/patients/{patientId}/allergies",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    request_body = CreateAllergyRequest,
    responses(
        (status = 201, description = "Allergy registered", body = Allergy),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Patient not found")
    ),
    tag = "allergies",
    security(("bearer_auth" = []))
)]
pub async fn create_allergy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<CreateAllergyRequest>,
) -> ApiResult<(StatusCode, Json<Allergy>)> {
    require_roles(&user, Role::CLINICAL)?;
    req.validate()?;
    ensure_patient_exists(&state, patient_id).await?;

    let allergy = sqlx::query_as::<_, Allergy>(
        r#"
        INSERT INTO allergies (patient_id, substance, reaction, severity)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(patient_id)
    .bind(req.substance.trim())
    .bind(&req.reaction)
    .bind(req.severity.as_str())
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(allergy)))
}

#[utoipa::path(
    delete,
    path = "/api/patients/{patientId}/allergies/{id}",
    params(
        ("patientId" = Uuid, Path, description = "Patient ID"),
        ("id" = Uuid, Path, description = "Allergy ID")
    ),
    responses(
        (status = 204, description = "Allergy removed"),
        (status = 404, description = "Allergy not found")
    ),
    tag = "allergies",
    security(("bearer_auth" = []))
)]
pub async fn delete_allergy(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((patient_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    require_roles(&user, Role::CLINICAL)?;

    let deleted = sqlx::query("DELETE FROM allergies WHERE id = $1 AND patient_id = $2")
        .bind(id)
        .bind(patient_id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Allergy"));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_severity_defaults_to_leve() {
        let req: CreateAllergyRequest =
            serde_json::from_value(json!({ "substance": "Penicilina" })).unwrap();

        assert_eq!(req.severity, AllergySeverity::Leve);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_unknown_severity_rejected() {
        let parsed = serde_json::from_value::<CreateAllergyRequest>(
            json!({ "substance": "Penicilina", "severity": "fatal" }),
        );
        assert!(parsed.is_err());
    }

    #[test]
    fn test_reaction_length() {
        let req = CreateAllergyRequest {
            substance: "Iodo".to_string(),
            reaction: Some("x".repeat(201)),
            severity: AllergySeverity::Grave,
        };
        assert!(req.validate().is_err());
    }
}
