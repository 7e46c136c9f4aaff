use crate::auth::{require_roles, Role};
use crate::error::{ApiError, ApiResult};
use crate::handlers::patients::{ensure_patient_exists, patients_by_id, Patient};
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
use validator::{Validate, ValidationError};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, FromRow)]
struct ConsultationRow {
    id: Uuid,
    patient_id: Uuid,
    appointment_id: Option<Uuid>,
    doctor_id: Uuid,
    schema_id: String,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    duration_minutes: i32,
    notes: serde_json::Value,
    summary: Option<String>,
    google_event_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// A recorded consultation with its patient
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub doctor_id: Uuid,
    #[schema(example = "anamnese-geral")]
    pub schema_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    /// Structured form answers keyed by field
    #[schema(value_type = Object)]
    pub notes: serde_json::Value,
    pub summary: Option<String>,
    pub google_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConsultationRow {
    fn with_patient(self, patient: Option<Patient>) -> Consultation {
        Consultation {
            id: self.id,
            patient_id: self.patient_id,
            appointment_id: self.appointment_id,
            doctor_id: self.doctor_id,
            schema_id: self.schema_id,
            start_time: self.start_time,
            end_time: self.end_time,
            duration_minutes: self.duration_minutes,
            notes: self.notes,
            summary: self.summary,
            google_event_id: self.google_event_id,
            patient,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

fn json_object(value: &serde_json::Value) -> Result<(), ValidationError> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ValidationError::new("notes_must_be_object"))
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_window"))]
pub struct CreateConsultationRequest {
    pub patient_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub doctor_id: Uuid,
    #[validate(length(min = 1, max = 120))]
    pub schema_id: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[validate(range(min = 0))]
    pub duration_minutes: i32,
    #[validate(custom(function = "json_object"))]
    #[schema(value_type = Object)]
    pub notes: serde_json::Value,
    pub summary: Option<String>,
}

fn validate_window(req: &CreateConsultationRequest) -> Result<(), ValidationError> {
    if req.end_time < req.start_time {
        return Err(ValidationError::new("end_before_start"));
    }
    Ok(())
}

fn consultation_not_found(id: Uuid) -> ApiError {
    ApiError::not_found_with(format!("Consultation with ID {} not found", id))
}

async fn attach_patients(
    state: &AppState,
    rows: Vec<ConsultationRow>,
) -> ApiResult<Vec<Consultation>> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.patient_id).collect();
    let by_id = patients_by_id(state, &ids).await?;

    Ok(rows
        .into_iter()
        .map(|row| {
            let patient = by_id.get(&row.patient_id).cloned();
            row.with_patient(patient)
        })
        .collect())
}

async fn load_consultation(state: &AppState, id: Uuid) -> ApiResult<Consultation> {
    let row = sqlx::query_as::<_, ConsultationRow>("SELECT * FROM consultations WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| consultation_not_found(id))?;

    attach_patients(state, vec![row])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| consultation_not_found(id))
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Record a finished consultation
#[utoipa::path(
    post,
    path = "/api/consultations",
    request_body = CreateConsultationRequest,
    responses(
        (status = 201, description = "Consultation recorded", body = Consultation),
        (status = 400, description = "Invalid request"),
        (status = 404, description = "Patient not found")
    ),
    tag = "consultations",
    security(("bearer_auth" = []))
)]
pub async fn create_consultation(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateConsultationRequest>,
) -> ApiResult<(StatusCode, Json<Consultation>)> {
    require_roles(&user, Role::ALL)?;
    req.validate()?;
    ensure_patient_exists(&state, req.patient_id).await?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO consultations (
            patient_id, appointment_id, doctor_id, schema_id,
            start_time, end_time, duration_minutes, notes, summary
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING id
        "#,
    )
    .bind(req.patient_id)
    .bind(req.appointment_id)
    .bind(req.doctor_id)
    .bind(&req.schema_id)
    .bind(req.start_time)
    .bind(req.end_time)
    .bind(req.duration_minutes)
    .bind(&req.notes)
    .bind(&req.summary)
    .fetch_one(&state.db)
    .await?;

    tracing::info!(consultation_id = %id, patient_id = %req.patient_id, "Consultation recorded");

    Ok((StatusCode::CREATED, Json(load_consultation(&state, id).await?)))
}

/// All consultations, most recent first
#[utoipa::path(
    get,
    path = "/api/consultations",
    responses((status = 200, description = "Consultations", body = Vec<Consultation>)),
    tag = "consultations",
    security(("bearer_auth" = []))
)]
pub async fn list_consultations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Vec<Consultation>>> {
    require_roles(&user, Role::ALL)?;

    let rows = sqlx::query_as::<_, ConsultationRow>(
        "SELECT * FROM consultations ORDER BY start_time DESC",
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(attach_patients(&state, rows).await?))
}

#[utoipa::path(
    get,
    path = "/api/consultations/{id}",
    params(("id" = Uuid, Path, description = "Consultation ID")),
    responses(
        (status = 200, description = "Consultation", body = Consultation),
        (status = 404, description = "Consultation not found")
    ),
    tag = "consultations",
    security(("bearer_auth" = []))
)]
pub async fn get_consultation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Consultation>> {
    require_roles(&user, Role::ALL)?;
    Ok(Json(load_consultation(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/consultations/patient/{patientId}",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    responses((status = 200, description = "Consultations of the patient", body = Vec<Consultation>)),
    tag = "consultations",
    security(("bearer_auth" = []))
)]
pub async fn list_patient_consultations(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Consultation>>> {
    require_roles(&user, Role::ALL)?;

    let rows = sqlx::query_as::<_, ConsultationRow>(
        "SELECT * FROM consultations WHERE patient_id = $1 ORDER BY start_time DESC",
    )
    .bind(patient_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(attach_patients(&state, rows).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(notes: serde_json::Value) -> CreateConsultationRequest {
        serde_json::from_value(json!({
            "patientId": Uuid::new_v4(),
            "doctorId": Uuid::new_v4(),
            "schemaId": "anamnese-geral",
            "startTime": "2026-03-02T13:00:00Z",
            "endTime": "2026-03-02T13:40:00Z",
            "durationMinutes": 40,
            "notes": notes
        }))
        .unwrap()
    }

    #[test]
    fn test_valid_consultation() {
        let req = request(json!({ "queixa": "cefaleia" }));
        assert!(req.validate().is_ok());
        assert!(req.appointment_id.is_none());
    }

    #[test]
    fn test_notes_must_be_object() {
        assert!(request(json!(["cefaleia"])).validate().is_err());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut req = request(json!({}));
        req.end_time = req.start_time - chrono::Duration::minutes(5);
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_not_found_message() {
        let id = Uuid::nil();
        assert_eq!(
            consultation_not_found(id).to_string(),
            format!("Consultation with ID {} not found", id)
        );
    }
}
