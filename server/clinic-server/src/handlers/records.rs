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
use validator::Validate;

const SELECT_RECORD: &str = r#"
    SELECT r.id, r.patient_id, r.doctor_id, r.summary, r.notes, r.tags,
           r.created_at, r.updated_at,
           u.name AS doctor_name, u.email AS doctor_email, u.role AS doctor_role
    FROM medical_records r
    JOIN users u ON u.id = r.doctor_id
"#;

#[derive(Debug, Clone, FromRow)]
struct RecordRow {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    summary: String,
    notes: Option<serde_json::Value>,
    tags: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    doctor_name: String,
    doctor_email: String,
    doctor_role: String,
}

/// Author of a medical record
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordAuthor {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub id: Uuid,
    pub patient: Option<Patient>,
    pub doctor: RecordAuthor,
    pub summary: String,
    #[schema(value_type = Option<Object>)]
    pub notes: Option<serde_json::Value>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordRow {
    fn into_record(self, patient: Option<Patient>) -> ApiResult<MedicalRecord> {
        Ok(MedicalRecord {
            id: self.id,
            patient,
            doctor: RecordAuthor {
                id: self.doctor_id,
                name: self.doctor_name,
                email: self.doctor_email,
                role: self.doctor_role.parse()?,
            },
            summary: self.summary,
            notes: self.notes,
            tags: self.tags,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    #[validate(length(min = 1))]
    pub summary: String,
    #[schema(value_type = Option<Object>)]
    pub notes: Option<serde_json::Value>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    #[validate(length(min = 1))]
    pub summary: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub notes: Option<serde_json::Value>,
    pub tags: Option<Vec<String>>,
}

fn ensure_can_author(user: &CurrentUser) -> ApiResult<()> {
    require_roles(user, Role::MEDICO_ONLY)
        .map_err(|_| ApiError::authorization("Only doctors can create medical records"))
}

/// Admins may edit any record, everyone else only their own
fn can_edit(user: &CurrentUser, author_id: Uuid) -> bool {
    user.role == Role::Admin || user.id == author_id
}

async fn attach_patients(state: &AppState, rows: Vec<RecordRow>) -> ApiResult<Vec<MedicalRecord>> {
    let ids: Vec<Uuid> = rows.iter().map(|row| row.patient_id).collect();
    let by_id = patients_by_id(state, &ids).await?;

    rows.into_iter()
        .map(|row| {
            let patient = by_id.get(&row.patient_id).cloned();
            row.into_record(patient)
        })
        .collect()
}

async fn find_row(state: &AppState, id: Uuid) -> ApiResult<RecordRow> {
    sqlx::query_as::<_, RecordRow>(&format!("{} WHERE r.id = $1", SELECT_RECORD))
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::not_found("Record"))
}

async fn load_record(state: &AppState, id: Uuid) -> ApiResult<MedicalRecord> {
    let row = find_row(state, id).await?;
    attach_patients(state, vec![row])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::not_found("Record"))
}

/// Write a medical record for a patient; doctors only
#[utoipa::path(
    post,
    path = "/api/patients/{patientId}/records",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    request_body = CreateRecordRequest,
    responses(
        (status = 201, description = "Record created", body = MedicalRecord),
        (status = 403, description = "Only doctors can create medical records"),
        (status = 404, description = "Patient not found")
    ),
    tag = "records",
    security(("bearer_auth" = []))
)]
pub async fn create_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<CreateRecordRequest>,
) -> ApiResult<(StatusCode, Json<MedicalRecord>)> {
    ensure_can_author(&user)?;
    req.validate()?;
    ensure_patient_exists(&state, patient_id).await?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO medical_records (patient_id, doctor_id, summary, notes, tags)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(patient_id)
    .bind(user.id)
    .bind(&req.summary)
    .bind(&req.notes)
    .bind(req.tags.clone().unwrap_or_default())
    .fetch_one(&state.db)
    .await?;

    tracing::info!(record_id = %id, patient_id = %patient_id, doctor_id = %user.id, "Medical record created");

    Ok((StatusCode::CREATED, Json(load_record(&state, id).await?)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/records",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Records, newest first", body = Vec<MedicalRecord>),
        (status = 404, description = "Patient not found")
    ),
    tag = "records",
    security(("bearer_auth" = []))
)]
pub async fn list_patient_records(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<MedicalRecord>>> {
    require_roles(&user, Role::ALL)?;
    ensure_patient_exists(&state, patient_id).await?;

    let rows = sqlx::query_as::<_, RecordRow>(&format!(
        "{} WHERE r.patient_id = $1 ORDER BY r.created_at DESC",
        SELECT_RECORD
    ))
    .bind(patient_id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(attach_patients(&state, rows).await?))
}

#[utoipa::path(
    get,
    path = "/api/records/{id}",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 200, description = "Record", body = MedicalRecord),
        (status = 404, description = "Record not found")
    ),
    tag = "records",
    security(("bearer_auth" = []))
)]
pub async fn get_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MedicalRecord>> {
    require_roles(&user, Role::ALL)?;
    Ok(Json(load_record(&state, id).await?))
}

/// Amend a record; absent fields are left unchanged
#[utoipa::path(
    put,
    path = "/api/records/{id}",
    params(("id" = Uuid, Path, description = "Record ID")),
    request_body = UpdateRecordRequest,
    responses(
        (status = 200, description = "Record updated", body = MedicalRecord),
        (status = 403, description = "Not the author of the record"),
        (status = 404, description = "Record not found")
    ),
    tag = "records",
    security(("bearer_auth" = []))
)]
pub async fn update_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateRecordRequest>,
) -> ApiResult<Json<MedicalRecord>> {
    require_roles(&user, Role::CLINICAL)?;
    req.validate()?;

    let existing = find_row(&state, id).await?;
    if !can_edit(&user, existing.doctor_id) {
        return Err(ApiError::authorization("You cannot update this medical record"));
    }

    sqlx::query(
        r#"
        UPDATE medical_records SET
            summary = COALESCE($2, summary),
            notes = COALESCE($3, notes),
            tags = COALESCE($4, tags),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(&req.summary)
    .bind(&req.notes)
    .bind(&req.tags)
    .execute(&state.db)
    .await?;

    Ok(Json(load_record(&state, id).await?))
}

#[utoipa::path(
    delete,
    path = "/api/records/{id}",
    params(("id" = Uuid, Path, description = "Record ID")),
    responses(
        (status = 204, description = "Record deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Record not found")
    ),
    tag = "records",
    security(("bearer_auth" = []))
)]
pub async fn delete_record(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_roles(&user, Role::ADMIN_ONLY)?;

    let deleted = sqlx::query("DELETE FROM medical_records WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(ApiError::not_found("Record"));
    }
    tracing::info!(record_id = %id, user_id = %user.id, "Medical record deleted");
    Ok(StatusCode::NO_CONTENT)
}
