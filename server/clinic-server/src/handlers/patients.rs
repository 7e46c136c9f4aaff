use crate::auth::{require_roles, Role};
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::types::{PageQuery, Paginated};
use crate::utils::ListQuery;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::collections::HashMap;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: Uuid,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub document_id: String,
    pub rg: String,
    pub gender: String,
    pub marital_status: String,
    pub phone: Option<String>,
    pub whatsapp: Option<String>,
    pub email: Option<String>,
    pub profession: String,
    #[schema(value_type = Option<Object>)]
    pub address_json: Option<serde_json::Value>,
    #[schema(value_type = Option<Object>)]
    pub emergency_contact: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, message = "Street is required"))]
    pub street: String,
    #[validate(length(min = 1, message = "Number is required"))]
    pub number: String,
    pub complement: Option<String>,
    pub neighborhood: Option<String>,
    #[validate(length(min = 1, message = "City is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 2, message = "State must be a two letter code"))]
    pub state: String,
    #[validate(length(min = 1, message = "Zip code is required"))]
    pub zip_code: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub relationship: Option<String>,
}

/// Create Patient Request
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePatientRequest {
    #[validate(length(min = 1, max = 180))]
    #[schema(example = "João da Silva")]
    pub full_name: String,
    #[schema(example = "1985-04-10")]
    pub birth_date: NaiveDate,
    #[validate(length(min = 1, max = 40))]
    pub document_id: String,
    #[validate(length(min = 1, max = 40))]
    pub rg: String,
    #[validate(length(min = 1, max = 20))]
    pub gender: String,
    #[validate(length(min = 1, max = 30))]
    pub marital_status: String,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 40))]
    pub whatsapp: Option<String>,
    #[validate(email, length(max = 160))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub profession: String,
    #[validate(nested)]
    pub address_json: Address,
    pub emergency_contact: Option<EmergencyContact>,
}

/// Partial update; absent fields are left unchanged
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePatientRequest {
    #[validate(length(min = 1, max = 180))]
    pub full_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 40))]
    pub document_id: Option<String>,
    #[validate(length(min = 1, max = 40))]
    pub rg: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub gender: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub marital_status: Option<String>,
    #[validate(length(max = 40))]
    pub phone: Option<String>,
    #[validate(length(max = 40))]
    pub whatsapp: Option<String>,
    #[validate(email, length(max = 160))]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 120))]
    pub profession: Option<String>,
    #[validate(nested)]
    pub address_json: Option<Address>,
    pub emergency_contact: Option<EmergencyContact>,
}

/// List Patients Query Parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListPatientsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Matches full name or document
    pub search: Option<String>,
    pub document_id: Option<String>,
}

fn to_json<T: Serialize>(value: &Option<T>) -> ApiResult<Option<serde_json::Value>> {
    value
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(ApiError::from)
}

pub(crate) async fn ensure_patient_exists(state: &AppState, patient_id: Uuid) -> ApiResult<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM patients WHERE id = $1)")
        .bind(patient_id)
        .fetch_one(&state.db)
        .await?;

    if exists {
        Ok(())
    } else {
        Err(ApiError::not_found("Patient"))
    }
}

/// Patients by id, for embedding in other responses
pub(crate) async fn patients_by_id(
    state: &AppState,
    ids: &[Uuid],
) -> ApiResult<HashMap<Uuid, Patient>> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }

    let patients: Vec<Patient> = sqlx::query_as("SELECT * FROM patients WHERE id = ANY($1)")
        .bind(ids)
        .fetch_all(&state.db)
        .await?;

    Ok(patients.into_iter().map(|p| (p.id, p)).collect())
}

const DUPLICATE_DOCUMENT: &str = "Patient with this document already exists";

/// `document_id` is the only unique column on patients, so any conflict
/// raised while writing one is a duplicated document.
fn duplicate_document(err: ApiError) -> ApiError {
    match err {
        ApiError::Conflict { .. } => ApiError::bad_request(DUPLICATE_DOCUMENT),
        other => other,
    }
}

async fn ensure_document_available(
    state: &AppState,
    document_id: &str,
    except: Option<Uuid>,
) -> ApiResult<()> {
    let taken: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM patients WHERE document_id = $1 AND id IS DISTINCT FROM $2)",
    )
    .bind(document_id)
    .bind(except)
    .fetch_one(&state.db)
    .await?;

    if taken {
        return Err(ApiError::bad_request(DUPLICATE_DOCUMENT));
    }
    Ok(())
}

// ============================================================================
// API HANDLERS
// ============================================================================

/// Register a patient
#[utoipa::path(
    post,
    path = "/api/patients",
    request_body = CreatePatientRequest,
    responses(
        (status = 201, description = "Patient created", body = Patient),
        (status = 400, description = "Invalid request or duplicated document"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn create_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePatientRequest>,
) -> ApiResult<(StatusCode, Json<Patient>)> {
    require_roles(&user, Role::ALL)?;
    req.validate()?;

    ensure_document_available(&state, &req.document_id, None).await?;

    let patient = sqlx::query_as::<_, Patient>(
        r#"
        INSERT INTO patients (
            full_name, birth_date, document_id, rg, gender, marital_status,
            phone, whatsapp, email, profession, address_json, emergency_contact
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        RETURNING *
        "#,
    )
    .bind(&req.full_name)
    .bind(req.birth_date)
    .bind(&req.document_id)
    .bind(&req.rg)
    .bind(&req.gender)
    .bind(&req.marital_status)
    .bind(&req.phone)
    .bind(&req.whatsapp)
    .bind(&req.email)
    .bind(&req.profession)
    .bind(serde_json::to_value(&req.address_json)?)
    .bind(to_json(&req.emergency_contact)?)
    .fetch_one(&state.db)
    .await
    .map_err(|e| duplicate_document(e.into()))?;

    tracing::info!(patient_id = %patient.id, user_id = %user.id, "Patient created");
    Ok((StatusCode::CREATED, Json(patient)))
}

/// List patients
#[utoipa::path(
    get,
    path = "/api/patients",
    params(ListPatientsParams),
    responses(
        (status = 200, description = "Page of patients", body = Paginated<Patient>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn list_patients(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListPatientsParams>,
) -> ApiResult<Json<Paginated<Patient>>> {
    require_roles(&user, Role::ALL)?;
    let page = PageQuery::new(params.page, params.limit);

    let mut query = ListQuery::new("FROM patients");
    query
        .search(&["full_name", "document_id"], params.search.as_deref())
        .filter_eq("document_id", params.document_id)
        .order_by("created_at DESC");

    let total = query.count(&state.db).await?;
    let patients: Vec<Patient> = query
        .fetch_page(&state.db, "SELECT *", page.limit(), page.offset())
        .await?;

    Ok(Json(Paginated::new(patients, total, page.limit(), page.page())))
}

/// Get a patient by ID
#[utoipa::path(
    get,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 200, description = "Patient", body = Patient),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn get_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Patient>> {
    require_roles(&user, Role::ALL)?;

    sqlx::query_as::<_, Patient>("SELECT * FROM patients WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Patient"))
}

/// Update a patient
#[utoipa::path(
    put,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    request_body = UpdatePatientRequest,
    responses(
        (status = 200, description = "Patient updated", body = Patient),
        (status = 400, description = "Invalid request or duplicated document"),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn update_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePatientRequest>,
) -> ApiResult<Json<Patient>> {
    require_roles(&user, Role::ALL)?;
    req.validate()?;
    if let Some(document_id) = &req.document_id {
        ensure_document_available(&state, document_id, Some(id)).await?;
    }

    let patient = sqlx::query_as::<_, Patient>(
        r#"
        UPDATE patients SET
            full_name = COALESCE($2, full_name),
            birth_date = COALESCE($3, birth_date),
            document_id = COALESCE($4, document_id),
            rg = COALESCE($5, rg),
            gender = COALESCE($6, gender),
            marital_status = COALESCE($7, marital_status),
            phone = COALESCE($8, phone),
            whatsapp = COALESCE($9, whatsapp),
            email = COALESCE($10, email),
            profession = COALESCE($11, profession),
            address_json = COALESCE($12, address_json),
            emergency_contact = COALESCE($13, emergency_contact),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.full_name)
    .bind(req.birth_date)
    .bind(&req.document_id)
    .bind(&req.rg)
    .bind(&req.gender)
    .bind(&req.marital_status)
    .bind(&req.phone)
    .bind(&req.whatsapp)
    .bind(&req.email)
    .bind(&req.profession)
    .bind(to_json(&req.address_json)?)
    .bind(to_json(&req.emergency_contact)?)
    .fetch_optional(&state.db)
    .await
    .map_err(|e| duplicate_document(e.into()))?
    .ok_or_else(|| ApiError::not_found("Patient"))?;

    Ok(Json(patient))
}

/// Delete a patient together with appointments, prescriptions and records
#[utoipa::path(
    delete,
    path = "/api/patients/{id}",
    params(("id" = Uuid, Path, description = "Patient ID")),
    responses(
        (status = 204, description = "Patient deleted"),
        (status = 404, description = "Patient not found")
    ),
    tag = "patients",
    security(("bearer_auth" = []))
)]
pub async fn delete_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_roles(&user, Role::ALL)?;
    ensure_patient_exists(&state, id).await?;

    let mut tx = state.db.begin().await?;
    for statement in [
        "DELETE FROM appointments WHERE patient_id = $1",
        "DELETE FROM prescriptions WHERE patient_id = $1",
        "DELETE FROM medical_records WHERE patient_id = $1",
        "DELETE FROM patients WHERE id = $1",
    ] {
        sqlx::query(statement).bind(id).execute(&mut *tx).await?;
    }
    tx.commit().await?;

    tracing::info!(patient_id = %id, user_id = %user.id, "Patient deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create_body() -> serde_json::Value {
        json!({
            "fullName": "Maria Souza",
            "birthDate": "1985-04-10",
            "documentId": "12345678900",
            "rg": "45.123.456-7",
            "gender": "Feminino",
            "maritalStatus": "Casada",
            "email": "maria@example.com",
            "profession": "Professora",
            "addressJson": {
                "street": "Av. Paulista",
                "number": "1000",
                "city": "São Paulo",
                "state": "SP",
                "zipCode": "01310-100"
            }
        })
    }

    #[test]
    fn test_duplicate_document_is_bad_request() {
        let err = duplicate_document(ApiError::conflict("A record with these details already exists"));

        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Patient with this document already exists");
    }

    #[test]
    fn test_other_write_errors_pass_through() {
        let err = duplicate_document(ApiError::not_found("Patient"));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_create_request_valid() {
        let req: CreatePatientRequest = serde_json::from_value(create_body()).unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.birth_date, NaiveDate::from_ymd_opt(1985, 4, 10).unwrap());
    }

    #[test]
    fn test_create_request_rejects_long_state_and_bad_email() {
        let mut body = create_body();
        body["addressJson"]["state"] = json!("SPX");
        body["email"] = json!("maria");
        let req: CreatePatientRequest = serde_json::from_value(body).unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_request_requires_name() {
        let mut body = create_body();
        body["fullName"] = json!("");
        let req: CreatePatientRequest = serde_json::from_value(body).unwrap();

        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("full_name"));
    }

    #[test]
    fn test_update_request_empty_is_valid() {
        let req: UpdatePatientRequest = serde_json::from_value(json!({})).unwrap();
        assert!(req.validate().is_ok());
        assert!(to_json(&req.address_json).unwrap().is_none());
    }
}
