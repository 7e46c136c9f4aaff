use crate::auth::{require_roles, Role};
use crate::error::{ApiError, ApiResult};
use crate::handlers::patients::{patients_by_id, Patient};
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::services::google::{appointment_event_body, AppointmentEvent};
use crate::types::{PageQuery, Paginated};
use crate::utils::ListQuery;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, FromRow)]
struct AppointmentRow {
    id: Uuid,
    patient_id: Uuid,
    doctor_id: Uuid,
    date_time: DateTime<Utc>,
    status: String,
    notes: Option<String>,
    google_event_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub date_time: DateTime<Utc>,
    #[schema(example = "scheduled")]
    pub status: String,
    pub notes: Option<String>,
    pub google_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentRow {
    fn with_patient(self, patient: Option<Patient>) -> Appointment {
        Appointment {
            id: self.id,
            patient_id: self.patient_id,
            doctor_id: self.doctor_id,
            date_time: self.date_time,
            status: self.status,
            notes: self.notes,
            google_event_id: self.google_event_id,
            patient,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: Uuid,
    pub date_time: DateTime<Utc>,
    #[serde(default)]
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAppointmentRequest {
    pub patient_id: Option<Uuid>,
    pub date_time: Option<DateTime<Utc>>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListAppointmentsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub patient_id: Option<Uuid>,
    pub status: Option<AppointmentStatus>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

fn appointment_not_found(id: Uuid) -> ApiError {
    ApiError::not_found_with(format!("Appointment with ID {} not found", id))
}

async fn attach_patients(state: &AppState, rows: Vec<AppointmentRow>) -> ApiResult<Vec<Appointment>> {
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

async fn load_appointment(state: &AppState, id: Uuid) -> ApiResult<Appointment> {
    let row = sqlx::query_as::<_, AppointmentRow>("SELECT * FROM appointments WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| appointment_not_found(id))?;

    attach_patients(state, vec![row])
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| appointment_not_found(id))
}

/// Mirror the appointment on its doctor's Google Calendar and remember a
/// newly created event id. Never fails the request.
async fn sync_with_google(state: &AppState, appointment: &mut Appointment) {
    let Some(google) = &state.google else {
        return;
    };

    let doctor_name = match state.users.find_by_id(appointment.doctor_id).await {
        Ok(Some(doctor)) => doctor.name,
        Ok(None) => {
            tracing::info!(appointment_id = %appointment.id, "Appointment without a doctor, skipping calendar sync");
            return;
        }
        Err(e) => {
            tracing::warn!(appointment_id = %appointment.id, error = %e, "Could not load appointment doctor");
            return;
        }
    };

    let body = appointment_event_body(&AppointmentEvent {
        patient_name: appointment.patient.as_ref().map(|p| p.full_name.clone()),
        patient_phone: appointment.patient.as_ref().and_then(|p| p.phone.clone()),
        patient_email: appointment.patient.as_ref().and_then(|p| p.email.clone()),
        doctor_name,
        notes: appointment.notes.clone(),
        date_time: appointment.date_time,
    });

    let Some(event_id) = google
        .sync
        .sync_appointment(
            appointment.doctor_id,
            appointment.google_event_id.as_deref(),
            &body,
        )
        .await
    else {
        return;
    };

    let stored = sqlx::query("UPDATE appointments SET google_event_id = $2 WHERE id = $1")
        .bind(appointment.id)
        .bind(&event_id)
        .execute(&state.db)
        .await;

    match stored {
        Ok(_) => appointment.google_event_id = Some(event_id),
        Err(e) => tracing::warn!(appointment_id = %appointment.id, error = %e, "Could not store Google event id"),
    }
}

/// Schedule an appointment for the current doctor
#[utoipa::path(
    post,
    path = "/api/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 201, description = "Appointment created", body = Appointment),
        (status = 400, description = "Invalid request")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn create_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateAppointmentRequest>,
) -> ApiResult<(StatusCode, Json<Appointment>)> {
    require_roles(&user, Role::ALL)?;

    let id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO appointments (patient_id, doctor_id, date_time, status, notes)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        "#,
    )
    .bind(req.patient_id)
    .bind(user.id)
    .bind(req.date_time)
    .bind(req.status.as_str())
    .bind(&req.notes)
    .fetch_one(&state.db)
    .await?;

    let mut appointment = load_appointment(&state, id).await?;
    sync_with_google(&state, &mut appointment).await;

    tracing::info!(appointment_id = %id, doctor_id = %user.id, "Appointment created");
    Ok((StatusCode::CREATED, Json(appointment)))
}

/// List appointments ordered by date
#[utoipa::path(
    get,
    path = "/api/appointments",
    params(ListAppointmentsParams),
    responses((status = 200, description = "Page of appointments", body = Paginated<Appointment>)),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn list_appointments(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListAppointmentsParams>,
) -> ApiResult<Json<Paginated<Appointment>>> {
    require_roles(&user, Role::ALL)?;
    let page = PageQuery::new(params.page, params.limit);

    let mut query = ListQuery::new("FROM appointments");
    query
        .filter_eq("patient_id", params.patient_id)
        .filter_eq("status", params.status.map(|s| s.as_str()))
        .filter_gte("date_time", params.date_from)
        .filter_lte("date_time", params.date_to)
        .order_by("date_time ASC");

    let total = query.count(&state.db).await?;
    let rows: Vec<AppointmentRow> = query
        .fetch_page(&state.db, "SELECT *", page.limit(), page.offset())
        .await?;
    let items = attach_patients(&state, rows).await?;

    Ok(Json(Paginated::new(items, total, page.limit(), page.page())))
}

#[utoipa::path(
    get,
    path = "/api/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 200, description = "Appointment", body = Appointment),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn get_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Appointment>> {
    require_roles(&user, Role::ALL)?;
    Ok(Json(load_appointment(&state, id).await?))
}

/// Update an appointment and re-sync its calendar event
#[utoipa::path(
    put,
    path = "/api/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    request_body = UpdateAppointmentRequest,
    responses(
        (status = 200, description = "Appointment updated", body = Appointment),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn update_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateAppointmentRequest>,
) -> ApiResult<Json<Appointment>> {
    require_roles(&user, Role::ALL)?;

    let updated = sqlx::query(
        r#"
        UPDATE appointments SET
            patient_id = COALESCE($2, patient_id),
            date_time = COALESCE($3, date_time),
            status = COALESCE($4, status),
            notes = COALESCE($5, notes),
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(id)
    .bind(req.patient_id)
    .bind(req.date_time)
    .bind(req.status.map(|s| s.as_str()))
    .bind(&req.notes)
    .execute(&state.db)
    .await?;

    if updated.rows_affected() == 0 {
        return Err(appointment_not_found(id));
    }

    let mut appointment = load_appointment(&state, id).await?;
    sync_with_google(&state, &mut appointment).await;
    Ok(Json(appointment))
}

#[utoipa::path(
    delete,
    path = "/api/appointments/{id}",
    params(("id" = Uuid, Path, description = "Appointment ID")),
    responses(
        (status = 204, description = "Appointment deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Appointment not found")
    ),
    tag = "appointments",
    security(("bearer_auth" = []))
)]
pub async fn delete_appointment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_roles(&user, Role::CLINICAL)?;

    let deleted = sqlx::query("DELETE FROM appointments WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(appointment_not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_defaults_to_scheduled() {
        let req: CreateAppointmentRequest = serde_json::from_value(json!({
            "patientId": Uuid::nil(),
            "dateTime": "2024-05-10T14:00:00Z"
        }))
        .unwrap();

        assert_eq!(req.status, AppointmentStatus::Scheduled);
        assert_eq!(req.status.as_str(), "scheduled");
    }

    #[test]
    fn test_unknown_status_rejected() {
        let parsed = serde_json::from_value::<CreateAppointmentRequest>(json!({
            "patientId": Uuid::nil(),
            "dateTime": "2024-05-10T14:00:00Z",
            "status": "postponed"
        }));

        assert!(parsed.is_err());
    }

    #[test]
    fn test_response_without_patient() {
        let row = AppointmentRow {
            id: Uuid::new_v4(),
            patient_id: Uuid::new_v4(),
            doctor_id: Uuid::new_v4(),
            date_time: Utc::now(),
            status: "confirmed".to_string(),
            notes: None,
            google_event_id: Some("evt-1".to_string()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(row.with_patient(None)).unwrap();
        assert_eq!(json["googleEventId"], "evt-1");
        assert_eq!(json["status"], "confirmed");
        assert!(json.get("patient").is_none());
    }
}
