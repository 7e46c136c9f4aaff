use crate::auth::{require_roles, Role};
use crate::error::ApiResult;
use crate::handlers::patient_prescriptions::{
    list_for_patient, timeline_for_patient, PatientPrescriptionsParams,
};
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::services::prescriptions::{PrescriptionResponse, PRESCRIPTION_FROM};
use crate::services::{NewItem, NewPrescription, PrescriptionChanges};
use crate::types::{PageQuery, Paginated};
use crate::utils::ListQuery;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use prescription_engine::{PrescriptionStatus, TimelineEntry};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItemRequest {
    pub medication_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "500mg")]
    pub dosage: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "8/8h")]
    pub frequency: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "7 dias")]
    pub duration: String,
    pub instructions: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<i32>,
}

impl From<PrescriptionItemRequest> for NewItem {
    fn from(item: PrescriptionItemRequest) -> Self {
        NewItem {
            medication_id: item.medication_id,
            medication_name: None,
            dosage: item.dosage,
            frequency: item.frequency,
            duration: item.duration,
            instructions: item.instructions,
            quantity: item.quantity,
            route: None,
            duration_days: None,
            is_chronic: false,
            is_prn: false,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreatePrescriptionRequest {
    pub patient_id: Uuid,
    #[validate(nested)]
    pub items: Vec<PrescriptionItemRequest>,
    pub notes: Option<String>,
    pub status: Option<PrescriptionStatus>,
}

/// Partial update; `items`, when present, replaces every item
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePrescriptionRequest {
    pub patient_id: Option<Uuid>,
    #[validate(nested)]
    pub items: Option<Vec<PrescriptionItemRequest>>,
    pub notes: Option<String>,
    pub status: Option<PrescriptionStatus>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListPrescriptionsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub patient_id: Option<Uuid>,
    pub status: Option<PrescriptionStatus>,
}

#[utoipa::path(
    post,
    path = "/api/prescriptions",
    request_body = CreatePrescriptionRequest,
    responses(
        (status = 201, description = "Prescription created", body = PrescriptionResponse),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Forbidden")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn create_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreatePrescriptionRequest>,
) -> ApiResult<(StatusCode, Json<PrescriptionResponse>)> {
    require_roles(&user, Role::CLINICAL)?;
    req.validate()?;

    let record = state
        .prescriptions
        .create(NewPrescription {
            patient_id: req.patient_id,
            prescriber_id: Some(user.id),
            status: req.status.unwrap_or_default(),
            notes: req.notes,
            valid_from: None,
            valid_until: None,
            items: req.items.into_iter().map(NewItem::from).collect(),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record.into_response()?)))
}

#[utoipa::path(
    get,
    path = "/api/prescriptions",
    params(ListPrescriptionsParams),
    responses((status = 200, description = "Page of prescriptions", body = Paginated<PrescriptionResponse>)),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListPrescriptionsParams>,
) -> ApiResult<Json<Paginated<PrescriptionResponse>>> {
    require_roles(&user, Role::ALL)?;
    let page = PageQuery::new(params.page, params.limit);

    let mut query = ListQuery::new(PRESCRIPTION_FROM);
    query
        .filter_eq("p.patient_id", params.patient_id)
        .filter_eq("p.status", params.status.map(|s| s.as_str()))
        .order_by("p.created_at DESC, p.id DESC");

    let (records, total) = state
        .prescriptions
        .list(&query, page.limit(), page.offset())
        .await?;
    let items = records
        .into_iter()
        .map(|record| record.into_response())
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Json(Paginated::new(items, total, page.limit(), page.page())))
}

#[utoipa::path(
    get,
    path = "/api/prescriptions/{id}",
    params(("id" = Uuid, Path, description = "Prescription ID")),
    responses(
        (status = 200, description = "Prescription", body = PrescriptionResponse),
        (status = 404, description = "Prescription not found")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn get_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PrescriptionResponse>> {
    require_roles(&user, Role::ALL)?;
    Ok(Json(state.prescriptions.get(id).await?.into_response()?))
}

#[utoipa::path(
    put,
    path = "/api/prescriptions/{id}",
    params(("id" = Uuid, Path, description = "Prescription ID")),
    request_body = UpdatePrescriptionRequest,
    responses(
        (status = 200, description = "Prescription updated", body = PrescriptionResponse),
        (status = 404, description = "Prescription not found")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn update_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePrescriptionRequest>,
) -> ApiResult<Json<PrescriptionResponse>> {
    require_roles(&user, Role::CLINICAL)?;
    req.validate()?;

    let record = state
        .prescriptions
        .update(
            id,
            PrescriptionChanges {
                patient_id: req.patient_id,
                status: req.status,
                notes: req.notes,
                items: req
                    .items
                    .map(|items| items.into_iter().map(NewItem::from).collect()),
            },
        )
        .await?;

    Ok(Json(record.into_response()?))
}

#[utoipa::path(
    delete,
    path = "/api/prescriptions/{id}",
    params(("id" = Uuid, Path, description = "Prescription ID")),
    responses(
        (status = 204, description = "Prescription deleted"),
        (status = 404, description = "Prescription not found")
    ),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn delete_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_roles(&user, Role::CLINICAL)?;
    state.prescriptions.delete(id).await?;
    tracing::info!(prescription_id = %id, user_id = %user.id, "Prescription deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Same listing as the patient-scoped endpoint
#[utoipa::path(
    get,
    path = "/api/prescriptions/patient/{patientId}",
    params(("patientId" = Uuid, Path, description = "Patient ID"), PatientPrescriptionsParams),
    responses((status = 200, description = "Page of prescriptions", body = Paginated<PrescriptionResponse>)),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn list_by_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Query(params): Query<PatientPrescriptionsParams>,
) -> ApiResult<Json<Paginated<PrescriptionResponse>>> {
    require_roles(&user, Role::ALL)?;
    Ok(Json(list_for_patient(&state, patient_id, params).await?))
}

#[utoipa::path(
    get,
    path = "/api/prescriptions/patient/{patientId}/timeline",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    responses((status = 200, description = "Timeline, newest first", body = Vec<TimelineEntry>)),
    tag = "prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn timeline_by_patient(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<Vec<TimelineEntry>>> {
    require_roles(&user, Role::ALL)?;
    Ok(Json(timeline_for_patient(&state, patient_id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_validation() {
        let req: CreatePrescriptionRequest = serde_json::from_value(json!({
            "patientId": Uuid::nil(),
            "items": [
                { "medicationId": Uuid::nil(), "dosage": "500mg", "frequency": "8/8h", "duration": "7 dias", "quantity": 0 }
            ]
        }))
        .unwrap();

        assert!(req.validate().is_err());
    }

    #[test]
    fn test_item_conversion() {
        let item = PrescriptionItemRequest {
            medication_id: Uuid::new_v4(),
            dosage: "500mg".to_string(),
            frequency: "8/8h".to_string(),
            duration: "7 dias".to_string(),
            instructions: Some("após refeições".to_string()),
            quantity: Some(21),
        };

        let new_item = NewItem::from(item.clone());
        assert_eq!(new_item.medication_id, item.medication_id);
        assert_eq!(new_item.quantity, Some(21));
        assert!(!new_item.is_chronic);
    }

    #[test]
    fn test_update_without_items_keeps_them() {
        let req: UpdatePrescriptionRequest =
            serde_json::from_value(json!({ "notes": "ajuste" })).unwrap();

        assert!(req.validate().is_ok());
        assert!(req.items.is_none());
        assert_eq!(req.notes.as_deref(), Some("ajuste"));
    }
}
