//! Patient-scoped prescription workflow: drafts, finalize, timeline,
//! generate-next, diff and reuse.

use crate::auth::{require_roles, Role};
use crate::error::{ApiError, ApiResult};
use crate::handlers::patients::ensure_patient_exists;
use crate::middleware::CurrentUser;
use crate::server::AppState;
use crate::services::prescriptions::{PrescriptionResponse, PRESCRIPTION_FROM};
use crate::services::NewDraft;
use crate::types::{PageQuery, Paginated};
use crate::utils::ListQuery;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use prescription_engine::{
    build_timeline, diff, select_for_reuse, suggest_next, DraftItemInput,
    GenerateNextOptions, PrescriptionDiff, PrescriptionStatus, TimelineEntry,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

const PATIENT_PAGE_LIMIT: u32 = 20;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PatientPrescriptionsParams {
    pub page: Option<u32>,
    /// Defaults to 20
    pub limit: Option<u32>,
    /// Medication name or generic name
    pub q: Option<String>,
    pub status: Option<PrescriptionStatus>,
    /// Created at or after (date or RFC3339)
    pub from: Option<String>,
    /// Created at or before (date or RFC3339)
    pub to: Option<String>,
}

/// Draft body; `patientId` comes from the path
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateDraftRequest {
    pub prescriber_id: Option<Uuid>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub items: Vec<DraftItemInput>,
    /// `draft` (default) or `active`
    pub status: Option<PrescriptionStatus>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedDraftResponse {
    pub draft_id: Uuid,
    pub warnings: Vec<String>,
    pub draft: PrescriptionResponse,
    pub clinical_warnings: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TimelineResponse {
    pub items: Vec<TimelineEntry>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReuseItemsRequest {
    pub item_ids: Vec<Uuid>,
}

/// Lower or upper bound for `created_at`; plain dates cover the whole day.
fn parse_bound(value: Option<&str>, end_of_day: bool) -> ApiResult<Option<DateTime<Utc>>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };

    if let Ok(at) = DateTime::parse_from_rfc3339(value) {
        return Ok(Some(at.with_timezone(&Utc)));
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::validation(format!("Invalid date: {}", value)))?;
    let time = if end_of_day {
        NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    }
    .unwrap_or_default();

    Ok(Some(date.and_time(time).and_utc()))
}

fn draft_status(status: Option<PrescriptionStatus>) -> ApiResult<PrescriptionStatus> {
    match status.unwrap_or_default() {
        status @ (PrescriptionStatus::Draft | PrescriptionStatus::Active) => Ok(status),
        other => Err(ApiError::validation(format!(
            "A new draft cannot have status {}",
            other
        ))),
    }
}

pub(crate) async fn list_for_patient(
    state: &AppState,
    patient_id: Uuid,
    params: PatientPrescriptionsParams,
) -> ApiResult<Paginated<PrescriptionResponse>> {
    let page = PageQuery::new(params.page, params.limit);
    let limit = page.limit_or(PATIENT_PAGE_LIMIT);

    let mut query = ListQuery::new(PRESCRIPTION_FROM);
    query
        .filter_eq("p.patient_id", Some(patient_id))
        .filter_eq("p.status", params.status.map(|s| s.as_str()))
        .filter_gte("p.created_at", parse_bound(params.from.as_deref(), false)?)
        .filter_lte("p.created_at", parse_bound(params.to.as_deref(), true)?)
        .search_within(
            " AND EXISTS (SELECT 1 FROM prescription_items pi \
             JOIN medications m ON m.id = pi.medication_id \
             WHERE pi.prescription_id = p.id AND (",
            &["m.name", "m.generic_name"],
            params.q.as_deref(),
            "))",
        )
        .order_by("p.created_at DESC, p.id DESC");

    let (records, total) = state
        .prescriptions
        .list(&query, limit, page.offset_for(limit))
        .await?;
    let items = records
        .into_iter()
        .map(|record| record.into_response())
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(Paginated::new(items, total, limit, page.page()))
}

pub(crate) async fn timeline_for_patient(
    state: &AppState,
    patient_id: Uuid,
) -> ApiResult<Vec<TimelineEntry>> {
    let snapshots = state
        .prescriptions
        .history(patient_id)
        .await?
        .iter()
        .map(|record| record.snapshot())
        .collect::<ApiResult<Vec<_>>>()?;

    Ok(build_timeline(snapshots))
}

/// Prescriptions of a patient, newest first
#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/prescriptions",
    params(("patientId" = Uuid, Path, description = "Patient ID"), PatientPrescriptionsParams),
    responses(
        (status = 200, description = "Page of prescriptions", body = Paginated<PrescriptionResponse>),
        (status = 404, description = "Patient not found")
    ),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn list_patient_prescriptions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Query(params): Query<PatientPrescriptionsParams>,
) -> ApiResult<Json<Paginated<PrescriptionResponse>>> {
    require_roles(&user, Role::ALL)?;
    ensure_patient_exists(&state, patient_id).await?;
    Ok(Json(list_for_patient(&state, patient_id, params).await?))
}

/// Versioned prescription history
#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/prescriptions/timeline",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    responses((status = 200, description = "Timeline, newest first", body = TimelineResponse)),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn patient_timeline(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
) -> ApiResult<Json<TimelineResponse>> {
    require_roles(&user, Role::ALL)?;
    let items = timeline_for_patient(&state, patient_id).await?;
    Ok(Json(TimelineResponse { items }))
}

/// Create a draft prescription
#[utoipa::path(
    post,
    path = "/api/patients/{patientId}/prescriptions/draft",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    request_body = CreateDraftRequest,
    responses(
        (status = 201, description = "Draft created", body = PrescriptionResponse),
        (status = 404, description = "Patient not found")
    ),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn create_draft(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    Json(req): Json<CreateDraftRequest>,
) -> ApiResult<(StatusCode, Json<PrescriptionResponse>)> {
    require_roles(&user, Role::CLINICAL)?;
    ensure_patient_exists(&state, patient_id).await?;

    let record = state
        .prescriptions
        .create_draft(NewDraft {
            patient_id,
            prescriber_id: req.prescriber_id.or(Some(user.id)),
            status: draft_status(req.status)?,
            notes: req.notes,
            valid_from: req.valid_from,
            valid_until: req.valid_until,
            items: req.items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record.into_response()?)))
}

/// Propose and store the next prescription from the latest one
#[utoipa::path(
    post,
    path = "/api/patients/{patientId}/prescriptions/generate-next",
    params(("patientId" = Uuid, Path, description = "Patient ID")),
    request_body = GenerateNextOptions,
    responses(
        (status = 201, description = "Draft generated", body = GeneratedDraftResponse),
        (status = 404, description = "Patient not found")
    ),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn generate_next(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(patient_id): Path<Uuid>,
    options: Option<Json<GenerateNextOptions>>,
) -> ApiResult<(StatusCode, Json<GeneratedDraftResponse>)> {
    require_roles(&user, Role::CLINICAL)?;
    ensure_patient_exists(&state, patient_id).await?;
    let options = options.map(|Json(o)| o).unwrap_or_default();

    let history = state.prescriptions.history(patient_id).await?;
    let latest = history.first().map(|record| record.snapshot()).transpose()?;
    let suggestion = suggest_next(latest.as_ref(), &options);

    let record = state
        .prescriptions
        .create_draft(NewDraft {
            patient_id,
            prescriber_id: Some(user.id),
            status: PrescriptionStatus::Draft,
            notes: suggestion.notes.clone(),
            valid_from: None,
            valid_until: None,
            items: suggestion.draft_inputs(&options),
        })
        .await?;

    let medication_names: Vec<String> = record
        .items
        .iter()
        .filter_map(|item| item.medication_name.clone())
        .collect();
    let clinical_warnings = state
        .interactions
        .check(&medication_names)
        .await
        .iter()
        .map(|warning| warning.summary())
        .collect();

    let draft = record.into_response()?;
    tracing::info!(
        patient_id = %patient_id,
        draft_id = %draft.id,
        items = draft.items.len(),
        "Next prescription generated"
    );

    Ok((
        StatusCode::CREATED,
        Json(GeneratedDraftResponse {
            draft_id: draft.id,
            warnings: suggestion.warnings,
            draft,
            clinical_warnings,
        }),
    ))
}

/// Finalize a draft into an active prescription
#[utoipa::path(
    post,
    path = "/api/patients/{patientId}/prescriptions/{id}/finalize",
    params(
        ("patientId" = Uuid, Path, description = "Patient ID"),
        ("id" = Uuid, Path, description = "Prescription ID")
    ),
    responses(
        (status = 200, description = "Prescription finalized", body = PrescriptionResponse),
        (status = 400, description = "Duplicated items"),
        (status = 404, description = "Prescription not found for this patient")
    ),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn finalize_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((patient_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PrescriptionResponse>> {
    require_roles(&user, Role::CLINICAL)?;

    let record = state
        .prescriptions
        .finalize_draft(id, patient_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Prescription"))?;

    tracing::info!(prescription_id = %id, user_id = %user.id, "Prescription finalized");
    Ok(Json(record.into_response()?))
}

/// Items added, removed and changed from `id` to `otherId`
#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/prescriptions/{id}/diff/{otherId}",
    params(
        ("patientId" = Uuid, Path, description = "Patient ID"),
        ("id" = Uuid, Path, description = "Base prescription"),
        ("otherId" = Uuid, Path, description = "Compared prescription")
    ),
    responses(
        (status = 200, description = "Item differences", body = PrescriptionDiff),
        (status = 404, description = "Prescription not found")
    ),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn diff_prescriptions(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((patient_id, id, other_id)): Path<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<PrescriptionDiff>> {
    require_roles(&user, Role::ALL)?;

    let (before, after) = tokio::try_join!(
        state.prescriptions.find(id),
        state.prescriptions.find(other_id)
    )?;
    let (Some(before), Some(after)) = (
        before.filter(|record| record.belongs_to(patient_id)),
        after.filter(|record| record.belongs_to(patient_id)),
    ) else {
        return Err(ApiError::not_found_with("Prescrição não encontrada para diff"));
    };

    Ok(Json(diff(&before.item_snapshots(), &after.item_snapshots())))
}

/// Start a new draft from selected items of an earlier prescription
#[utoipa::path(
    post,
    path = "/api/patients/{patientId}/prescriptions/{id}/reuse",
    params(
        ("patientId" = Uuid, Path, description = "Patient ID"),
        ("id" = Uuid, Path, description = "Prescription to copy from")
    ),
    request_body = ReuseItemsRequest,
    responses(
        (status = 201, description = "Draft created", body = PrescriptionResponse),
        (status = 400, description = "No item selected"),
        (status = 404, description = "Base prescription not found")
    ),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn reuse_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((patient_id, id)): Path<(Uuid, Uuid)>,
    Json(req): Json<ReuseItemsRequest>,
) -> ApiResult<(StatusCode, Json<PrescriptionResponse>)> {
    require_roles(&user, Role::CLINICAL)?;

    let base = state
        .prescriptions
        .find(id)
        .await?
        .filter(|record| record.belongs_to(patient_id))
        .ok_or_else(|| ApiError::not_found_with("Prescrição base não encontrada"))?;
    let items = select_for_reuse(&base.item_snapshots(), &req.item_ids)?;

    let record = state
        .prescriptions
        .create_draft(NewDraft {
            patient_id,
            prescriber_id: Some(user.id),
            status: PrescriptionStatus::Draft,
            notes: None,
            valid_from: None,
            valid_until: None,
            items,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(record.into_response()?)))
}

#[utoipa::path(
    get,
    path = "/api/patients/{patientId}/prescriptions/{id}",
    params(
        ("patientId" = Uuid, Path, description = "Patient ID"),
        ("id" = Uuid, Path, description = "Prescription ID")
    ),
    responses(
        (status = 200, description = "Prescription", body = PrescriptionResponse),
        (status = 404, description = "Prescription not found")
    ),
    tag = "patient-prescriptions",
    security(("bearer_auth" = []))
)]
pub async fn get_patient_prescription(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((patient_id, id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Json<PrescriptionResponse>> {
    require_roles(&user, Role::ALL)?;

    let record = state
        .prescriptions
        .find(id)
        .await?
        .filter(|record| record.belongs_to(patient_id))
        .ok_or_else(|| ApiError::not_found("Prescription"))?;

    Ok(Json(record.into_response()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_bound_dates() {
        assert_eq!(parse_bound(None, false).unwrap(), None);
        assert_eq!(parse_bound(Some("  "), true).unwrap(), None);

        assert_eq!(
            parse_bound(Some("2024-03-01"), false).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
        );

        let end = parse_bound(Some("2024-03-01"), true).unwrap().unwrap();
        assert_eq!(end.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert!(end > Utc.with_ymd_and_hms(2024, 3, 1, 23, 59, 59).unwrap());
    }

    #[test]
    fn test_parse_bound_rfc3339_and_invalid() {
        assert_eq!(
            parse_bound(Some("2024-03-01T10:00:00-03:00"), false).unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 13, 0, 0).unwrap())
        );
        assert!(parse_bound(Some("ontem"), false).is_err());
    }

    #[test]
    fn test_draft_status() {
        assert_eq!(draft_status(None).unwrap(), PrescriptionStatus::Draft);
        assert_eq!(
            draft_status(Some(PrescriptionStatus::Active)).unwrap(),
            PrescriptionStatus::Active
        );
        assert!(draft_status(Some(PrescriptionStatus::Cancelled)).is_err());
    }

    #[test]
    fn test_create_draft_request_shape() {
        let req: CreateDraftRequest = serde_json::from_value(serde_json::json!({
            "notes": "retorno em 30 dias",
            "items": [
                { "medicationName": "Losartana", "dosage": "50mg", "frequency": "1x/dia", "durationDays": 30, "isChronic": true }
            ]
        }))
        .unwrap();

        assert_eq!(req.items.len(), 1);
        assert!(req.items[0].is_chronic);
        assert!(!req.items[0].is_prn);
        assert_eq!(req.status, None);
    }
}
