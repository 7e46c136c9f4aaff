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
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub generic_name: String,
    pub concentration: String,
    pub form: String,
    pub manufacturer: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_form() -> String {
    "tablet".to_string()
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMedicationRequest {
    #[validate(length(min = 1, max = 180))]
    #[schema(example = "Losartana")]
    pub name: String,
    #[validate(length(min = 1, max = 180))]
    #[schema(example = "Losartana potássica")]
    pub generic_name: String,
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "50mg")]
    pub concentration: String,
    #[serde(default = "default_form")]
    #[validate(length(min = 1, max = 100))]
    pub form: String,
    #[validate(length(max = 180))]
    pub manufacturer: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMedicationRequest {
    #[validate(length(min = 1, max = 180))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 180))]
    pub generic_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub concentration: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub form: Option<String>,
    #[validate(length(max = 180))]
    pub manufacturer: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListMedicationsParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// Matches name or generic name
    pub search: Option<String>,
}

fn medication_not_found(id: Uuid) -> ApiError {
    ApiError::not_found_with(format!("Medication with ID {} not found", id))
}

/// Add a medication to the catalogue
#[utoipa::path(
    post,
    path = "/api/medications",
    request_body = CreateMedicationRequest,
    responses(
        (status = 201, description = "Medication created", body = Medication),
        (status = 403, description = "Forbidden")
    ),
    tag = "medications",
    security(("bearer_auth" = []))
)]
pub async fn create_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<CreateMedicationRequest>,
) -> ApiResult<(StatusCode, Json<Medication>)> {
    require_roles(&user, Role::CLINICAL)?;
    req.validate()?;

    let medication = sqlx::query_as::<_, Medication>(
        r#"
        INSERT INTO medications (name, generic_name, concentration, form, manufacturer)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&req.name)
    .bind(&req.generic_name)
    .bind(&req.concentration)
    .bind(&req.form)
    .bind(&req.manufacturer)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(medication)))
}

/// List medications ordered by name
#[utoipa::path(
    get,
    path = "/api/medications",
    params(ListMedicationsParams),
    responses((status = 200, description = "Page of medications", body = Paginated<Medication>)),
    tag = "medications",
    security(("bearer_auth" = []))
)]
pub async fn list_medications(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListMedicationsParams>,
) -> ApiResult<Json<Paginated<Medication>>> {
    require_roles(&user, Role::ALL)?;
    let page = PageQuery::new(params.page, params.limit);

    let mut query = ListQuery::new("FROM medications");
    query
        .search(&["name", "generic_name"], params.search.as_deref())
        .order_by("name ASC");

    let total = query.count(&state.db).await?;
    let items: Vec<Medication> = query
        .fetch_page(&state.db, "SELECT *", page.limit(), page.offset())
        .await?;

    Ok(Json(Paginated::new(items, total, page.limit(), page.page())))
}

#[utoipa::path(
    get,
    path = "/api/medications/{id}",
    params(("id" = Uuid, Path, description = "Medication ID")),
    responses(
        (status = 200, description = "Medication", body = Medication),
        (status = 404, description = "Medication not found")
    ),
    tag = "medications",
    security(("bearer_auth" = []))
)]
pub async fn get_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Medication>> {
    require_roles(&user, Role::ALL)?;

    sqlx::query_as::<_, Medication>("SELECT * FROM medications WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .map(Json)
        .ok_or_else(|| medication_not_found(id))
}

#[utoipa::path(
    put,
    path = "/api/medications/{id}",
    params(("id" = Uuid, Path, description = "Medication ID")),
    request_body = UpdateMedicationRequest,
    responses(
        (status = 200, description = "Medication updated", body = Medication),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Medication not found")
    ),
    tag = "medications",
    security(("bearer_auth" = []))
)]
pub async fn update_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateMedicationRequest>,
) -> ApiResult<Json<Medication>> {
    require_roles(&user, Role::CLINICAL)?;
    req.validate()?;

    sqlx::query_as::<_, Medication>(
        r#"
        UPDATE medications SET
            name = COALESCE($2, name),
            generic_name = COALESCE($3, generic_name),
            concentration = COALESCE($4, concentration),
            form = COALESCE($5, form),
            manufacturer = COALESCE($6, manufacturer),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.generic_name)
    .bind(&req.concentration)
    .bind(&req.form)
    .bind(&req.manufacturer)
    .fetch_optional(&state.db)
    .await?
    .map(Json)
    .ok_or_else(|| medication_not_found(id))
}

#[utoipa::path(
    delete,
    path = "/api/medications/{id}",
    params(("id" = Uuid, Path, description = "Medication ID")),
    responses(
        (status = 204, description = "Medication deleted"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Medication not found")
    ),
    tag = "medications",
    security(("bearer_auth" = []))
)]
pub async fn delete_medication(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_roles(&user, Role::ADMIN_ONLY)?;

    let deleted = sqlx::query("DELETE FROM medications WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;

    if deleted.rows_affected() == 0 {
        return Err(medication_not_found(id));
    }
    Ok(StatusCode::NO_CONTENT)
}
