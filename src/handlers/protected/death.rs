use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{DeathPayload, DeathView};
use crate::services::death_service::DeathListQuery;
use crate::services::{DeathService, Listing};
use crate::state::AppState;

/// GET /deaths
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<DeathListQuery>,
) -> ApiResult<Listing<DeathView>> {
    let listing = DeathService::new(&state).list(&user, query).await?;
    Ok(ApiResponse::success(listing, "Death records retrieved successfully."))
}

/// POST /deaths - also marks the member deceased
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<DeathPayload>,
) -> ApiResult<DeathView> {
    let record = DeathService::new(&state).create(&user, payload).await?;
    Ok(ApiResponse::created(record, "Death record created successfully."))
}

/// GET /deaths/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<DeathView> {
    let record = DeathService::new(&state).get(&user, id).await?;
    Ok(ApiResponse::success(record, "Death record retrieved successfully."))
}

/// PUT|PATCH /deaths/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<DeathPayload>,
) -> ApiResult<DeathView> {
    let record = DeathService::new(&state).update(&user, id, payload).await?;
    Ok(ApiResponse::success(record, "Death record updated successfully."))
}

/// DELETE /deaths/:id - reverts the member to Active
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    DeathService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::success((), "Death record deleted successfully."))
}
