use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{ParishPayload, ParishView};
use crate::services::parish_service::ParishListQuery;
use crate::services::{Listing, ParishService};
use crate::state::AppState;

/// GET /parishes
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<ParishListQuery>,
) -> ApiResult<Listing<ParishView>> {
    let listing = ParishService::new(&state).list(&user, query).await?;
    Ok(ApiResponse::success(listing, "Parishes retrieved successfully."))
}

/// POST /parishes
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<ParishPayload>,
) -> ApiResult<ParishView> {
    let parish = ParishService::new(&state).create(&user, payload).await?;
    Ok(ApiResponse::created(parish, "Parish created successfully."))
}

/// GET /parishes/by-wereda/:weredaId
///
/// The id is taken as a string so a malformed one is reported by the service.
pub async fn by_wereda(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(wereda_id): ApiPath<String>,
) -> ApiResult<Vec<ParishView>> {
    let parishes = ParishService::new(&state).by_wereda(&user, &wereda_id).await?;
    Ok(ApiResponse::success(parishes, "Parishes retrieved successfully."))
}

/// GET /parishes/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<ParishView> {
    let parish = ParishService::new(&state).get(&user, id).await?;
    Ok(ApiResponse::success(parish, "Parish retrieved successfully."))
}

/// PUT|PATCH /parishes/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<ParishPayload>,
) -> ApiResult<ParishView> {
    let parish = ParishService::new(&state).update(&user, id, payload).await?;
    Ok(ApiResponse::success(parish, "Parish updated successfully."))
}
