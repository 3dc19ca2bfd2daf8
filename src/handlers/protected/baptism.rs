use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{BaptismPayload, BaptismView};
use crate::services::baptism_service::BaptismListQuery;
use crate::services::{BaptismService, Listing};
use crate::state::AppState;

/// GET /baptisms
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<BaptismListQuery>,
) -> ApiResult<Listing<BaptismView>> {
    let listing = BaptismService::new(&state).list(&user, query).await?;
    Ok(ApiResponse::success(listing, "Baptism records retrieved successfully."))
}

/// POST /baptisms
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<BaptismPayload>,
) -> ApiResult<BaptismView> {
    let record = BaptismService::new(&state).create(&user, payload).await?;
    Ok(ApiResponse::created(record, "Baptism record created successfully."))
}

/// GET /baptisms/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<BaptismView> {
    let record = BaptismService::new(&state).get(&user, id).await?;
    Ok(ApiResponse::success(record, "Baptism record retrieved successfully."))
}

/// PUT|PATCH /baptisms/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<BaptismPayload>,
) -> ApiResult<BaptismView> {
    let record = BaptismService::new(&state).update(&user, id, payload).await?;
    Ok(ApiResponse::success(record, "Baptism record updated successfully."))
}
