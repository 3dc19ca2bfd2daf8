use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{DivorcePayload, MarriagePayload, MarriageView};
use crate::services::marriage_service::MarriageListQuery;
use crate::services::{Listing, MarriageService};
use crate::state::AppState;

/// GET /marriages
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<MarriageListQuery>,
) -> ApiResult<Listing<MarriageView>> {
    let listing = MarriageService::new(&state).list(&user, query).await?;
    Ok(ApiResponse::success(listing, "Marriage records retrieved successfully."))
}

/// POST /marriages
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<MarriagePayload>,
) -> ApiResult<MarriageView> {
    let record = MarriageService::new(&state).create(&user, payload).await?;
    Ok(ApiResponse::created(record, "Marriage record created successfully."))
}

/// GET /marriages/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<MarriageView> {
    let record = MarriageService::new(&state).get(&user, id).await?;
    Ok(ApiResponse::success(record, "Marriage record retrieved successfully."))
}

/// PUT|PATCH /marriages/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<MarriagePayload>,
) -> ApiResult<MarriageView> {
    let record = MarriageService::new(&state).update(&user, id, payload).await?;
    Ok(ApiResponse::success(record, "Marriage record updated successfully."))
}

/// PUT /marriages/:id/divorce
pub async fn divorce(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<DivorcePayload>,
) -> ApiResult<MarriageView> {
    let record = MarriageService::new(&state).divorce(&user, id, payload).await?;
    Ok(ApiResponse::success(record, "Divorce recorded successfully."))
}
