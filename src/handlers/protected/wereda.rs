use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{WeredaUnit, WeredaUnitPayload};
use crate::services::wereda_service::WeredaListQuery;
use crate::services::{Listing, WeredaService};
use crate::state::AppState;

/// GET /wereda-units
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<WeredaListQuery>,
) -> ApiResult<Listing<WeredaUnit>> {
    let listing = WeredaService::new(&state).list(&user, query).await?;
    Ok(ApiResponse::success(listing, "Wereda units retrieved successfully."))
}

/// POST /wereda-units
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<WeredaUnitPayload>,
) -> ApiResult<WeredaUnit> {
    let unit = WeredaService::new(&state).create(&user, payload).await?;
    Ok(ApiResponse::created(unit, "Wereda unit created successfully."))
}

/// GET /wereda-units/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<WeredaUnit> {
    let unit = WeredaService::new(&state).get(&user, id).await?;
    Ok(ApiResponse::success(unit, "Wereda unit retrieved successfully."))
}

/// PUT|PATCH /wereda-units/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<WeredaUnitPayload>,
) -> ApiResult<WeredaUnit> {
    let unit = WeredaService::new(&state).update(&user, id, payload).await?;
    Ok(ApiResponse::success(unit, "Wereda unit updated successfully."))
}
