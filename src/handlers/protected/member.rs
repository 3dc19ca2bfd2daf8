use axum::{extract::State, Extension};
use uuid::Uuid;

use crate::api::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::models::{MemberPayload, MemberView};
use crate::services::member_service::{MemberListQuery, MemberStatistics};
use crate::services::{Listing, MemberService};
use crate::state::AppState;

/// GET /members
pub async fn list(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiQuery(query): ApiQuery<MemberListQuery>,
) -> ApiResult<Listing<MemberView>> {
    let listing = MemberService::new(&state).list(&user, query).await?;
    Ok(ApiResponse::success(listing, "Members retrieved successfully."))
}

/// POST /members
pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<MemberPayload>,
) -> ApiResult<MemberView> {
    let member = MemberService::new(&state).create(&user, payload).await?;
    Ok(ApiResponse::created(member, "Member created successfully."))
}

/// GET /members/statistics
pub async fn statistics(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<MemberStatistics> {
    let stats = MemberService::new(&state).statistics(&user).await?;
    Ok(ApiResponse::success(stats, "Member statistics retrieved successfully."))
}

/// GET /members/:id
pub async fn show(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<MemberView> {
    let member = MemberService::new(&state).get(&user, id).await?;
    Ok(ApiResponse::success(member, "Member retrieved successfully."))
}

/// PUT|PATCH /members/:id
pub async fn update(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(payload): ApiJson<MemberPayload>,
) -> ApiResult<MemberView> {
    let member = MemberService::new(&state).update(&user, id, payload).await?;
    Ok(ApiResponse::success(member, "Member updated successfully."))
}

/// DELETE /members/:id
pub async fn delete(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiPath(id): ApiPath<Uuid>,
) -> ApiResult<()> {
    MemberService::new(&state).delete(&user, id).await?;
    Ok(ApiResponse::success((), "Member deleted successfully."))
}
