use axum::{extract::State, Extension};

use crate::api::ApiJson;
use crate::middleware::{ApiResponse, ApiResult, AuthUser};
use crate::services::auth_service::{Profile, RegisterPayload, Session};
use crate::services::AuthService;
use crate::state::AppState;

/// POST /auth/register - admin creates an account
pub async fn register_post(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    ApiJson(payload): ApiJson<RegisterPayload>,
) -> ApiResult<Session> {
    let session = AuthService::new(&state).register(&user, payload).await?;
    Ok(ApiResponse::created(session, "User registered successfully."))
}

/// GET /auth/me - the caller's account and wereda unit
pub async fn me_get(State(state): State<AppState>, Extension(user): Extension<AuthUser>) -> ApiResult<Profile> {
    let profile = AuthService::new(&state).me(&user).await?;
    Ok(ApiResponse::success(profile, "User profile retrieved."))
}
