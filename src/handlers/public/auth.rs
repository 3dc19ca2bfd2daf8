use axum::extract::State;

use crate::api::ApiJson;
use crate::middleware::{ApiResponse, ApiResult};
use crate::services::auth_service::{LoginPayload, Session};
use crate::services::AuthService;
use crate::state::AppState;

/// POST /auth/login - exchange credentials for a session token
pub async fn login_post(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> ApiResult<Session> {
    let session = AuthService::new(&state).login(payload).await?;
    Ok(ApiResponse::success(session, "Login successful."))
}
