// Public handlers: service info, health and login.
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};
use crate::state::AppState;

pub mod auth;

pub use auth::login_post;

/// GET / - service name, version and API prefix
pub async fn root(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    Ok(ApiResponse::success(
        json!({
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "apiPrefix": state.config.server.api_prefix,
            "environment": state.config.environment,
        }),
        "Church registry API",
    ))
}

/// GET /health - 200 when the store answers, 503 otherwise
pub async fn health(State(state): State<AppState>) -> Response {
    let now = chrono::Utc::now();
    match state.store.health_check().await {
        Ok(()) => ApiResponse::success(
            json!({ "status": "ok", "timestamp": now, "store": state.store.backend() }),
            "Service is healthy",
        )
        .into_response(),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "success": false,
                    "data": { "status": "degraded", "timestamp": now, "store": state.store.backend() },
                    "message": "Store unavailable",
                    "code": "SERVICE_UNAVAILABLE"
                })),
            )
                .into_response()
        }
    }
}

/// Fallback for unknown routes
pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::not_found("Route not found").to_json()),
    )
}
