// HTTP API Error Types
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::{json, Value};

use crate::middleware::response::InternalError;
use crate::services::ServiceError;
use crate::validation::FieldError;

/// HTTP API error with appropriate status codes and client-friendly messages
#[derive(Debug)]
pub enum ApiError {
    // 400 Bad Request
    ValidationError {
        message: String,
        field_errors: Option<Vec<FieldError>>,
    },
    InvalidReference(String),
    Duplicate(String),

    // 401 Unauthorized
    Unauthorized(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 500 Internal Server Error
    InternalServerError(String),
}

impl ApiError {
    /// Get HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError { .. } => StatusCode::BAD_REQUEST,
            ApiError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            ApiError::Duplicate(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get client-safe error message
    pub fn message(&self) -> &str {
        match self {
            ApiError::ValidationError { message, .. } => message,
            ApiError::InvalidReference(msg) => msg,
            ApiError::Duplicate(msg) => msg,
            ApiError::Unauthorized(msg) => msg,
            ApiError::Forbidden(msg) => msg,
            ApiError::NotFound(msg) => msg,
            ApiError::InternalServerError(msg) => msg,
        }
    }

    /// Get error code for client handling
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::ValidationError { .. } => "VALIDATION_ERROR",
            ApiError::InvalidReference(_) => "INVALID_REFERENCE",
            ApiError::Duplicate(_) => "DUPLICATE",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::InternalServerError(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Convert to JSON response body
    pub fn to_json(&self) -> Value {
        let mut response = json!({
            "success": false,
            "data": null,
            "message": self.message(),
            "code": self.error_code()
        });

        if let ApiError::ValidationError {
            field_errors: Some(field_errors),
            ..
        } = self
        {
            if !field_errors.is_empty() {
                response["fieldErrors"] = json!(field_errors);
            }
        }

        response
    }
}

impl ApiError {
    pub fn validation_error(message: impl Into<String>, field_errors: Option<Vec<FieldError>>) -> Self {
        ApiError::ValidationError {
            message: message.into(),
            field_errors,
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        ApiError::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound(message.into())
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        ApiError::InternalServerError(message.into())
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation { message, fields } => ApiError::validation_error(message, Some(fields)),
            ServiceError::Reference(msg) => ApiError::InvalidReference(msg),
            ServiceError::Duplicate(msg) => ApiError::Duplicate(msg),
            ServiceError::Unauthorized(msg) => ApiError::unauthorized(msg),
            ServiceError::Forbidden(msg) => ApiError::forbidden(msg),
            ServiceError::NotFound(msg) => ApiError::not_found(msg),
            ServiceError::Store(store_err) => {
                tracing::error!("Store error: {}", store_err);
                ApiError::internal_server_error(store_err.to_string())
            }
            ServiceError::Auth(auth_err) => {
                tracing::error!("Auth error: {}", auth_err);
                ApiError::internal_server_error(auth_err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::validation_error(format!("Invalid request body: {}", rejection.body_text()), None)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::validation_error(format!("Invalid query string: {}", rejection.body_text()), None)
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Path rejected: {}", rejection.body_text());
        ApiError::validation_error("Invalid ID format.", None)
    }
}

// Standard error trait implementations
impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for ApiError {}

// Automatic HTTP response conversion for Axum
impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut response = (self.status_code(), Json(self.to_json())).into_response();
        if matches!(self, ApiError::InternalServerError(_)) {
            response.extensions_mut().insert(InternalError);
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_errors_map_to_status_and_code() {
        let cases = [
            (ServiceError::validation("bad"), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            (ServiceError::Reference("Invalid parish ID.".into()), StatusCode::BAD_REQUEST, "INVALID_REFERENCE"),
            (ServiceError::Duplicate("dup".into()), StatusCode::BAD_REQUEST, "DUPLICATE"),
            (ServiceError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            (ServiceError::forbidden("no"), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (ServiceError::not_found("gone"), StatusCode::NOT_FOUND, "NOT_FOUND"),
        ];
        for (err, status, code) in cases {
            let api: ApiError = err.into();
            assert_eq!(api.status_code(), status);
            assert_eq!(api.error_code(), code);
        }
    }

    #[test]
    fn envelope_carries_field_errors() {
        let err = ApiError::validation_error(
            "First name is required",
            Some(vec![FieldError {
                field: "firstName".into(),
                message: "First name is required".into(),
            }]),
        );
        let body = err.to_json();
        assert_eq!(body["success"], false);
        assert!(body["data"].is_null());
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(body["fieldErrors"][0]["field"], "firstName");
    }
}
