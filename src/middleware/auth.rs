use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::warn;
use uuid::Uuid;

use crate::access::Scope;
use crate::error::ApiError;
use crate::models::Role;
use crate::state::AppState;

/// Authenticated caller, resolved from the session token and the stored account.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
    pub wereda: Option<Uuid>,
}

impl AuthUser {
    pub fn scope(&self) -> Scope {
        match (self.role, self.wereda) {
            (Role::Admin, _) => Scope::All,
            (Role::WeredaAdmin, Some(wereda)) => Scope::Wereda(wereda),
            // Unreachable through the middleware; the nil unit owns nothing.
            (Role::WeredaAdmin, None) => Scope::Wereda(Uuid::nil()),
        }
    }
}

/// JWT authentication middleware that validates tokens and extracts user context
pub async fn jwt_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_jwt_from_headers(&headers).map_err(ApiError::unauthorized)?;

    let claims = state.keys.decode(&token).map_err(|e| {
        warn!("Rejected token: {}", e);
        ApiError::unauthorized("Not authorized, token failed")
    })?;

    if claims.role == Role::WeredaAdmin && claims.wereda.is_none() {
        return Err(ApiError::unauthorized("Token is missing the wereda unit"));
    }

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| ApiError::unauthorized("Not authorized, token failed"))?;
    let user = state
        .repos
        .users
        .select_id(user_id)
        .await
        .map_err(crate::services::ServiceError::from)?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::unauthorized("User not found or inactive"))?;

    if user.role == Role::WeredaAdmin && user.wereda_unit.is_none() {
        return Err(ApiError::unauthorized("Account has no wereda unit assigned"));
    }

    request.extensions_mut().insert(AuthUser {
        user_id: user.id,
        role: user.role,
        wereda: user.wereda_unit,
    });

    Ok(next.run(request).await)
}

/// Extract JWT token from Authorization header
fn extract_jwt_from_headers(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Not authorized, no token".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    if let Some(token) = auth_str.strip_prefix("Bearer ") {
        if token.trim().is_empty() {
            return Err("Empty JWT token".to_string());
        }
        Ok(token.trim().to_string())
    } else {
        Err("Authorization header must use Bearer token format".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_header_parsing() {
        let mut headers = HeaderMap::new();
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Basic abc"));
        assert!(extract_jwt_from_headers(&headers).is_err());

        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(extract_jwt_from_headers(&headers).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn scope_by_role() {
        let wereda = Uuid::new_v4();
        let admin = AuthUser { user_id: Uuid::new_v4(), role: Role::Admin, wereda: None };
        let scoped = AuthUser { user_id: Uuid::new_v4(), role: Role::WeredaAdmin, wereda: Some(wereda) };
        assert_eq!(admin.scope(), Scope::All);
        assert_eq!(scoped.scope(), Scope::Wereda(wereda));
    }
}
