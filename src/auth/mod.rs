pub mod password;

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::Role;

pub use password::{hash_password, verify_password};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("JWT secret not configured")]
    InvalidSecret,

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),
}

/// Session token claims. `wereda` is present for wereda admins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wereda: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, role: Role, wereda: Option<Uuid>, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: user_id.to_string(),
            role,
            wereda: wereda.map(|w| w.to_string()),
            iat: now.timestamp(),
            exp,
        }
    }
}

/// HS256 signing and verification keys built once from configuration.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: u64,
}

impl JwtKeys {
    pub fn new(secret: &str, expiry_hours: u64) -> Result<Self, AuthError> {
        if secret.is_empty() {
            return Err(AuthError::InvalidSecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
        })
    }

    pub fn issue(&self, user_id: Uuid, role: Role, wereda: Option<Uuid>) -> Result<String, AuthError> {
        let claims = Claims::new(user_id, role, wereda, self.expiry_hours);
        encode(&Header::default(), &claims, &self.encoding).map_err(|e| AuthError::TokenGeneration(e.to_string()))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_decode() {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        let user = Uuid::new_v4();
        let wereda = Uuid::new_v4();
        let token = keys.issue(user, Role::WeredaAdmin, Some(wereda)).unwrap();

        let claims = keys.decode(&token).unwrap();
        assert_eq!(claims.sub, user.to_string());
        assert_eq!(claims.role, Role::WeredaAdmin);
        assert_eq!(claims.wereda, Some(wereda.to_string()));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn rejects_foreign_and_expired_tokens() {
        let keys = JwtKeys::new("test-secret", 1).unwrap();
        let other = JwtKeys::new("other-secret", 1).unwrap();
        let token = other.issue(Uuid::new_v4(), Role::Admin, None).unwrap();
        assert!(keys.decode(&token).is_err());

        let mut claims = Claims::new(Uuid::new_v4(), Role::Admin, None, 1);
        claims.exp = Utc::now().timestamp() - 3600;
        let expired = encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap();
        assert!(keys.decode(&expired).is_err());
    }

    #[test]
    fn empty_secret_is_refused() {
        assert!(matches!(JwtKeys::new("", 1), Err(AuthError::InvalidSecret)));
    }
}
