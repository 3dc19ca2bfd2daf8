use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use super::ServiceError;
use crate::access::require_admin;
use crate::auth::{hash_password, verify_password, JwtKeys};
use crate::database::Repositories;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{Role, User, UserView, WeredaUnit};
use crate::state::AppState;
use crate::validation::{clean, ReferenceValidator, Violations};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginPayload {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub username: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
    pub wereda_unit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Session {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user: UserView,
    pub wereda_unit: Option<WeredaUnit>,
}

pub struct AuthService {
    repos: Repositories,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            keys: state.keys.clone(),
        }
    }

    pub async fn login(&self, payload: LoginPayload) -> Result<Session, ServiceError> {
        let mut violations = Violations::new();
        let username = violations.require("username", clean(payload.username), "Username is required");
        let password = violations.require("password", payload.password.filter(|p| !p.is_empty()), "Password is required");
        violations.finish()?;
        let (Some(username), Some(password)) = (username, password) else {
            return Err(ServiceError::validation("Username and password are required"));
        };

        let Some(mut user) = self.find_by_username(&username).await? else {
            warn!("Login failed: unknown user {}", username);
            return Err(invalid_credentials());
        };
        if !user.is_active || !verify_password(&password, &user.password_hash) {
            warn!("Login failed for user {}", user.id);
            return Err(invalid_credentials());
        }

        let now = Utc::now();
        user.last_login = Some(now);
        user.updated_at = now;
        self.repos.users.update(&user).await?;

        let token = self.keys.issue(user.id, user.role, user.wereda_unit)?;
        info!("User {} logged in", user.id);
        Ok(Session {
            token,
            user: UserView::from(&user),
        })
    }

    /// Creates an account on behalf of an admin and returns a session for it.
    pub async fn register(&self, caller: &AuthUser, payload: RegisterPayload) -> Result<Session, ServiceError> {
        require_admin(caller)?;

        let mut violations = Violations::new();
        let username = violations.require("username", clean(payload.username), "Username is required");
        violations.min_len("username", username.as_deref(), 3, "Username must be at least 3 characters long");
        let password = violations.require("password", payload.password, "Password is required");
        violations.min_len("password", password.as_deref(), 6, "Password must be at least 6 characters long");
        let role = violations.require("role", payload.role, "Role is required");
        let wereda_unit = clean(payload.wereda_unit);
        if role == Some(Role::WeredaAdmin) && wereda_unit.is_none() {
            violations.add("weredaUnit", "A wereda admin requires a wereda unit");
        }
        violations.finish()?;

        let (Some(username), Some(password), Some(role)) = (username, password, role) else {
            return Err(ServiceError::validation("Username, password and role are required"));
        };
        let wereda_unit = match (role, wereda_unit) {
            (Role::WeredaAdmin, Some(raw)) => Some(ReferenceValidator::new(&self.repos).wereda_unit(&raw).await?.id),
            _ => None,
        };

        let user = self.create_account(&username, &password, role, wereda_unit).await?;
        let token = self.keys.issue(user.id, user.role, user.wereda_unit)?;
        info!("User {} registered {} as {}", caller.user_id, user.username, role.as_str());
        Ok(Session {
            token,
            user: UserView::from(&user),
        })
    }

    pub async fn me(&self, caller: &AuthUser) -> Result<Profile, ServiceError> {
        let user = self
            .repos
            .users
            .select_id(caller.user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User not found."))?;
        let wereda_unit = match user.wereda_unit {
            Some(id) => self.repos.wereda_units.select_id(id).await?,
            None => None,
        };
        Ok(Profile {
            user: UserView::from(&user),
            wereda_unit,
        })
    }

    /// Creates an admin account. Fails with a duplicate error when the name is taken.
    pub async fn create_admin(&self, username: &str, password: &str) -> Result<User, ServiceError> {
        let mut violations = Violations::new();
        violations.min_len("username", Some(username.trim()), 3, "Username must be at least 3 characters long");
        violations.min_len("password", Some(password), 6, "Password must be at least 6 characters long");
        violations.finish()?;
        self.create_account(username.trim(), password, Role::Admin, None).await
    }

    /// Creates the configured admin unless the username already exists. Returns whether it was created.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> Result<bool, ServiceError> {
        if self.find_by_username(username.trim()).await?.is_some() {
            return Ok(false);
        }
        self.create_admin(username, password).await?;
        Ok(true)
    }

    async fn create_account(
        &self,
        username: &str,
        password: &str,
        role: Role,
        wereda_unit: Option<Uuid>,
    ) -> Result<User, ServiceError> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: hash_password(password)?,
            role,
            wereda_unit,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        };
        self.repos.users.insert(&user).await?;
        info!("Created {} account {} ({})", role.as_str(), user.username, user.id);
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .repos
            .users
            .select_one(FilterData::where_clause(json!({ "username": username })))
            .await?)
    }
}

fn invalid_credentials() -> ServiceError {
    ServiceError::Unauthorized("Invalid username or password".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::database::MemoryDocumentStore;
    use std::sync::Arc;

    fn service() -> AuthService {
        let state = AppState::new(AppConfig::development(), Arc::new(MemoryDocumentStore::new())).unwrap();
        AuthService::new(&state)
    }

    fn login(username: &str, password: &str) -> LoginPayload {
        LoginPayload {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[tokio::test]
    async fn login_checks_password_and_records_last_login() {
        let auth = service();
        assert!(auth.ensure_admin("root", "s3cret!").await.unwrap());
        assert!(!auth.ensure_admin("root", "other-password").await.unwrap());

        assert!(matches!(
            auth.login(login("root", "wrong-password")).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            auth.login(login("nobody", "s3cret!")).await,
            Err(ServiceError::Unauthorized(_))
        ));

        let session = auth.login(login("root", "s3cret!")).await.unwrap();
        assert!(!session.token.is_empty());
        assert!(session.user.last_login.is_some());
        assert_eq!(auth.keys.decode(&session.token).unwrap().role, Role::Admin);
    }

    #[tokio::test]
    async fn duplicate_admin_is_rejected() {
        let auth = service();
        auth.create_admin("root", "s3cret!").await.unwrap();
        assert!(matches!(
            auth.create_admin("root", "s3cret!").await,
            Err(ServiceError::Duplicate(_))
        ));
    }
}
