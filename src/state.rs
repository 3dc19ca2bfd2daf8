use std::sync::Arc;

use crate::auth::{AuthError, JwtKeys};
use crate::config::AppConfig;
use crate::database::{DocumentStore, Repositories};

/// Shared handles for request handlers. Built once in `main` (or a test harness).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub repos: Repositories,
    pub keys: JwtKeys,
}

impl AppState {
    pub fn new(config: AppConfig, store: Arc<dyn DocumentStore>) -> Result<Self, AuthError> {
        let keys = JwtKeys::new(&config.security.jwt_secret, config.security.jwt_expiry_hours)?;
        Ok(Self {
            repos: Repositories::new(store.clone()),
            config: Arc::new(config),
            store,
            keys,
        })
    }
}
