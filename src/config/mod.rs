use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;

/// Fallback secret for local development only. `validate()` refuses it in production.
const DEV_JWT_SECRET: &str = "church-registry-development-secret";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub pagination: PaginationConfig,
    pub bootstrap: BootstrapConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_prefix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_limit: u32,
    pub max_limit: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapConfig {
    pub admin_username: Option<String>,
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variables: {0}")]
    MissingVariables(String),

    #[error("The memory store cannot be used in production")]
    MemoryStoreInProduction,
}

impl Environment {
    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("HOST") {
            self.server.host = v;
        }
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_PREFIX") {
            self.server.api_prefix = normalize_prefix(&v);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            if !v.trim().is_empty() {
                self.database.url = Some(v);
                self.database.backend = StoreBackend::Postgres;
            }
        }
        if let Ok(v) = env::var("STORE_BACKEND") {
            match v.to_ascii_lowercase().as_str() {
                "memory" => self.database.backend = StoreBackend::Memory,
                "postgres" | "postgresql" => self.database.backend = StoreBackend::Postgres,
                other => tracing::warn!("Ignoring unknown STORE_BACKEND '{}'", other),
            }
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout = v.parse().unwrap_or(self.database.connection_timeout);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRY_HOURS") {
            self.security.jwt_expiry_hours = v.parse().unwrap_or(self.security.jwt_expiry_hours);
        }
        if let Ok(v) = env::var("CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }

        // Pagination overrides
        if let Ok(v) = env::var("PAGINATION_DEFAULT_LIMIT") {
            self.pagination.default_limit = v.parse().unwrap_or(self.pagination.default_limit);
        }
        if let Ok(v) = env::var("PAGINATION_MAX_LIMIT") {
            self.pagination.max_limit = v.parse().unwrap_or(self.pagination.max_limit);
        }

        // Bootstrap admin
        if let Ok(v) = env::var("BOOTSTRAP_ADMIN_USERNAME") {
            self.bootstrap.admin_username = Some(v);
        }
        if let Ok(v) = env::var("BOOTSTRAP_ADMIN_PASSWORD") {
            self.bootstrap.admin_password = Some(v);
        }

        self
    }

    /// Reject configurations that must not reach a production process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.environment.is_production() {
            return Ok(());
        }

        let mut missing = Vec::new();
        if self.security.jwt_secret.is_empty() || self.security.jwt_secret == DEV_JWT_SECRET {
            missing.push("JWT_SECRET");
        }
        if self.database.url.is_none() {
            missing.push("DATABASE_URL");
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingVariables(missing.join(", ")));
        }
        if self.database.backend == StoreBackend::Memory {
            return Err(ConfigError::MemoryStoreInProduction);
        }
        Ok(())
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                api_prefix: "/api/v1".to_string(),
            },
            database: DatabaseConfig {
                backend: StoreBackend::Memory,
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24 * 7, // 1 week
                cors_origins: vec!["*".to_string()],
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
            },
            bootstrap: BootstrapConfig::default(),
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                api_prefix: "/api/v1".to_string(),
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            security: SecurityConfig {
                jwt_secret: DEV_JWT_SECRET.to_string(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 100,
            },
            bootstrap: BootstrapConfig::default(),
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 5000,
                api_prefix: "/api/v1".to_string(),
            },
            database: DatabaseConfig {
                backend: StoreBackend::Postgres,
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            security: SecurityConfig {
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
                cors_origins: vec!["https://app.example.com".to_string()],
            },
            pagination: PaginationConfig {
                default_limit: 10,
                max_limit: 50,
            },
            bootstrap: BootstrapConfig::default(),
        }
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert_eq!(config.database.backend, StoreBackend::Memory);
        assert_eq!(config.pagination.default_limit, 10);
        assert_eq!(config.server.api_prefix, "/api/v1");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_production_requires_secrets() {
        let config = AppConfig::production();
        match config.validate() {
            Err(ConfigError::MissingVariables(vars)) => {
                assert!(vars.contains("JWT_SECRET"));
                assert!(vars.contains("DATABASE_URL"));
            }
            other => panic!("expected missing variables, got {:?}", other),
        }
    }

    #[test]
    fn test_production_rejects_memory_store() {
        let mut config = AppConfig::production();
        config.security.jwt_secret = "s3cret".to_string();
        config.database.url = Some("postgres://localhost/church".to_string());
        assert!(config.validate().is_ok());

        config.database.backend = StoreBackend::Memory;
        assert!(matches!(config.validate(), Err(ConfigError::MemoryStoreInProduction)));
    }

    #[test]
    fn test_prefix_normalization() {
        assert_eq!(normalize_prefix("api/v2/"), "/api/v2");
        assert_eq!(normalize_prefix("/api"), "/api");
        assert_eq!(normalize_prefix("/"), "");
    }
}
