pub mod auth_service;
pub mod baptism_service;
pub mod death_service;
pub mod expand;
pub mod marriage_service;
pub mod member_service;
pub mod pagination;
pub mod parish_service;
pub mod wereda_service;

use thiserror::Error;

use crate::auth::AuthError;
use crate::database::StoreError;
use crate::validation::FieldError;

pub use auth_service::AuthService;
pub use baptism_service::BaptismService;
pub use death_service::DeathService;
pub use expand::Expander;
pub use marriage_service::MarriageService;
pub use member_service::MemberService;
pub use pagination::{Listing, PageRequest, Pagination};
pub use parish_service::ParishService;
pub use wereda_service::WeredaService;

/// Failure of a registry operation, classified by what the caller did wrong.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{message}")]
    Validation { message: String, fields: Vec<FieldError> },

    #[error("{0}")]
    Reference(String),

    #[error("{0}")]
    Duplicate(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(StoreError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl ServiceError {
    pub fn validation(message: impl Into<String>) -> Self {
        ServiceError::Validation {
            message: message.into(),
            fields: vec![],
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ServiceError::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ServiceError::NotFound(message.into())
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { message, .. } => ServiceError::Duplicate(message),
            StoreError::NotFound => ServiceError::not_found("Record not found."),
            // Bad sort keys and filter shapes come from the caller.
            StoreError::Query(e) => ServiceError::validation(e.to_string()),
            other => ServiceError::Store(other),
        }
    }
}
