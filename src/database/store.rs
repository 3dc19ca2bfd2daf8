use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::filter::{Filter, FilterError};

/// Named document collections. Each maps to one table in Postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    WeredaUnits,
    Parishes,
    Members,
    Baptisms,
    Marriages,
    Deaths,
    Users,
}

/// A uniqueness constraint over one or more document fields.
///
/// Documents missing any of the fields are not constrained, so optional
/// fields such as a member's phone behave as sparse keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniqueKey {
    pub name: &'static str,
    pub fields: &'static [&'static str],
    pub message: &'static str,
}

const WEREDA_UNIT_KEYS: &[UniqueKey] = &[UniqueKey {
    name: "wereda_units_name_key",
    fields: &["name"],
    message: "A wereda unit with this name already exists.",
}];

const PARISH_KEYS: &[UniqueKey] = &[UniqueKey {
    name: "parishes_name_key",
    fields: &["name"],
    message: "A parish with this name already exists.",
}];

const MEMBER_KEYS: &[UniqueKey] = &[UniqueKey {
    name: "members_phone_key",
    fields: &["phone"],
    message: "A member with this phone number already exists.",
}];

const BAPTISM_KEYS: &[UniqueKey] = &[UniqueKey {
    name: "baptism_records_member_key",
    fields: &["member"],
    message: "A baptism record already exists for this member.",
}];

const MARRIAGE_KEYS: &[UniqueKey] = &[UniqueKey {
    name: "marriage_records_couple_key",
    fields: &["husband", "wife"],
    message: "A marriage record already exists for this couple.",
}];

const DEATH_KEYS: &[UniqueKey] = &[UniqueKey {
    name: "death_records_member_key",
    fields: &["member"],
    message: "A death record already exists for this member.",
}];

const USER_KEYS: &[UniqueKey] = &[UniqueKey {
    name: "users_username_key",
    fields: &["username"],
    message: "Username already exists.",
}];

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::WeredaUnits,
        Collection::Parishes,
        Collection::Members,
        Collection::Baptisms,
        Collection::Marriages,
        Collection::Deaths,
        Collection::Users,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            Collection::WeredaUnits => "wereda_units",
            Collection::Parishes => "parishes",
            Collection::Members => "members",
            Collection::Baptisms => "baptism_records",
            Collection::Marriages => "marriage_records",
            Collection::Deaths => "death_records",
            Collection::Users => "users",
        }
    }

    pub fn unique_keys(&self) -> &'static [UniqueKey] {
        match self {
            Collection::WeredaUnits => WEREDA_UNIT_KEYS,
            Collection::Parishes => PARISH_KEYS,
            Collection::Members => MEMBER_KEYS,
            Collection::Baptisms => BAPTISM_KEYS,
            Collection::Marriages => MARRIAGE_KEYS,
            Collection::Deaths => DEATH_KEYS,
            Collection::Users => USER_KEYS,
        }
    }

    /// Fields matched by free-text search.
    pub fn search_fields(&self) -> &'static [&'static str] {
        match self {
            Collection::WeredaUnits => &[
                "name",
                "address.region",
                "address.zone",
                "address.woreda",
                "address.kebele",
            ],
            Collection::Parishes => &["name", "address.region"],
            Collection::Members => &["firstName", "fatherName", "grandfatherName"],
            Collection::Marriages => &["marriagePlace", "divorceReason"],
            Collection::Baptisms | Collection::Deaths | Collection::Users => &[],
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{message}")]
    Duplicate { key: String, message: String },

    #[error("Record not found")]
    NotFound,

    #[error("Invalid query: {0}")]
    Query(#[from] FilterError),

    #[error("Malformed document: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl StoreError {
    pub fn duplicate(key: &UniqueKey) -> Self {
        StoreError::Duplicate {
            key: key.name.to_string(),
            message: key.message.to_string(),
        }
    }
}

/// Persistence for JSON documents keyed by UUID.
///
/// Implementations must enforce every `Collection::unique_keys` entry atomically
/// with the write that would violate it.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError>;

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError>;

    /// Overwrites an existing document. `StoreError::NotFound` when `id` is absent.
    async fn replace(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError>;

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError>;

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<i64, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;

    async fn close(&self);
}
