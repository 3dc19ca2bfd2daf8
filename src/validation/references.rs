use tracing::debug;
use uuid::Uuid;

use crate::database::{Repositories, StoreError};
use crate::models::{Member, Parish, WeredaUnit};
use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    WeredaUnit,
    Parish,
    Member,
    Baptism,
    Marriage,
    Death,
}

impl EntityKind {
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::WeredaUnit => "wereda unit",
            EntityKind::Parish => "parish",
            EntityKind::Member => "member",
            EntityKind::Baptism => "baptism record",
            EntityKind::Marriage => "marriage record",
            EntityKind::Death => "death record",
        }
    }
}

/// Point lookups that check a foreign key before it is written. Nothing is cached.
pub struct ReferenceValidator<'a> {
    repos: &'a Repositories,
}

impl<'a> ReferenceValidator<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    /// Whether `id` names an existing entity. Malformed ids are simply absent.
    pub async fn exists(&self, kind: EntityKind, id: &str) -> Result<bool, StoreError> {
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };
        debug!("Reference lookup: {} {}", kind.label(), id);
        match kind {
            EntityKind::WeredaUnit => self.repos.wereda_units.exists(id).await,
            EntityKind::Parish => self.repos.parishes.exists(id).await,
            EntityKind::Member => self.repos.members.exists(id).await,
            EntityKind::Baptism => self.repos.baptisms.exists(id).await,
            EntityKind::Marriage => self.repos.marriages.exists(id).await,
            EntityKind::Death => self.repos.deaths.exists(id).await,
        }
    }

    pub async fn wereda_unit(&self, raw: &str) -> Result<WeredaUnit, ServiceError> {
        let found = match parse_id(raw) {
            Some(id) => self.repos.wereda_units.select_id(id).await?,
            None => None,
        };
        found.ok_or_else(|| invalid(EntityKind::WeredaUnit))
    }

    pub async fn parish(&self, raw: &str) -> Result<Parish, ServiceError> {
        let found = match parse_id(raw) {
            Some(id) => self.repos.parishes.select_id(id).await?,
            None => None,
        };
        found.ok_or_else(|| invalid(EntityKind::Parish))
    }

    pub async fn member(&self, raw: &str) -> Result<Member, ServiceError> {
        let found = match parse_id(raw) {
            Some(id) => self.repos.members.select_id(id).await?,
            None => None,
        };
        found.ok_or_else(|| invalid(EntityKind::Member))
    }
}

pub fn parse_id(raw: &str) -> Option<Uuid> {
    Uuid::parse_str(raw.trim()).ok()
}

fn invalid(kind: EntityKind) -> ServiceError {
    ServiceError::Reference(format!("Invalid {} ID.", kind.label()))
}
