//! Role checks and wereda scoping.
//!
//! An admin sees everything. A wereda admin sees rows whose ownership chain
//! ends at their unit: Parish → `under`, Member → `parish` → `under`, and so on.
//! A member without a parish is outside every wereda admin's scope.

use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::database::Repositories;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{Member, Role};
use crate::services::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Wereda(Uuid),
}

pub fn require_admin(user: &AuthUser) -> Result<(), ServiceError> {
    if user.role == Role::Admin {
        return Ok(());
    }
    warn!("Admin-only operation refused for user {}", user.user_id);
    Err(ServiceError::forbidden("Not authorized. Admin access required."))
}

/// Refuses rows owned by another unit. `owner` is `None` when the chain is broken.
pub fn ensure_wereda(scope: Scope, owner: Option<Uuid>) -> Result<(), ServiceError> {
    match scope {
        Scope::All => Ok(()),
        Scope::Wereda(own) if owner == Some(own) => Ok(()),
        Scope::Wereda(own) => {
            warn!("Scope violation: wereda {} touched a row owned by {:?}", own, owner);
            Err(ServiceError::forbidden("Access denied: record is outside your wereda unit."))
        }
    }
}

pub struct AccessPolicy<'a> {
    repos: &'a Repositories,
}

impl<'a> AccessPolicy<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    pub async fn parish_wereda(&self, parish_id: Uuid) -> Result<Option<Uuid>, ServiceError> {
        Ok(self.repos.parishes.select_id(parish_id).await?.map(|p| p.under))
    }

    pub async fn member_wereda(&self, member: &Member) -> Result<Option<Uuid>, ServiceError> {
        match member.parish {
            Some(parish_id) => self.parish_wereda(parish_id).await,
            None => Ok(None),
        }
    }

    pub async fn ensure_parish(&self, scope: Scope, parish_id: Uuid) -> Result<(), ServiceError> {
        if scope == Scope::All {
            return Ok(());
        }
        ensure_wereda(scope, self.parish_wereda(parish_id).await?)
    }

    pub async fn ensure_member(&self, scope: Scope, member: &Member) -> Result<(), ServiceError> {
        if scope == Scope::All {
            return Ok(());
        }
        ensure_wereda(scope, self.member_wereda(member).await?)
    }

    pub async fn parish_ids_in(&self, wereda: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let parishes = self
            .repos
            .parishes
            .select_any(FilterData::where_clause(json!({ "under": wereda })))
            .await?;
        Ok(parishes.into_iter().map(|p| p.id).collect())
    }

    pub async fn member_ids_in(&self, wereda: Uuid) -> Result<Vec<Uuid>, ServiceError> {
        let parish_ids = self.parish_ids_in(wereda).await?;
        if parish_ids.is_empty() {
            return Ok(vec![]);
        }
        let members = self
            .repos
            .members
            .select_any(FilterData::where_clause(json!({ "parish": { "$in": parish_ids } })))
            .await?;
        Ok(members.into_iter().map(|m| m.id).collect())
    }

    /// `{ field: { $in: [...] } }` restricting a listing to the caller's parishes.
    pub async fn parish_condition(&self, scope: Scope, field: &str) -> Result<Option<Value>, ServiceError> {
        match scope {
            Scope::All => Ok(None),
            Scope::Wereda(wereda) => {
                let ids = self.parish_ids_in(wereda).await?;
                Ok(Some(json!({ field: { "$in": ids } })))
            }
        }
    }

    /// `{ field: { $in: [...] } }` restricting a listing to the caller's members.
    pub async fn member_condition(&self, scope: Scope, field: &str) -> Result<Option<Value>, ServiceError> {
        match scope {
            Scope::All => Ok(None),
            Scope::Wereda(wereda) => {
                let ids = self.member_ids_in(wereda).await?;
                Ok(Some(json!({ field: { "$in": ids } })))
            }
        }
    }
}
