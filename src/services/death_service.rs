use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::pagination::{date_range, fetch_page, PageRequest};
use super::{Expander, Listing, ServiceError};
use crate::access::{ensure_wereda, AccessPolicy, Scope};
use crate::config::PaginationConfig;
use crate::database::Repositories;
use crate::middleware::AuthUser;
use crate::models::{DeathPayload, DeathRecord, DeathView, LiveStatus, Member};
use crate::state::AppState;
use crate::validation::{clean, clean_patch, ReferenceValidator, Violations};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathListQuery {
    pub member: Option<String>,
    pub grave_location: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Death records and the member status that follows them.
///
/// A stored record always leaves its member `Deceased` with `death` pointing back at it.
/// There is no transaction across the two writes: a failed member update deletes the new
/// record again.
pub struct DeathService {
    repos: Repositories,
    pagination: PaginationConfig,
}

impl DeathService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            pagination: state.config.pagination,
        }
    }

    pub async fn create(&self, user: &AuthUser, payload: DeathPayload) -> Result<DeathView, ServiceError> {
        let mut violations = Violations::new();
        let member = violations.require("member", clean(payload.member), "Member is required");
        let date_of_death = violations.require("dateOfDeath", payload.date_of_death, "Date of death is required");
        violations.not_future("dateOfDeath", date_of_death, "Date of death cannot be in the future");
        violations.finish()?;

        let (Some(member), Some(date_of_death)) = (member, date_of_death) else {
            return Err(ServiceError::validation("Member and date of death are required"));
        };

        let refs = ReferenceValidator::new(&self.repos);
        let member = refs.member(&member).await?;
        AccessPolicy::new(&self.repos).ensure_member(user.scope(), &member).await?;
        let grave_location = match clean_patch(payload.grave_location).flatten() {
            Some(raw) => Some(refs.parish(&raw).await?.id),
            None => None,
        };
        check_after_birth(&member, date_of_death)?;

        let now = Utc::now();
        let record = DeathRecord {
            id: Uuid::new_v4(),
            member: member.id,
            date_of_death,
            grave_location,
            created_at: now,
            updated_at: now,
        };
        self.repos.deaths.insert(&record).await?;

        if let Err(e) = self.mark_deceased(member, record.id).await {
            error!("Member update failed after recording death {}; removing it: {}", record.id, e);
            if let Err(cleanup) = self.repos.deaths.delete(record.id).await {
                error!("Could not remove death record {}: {}", record.id, cleanup);
            }
            return Err(e);
        }

        info!("Recorded death {} for member {}", record.id, record.member);
        Expander::new(&self.repos).death(record).await
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, payload: DeathPayload) -> Result<DeathView, ServiceError> {
        let current = self.find(id).await?;
        let member = self.repos.members.select_id(current.member).await?;
        self.ensure_scope(user.scope(), member.as_ref()).await?;

        if let Some(raw) = clean(payload.member) {
            if Uuid::parse_str(&raw).ok() != Some(current.member) {
                return Err(ServiceError::validation("The member of a death record cannot be changed"));
            }
        }

        let mut violations = Violations::new();
        violations.not_future("dateOfDeath", payload.date_of_death, "Date of death cannot be in the future");
        violations.finish()?;

        let mut next = current.clone();
        if let Some(date) = payload.date_of_death {
            next.date_of_death = date;
        }
        if let Some(patch) = clean_patch(payload.grave_location) {
            next.grave_location = match patch {
                Some(raw) => Some(ReferenceValidator::new(&self.repos).parish(&raw).await?.id),
                None => None,
            };
        }
        if let Some(member) = &member {
            check_after_birth(member, next.date_of_death)?;
        }

        if next != current {
            next.updated_at = Utc::now();
            self.repos.deaths.update(&next).await?;
            info!("Updated death record {}", next.id);
        }
        if let Some(member) = member {
            self.mark_deceased(member, next.id).await?;
        }
        Expander::new(&self.repos).death(next).await
    }

    /// Removes a death record and returns its member to `Active`.
    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        let record = self.find(id).await?;
        let member = self.repos.members.select_id(record.member).await?;
        self.ensure_scope(user.scope(), member.as_ref()).await?;

        match member {
            Some(mut member) => {
                member.live_status = LiveStatus::Active;
                member.death = None;
                member.updated_at = Utc::now();
                self.repos.members.update(&member).await?;
            }
            None => warn!("Death record {} refers to missing member {}", record.id, record.member),
        }

        self.repos.deaths.delete(record.id).await?;
        info!("Deleted death record {} and reactivated member {}", record.id, record.member);
        Ok(())
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<DeathView, ServiceError> {
        let record = self.find(id).await?;
        let member = self.repos.members.select_id(record.member).await?;
        self.ensure_scope(user.scope(), member.as_ref()).await?;
        Expander::new(&self.repos).death(record).await
    }

    pub async fn list(&self, user: &AuthUser, query: DeathListQuery) -> Result<Listing<DeathView>, ServiceError> {
        let refs = ReferenceValidator::new(&self.repos);
        let policy = AccessPolicy::new(&self.repos);
        let mut conditions = Map::new();
        if let Some(raw) = clean(query.grave_location) {
            conditions.insert("graveLocation".into(), json!(refs.parish(&raw).await?.id));
        }
        date_range(
            &mut conditions,
            "dateOfDeath",
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )?;

        if let Some(raw) = clean(query.member) {
            let member = refs.member(&raw).await?;
            policy.ensure_member(user.scope(), &member).await?;
            conditions.insert("member".into(), json!(member.id));
        } else if let Some(Value::Object(scoped)) = policy.member_condition(user.scope(), "member").await? {
            conditions.extend(scoped);
        }

        let page = query.page.resolve(&self.pagination);
        let (items, pagination) = fetch_page(&self.repos.deaths, &page, conditions, "-dateOfDeath").await?;
        let listing = Listing {
            key: "deaths",
            items,
            pagination,
        };
        Expander::new(&self.repos).deaths(listing).await
    }

    async fn mark_deceased(&self, mut member: Member, death: Uuid) -> Result<(), ServiceError> {
        if member.live_status == LiveStatus::Deceased && member.death == Some(death) {
            return Ok(());
        }
        member.live_status = LiveStatus::Deceased;
        member.death = Some(death);
        member.updated_at = Utc::now();
        self.repos.members.update(&member).await?;
        Ok(())
    }

    /// A record whose member is gone has no owner, so only an admin may touch it.
    async fn ensure_scope(&self, scope: Scope, member: Option<&Member>) -> Result<(), ServiceError> {
        match member {
            Some(member) => AccessPolicy::new(&self.repos).ensure_member(scope, member).await,
            None => ensure_wereda(scope, None),
        }
    }

    async fn find(&self, id: Uuid) -> Result<DeathRecord, ServiceError> {
        self.repos
            .deaths
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Death record not found."))
    }
}

fn check_after_birth(member: &Member, date_of_death: NaiveDate) -> Result<(), ServiceError> {
    if date_of_death < member.date_of_birth {
        return Err(ServiceError::validation("Date of death cannot be before date of birth"));
    }
    Ok(())
}
