use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::info;
use uuid::Uuid;

use super::pagination::{date_range, fetch_page, PageRequest};
use super::{Expander, Listing, ServiceError};
use crate::access::{ensure_wereda, AccessPolicy};
use crate::config::PaginationConfig;
use crate::database::Repositories;
use crate::middleware::AuthUser;
use crate::models::{BaptismPayload, BaptismRecord, BaptismView, ParentContact, ParentContactPayload};
use crate::state::AppState;
use crate::validation::{clean, clean_patch, merge, ReferenceValidator, Violations};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaptismListQuery {
    pub member: Option<String>,
    pub parish: Option<String>,
    pub baptized_by: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub struct BaptismService {
    repos: Repositories,
    pagination: PaginationConfig,
}

impl BaptismService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            pagination: state.config.pagination,
        }
    }

    pub async fn create(&self, user: &AuthUser, payload: BaptismPayload) -> Result<BaptismView, ServiceError> {
        let mut violations = Violations::new();
        let member = violations.require("member", clean(payload.member), "Member is required");
        let baptism_date = violations.require("baptismDate", payload.baptism_date, "Baptism date is required");
        let parish = violations.require("parish", clean(payload.parish), "Parish is required");
        let parent_contact = read_parent_contact(&mut violations, payload.parent_contact.unwrap_or_default(), None);
        violations.finish()?;

        let (Some(member), Some(baptism_date), Some(parish), Some(parent_contact)) =
            (member, baptism_date, parish, parent_contact)
        else {
            return Err(ServiceError::validation("Member, baptism date, parish and parent contact are required"));
        };

        let refs = ReferenceValidator::new(&self.repos);
        let member = refs.member(&member).await?;
        let parish = refs.parish(&parish).await?;
        ensure_wereda(user.scope(), Some(parish.under))?;
        let baptized_by = match clean_patch(payload.baptized_by).flatten() {
            Some(raw) => Some(refs.member(&raw).await?.id),
            None => None,
        };

        let now = Utc::now();
        let record = BaptismRecord {
            id: Uuid::new_v4(),
            member: member.id,
            baptism_date,
            parish: parish.id,
            baptized_by,
            parent_contact,
            created_at: now,
            updated_at: now,
        };
        self.repos.baptisms.insert(&record).await?;
        info!("Recorded baptism {} for member {}", record.id, record.member);
        Expander::new(&self.repos).baptism(record).await
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, payload: BaptismPayload) -> Result<BaptismView, ServiceError> {
        let current = self.find(id).await?;
        let policy = AccessPolicy::new(&self.repos);
        policy.ensure_parish(user.scope(), current.parish).await?;

        let mut violations = Violations::new();
        let mut next = current.clone();
        if let Some(date) = payload.baptism_date {
            next.baptism_date = date;
        }
        if let Some(contact) = payload.parent_contact {
            if let Some(contact) = read_parent_contact(&mut violations, contact, Some(&current.parent_contact)) {
                next.parent_contact = contact;
            }
        }
        let member = match payload.member {
            Some(raw) => violations.require("member", clean(Some(raw)), "Member is required"),
            None => None,
        };
        let parish = match payload.parish {
            Some(raw) => violations.require("parish", clean(Some(raw)), "Parish is required"),
            None => None,
        };
        violations.finish()?;

        let refs = ReferenceValidator::new(&self.repos);
        if let Some(raw) = member {
            next.member = refs.member(&raw).await?.id;
        }
        if let Some(raw) = parish {
            let parish = refs.parish(&raw).await?;
            ensure_wereda(user.scope(), Some(parish.under))?;
            next.parish = parish.id;
        }
        if let Some(patch) = clean_patch(payload.baptized_by) {
            next.baptized_by = match patch {
                Some(raw) => Some(refs.member(&raw).await?.id),
                None => None,
            };
        }

        if next == current {
            return Expander::new(&self.repos).baptism(current).await;
        }
        next.updated_at = Utc::now();
        self.repos.baptisms.update(&next).await?;
        info!("Updated baptism record {}", next.id);
        Expander::new(&self.repos).baptism(next).await
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<BaptismView, ServiceError> {
        let record = self.find(id).await?;
        AccessPolicy::new(&self.repos).ensure_parish(user.scope(), record.parish).await?;
        Expander::new(&self.repos).baptism(record).await
    }

    pub async fn list(&self, user: &AuthUser, query: BaptismListQuery) -> Result<Listing<BaptismView>, ServiceError> {
        let refs = ReferenceValidator::new(&self.repos);
        let mut conditions = Map::new();
        if let Some(raw) = clean(query.member) {
            conditions.insert("member".into(), json!(refs.member(&raw).await?.id));
        }
        if let Some(raw) = clean(query.baptized_by) {
            conditions.insert("baptizedBy".into(), json!(refs.member(&raw).await?.id));
        }
        date_range(
            &mut conditions,
            "baptismDate",
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )?;

        if let Some(raw) = clean(query.parish) {
            let parish = refs.parish(&raw).await?;
            ensure_wereda(user.scope(), Some(parish.under))?;
            conditions.insert("parish".into(), json!(parish.id));
        } else if let Some(Value::Object(scoped)) = AccessPolicy::new(&self.repos)
            .parish_condition(user.scope(), "parish")
            .await?
        {
            conditions.extend(scoped);
        }

        let page = query.page.resolve(&self.pagination);
        let (items, pagination) = fetch_page(&self.repos.baptisms, &page, conditions, "-baptismDate").await?;
        let listing = Listing {
            key: "baptisms",
            items,
            pagination,
        };
        Expander::new(&self.repos).baptisms(listing).await
    }

    async fn find(&self, id: Uuid) -> Result<BaptismRecord, ServiceError> {
        self.repos
            .baptisms
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Baptism record not found."))
    }
}

fn read_parent_contact(
    violations: &mut Violations,
    payload: ParentContactPayload,
    current: Option<&ParentContact>,
) -> Option<ParentContact> {
    let name = match payload.name {
        Some(name) => clean(Some(name)),
        None => current.map(|c| c.name.clone()),
    };
    let name = violations.require("parentContact.name", name, "Parent contact name is required");
    let phone = merge(current.and_then(|c| c.phone.clone()), clean_patch(payload.phone));
    violations.phone("parentContact.phone", phone.as_deref());
    Some(ParentContact { name: name?, phone })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_contact_requires_name_and_valid_phone() {
        let mut violations = Violations::new();
        assert!(read_parent_contact(&mut violations, ParentContactPayload::default(), None).is_none());
        assert_eq!(violations.into_errors()[0].field, "parentContact.name");

        let mut violations = Violations::new();
        let payload = ParentContactPayload {
            name: Some("Almaz".into()),
            phone: Some(Some("+251911223344".into())),
        };
        let contact = read_parent_contact(&mut violations, payload, None).unwrap();
        assert!(violations.is_empty());
        assert_eq!(contact.phone.as_deref(), Some("+251911223344"));

        let mut violations = Violations::new();
        let payload = ParentContactPayload {
            name: None,
            phone: Some(Some("abc".into())),
        };
        read_parent_contact(&mut violations, payload, Some(&contact));
        assert_eq!(violations.into_errors()[0].field, "parentContact.phone");
    }
}
