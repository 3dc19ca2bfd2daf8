use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map};
use tracing::info;
use uuid::Uuid;

use super::pagination::{fetch_page, PageRequest};
use super::{Expander, Listing, ServiceError};
use crate::access::{ensure_wereda, require_admin, Scope};
use crate::config::PaginationConfig;
use crate::database::Repositories;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{
    AddressPayload, ContactPerson, ContactPersonPayload, Parish, ParishAddress, ParishPayload, ParishView,
};
use crate::state::AppState;
use crate::validation::references::parse_id;
use crate::validation::{clean, clean_patch, merge, ReferenceValidator, Violations};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParishListQuery {
    pub name: Option<String>,
    pub region: Option<String>,
    pub under: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

pub struct ParishService {
    repos: Repositories,
    pagination: PaginationConfig,
}

impl ParishService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            pagination: state.config.pagination,
        }
    }

    pub async fn create(&self, user: &AuthUser, payload: ParishPayload) -> Result<ParishView, ServiceError> {
        require_admin(user)?;

        let mut violations = Violations::new();
        let name = violations.require("name", clean(payload.name), "Parish name is required");
        let address = read_address(&mut violations, payload.address.unwrap_or_default(), None);
        let under = violations.require("under", clean(payload.under), "Parent wereda unit is required");
        let contact_person = match payload.contact_person.flatten() {
            Some(contact) => read_contact(&mut violations, contact, None),
            None => None,
        };
        violations.finish()?;

        let (Some(name), Some(address), Some(under)) = (name, address, under) else {
            return Err(ServiceError::validation("Parish name, region and wereda unit are required"));
        };
        let unit = ReferenceValidator::new(&self.repos).wereda_unit(&under).await?;

        let now = Utc::now();
        let parish = Parish {
            id: Uuid::new_v4(),
            name,
            address,
            contact_person,
            under: unit.id,
            created_at: now,
            updated_at: now,
        };
        self.repos.parishes.insert(&parish).await?;
        info!("Created parish {} ({}) under wereda unit {}", parish.id, parish.name, unit.id);
        Expander::new(&self.repos).parish(parish).await
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, payload: ParishPayload) -> Result<ParishView, ServiceError> {
        require_admin(user)?;
        let current = self.find(id).await?;

        let mut violations = Violations::new();
        let mut next = current.clone();
        if let Some(name) = payload.name {
            match clean(Some(name)) {
                Some(name) => next.name = name,
                None => violations.add("name", "Parish name is required"),
            }
        }
        if let Some(address) = payload.address {
            if let Some(address) = read_address(&mut violations, address, Some(&current.address)) {
                next.address = address;
            }
        }
        match payload.contact_person {
            Some(Some(contact)) => {
                next.contact_person = read_contact(&mut violations, contact, current.contact_person.as_ref());
            }
            Some(None) => next.contact_person = None,
            None => {}
        }
        let under = match payload.under {
            Some(raw) => violations.require("under", clean(Some(raw)), "Parent wereda unit is required"),
            None => None,
        };
        violations.finish()?;

        if let Some(under) = under {
            next.under = ReferenceValidator::new(&self.repos).wereda_unit(&under).await?.id;
        }

        if next == current {
            return Expander::new(&self.repos).parish(current).await;
        }
        next.updated_at = Utc::now();
        self.repos.parishes.update(&next).await?;
        info!("Updated parish {}", next.id);
        Expander::new(&self.repos).parish(next).await
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<ParishView, ServiceError> {
        let parish = self.find(id).await?;
        ensure_wereda(user.scope(), Some(parish.under))?;
        Expander::new(&self.repos).parish(parish).await
    }

    pub async fn list(&self, user: &AuthUser, query: ParishListQuery) -> Result<Listing<ParishView>, ServiceError> {
        let mut conditions = Map::new();
        if let Some(name) = clean(query.name) {
            conditions.insert("name".into(), json!({ "$ilike": name }));
        }
        if let Some(region) = clean(query.region) {
            conditions.insert("address.region".into(), json!({ "$ilike": region }));
        }
        if let Some(under) = clean(query.under) {
            let unit = ReferenceValidator::new(&self.repos).wereda_unit(&under).await?;
            ensure_wereda(user.scope(), Some(unit.id))?;
            conditions.insert("under".into(), json!(unit.id));
        }
        if let Scope::Wereda(own) = user.scope() {
            conditions.insert("under".into(), json!(own));
        }
        if let Some(search) = clean(query.search) {
            conditions.insert("$text".into(), json!(search));
        }

        let page = query.page.resolve(&self.pagination);
        let (items, pagination) = fetch_page(&self.repos.parishes, &page, conditions, "name").await?;
        Ok(Listing {
            key: "parishes",
            items: Expander::new(&self.repos).parishes(items).await?,
            pagination,
        })
    }

    /// Every parish of one wereda unit, sorted by name.
    pub async fn by_wereda(&self, user: &AuthUser, wereda_id: &str) -> Result<Vec<ParishView>, ServiceError> {
        let wereda_id = parse_id(wereda_id).ok_or_else(|| ServiceError::validation("Invalid wereda unit ID format."))?;
        ensure_wereda(user.scope(), Some(wereda_id))?;
        if !self.repos.wereda_units.exists(wereda_id).await? {
            return Err(ServiceError::not_found("Wereda unit not found."));
        }

        let filter = FilterData {
            where_clause: Some(json!({ "under": wereda_id })),
            order: Some(json!("name")),
            ..Default::default()
        };
        let parishes = self.repos.parishes.select_any(filter).await?;
        Expander::new(&self.repos).parishes(parishes).await
    }

    async fn find(&self, id: Uuid) -> Result<Parish, ServiceError> {
        self.repos
            .parishes
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Parish not found."))
    }
}

fn read_address(
    violations: &mut Violations,
    payload: AddressPayload,
    current: Option<&ParishAddress>,
) -> Option<ParishAddress> {
    let region = match payload.region {
        Some(region) => clean(Some(region)),
        None => current.map(|a| a.region.clone()),
    };
    let region = violations.require("address.region", region, "Region is required")?;
    Some(ParishAddress {
        region,
        zone: merge(current.and_then(|a| a.zone.clone()), clean_patch(payload.zone)),
        woreda: merge(current.and_then(|a| a.woreda.clone()), clean_patch(payload.woreda)),
        kebele: merge(current.and_then(|a| a.kebele.clone()), clean_patch(payload.kebele)),
    })
}

/// Merges a contact patch. A contact with no remaining fields is dropped.
fn read_contact(
    violations: &mut Violations,
    payload: ContactPersonPayload,
    current: Option<&ContactPerson>,
) -> Option<ContactPerson> {
    let current = current.cloned().unwrap_or_default();
    let contact = ContactPerson {
        name: merge(current.name, clean_patch(payload.name)),
        phone: merge(current.phone, clean_patch(payload.phone)),
        role: merge(current.role, clean_patch(payload.role)),
    };
    violations.phone("contactPerson.phone", contact.phone.as_deref());
    if contact == ContactPerson::default() {
        None
    } else {
        Some(contact)
    }
}
