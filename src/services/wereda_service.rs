use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map};
use tracing::info;
use uuid::Uuid;

use super::pagination::{fetch_page, PageRequest};
use super::{Listing, ServiceError};
use crate::access::require_admin;
use crate::config::PaginationConfig;
use crate::database::Repositories;
use crate::middleware::AuthUser;
use crate::models::{AddressPayload, WeredaAddress, WeredaUnit, WeredaUnitPayload};
use crate::state::AppState;
use crate::validation::{clean, clean_patch, Violations};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WeredaListQuery {
    pub name: Option<String>,
    pub region: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Wereda units. Every operation is admin-only.
pub struct WeredaService {
    repos: Repositories,
    pagination: PaginationConfig,
}

impl WeredaService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            pagination: state.config.pagination,
        }
    }

    pub async fn create(&self, user: &AuthUser, payload: WeredaUnitPayload) -> Result<WeredaUnit, ServiceError> {
        require_admin(user)?;

        let mut violations = Violations::new();
        let name = violations.require("name", clean(payload.name), "Wereda name is required");
        violations.min_len("name", name.as_deref(), 3, "Wereda name must be at least 3 characters long");
        let address = read_address(&mut violations, payload.address.unwrap_or_default(), None);
        violations.finish()?;

        let (Some(name), Some(address)) = (name, address) else {
            return Err(ServiceError::validation("Wereda name and address are required"));
        };

        let now = Utc::now();
        let unit = WeredaUnit {
            id: Uuid::new_v4(),
            name,
            address,
            created_at: now,
            updated_at: now,
        };
        self.repos.wereda_units.insert(&unit).await?;
        info!("Created wereda unit {} ({})", unit.id, unit.name);
        Ok(unit)
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, payload: WeredaUnitPayload) -> Result<WeredaUnit, ServiceError> {
        require_admin(user)?;
        let current = self.find(id).await?;

        let mut violations = Violations::new();
        let mut next = current.clone();
        if let Some(name) = payload.name {
            match clean(Some(name)) {
                Some(name) => {
                    violations.min_len("name", Some(&name), 3, "Wereda name must be at least 3 characters long");
                    next.name = name;
                }
                None => violations.add("name", "Wereda name is required"),
            }
        }
        if let Some(address) = payload.address {
            if let Some(address) = read_address(&mut violations, address, Some(&current.address)) {
                next.address = address;
            }
        }
        violations.finish()?;

        if next == current {
            return Ok(current);
        }
        next.updated_at = Utc::now();
        self.repos.wereda_units.update(&next).await?;
        info!("Updated wereda unit {}", next.id);
        Ok(next)
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<WeredaUnit, ServiceError> {
        require_admin(user)?;
        self.find(id).await
    }

    pub async fn list(&self, user: &AuthUser, query: WeredaListQuery) -> Result<Listing<WeredaUnit>, ServiceError> {
        require_admin(user)?;

        let mut conditions = Map::new();
        if let Some(name) = clean(query.name) {
            conditions.insert("name".into(), json!({ "$ilike": name }));
        }
        if let Some(region) = clean(query.region) {
            conditions.insert("address.region".into(), json!({ "$ilike": region }));
        }
        if let Some(search) = clean(query.search) {
            conditions.insert("$text".into(), json!(search));
        }

        let page = query.page.resolve(&self.pagination);
        let (items, pagination) = fetch_page(&self.repos.wereda_units, &page, conditions, "name").await?;
        Ok(Listing {
            key: "weredaUnits",
            items,
            pagination,
        })
    }

    async fn find(&self, id: Uuid) -> Result<WeredaUnit, ServiceError> {
        self.repos
            .wereda_units
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Wereda unit not found."))
    }
}

/// Builds a complete address from `payload`, falling back to `current` for omitted parts.
fn read_address(
    violations: &mut Violations,
    payload: AddressPayload,
    current: Option<&WeredaAddress>,
) -> Option<WeredaAddress> {
    let region = match payload.region {
        Some(region) => clean(Some(region)),
        None => current.map(|a| a.region.clone()),
    };
    let region = violations.require("address.region", region, "Region is required");
    let mut part = |patch: Option<Option<String>>, existing: Option<&String>, field: &str, label: &str| {
        let value = match clean_patch(patch) {
            Some(value) => value,
            None => existing.cloned(),
        };
        violations.require(field, value, &format!("{} is required", label))
    };
    let zone = part(payload.zone, current.map(|a| &a.zone), "address.zone", "Zone");
    let woreda = part(payload.woreda, current.map(|a| &a.woreda), "address.woreda", "Woreda");
    let kebele = part(payload.kebele, current.map(|a| &a.kebele), "address.kebele", "Kebele");

    Some(WeredaAddress {
        region: region?,
        zone: zone?,
        woreda: woreda?,
        kebele: kebele?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(region: Option<&str>, zone: Option<Option<&str>>) -> AddressPayload {
        AddressPayload {
            region: region.map(str::to_string),
            zone: zone.map(|z| z.map(str::to_string)),
            woreda: Some(Some("Bahir Dar".to_string())),
            kebele: Some(Some("04".to_string())),
        }
    }

    #[test]
    fn address_needs_every_part() {
        let mut violations = Violations::new();
        assert!(read_address(&mut violations, payload(Some("Amhara"), Some(Some("West Gojjam"))), None).is_some());
        assert!(violations.is_empty());

        let mut violations = Violations::new();
        assert!(read_address(&mut violations, payload(None, Some(None)), None).is_none());
        let fields: Vec<_> = violations.into_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["address.region", "address.zone"]);
    }

    #[test]
    fn address_patch_keeps_omitted_parts() {
        let current = WeredaAddress {
            region: "Amhara".into(),
            zone: "West Gojjam".into(),
            woreda: "Bahir Dar".into(),
            kebele: "01".into(),
        };
        let mut violations = Violations::new();
        let patch = AddressPayload {
            kebele: Some(Some("09".into())),
            ..Default::default()
        };
        let next = read_address(&mut violations, patch, Some(&current)).unwrap();
        assert_eq!(next.kebele, "09");
        assert_eq!(next.zone, "West Gojjam");
    }
}
