use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Map};
use tracing::info;
use uuid::Uuid;

use super::pagination::{date_range, fetch_page, PageRequest};
use super::{Expander, Listing, ServiceError};
use crate::access::require_admin;
use crate::config::PaginationConfig;
use crate::database::Repositories;
use crate::middleware::AuthUser;
use crate::models::{DivorcePayload, Gender, MarriagePayload, MarriageRecord, MarriageView, Member};
use crate::state::AppState;
use crate::validation::{clean, clean_patch, merge, ReferenceValidator, Violations};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarriageListQuery {
    pub is_active: Option<String>,
    pub parish: Option<String>,
    pub husband: Option<String>,
    pub wife: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

/// Marriage records. Every operation is admin-only.
pub struct MarriageService {
    repos: Repositories,
    pagination: PaginationConfig,
}

impl MarriageService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            pagination: state.config.pagination,
        }
    }

    pub async fn create(&self, user: &AuthUser, payload: MarriagePayload) -> Result<MarriageView, ServiceError> {
        require_admin(user)?;

        let mut violations = Violations::new();
        let husband = violations.require("husband", clean(payload.husband), "Husband is required");
        let wife = violations.require("wife", clean(payload.wife), "Wife is required");
        let marriage_date = violations.require("marriageDate", payload.marriage_date, "Marriage date is required");
        let marriage_place = clean_patch(payload.marriage_place).flatten();
        let divorce_reason = clean_patch(payload.divorce_reason).flatten();
        check_lengths(&mut violations, marriage_place.as_deref(), divorce_reason.as_deref());
        violations.finish()?;

        let (Some(husband), Some(wife), Some(marriage_date)) = (husband, wife, marriage_date) else {
            return Err(ServiceError::validation("Husband, wife and marriage date are required"));
        };

        let refs = ReferenceValidator::new(&self.repos);
        let husband = refs.member(&husband).await?;
        let wife = refs.member(&wife).await?;
        check_spouses(&husband, &wife)?;
        let parish = match clean_patch(payload.parish).flatten() {
            Some(raw) => Some(refs.parish(&raw).await?.id),
            None => None,
        };

        let now = Utc::now();
        let mut record = MarriageRecord {
            id: Uuid::new_v4(),
            husband: husband.id,
            wife: wife.id,
            marriage_date,
            marriage_place,
            parish,
            is_active: payload.is_active.unwrap_or(true),
            divorce_date: payload.divorce_date.flatten(),
            divorce_reason,
            created_at: now,
            updated_at: now,
        };
        record.check_divorce_rules().map_err(ServiceError::validation)?;

        self.repos.marriages.insert(&record).await?;
        info!("Recorded marriage {} ({} and {})", record.id, record.husband, record.wife);
        Expander::new(&self.repos).marriage(record).await
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, payload: MarriagePayload) -> Result<MarriageView, ServiceError> {
        require_admin(user)?;
        let current = self.find(id).await?;

        let changes_spouse = |raw: &Option<String>, existing: Uuid| {
            clean(raw.clone()).is_some_and(|raw| Uuid::parse_str(&raw).ok() != Some(existing))
        };
        if changes_spouse(&payload.husband, current.husband) || changes_spouse(&payload.wife, current.wife) {
            return Err(ServiceError::validation("Husband and wife cannot be changed"));
        }

        let mut next = current.clone();
        if let Some(date) = payload.marriage_date {
            next.marriage_date = date;
        }
        next.marriage_place = merge(next.marriage_place, clean_patch(payload.marriage_place));
        next.divorce_reason = merge(next.divorce_reason, clean_patch(payload.divorce_reason));
        next.divorce_date = merge(next.divorce_date, payload.divorce_date);
        if let Some(active) = payload.is_active {
            next.is_active = active;
        }

        let mut violations = Violations::new();
        check_lengths(&mut violations, next.marriage_place.as_deref(), next.divorce_reason.as_deref());
        violations.finish()?;

        if let Some(patch) = clean_patch(payload.parish) {
            next.parish = match patch {
                Some(raw) => Some(ReferenceValidator::new(&self.repos).parish(&raw).await?.id),
                None => None,
            };
        }
        next.check_divorce_rules().map_err(ServiceError::validation)?;

        self.save(current, next).await
    }

    /// Ends a marriage, whatever its previous state.
    pub async fn divorce(&self, user: &AuthUser, id: Uuid, payload: DivorcePayload) -> Result<MarriageView, ServiceError> {
        require_admin(user)?;
        let current = self.find(id).await?;

        let mut violations = Violations::new();
        let divorce_date = violations.require("divorceDate", payload.divorce_date, "Divorce date is required");
        let divorce_reason = clean(payload.divorce_reason);
        check_lengths(&mut violations, None, divorce_reason.as_deref());
        violations.finish()?;

        let mut next = current.clone();
        next.is_active = false;
        next.divorce_date = divorce_date;
        if divorce_reason.is_some() {
            next.divorce_reason = divorce_reason;
        }
        next.check_divorce_rules().map_err(ServiceError::validation)?;

        self.save(current, next).await
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<MarriageView, ServiceError> {
        require_admin(user)?;
        let record = self.find(id).await?;
        Expander::new(&self.repos).marriage(record).await
    }

    pub async fn list(&self, user: &AuthUser, query: MarriageListQuery) -> Result<Listing<MarriageView>, ServiceError> {
        require_admin(user)?;

        let refs = ReferenceValidator::new(&self.repos);
        let mut conditions = Map::new();
        if let Some(raw) = clean(query.is_active) {
            let active = match raw.to_ascii_lowercase().as_str() {
                "true" => true,
                "false" => false,
                _ => return Err(ServiceError::validation("isActive must be true or false")),
            };
            conditions.insert("isActive".into(), json!(active));
        }
        if let Some(raw) = clean(query.parish) {
            conditions.insert("parish".into(), json!(refs.parish(&raw).await?.id));
        }
        if let Some(raw) = clean(query.husband) {
            conditions.insert("husband".into(), json!(refs.member(&raw).await?.id));
        }
        if let Some(raw) = clean(query.wife) {
            conditions.insert("wife".into(), json!(refs.member(&raw).await?.id));
        }
        date_range(
            &mut conditions,
            "marriageDate",
            query.start_date.as_deref(),
            query.end_date.as_deref(),
        )?;
        if let Some(search) = clean(query.search) {
            conditions.insert("$text".into(), json!(search));
        }

        let page = query.page.resolve(&self.pagination);
        let (items, pagination) = fetch_page(&self.repos.marriages, &page, conditions, "-marriageDate").await?;
        let listing = Listing {
            key: "marriages",
            items,
            pagination,
        };
        Expander::new(&self.repos).marriages(listing).await
    }

    async fn save(&self, current: MarriageRecord, mut next: MarriageRecord) -> Result<MarriageView, ServiceError> {
        if next == current {
            return Expander::new(&self.repos).marriage(current).await;
        }
        next.updated_at = Utc::now();
        self.repos.marriages.update(&next).await?;
        info!("Updated marriage record {} (active: {})", next.id, next.is_active);
        Expander::new(&self.repos).marriage(next).await
    }

    async fn find(&self, id: Uuid) -> Result<MarriageRecord, ServiceError> {
        self.repos
            .marriages
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Marriage record not found."))
    }
}

fn check_spouses(husband: &Member, wife: &Member) -> Result<(), ServiceError> {
    if husband.gender != Gender::Male {
        return Err(ServiceError::validation("Husband must be a male member."));
    }
    if wife.gender != Gender::Female {
        return Err(ServiceError::validation("Wife must be a female member."));
    }
    Ok(())
}

fn check_lengths(violations: &mut Violations, marriage_place: Option<&str>, divorce_reason: Option<&str>) {
    violations.min_len("marriagePlace", marriage_place, 2, "Marriage place must be at least 2 characters long");
    violations.min_len("divorceReason", divorce_reason, 2, "Divorce reason must be at least 2 characters long");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn member(gender: &str) -> Member {
        serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "firstName": "Test",
            "gender": gender,
            "dateOfBirth": "1990-01-01",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn spouses_must_match_roles() {
        assert!(check_spouses(&member("Male"), &member("Female")).is_ok());
        assert!(check_spouses(&member("Female"), &member("Female")).is_err());
        assert!(check_spouses(&member("Male"), &member("Male")).is_err());
    }

    #[test]
    fn short_texts_are_rejected() {
        let mut violations = Violations::new();
        check_lengths(&mut violations, Some("A"), Some("ok"));
        let errors = violations.into_errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "marriagePlace");
    }
}
