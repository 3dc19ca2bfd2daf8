use chrono::{Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use uuid::Uuid;

use super::pagination::{fetch_page, parse_enum, PageRequest};
use super::{Listing, ServiceError};
use crate::access::{ensure_wereda, require_admin, AccessPolicy, Scope};
use crate::config::PaginationConfig;
use crate::database::Repositories;
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{Gender, LiveStatus, Member, MemberPayload, MemberRole, MemberView};
use crate::state::AppState;
use crate::validation::{clean, clean_patch, merge, today, ReferenceValidator, Violations};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberListQuery {
    pub role: Option<String>,
    pub live_status: Option<String>,
    pub gender: Option<String>,
    pub parish: Option<String>,
    pub min_age: Option<String>,
    pub max_age: Option<String>,
    pub search: Option<String>,
    #[serde(flatten)]
    pub page: PageRequest,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatistics {
    pub total: i64,
    pub by_gender: Vec<GenderCount>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenderCount {
    pub gender: Gender,
    pub count: i64,
}

pub struct MemberService {
    repos: Repositories,
    pagination: PaginationConfig,
}

impl MemberService {
    pub fn new(state: &AppState) -> Self {
        Self {
            repos: state.repos.clone(),
            pagination: state.config.pagination,
        }
    }

    pub async fn create(&self, user: &AuthUser, payload: MemberPayload) -> Result<MemberView, ServiceError> {
        let mut violations = Violations::new();
        let first_name = violations.require("firstName", clean(payload.first_name), "First name is required");
        let gender = violations.require("gender", payload.gender, "Gender is required");
        let date_of_birth = violations.require("dateOfBirth", payload.date_of_birth, "Date of birth is required");
        if payload.live_status == Some(LiveStatus::Deceased) {
            violations.add("liveStatus", "Deceased status is set by recording a death");
        }

        let now = Utc::now();
        let mut member = Member {
            id: Uuid::new_v4(),
            first_name: first_name.unwrap_or_default(),
            father_name: clean_patch(payload.father_name).flatten(),
            grandfather_name: clean_patch(payload.grandfather_name).flatten(),
            gender: gender.unwrap_or(Gender::Male),
            date_of_birth: date_of_birth.unwrap_or_else(today),
            christianity_name: clean_patch(payload.christianity_name).flatten(),
            education_level: payload.education_level.flatten(),
            role: payload.role.unwrap_or_default(),
            live_status: payload.live_status.unwrap_or_default(),
            phone: clean_patch(payload.phone).flatten(),
            emergency_phone: clean_patch(payload.emergency_phone).flatten(),
            parish: None,
            mother_name: clean_patch(payload.mother_name).flatten(),
            mother_father_name: clean_patch(payload.mother_father_name).flatten(),
            soul_father_name: clean_patch(payload.soul_father_name).flatten(),
            photo_url: clean_patch(payload.photo_url).flatten(),
            death: None,
            created_at: now,
            updated_at: now,
        };
        check_fields(&mut violations, &member);
        violations.finish()?;

        let parish = clean_patch(payload.parish).flatten();
        member.parish = self.place(user.scope(), parish.as_deref()).await?;

        self.repos.members.insert(&member).await?;
        info!("Created member {} ({})", member.id, member.full_name());
        Ok(member.into())
    }

    pub async fn update(&self, user: &AuthUser, id: Uuid, payload: MemberPayload) -> Result<MemberView, ServiceError> {
        let current = self.find(id).await?;
        let policy = AccessPolicy::new(&self.repos);
        policy.ensure_member(user.scope(), &current).await?;

        let mut violations = Violations::new();
        let mut next = current.clone();
        if let Some(first_name) = payload.first_name {
            match clean(Some(first_name)) {
                Some(first_name) => next.first_name = first_name,
                None => violations.add("firstName", "First name is required"),
            }
        }
        next.father_name = merge(next.father_name, clean_patch(payload.father_name));
        next.grandfather_name = merge(next.grandfather_name, clean_patch(payload.grandfather_name));
        if let Some(gender) = payload.gender {
            next.gender = gender;
        }
        if let Some(date_of_birth) = payload.date_of_birth {
            next.date_of_birth = date_of_birth;
        }
        next.christianity_name = merge(next.christianity_name, clean_patch(payload.christianity_name));
        next.education_level = merge(next.education_level, payload.education_level);
        if let Some(role) = payload.role {
            next.role = role;
        }
        if let Some(status) = payload.live_status {
            if current.death.is_some() && status != LiveStatus::Deceased {
                violations.add("liveStatus", "Status of a deceased member is managed by their death record");
            } else if current.live_status != LiveStatus::Deceased && status == LiveStatus::Deceased {
                violations.add("liveStatus", "Deceased status is set by recording a death");
            } else {
                next.live_status = status;
            }
        }
        next.phone = merge(next.phone, clean_patch(payload.phone));
        next.emergency_phone = merge(next.emergency_phone, clean_patch(payload.emergency_phone));
        next.mother_name = merge(next.mother_name, clean_patch(payload.mother_name));
        next.mother_father_name = merge(next.mother_father_name, clean_patch(payload.mother_father_name));
        next.soul_father_name = merge(next.soul_father_name, clean_patch(payload.soul_father_name));
        next.photo_url = merge(next.photo_url, clean_patch(payload.photo_url));
        check_fields(&mut violations, &next);
        if next.date_of_birth != current.date_of_birth {
            if let Some(death) = current.death {
                let died = self.repos.deaths.select_id(death).await?.map(|record| record.date_of_death);
                if died.is_some_and(|died| died < next.date_of_birth) {
                    violations.add("dateOfBirth", "Date of death cannot be before date of birth");
                }
            }
        }
        violations.finish()?;

        if let Some(parish) = clean_patch(payload.parish) {
            next.parish = self.place(user.scope(), parish.as_deref()).await?;
        }

        if next == current {
            return Ok(current.into());
        }
        next.updated_at = Utc::now();
        self.repos.members.update(&next).await?;
        info!("Updated member {}", next.id);
        Ok(next.into())
    }

    pub async fn delete(&self, user: &AuthUser, id: Uuid) -> Result<(), ServiceError> {
        require_admin(user)?;
        if !self.repos.members.delete(id).await? {
            return Err(ServiceError::not_found("Member not found."));
        }
        info!("Deleted member {}", id);
        Ok(())
    }

    pub async fn get(&self, user: &AuthUser, id: Uuid) -> Result<MemberView, ServiceError> {
        let member = self.find(id).await?;
        AccessPolicy::new(&self.repos).ensure_member(user.scope(), &member).await?;
        Ok(member.into())
    }

    pub async fn list(&self, user: &AuthUser, query: MemberListQuery) -> Result<Listing<MemberView>, ServiceError> {
        let mut conditions = Map::new();
        if let Some(raw) = clean(query.role) {
            let role: MemberRole = parse_enum("role", &raw)?;
            conditions.insert("role".into(), json!(role));
        }
        if let Some(raw) = clean(query.live_status) {
            let status: LiveStatus = parse_enum("liveStatus", &raw)?;
            conditions.insert("liveStatus".into(), json!(status));
        }
        if let Some(raw) = clean(query.gender) {
            let gender: Gender = parse_enum("gender", &raw)?;
            conditions.insert("gender".into(), json!(gender));
        }
        let min_age = parse_age("minAge", query.min_age)?;
        let max_age = parse_age("maxAge", query.max_age)?;
        if let Some(range) = birth_date_range(today(), min_age, max_age) {
            conditions.insert("dateOfBirth".into(), range);
        }
        if let Some(search) = clean(query.search) {
            conditions.insert("$text".into(), json!(search));
        }
        self.scope_by_parish(user.scope(), &mut conditions, clean(query.parish)).await?;

        let page = query.page.resolve(&self.pagination);
        let (items, pagination) = fetch_page(&self.repos.members, &page, conditions, "firstName").await?;
        Ok(Listing {
            key: "members",
            items: items.into_iter().map(MemberView::from).collect(),
            pagination,
        })
    }

    /// Member count, and per-gender counts for genders that occur.
    pub async fn statistics(&self, user: &AuthUser) -> Result<MemberStatistics, ServiceError> {
        let mut scope_conditions = Map::new();
        self.scope_by_parish(user.scope(), &mut scope_conditions, None).await?;

        let mut total = 0;
        let mut by_gender = Vec::new();
        for gender in Gender::ALL {
            let mut conditions = scope_conditions.clone();
            conditions.insert("gender".into(), json!(gender));
            let count = self
                .repos
                .members
                .count(FilterData::where_clause(Value::Object(conditions)))
                .await?;
            total += count;
            if count > 0 {
                by_gender.push(GenderCount { gender, count });
            }
        }
        Ok(MemberStatistics { total, by_gender })
    }

    /// Resolves the requested parish for a member and checks it is inside the caller's unit.
    async fn place(&self, scope: Scope, parish: Option<&str>) -> Result<Option<Uuid>, ServiceError> {
        match parish {
            Some(raw) => {
                let parish = ReferenceValidator::new(&self.repos).parish(raw).await?;
                ensure_wereda(scope, Some(parish.under))?;
                Ok(Some(parish.id))
            }
            None if scope == Scope::All => Ok(None),
            None => {
                warn!("Wereda admin tried to place a member outside any parish");
                Err(ServiceError::forbidden("Wereda admins must assign members to a parish in their unit."))
            }
        }
    }

    async fn scope_by_parish(
        &self,
        scope: Scope,
        conditions: &mut Map<String, Value>,
        parish: Option<String>,
    ) -> Result<(), ServiceError> {
        if let Some(raw) = parish {
            let parish = ReferenceValidator::new(&self.repos).parish(&raw).await?;
            ensure_wereda(scope, Some(parish.under))?;
            conditions.insert("parish".into(), json!(parish.id));
        } else if let Some(Value::Object(scoped)) = AccessPolicy::new(&self.repos).parish_condition(scope, "parish").await? {
            conditions.extend(scoped);
        }
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Member, ServiceError> {
        self.repos
            .members
            .select_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Member not found."))
    }
}

fn check_fields(violations: &mut Violations, member: &Member) {
    violations.not_future("dateOfBirth", Some(member.date_of_birth), "Date of birth cannot be in the future");
    violations.max_len(
        "christianityName",
        member.christianity_name.as_deref(),
        100,
        "Christianity name cannot exceed 100 characters",
    );
    violations.phone("phone", member.phone.as_deref());
    violations.phone("emergencyPhone", member.emergency_phone.as_deref());
    violations.url("photoUrl", member.photo_url.as_deref());
}

const MAX_AGE: u32 = 200;

fn parse_age(field: &str, raw: Option<String>) -> Result<Option<u32>, ServiceError> {
    let Some(raw) = clean(raw) else {
        return Ok(None);
    };
    let age = raw
        .parse::<u32>()
        .map_err(|_| ServiceError::validation(format!("{} must be a non-negative whole number", field)))?;
    if age > MAX_AGE {
        return Err(ServiceError::validation(format!("{} cannot exceed {}", field, MAX_AGE)));
    }
    Ok(Some(age))
}

/// `dateOfBirth` bounds for members aged `min_age..=max_age` on `today`.
fn birth_date_range(today: NaiveDate, min_age: Option<u32>, max_age: Option<u32>) -> Option<Value> {
    let years_before = |years: u32| today.checked_sub_months(Months::new(years.saturating_mul(12)));
    let mut range = Map::new();
    if let Some(born_by) = min_age.and_then(years_before) {
        range.insert("$lte".into(), json!(born_by));
    }
    if let Some(born_after) = max_age
        .and_then(|age| years_before(age.saturating_add(1)))
        .and_then(|d| d.checked_add_days(Days::new(1)))
    {
        range.insert("$gte".into(), json!(born_after));
    }
    if range.is_empty() {
        None
    } else {
        Some(Value::Object(range))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_bounds_are_inclusive_whole_years() {
        let today = date(2024, 6, 15);
        let range = birth_date_range(today, Some(18), Some(30)).unwrap();
        // 18 today if born on or before 2006-06-15; still 30 if born after 1993-06-15.
        assert_eq!(range["$lte"], json!("2006-06-15"));
        assert_eq!(range["$gte"], json!("1993-06-16"));
        assert!(birth_date_range(today, None, None).is_none());
    }

    #[test]
    fn leap_day_clamps() {
        let range = birth_date_range(date(2024, 2, 29), Some(1), None).unwrap();
        assert_eq!(range["$lte"], json!("2023-02-28"));
    }

    #[test]
    fn ages_must_be_numbers() {
        assert_eq!(parse_age("minAge", Some("20".into())).unwrap(), Some(20));
        assert_eq!(parse_age("minAge", Some(" ".into())).unwrap(), None);
        assert!(parse_age("minAge", Some("-1".into())).is_err());
        assert!(parse_age("maxAge", Some("old".into())).is_err());
        assert_eq!(parse_age("maxAge", Some("200".into())).unwrap(), Some(200));
        assert!(parse_age("minAge", Some("201".into())).is_err());
        assert!(parse_age("minAge", Some("400000000".into())).is_err());
    }

    #[test]
    fn field_checks_cover_formats() {
        let member: Member = serde_json::from_value(json!({
            "id": Uuid::new_v4(),
            "firstName": "Abebe",
            "gender": "Male",
            "dateOfBirth": "2999-01-01",
            "phone": "0911",
            "photoUrl": "ftp://example.org/a.png",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z"
        }))
        .unwrap();
        let mut violations = Violations::new();
        check_fields(&mut violations, &member);
        let fields: Vec<_> = violations.into_errors().into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["dateOfBirth", "phone", "photoUrl"]);
    }
}
