use chrono::{DateTime, NaiveDate};
use serde::de::DeserializeOwned;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{json, Map, Value};

use super::ServiceError;
use crate::config::PaginationConfig;
use crate::database::Repository;
use crate::filter::FilterData;
use crate::models::Document;

/// Raw paging parameters from a query string.
///
/// Unparseable or non-positive values fall back to defaults instead of failing.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageRequest {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl PageRequest {
    pub fn resolve(&self, config: &PaginationConfig) -> Page {
        let positive = |raw: &Option<String>| {
            raw.as_deref()
                .and_then(|s| s.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
        };
        let page = positive(&self.page).unwrap_or(1);
        let limit = positive(&self.limit)
            .unwrap_or(config.default_limit)
            .min(config.max_limit.max(1));
        let sort = self
            .sort
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        Page { page, limit, sort }
    }
}

impl Page {
    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }

    /// Filter for one page of `conditions`, sorted by the requested or default sort.
    pub fn filter(&self, conditions: Map<String, Value>, default_sort: &str) -> FilterData {
        let sort = self.sort.clone().unwrap_or_else(|| default_sort.to_string());
        FilterData {
            where_clause: Some(Value::Object(conditions)),
            order: Some(Value::String(sort)),
            limit: Some(self.limit as i64),
            offset: Some(self.offset()),
        }
    }

    pub fn pagination(&self, total: i64) -> Pagination {
        let total = total.max(0) as u64;
        let limit = self.limit.max(1) as u64;
        Pagination {
            page: self.page,
            limit: self.limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

/// Runs `conditions` as one page against `repo` and counts the full match set.
pub async fn fetch_page<T: Document>(
    repo: &Repository<T>,
    page: &Page,
    conditions: Map<String, Value>,
    default_sort: &str,
) -> Result<(Vec<T>, Pagination), ServiceError> {
    let count_filter = FilterData::where_clause(Value::Object(conditions.clone()));
    let items = repo.select_any(page.filter(conditions, default_sort)).await?;
    let total = repo.count(count_filter).await?;
    Ok((items, page.pagination(total)))
}

/// Parses a query-string enum value using its serialized spelling.
pub fn parse_enum<T: DeserializeOwned>(field: &str, raw: &str) -> Result<T, ServiceError> {
    serde_json::from_value(Value::String(raw.trim().to_string()))
        .map_err(|_| ServiceError::validation(format!("Invalid {} filter: {}", field, raw)))
}

/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
pub fn parse_date(field: &str, raw: &str) -> Result<NaiveDate, ServiceError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| ServiceError::validation(format!("Invalid {}: expected YYYY-MM-DD", field)))
}

/// Adds an inclusive `startDate`/`endDate` range on `field` to `conditions`.
pub fn date_range(
    conditions: &mut Map<String, Value>,
    field: &str,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<(), ServiceError> {
    let mut range = Map::new();
    if let Some(raw) = start {
        range.insert("$gte".to_string(), json!(parse_date("startDate", raw)?));
    }
    if let Some(raw) = end {
        range.insert("$lte".to_string(), json!(parse_date("endDate", raw)?));
    }
    if let (Some(Value::String(from)), Some(Value::String(to))) = (range.get("$gte"), range.get("$lte")) {
        if from > to {
            return Err(ServiceError::validation("startDate must not be after endDate"));
        }
    }
    if !range.is_empty() {
        conditions.insert(field.to_string(), Value::Object(range));
    }
    Ok(())
}

/// One page of results, serialized as `{ <key>: [...], pagination: {...} }`.
#[derive(Debug, Clone)]
pub struct Listing<T> {
    pub key: &'static str,
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T: Serialize> Serialize for Listing<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.key, &self.items)?;
        map.serialize_entry("pagination", &self.pagination)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PaginationConfig {
        PaginationConfig {
            default_limit: 10,
            max_limit: 100,
        }
    }

    fn request(page: Option<&str>, limit: Option<&str>) -> PageRequest {
        PageRequest {
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
            sort: None,
        }
    }

    #[test]
    fn defaults_and_fallbacks() {
        let page = request(None, None).resolve(&config());
        assert_eq!((page.page, page.limit), (1, 10));

        let page = request(Some("abc"), Some("-4")).resolve(&config());
        assert_eq!((page.page, page.limit), (1, 10));

        let page = request(Some("3"), Some("1000")).resolve(&config());
        assert_eq!((page.page, page.limit), (3, 100));
        assert_eq!(page.offset(), 200);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = request(Some("2"), Some("5")).resolve(&config());
        let p = page.pagination(12);
        assert_eq!(p.total_pages, 3);
        assert_eq!(page.pagination(0).total_pages, 0);
        assert_eq!(page.pagination(10).total_pages, 2);
    }

    #[test]
    fn date_range_is_inclusive_and_ordered() {
        let mut conditions = Map::new();
        date_range(&mut conditions, "dateOfDeath", Some("2020-01-01"), Some("2020-12-31")).unwrap();
        assert_eq!(conditions["dateOfDeath"], json!({ "$gte": "2020-01-01", "$lte": "2020-12-31" }));

        let mut conditions = Map::new();
        assert!(date_range(&mut conditions, "dateOfDeath", Some("2021-01-01"), Some("2020-01-01")).is_err());
        assert!(date_range(&mut conditions, "dateOfDeath", Some("yesterday"), None).is_err());
    }

    #[test]
    fn parses_timestamps_as_dates() {
        let d = parse_date("startDate", "2020-03-04T10:00:00Z").unwrap();
        assert_eq!(d, NaiveDate::from_ymd_opt(2020, 3, 4).unwrap());
    }

    #[test]
    fn enum_filters_use_serialized_names() {
        use crate::models::MemberRole;
        let role: MemberRole = parse_enum("role", "Sunday School Teacher").unwrap();
        assert_eq!(role, MemberRole::SundaySchoolTeacher);
        assert!(parse_enum::<MemberRole>("role", "Bishop").is_err());
    }

    #[test]
    fn listing_uses_plural_key() {
        let page = request(None, None).resolve(&config());
        let listing = Listing {
            key: "parishes",
            items: vec![1, 2],
            pagination: page.pagination(2),
        };
        let v = serde_json::to_value(&listing).unwrap();
        assert_eq!(v["parishes"], serde_json::json!([1, 2]));
        assert_eq!(v["pagination"]["totalPages"], 1);
    }
}
