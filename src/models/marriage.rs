use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, Document, MemberView, Parish, Populated};
use crate::database::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarriageRecord {
    pub id: Uuid,
    pub husband: Uuid,
    pub wife: Uuid,
    pub marriage_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marriage_place: Option<String>,
    /// Church of marriage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parish: Option<Uuid>,
    pub is_active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divorce_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub divorce_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MarriageRecord {
    /// Normalizes divorce state and reports the first broken divorce rule.
    pub fn check_divorce_rules(&mut self) -> Result<(), &'static str> {
        if let Some(divorce_date) = self.divorce_date {
            if divorce_date <= self.marriage_date {
                return Err("Divorce date must be after marriage date.");
            }
            self.is_active = false;
        }
        if self.divorce_reason.is_some() && self.divorce_date.is_none() {
            return Err("Divorce reason requires a divorce date.");
        }
        if !self.is_active && self.divorce_date.is_none() {
            return Err("Inactive marriage requires a divorce date.");
        }
        Ok(())
    }
}

impl Document for MarriageRecord {
    const COLLECTION: Collection = Collection::Marriages;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Marriage as returned by the API: spouses and parish expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarriageView {
    pub id: Uuid,
    pub husband: Populated<MemberView>,
    pub wife: Populated<MemberView>,
    pub marriage_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marriage_place: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parish: Option<Populated<Parish>>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divorce_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub divorce_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarriagePayload {
    pub husband: Option<String>,
    pub wife: Option<String>,
    pub marriage_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub marriage_place: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub parish: Option<Option<String>>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub divorce_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "double_option")]
    pub divorce_reason: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DivorcePayload {
    pub divorce_date: Option<NaiveDate>,
    pub divorce_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(marriage: (i32, u32, u32), divorce: Option<(i32, u32, u32)>) -> MarriageRecord {
        let date = |(y, m, d): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, d).unwrap();
        MarriageRecord {
            id: Uuid::new_v4(),
            husband: Uuid::new_v4(),
            wife: Uuid::new_v4(),
            marriage_date: date(marriage),
            marriage_place: None,
            parish: None,
            is_active: true,
            divorce_date: divorce.map(date),
            divorce_reason: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn divorce_date_deactivates() {
        let mut r = record((2010, 1, 1), Some((2015, 1, 1)));
        assert!(r.check_divorce_rules().is_ok());
        assert!(!r.is_active);
    }

    #[test]
    fn divorce_must_follow_marriage() {
        let mut same_day = record((2010, 1, 1), Some((2010, 1, 1)));
        assert!(same_day.check_divorce_rules().is_err());
        let mut earlier = record((2010, 1, 1), Some((2009, 1, 1)));
        assert!(earlier.check_divorce_rules().is_err());
    }

    #[test]
    fn reason_and_inactive_need_a_date() {
        let mut r = record((2010, 1, 1), None);
        r.divorce_reason = Some("Separation".to_string());
        assert_eq!(r.check_divorce_rules(), Err("Divorce reason requires a divorce date."));

        let mut r = record((2010, 1, 1), None);
        r.is_active = false;
        assert_eq!(r.check_divorce_rules(), Err("Inactive marriage requires a divorce date."));
    }
}
