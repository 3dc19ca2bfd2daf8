use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, Document, MemberView, Parish, Populated};
use crate::database::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaptismRecord {
    pub id: Uuid,
    pub member: Uuid,
    pub baptism_date: NaiveDate,
    pub parish: Uuid,
    /// Officiating member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub baptized_by: Option<Uuid>,
    pub parent_contact: ParentContact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentContact {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl Document for BaptismRecord {
    const COLLECTION: Collection = Collection::Baptisms;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaptismView {
    pub id: Uuid,
    pub member: Populated<MemberView>,
    pub baptism_date: NaiveDate,
    pub parish: Populated<Parish>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baptized_by: Option<Populated<MemberView>>,
    pub parent_contact: ParentContact,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaptismPayload {
    pub member: Option<String>,
    pub baptism_date: Option<NaiveDate>,
    pub parish: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub baptized_by: Option<Option<String>>,
    pub parent_contact: Option<ParentContactPayload>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentContactPayload {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub phone: Option<Option<String>>,
}
