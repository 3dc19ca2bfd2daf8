use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, Document, MemberView, Parish, Populated};
use crate::database::Collection;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathRecord {
    pub id: Uuid,
    pub member: Uuid,
    pub date_of_death: NaiveDate,
    /// Parish holding the grave.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grave_location: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document for DeathRecord {
    const COLLECTION: Collection = Collection::Deaths;

    fn id(&self) -> Uuid {
        self.id
    }
}

/// Death record as returned by the API, with its member and grave parish expanded.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathView {
    pub id: Uuid,
    pub member: Populated<MemberView>,
    pub date_of_death: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grave_location: Option<Populated<Parish>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeathPayload {
    pub member: Option<String>,
    pub date_of_death: Option<NaiveDate>,
    #[serde(default, deserialize_with = "double_option")]
    pub grave_location: Option<Option<String>>,
}
