use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{double_option, Document};
use crate::database::Collection;

/// Geographic administrative unit, the root of the hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeredaUnit {
    pub id: Uuid,
    pub name: String,
    pub address: WeredaAddress,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeredaAddress {
    pub region: String,
    pub zone: String,
    pub woreda: String,
    pub kebele: String,
}

impl Document for WeredaUnit {
    const COLLECTION: Collection = Collection::WeredaUnits;

    fn id(&self) -> Uuid {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeredaUnitPayload {
    pub name: Option<String>,
    pub address: Option<AddressPayload>,
}

/// Address fields as sent by clients. Shared by wereda units and parishes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPayload {
    pub region: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub zone: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub woreda: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub kebele: Option<Option<String>>,
}
