pub mod baptism;
pub mod death;
pub mod marriage;
pub mod member;
pub mod parish;
pub mod user;
pub mod wereda;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::database::Collection;

pub use baptism::{BaptismPayload, BaptismRecord, BaptismView, ParentContact, ParentContactPayload};
pub use death::{DeathPayload, DeathRecord, DeathView};
pub use marriage::{DivorcePayload, MarriagePayload, MarriageRecord, MarriageView};
pub use member::{EducationLevel, Gender, LiveStatus, Member, MemberPayload, MemberRole, MemberView};
pub use parish::{ContactPerson, ContactPersonPayload, Parish, ParishAddress, ParishPayload, ParishView};
pub use user::{Role, User, UserView};
pub use wereda::{AddressPayload, WeredaAddress, WeredaUnit, WeredaUnitPayload};

/// A record stored as one JSON document in a `Collection`.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> Uuid;
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
///
/// Use with `#[serde(default, deserialize_with = "double_option")]`.
/// A reference field in a response: the referenced document when it resolves, else the bare id.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Populated<T> {
    Document(T),
    Id(Uuid),
}

impl<T> Populated<T> {
    pub fn from_lookup(id: Uuid, document: Option<T>) -> Self {
        match document {
            Some(document) => Populated::Document(document),
            None => Populated::Id(id),
        }
    }
}

pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
