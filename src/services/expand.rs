use uuid::Uuid;

use super::{Listing, ServiceError};
use crate::database::{Repositories, Repository};
use crate::models::{
    BaptismRecord, BaptismView, DeathRecord, DeathView, Document, MarriageRecord, MarriageView, MemberView, Parish,
    ParishView, Populated,
};

/// Replaces reference ids in outgoing records with the documents they point at.
///
/// One point lookup per reference. A reference that no longer resolves stays a bare id.
pub struct Expander<'a> {
    repos: &'a Repositories,
}

impl<'a> Expander<'a> {
    pub fn new(repos: &'a Repositories) -> Self {
        Self { repos }
    }

    pub async fn parish(&self, parish: Parish) -> Result<ParishView, ServiceError> {
        Ok(ParishView {
            under: lookup(&self.repos.wereda_units, parish.under).await?,
            id: parish.id,
            name: parish.name,
            address: parish.address,
            contact_person: parish.contact_person,
            created_at: parish.created_at,
            updated_at: parish.updated_at,
        })
    }

    pub async fn baptism(&self, record: BaptismRecord) -> Result<BaptismView, ServiceError> {
        let baptized_by: Option<Populated<MemberView>> = match record.baptized_by {
            Some(id) => Some(lookup(&self.repos.members, id).await?),
            None => None,
        };
        Ok(BaptismView {
            id: record.id,
            member: lookup(&self.repos.members, record.member).await?,
            baptism_date: record.baptism_date,
            parish: lookup(&self.repos.parishes, record.parish).await?,
            baptized_by,
            parent_contact: record.parent_contact,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub async fn marriage(&self, record: MarriageRecord) -> Result<MarriageView, ServiceError> {
        let parish: Option<Populated<Parish>> = match record.parish {
            Some(id) => Some(lookup(&self.repos.parishes, id).await?),
            None => None,
        };
        Ok(MarriageView {
            id: record.id,
            husband: lookup(&self.repos.members, record.husband).await?,
            wife: lookup(&self.repos.members, record.wife).await?,
            marriage_date: record.marriage_date,
            marriage_place: record.marriage_place,
            parish,
            is_active: record.is_active,
            divorce_date: record.divorce_date,
            divorce_reason: record.divorce_reason,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub async fn death(&self, record: DeathRecord) -> Result<DeathView, ServiceError> {
        let grave_location: Option<Populated<Parish>> = match record.grave_location {
            Some(id) => Some(lookup(&self.repos.parishes, id).await?),
            None => None,
        };
        Ok(DeathView {
            id: record.id,
            member: lookup(&self.repos.members, record.member).await?,
            date_of_death: record.date_of_death,
            grave_location,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }

    pub async fn parishes(&self, items: Vec<Parish>) -> Result<Vec<ParishView>, ServiceError> {
        let mut views = Vec::with_capacity(items.len());
        for item in items {
            views.push(self.parish(item).await?);
        }
        Ok(views)
    }

    pub async fn baptisms(&self, listing: Listing<BaptismRecord>) -> Result<Listing<BaptismView>, ServiceError> {
        let mut items = Vec::with_capacity(listing.items.len());
        for item in listing.items {
            items.push(self.baptism(item).await?);
        }
        Ok(Listing {
            key: listing.key,
            items,
            pagination: listing.pagination,
        })
    }

    pub async fn marriages(&self, listing: Listing<MarriageRecord>) -> Result<Listing<MarriageView>, ServiceError> {
        let mut items = Vec::with_capacity(listing.items.len());
        for item in listing.items {
            items.push(self.marriage(item).await?);
        }
        Ok(Listing {
            key: listing.key,
            items,
            pagination: listing.pagination,
        })
    }

    pub async fn deaths(&self, listing: Listing<DeathRecord>) -> Result<Listing<DeathView>, ServiceError> {
        let mut items = Vec::with_capacity(listing.items.len());
        for item in listing.items {
            items.push(self.death(item).await?);
        }
        Ok(Listing {
            key: listing.key,
            items,
            pagination: listing.pagination,
        })
    }
}

async fn lookup<T, V>(repo: &Repository<T>, id: Uuid) -> Result<Populated<V>, ServiceError>
where
    T: Document,
    V: From<T>,
{
    let document = repo.select_id(id).await?.map(V::from);
    Ok(Populated::from_lookup(id, document))
}
