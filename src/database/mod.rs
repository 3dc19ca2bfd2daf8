pub mod manager;
pub mod memory;
pub mod postgres;
pub mod repository;
pub mod store;

use std::sync::Arc;

use crate::models::{BaptismRecord, DeathRecord, MarriageRecord, Member, Parish, User, WeredaUnit};

pub use manager::DatabaseManager;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use repository::Repository;
pub use store::{Collection, DocumentStore, StoreError, UniqueKey};

/// One typed repository per collection, all sharing a store handle.
#[derive(Clone)]
pub struct Repositories {
    pub wereda_units: Repository<WeredaUnit>,
    pub parishes: Repository<Parish>,
    pub members: Repository<Member>,
    pub baptisms: Repository<BaptismRecord>,
    pub marriages: Repository<MarriageRecord>,
    pub deaths: Repository<DeathRecord>,
    pub users: Repository<User>,
}

impl Repositories {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            wereda_units: Repository::new(store.clone()),
            parishes: Repository::new(store.clone()),
            members: Repository::new(store.clone()),
            baptisms: Repository::new(store.clone()),
            marriages: Repository::new(store.clone()),
            deaths: Repository::new(store.clone()),
            users: Repository::new(store),
        }
    }
}
