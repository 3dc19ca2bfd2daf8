use std::marker::PhantomData;
use std::sync::Arc;

use uuid::Uuid;

use crate::database::store::{DocumentStore, StoreError};
use crate::filter::{Filter, FilterData};
use crate::models::Document;

/// Typed access to one collection of a `DocumentStore`.
pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _phantom: PhantomData<fn() -> T>,
}

impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T: Document> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _phantom: PhantomData,
        }
    }

    fn filter(&self, filter_data: FilterData) -> Result<Filter, StoreError> {
        let collection = T::COLLECTION;
        let mut filter = Filter::new(collection.table_name())?.with_search_fields(collection.search_fields());
        filter.assign(filter_data)?;
        Ok(filter)
    }

    fn decode(doc: serde_json::Value) -> Result<T, StoreError> {
        Ok(serde_json::from_value(doc)?)
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, StoreError> {
        let filter = self.filter(filter_data)?;
        let docs = self.store.find(T::COLLECTION, &filter).await?;
        docs.into_iter().map(Self::decode).collect()
    }

    pub async fn select_one(&self, mut filter_data: FilterData) -> Result<Option<T>, StoreError> {
        filter_data.limit = Some(1);
        Ok(self.select_any(filter_data).await?.into_iter().next())
    }

    pub async fn select_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.store.get(T::COLLECTION, id).await?.map(Self::decode).transpose()
    }

    pub async fn exists(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.store.get(T::COLLECTION, id).await?.is_some())
    }

    pub async fn count(&self, filter_data: FilterData) -> Result<i64, StoreError> {
        let filter = self.filter(filter_data)?;
        self.store.count(T::COLLECTION, &filter).await
    }

    pub async fn insert(&self, record: &T) -> Result<(), StoreError> {
        let doc = serde_json::to_value(record)?;
        self.store.insert(T::COLLECTION, record.id(), doc).await
    }

    pub async fn update(&self, record: &T) -> Result<(), StoreError> {
        let doc = serde_json::to_value(record)?;
        self.store.replace(T::COLLECTION, record.id(), doc).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.store.delete(T::COLLECTION, id).await
    }
}
