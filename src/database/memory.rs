use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::store::{Collection, DocumentStore, StoreError, UniqueKey};
use crate::filter::filter_eval::text_at;
use crate::filter::Filter;

type Documents = HashMap<Uuid, Value>;

/// Process-local document store. Unique keys are checked while holding the
/// write lock, so a check and the write that follows it cannot interleave.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<Collection, Documents>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key_values(doc: &Value, key: &UniqueKey) -> Option<Vec<String>> {
        key.fields.iter().map(|field| text_at(doc, field)).collect()
    }

    fn check_unique(collection: Collection, docs: &Documents, id: Uuid, doc: &Value) -> Result<(), StoreError> {
        for key in collection.unique_keys() {
            let Some(values) = Self::key_values(doc, key) else {
                continue;
            };
            let taken = docs
                .iter()
                .any(|(other_id, other)| *other_id != id && Self::key_values(other, key).as_ref() == Some(&values));
            if taken {
                return Err(StoreError::duplicate(key));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if docs.contains_key(&id) {
            return Err(StoreError::Duplicate {
                key: format!("{}_pkey", collection.table_name()),
                message: "Record already exists.".to_string(),
            });
        }
        Self::check_unique(collection, docs, id, &doc)?;
        docs.insert(id, doc);
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(&collection).and_then(|docs| docs.get(&id)).cloned())
    }

    async fn replace(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection).or_default();
        if !docs.contains_key(&id) {
            return Err(StoreError::NotFound);
        }
        Self::check_unique(collection, docs, id, &doc)?;
        docs.insert(id, doc);
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(&collection)
            .map(|docs| docs.remove(&id).is_some())
            .unwrap_or(false))
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&collection) else {
            return Ok(vec![]);
        };

        let mut rows = Vec::new();
        for doc in docs.values() {
            if filter.matches(doc)? {
                rows.push(doc);
            }
        }
        rows.sort_by(|a, b| filter.compare(a, b));

        let rows = rows.into_iter().skip(filter.offset_value());
        Ok(match filter.limit_value() {
            Some(limit) => rows.take(limit).cloned().collect(),
            None => rows.cloned().collect(),
        })
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<i64, StoreError> {
        let collections = self.collections.read().await;
        let Some(docs) = collections.get(&collection) else {
            return Ok(0);
        };
        let mut total = 0;
        for doc in docs.values() {
            if filter.matches(doc)? {
                total += 1;
            }
        }
        Ok(total)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn close(&self) {
        self.collections.write().await.clear();
    }
}
