mod common;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::http::StatusCode;
use serde_json::{json, Value};
use uuid::Uuid;

use church_registry::config::AppConfig;
use church_registry::database::{Collection, DocumentStore, MemoryDocumentStore, StoreError};
use church_registry::filter::Filter;

use common::{hierarchy, member_body, TestApp};

/// An in-memory store that refuses to rewrite member documents.
#[derive(Default)]
struct MemberWritesFail {
    inner: MemoryDocumentStore,
}

#[async_trait]
impl DocumentStore for MemberWritesFail {
    fn backend(&self) -> &'static str {
        "member-writes-fail"
    }

    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        self.inner.insert(collection, id, doc).await
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        self.inner.get(collection, id).await
    }

    async fn replace(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        if collection == Collection::Members {
            return Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        self.inner.replace(collection, id, doc).await
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        self.inner.delete(collection, id).await
    }

    async fn find(&self, collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        self.inner.find(collection, filter).await
    }

    async fn count(&self, collection: Collection, filter: &Filter) -> Result<i64, StoreError> {
        self.inner.count(collection, filter).await
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.inner.health_check().await
    }

    async fn close(&self) {}
}

#[tokio::test]
async fn failed_member_update_removes_the_death_record() -> Result<()> {
    let app = TestApp::with_store(AppConfig::development(), Arc::new(MemberWritesFail::default()));
    let h = hierarchy(&app, "A").await?;
    let member = app.create_member(&h.admin, member_body("Abebe", "Male", &h.parish)).await?;

    let res = app
        .post("/deaths", &h.admin, json!({ "member": member, "dateOfDeath": "2020-02-02" }))
        .await?;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);

    let deaths = app.get("/deaths", &h.admin).await?;
    assert_eq!(deaths.data()["pagination"]["total"], 0);

    let shown = app.get(&format!("/members/{}", member), &h.admin).await?;
    assert_eq!(shown.data()["liveStatus"], "Active");
    assert!(shown.data()["death"].is_null());
    Ok(())
}
