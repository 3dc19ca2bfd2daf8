use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::store::{Collection, DocumentStore, StoreError};
use crate::filter::Filter;

/// Document store over Postgres: one `(id UUID, doc JSONB)` table per collection.
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply the embedded migrations (tables and unique indexes).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    fn map_write_error(collection: Collection, err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let constraint = db_err.constraint().unwrap_or_default();
                if let Some(key) = collection.unique_keys().iter().find(|k| k.name == constraint) {
                    return StoreError::duplicate(key);
                }
                return StoreError::Duplicate {
                    key: constraint.to_string(),
                    message: "Record already exists.".to_string(),
                };
            }
        }
        StoreError::Sqlx(err)
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn insert(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        let sql = format!("INSERT INTO \"{}\" (id, doc) VALUES ($1, $2)", collection.table_name());
        sqlx::query(&sql)
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(collection, e))?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Value>, StoreError> {
        let sql = format!("SELECT doc FROM \"{}\" WHERE id = $1", collection.table_name());
        let row = sqlx::query_scalar::<_, Json<Value>>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|Json(doc)| doc))
    }

    async fn replace(&self, collection: Collection, id: Uuid, doc: Value) -> Result<(), StoreError> {
        let sql = format!("UPDATE \"{}\" SET doc = $2 WHERE id = $1", collection.table_name());
        let result = sqlx::query(&sql)
            .bind(id)
            .bind(Json(doc))
            .execute(&self.pool)
            .await
            .map_err(|e| Self::map_write_error(collection, e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let sql = format!("DELETE FROM \"{}\" WHERE id = $1", collection.table_name());
        let result = sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find(&self, _collection: Collection, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let sql = filter.to_sql()?;
        debug!("find: {} {:?}", sql.query, sql.params);

        let mut query = sqlx::query_scalar::<_, Json<Value>>(&sql.query);
        for param in &sql.params {
            query = query.bind(param);
        }
        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|Json(doc)| doc).collect())
    }

    async fn count(&self, _collection: Collection, filter: &Filter) -> Result<i64, StoreError> {
        let sql = filter.to_count_sql()?;
        let mut query = sqlx::query_scalar::<_, i64>(&sql.query);
        for param in &sql.params {
            query = query.bind(param);
        }
        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
