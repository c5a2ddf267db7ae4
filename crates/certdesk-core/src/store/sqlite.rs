//! `SQLite`-backed document store.
//!
//! Each document is one row holding its fields as JSON text. `seq` records
//! insertion order so listing is stable across restarts.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Document, DocumentStore, Fields, StoreError};
use crate::db::unix_timestamp;

crate::define_database!(DocumentDatabase, "documents");

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    body: String,
}

impl TryFrom<DocumentRow> for Document {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        let fields: Fields = serde_json::from_str(&row.body)?;
        Ok(Self::new(row.id, fields))
    }
}

fn field_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', ""))
}

/// Document store persisted in a local `SQLite` database.
#[derive(Clone)]
pub struct SqliteStore {
    db: DocumentDatabase,
}

impl SqliteStore {
    pub const fn new(db: DocumentDatabase) -> Self {
        Self { db }
    }

    /// In-memory store (for testing).
    pub async fn in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(DocumentDatabase::open_in_memory().await?))
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = ? ORDER BY seq",
        )
        .bind(collection)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?
        .map(Document::try_from)
        .transpose()
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let now = unix_timestamp();
        let body = serde_json::to_string(&fields)?;

        sqlx::query(
            "INSERT INTO documents (collection, id, body, created_at, updated_at) VALUES (?, ?, ?, ?, ?)
             ON CONFLICT (collection, id) DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
        )
        .bind(collection)
        .bind(id)
        .bind(body)
        .bind(now)
        .bind(now)
        .execute(self.db.pool())
        .await?;

        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Fields) -> Result<(), StoreError> {
        let mut tx = self.db.pool().begin().await?;

        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found(collection, id))?;

        let mut doc = Document::try_from(row)?;
        doc.fields.extend(partial);

        sqlx::query("UPDATE documents SET body = ?, updated_at = ? WHERE collection = ? AND id = ?")
            .bind(serde_json::to_string(&doc.fields)?)
            .bind(unix_timestamp())
            .bind(collection)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        debug!(collection, id, "Document updated");
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(collection)
            .bind(id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        // Compare SQL scalars on both sides so strings, numbers and booleans
        // match the way they were stored.
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, body FROM documents
             WHERE collection = ? AND json_extract(body, ?) = json_extract(?, '$')
             ORDER BY seq",
        )
        .bind(collection)
        .bind(field_path(field))
        .bind(serde_json::to_string(value)?)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter().map(Document::try_from).collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    async fn store() -> SqliteStore {
        SqliteStore::in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn set_and_get_roundtrip() {
        let store = store().await;
        store
            .set("certificates", "c1", fields(json!({"score": 91.5, "verification_status": "VERIFIED"})))
            .await
            .unwrap();

        let doc = store.get("certificates", "c1").await.unwrap().unwrap();
        assert_eq!(doc.get("score"), Some(&json!(91.5)));
        assert!(store.get("certificates", "c2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_replaces_without_reordering() {
        let store = store().await;
        store.set("c", "first", fields(json!({"v": 1}))).await.unwrap();
        store.set("c", "second", fields(json!({"v": 2}))).await.unwrap();
        store.set("c", "first", fields(json!({"v": 3}))).await.unwrap();

        let docs = store.list("c").await.unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "first");
        assert_eq!(docs[0].get("v"), Some(&json!(3)));
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = store().await;
        store
            .set("c", "x", fields(json!({"remarks": "", "score": 10})))
            .await
            .unwrap();
        store
            .update("c", "x", fields(json!({"score": 75, "updated_at": 1_700_000_000_000_i64})))
            .await
            .unwrap();

        let doc = store.get("c", "x").await.unwrap().unwrap();
        assert_eq!(doc.get("score"), Some(&json!(75)));
        assert_eq!(doc.get("remarks"), Some(&json!("")));
        assert_eq!(doc.get("updated_at"), Some(&json!(1_700_000_000_000_i64)));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = store().await;
        let err = store.update("c", "ghost", Fields::new()).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn query_eq_filters_by_string_field() {
        let store = store().await;
        store.set("certificates", "a", fields(json!({"user_email": "amy@uni.edu"}))).await.unwrap();
        store.set("certificates", "b", fields(json!({"user_email": "bo@uni.edu"}))).await.unwrap();
        store.set("certificates", "c", fields(json!({"user_email": "amy@uni.edu"}))).await.unwrap();

        let hits = store
            .query_eq("certificates", "user_email", &json!("amy@uni.edu"))
            .await
            .unwrap();
        let ids: Vec<_> = hits.into_iter().map(|d| d.id).collect();
        assert_eq!(ids, ["a", "c"]);
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = store().await;
        store.set("c", "x", Fields::new()).await.unwrap();
        store.delete("c", "x").await.unwrap();
        assert!(store.list("c").await.unwrap().is_empty());
    }
}
