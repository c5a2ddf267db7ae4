//! In-process document store.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Fields, StoreError};

/// Collections kept in memory; each collection is a `Vec` so listing
/// preserves insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id))
            .cloned())
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if let Some(existing) = docs.iter_mut().find(|d| d.id == id) {
            existing.fields = fields;
        } else {
            docs.push(Document::new(id, fields));
        }
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, partial: Fields) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let doc = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| d.id == id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        doc.fields.extend(partial);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        if let Some(docs) = collections.get_mut(collection) {
            docs.retain(|d| d.id != id);
        }
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.fields.get(field) == Some(value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
