//! Document store boundary.
//!
//! Record collections live in an external document database. Documents are
//! plain key-value maps; each backend translates to its own storage.

#[cfg(feature = "firestore")]
pub mod firestore;
mod memory;
mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use memory::MemoryStore;
pub use sqlite::{DocumentDatabase, SqliteStore};

/// Raw field map of a stored document.
pub type Fields = Map<String, Value>;

/// A stored document: identifier plus raw fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Document store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed document: {0}")]
    Malformed(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<crate::db::DatabaseError> for StoreError {
    fn from(e: crate::db::DatabaseError) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Malformed(e.to_string())
    }
}

/// Per-collection document operations.
///
/// Every call is an independent round-trip; there is no transaction spanning
/// more than one document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents of a collection, in stored order.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// A single document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Create or replace a document.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Merge `partial` into an existing document.
    async fn update(&self, collection: &str, id: &str, partial: Fields) -> Result<(), StoreError>;

    /// Delete a document. Deleting an absent document is not an error.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Documents whose `field` equals `value`, in stored order.
    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError>;
}
