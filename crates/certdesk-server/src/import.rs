//! Bulk document import for seeding a record store.

use serde_json::Value;
use tracing::{info, instrument};

use certdesk_core::model::{CERTIFICATES, PROFILES};
use certdesk_core::store::{DocumentStore, Fields};
use certdesk_core::{Error, Result};

/// Write a JSON array of documents into `collection`.
///
/// Each element must be an object. Its `id` field (string or number) becomes
/// the document id and is not stored as a field; elements without one get a
/// fresh UUID. Returns the number of documents written.
#[instrument(skip(store, docs), fields(count = docs.len()))]
pub async fn import_documents(
    store: &dyn DocumentStore,
    collection: &str,
    docs: Vec<Value>,
) -> Result<usize> {
    if collection != PROFILES && collection != CERTIFICATES {
        return Err(Error::Validation(format!(
            "Unknown collection {collection}; expected {PROFILES} or {CERTIFICATES}"
        )));
    }

    let mut batch: Vec<(String, Fields)> = Vec::with_capacity(docs.len());
    for (index, doc) in docs.into_iter().enumerate() {
        let Value::Object(mut fields) = doc else {
            return Err(Error::Validation(format!(
                "Element {index} is not a JSON object"
            )));
        };
        let id = match fields.remove("id") {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            _ => uuid::Uuid::new_v4().to_string(),
        };
        batch.push((id, fields));
    }

    let written = batch.len();
    for (id, fields) in batch {
        store.set(collection, &id, fields).await?;
    }

    info!(collection, written, "Documents imported");
    Ok(written)
}

/// Parse an import file body: a JSON array of objects.
pub fn parse_documents(raw: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(raw)? {
        Value::Array(docs) => Ok(docs),
        _ => Err(Error::Validation("Import file must hold a JSON array".into())),
    }
}
