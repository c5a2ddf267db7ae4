//! Error types for `certdesk` core library.

use thiserror::Error;

use crate::repository::CascadeReport;
use crate::store::StoreError;

/// Result type alias using `certdesk` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `certdesk` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Referenced record is absent.
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    /// Input rejected before any store call.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Document store failure (network, permission, backend).
    #[error("Store error: {0}")]
    Store(StoreError),

    /// Multi-step delete stopped short; earlier deletes are not rolled back.
    #[error("Partial delete: {} deleted, {} failed", .0.deleted.len(), .0.failed.len())]
    PartialDelete(CascadeReport),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StoreError> for Error {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { collection, id } => Self::NotFound {
                kind: collection_kind(&collection),
                id,
            },
            other => Self::Store(other),
        }
    }
}

fn collection_kind(collection: &str) -> &'static str {
    match collection {
        crate::model::PROFILES => "User",
        crate::model::CERTIFICATES => "Certificate",
        _ => "Document",
    }
}
