//! `certdesk` Core Library
//!
//! Shared functionality for the certificate-verification admin console:
//! - Record model and normalization of raw stored documents
//! - Document store boundary (memory, SQLite, Firestore backends)
//! - Record repository over the three console collections
//! - Statistics aggregation and dashboard reporting
//! - View state machines for list, detail and edit-status views
//! - Configuration resolution, common error types and tracing setup

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod normalize;
pub mod repository;
pub mod stats;
pub mod store;
pub mod tracing_init;
pub mod views;

pub use config::Config;
pub use error::{Error, Result};
pub use model::{Certificate, UserProfile, VerificationStatus};
pub use repository::Repository;
pub use store::{Document, DocumentStore, StoreError};
