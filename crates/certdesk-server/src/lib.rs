//! `certdesk` Server Library
//!
//! Back end of the certificate-verification admin console:
//! - SQLite storage for admin accounts and refresh tokens
//! - JWT sessions and argon2id password hashing
//! - Axum HTTP API for every console view
//! - Bulk import of documents into the record store

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod import;
pub mod routes;
pub mod server;
pub mod storage;
