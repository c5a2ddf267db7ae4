//! SQLite storage for console administrators and their refresh tokens.

mod models;
mod queries;


pub use certdesk_core::db::DatabaseError;
pub use models::*;
pub use queries::NewAdmin;

certdesk_core::define_database!(AdminDatabase, "admin");
