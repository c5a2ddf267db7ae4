//! Row types for the admin database.

use serde::{Deserialize, Serialize};

pub const ROLE_ADMIN: &str = "Admin";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Admin {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
    pub password_hash: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Token {
    pub id: String,
    pub admin_id: String,
    pub token_hash: String,
    pub expires_at: i64,
    pub revoked: i64,
    pub created_at: i64,
}
