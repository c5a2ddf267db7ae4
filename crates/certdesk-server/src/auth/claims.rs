//! JWT claims carried by admin session tokens.

use serde::{Deserialize, Serialize};

pub const ACCESS: &str = "access";
pub const REFRESH: &str = "refresh";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// JWT ID (unique per token).
    pub jti: String,
    /// Admin ID.
    pub sub: String,
    pub email: String,
    /// Issued at (unix seconds).
    pub iat: i64,
    /// Expiration (unix seconds).
    pub exp: i64,
    /// `access` or `refresh`.
    pub token_type: String,
}

impl Claims {
    pub fn is_access(&self) -> bool {
        self.token_type == ACCESS
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == REFRESH
    }
}
