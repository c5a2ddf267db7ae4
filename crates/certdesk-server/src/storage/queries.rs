//! Admin database queries.

use certdesk_core::db::unix_timestamp;

use super::models::{Admin, ROLE_ADMIN, Token};
use super::{AdminDatabase, DatabaseError};

/// Fields of a new admin account.
#[derive(Debug, Clone, Copy)]
pub struct NewAdmin<'a> {
    pub id: &'a str,
    pub email: &'a str,
    pub display_name: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
}

impl AdminDatabase {
    // =========================================================================
    // Admin queries
    // =========================================================================

    pub async fn create_admin(&self, admin: NewAdmin<'_>) -> Result<Admin, DatabaseError> {
        let now = unix_timestamp();

        sqlx::query(
            "INSERT INTO admins (id, email, display_name, phone, role, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(admin.id)
        .bind(admin.email)
        .bind(admin.display_name)
        .bind(admin.phone)
        .bind(ROLE_ADMIN)
        .bind(admin.password_hash)
        .bind(now)
        .bind(now)
        .execute(self.pool())
        .await?;

        self.get_admin(admin.id).await
    }

    pub async fn get_admin(&self, id: &str) -> Result<Admin, DatabaseError> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Admin {id}")))
    }

    pub async fn get_admin_by_email(&self, email: &str) -> Result<Admin, DatabaseError> {
        sqlx::query_as::<_, Admin>("SELECT * FROM admins WHERE email = ?")
            .bind(email)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Admin with email {email}")))
    }

    pub async fn update_admin_profile(
        &self,
        id: &str,
        display_name: &str,
        phone: Option<&str>,
        photo_url: Option<&str>,
    ) -> Result<Admin, DatabaseError> {
        let result = sqlx::query(
            "UPDATE admins SET display_name = ?, phone = ?, photo_url = ?, updated_at = ? WHERE id = ?",
        )
        .bind(display_name)
        .bind(phone)
        .bind(photo_url)
        .bind(unix_timestamp())
        .bind(id)
        .execute(self.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Admin {id}")));
        }
        self.get_admin(id).await
    }

    pub async fn update_admin_password(
        &self,
        id: &str,
        password_hash: &str,
    ) -> Result<(), DatabaseError> {
        let result =
            sqlx::query("UPDATE admins SET password_hash = ?, updated_at = ? WHERE id = ?")
                .bind(password_hash)
                .bind(unix_timestamp())
                .bind(id)
                .execute(self.pool())
                .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("Admin {id}")));
        }
        Ok(())
    }

    // =========================================================================
    // Token queries
    // =========================================================================

    /// Store a refresh token hash.
    pub async fn create_token(
        &self,
        id: &str,
        admin_id: &str,
        token_hash: &str,
        expires_at: i64,
    ) -> Result<Token, DatabaseError> {
        sqlx::query(
            "INSERT INTO tokens (id, admin_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(admin_id)
        .bind(token_hash)
        .bind(expires_at)
        .bind(unix_timestamp())
        .execute(self.pool())
        .await?;

        self.get_token(id).await
    }

    pub async fn get_token(&self, id: &str) -> Result<Token, DatabaseError> {
        sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE id = ?")
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("Token {id}")))
    }

    /// Find a valid (non-revoked, non-expired) token by hash.
    pub async fn get_token_by_hash(&self, token_hash: &str) -> Result<Option<Token>, DatabaseError> {
        let token = sqlx::query_as::<_, Token>(
            "SELECT * FROM tokens WHERE token_hash = ? AND revoked = 0 AND expires_at > ?",
        )
        .bind(token_hash)
        .bind(unix_timestamp())
        .fetch_optional(self.pool())
        .await?;

        Ok(token)
    }

    /// Returns `false` when the token was already revoked, so only one
    /// caller can consume it.
    pub async fn revoke_token(&self, id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("UPDATE tokens SET revoked = 1 WHERE id = ? AND revoked = 0")
            .bind(id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revoke every outstanding refresh token of an admin.
    pub async fn revoke_admin_tokens(&self, admin_id: &str) -> Result<u64, DatabaseError> {
        let result = sqlx::query("UPDATE tokens SET revoked = 1 WHERE admin_id = ? AND revoked = 0")
            .bind(admin_id)
            .execute(self.pool())
            .await?;

        Ok(result.rows_affected())
    }
}
