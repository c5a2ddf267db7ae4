//! Admin identity flows: sign-up, sign-in, token rotation, sign-out and
//! profile management.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auth::jwt::JwtManager;
use crate::auth::password;
use crate::error::ApiError;
use crate::storage::{Admin, AdminDatabase, DatabaseError, NewAdmin};

#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub registration_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateProfileRequest {
    pub display_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub photo_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// Issued session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub admin_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in_secs: i64,
}

/// Admin profile as shown on the profile page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminProfile {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub photo_url: Option<String>,
    pub role: String,
    pub created_at: i64,
}

impl From<Admin> for AdminProfile {
    fn from(admin: Admin) -> Self {
        Self {
            id: admin.id,
            email: admin.email,
            display_name: admin.display_name,
            phone: admin.phone,
            photo_url: admin.photo_url,
            role: admin.role,
            created_at: admin.created_at,
        }
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn is_plausible_email(email: &str) -> bool {
    email.split_once('@').is_some_and(|(local, domain)| {
        !local.is_empty()
            && domain.contains('.')
            && !domain.starts_with('.')
            && !domain.ends_with('.')
            && !email.contains(char::is_whitespace)
    })
}

/// Blank optional text is stored as NULL.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn token_error(e: &jsonwebtoken::errors::Error) -> ApiError {
    ApiError::Internal(format!("Token creation failed: {e}"))
}

pub struct AuthService {
    db: AdminDatabase,
    jwt: Arc<JwtManager>,
    registration_code: Option<String>,
}

impl AuthService {
    /// A blank `registration_code` leaves registration closed.
    pub fn new(db: AdminDatabase, jwt: Arc<JwtManager>, registration_code: Option<String>) -> Self {
        Self {
            db,
            jwt,
            registration_code: registration_code.filter(|code| !code.trim().is_empty()),
        }
    }

    pub fn jwt(&self) -> &JwtManager {
        &self.jwt
    }

    /// Every check that needs no storage access.
    fn validate_registration(&self, req: &RegisterRequest) -> Result<(), ApiError> {
        let Some(code) = self.registration_code.as_deref() else {
            return Err(ApiError::Forbidden("Admin registration is disabled".into()));
        };
        if req.display_name.trim().is_empty() {
            return Err(ApiError::BadRequest("Display name is required".into()));
        }
        if !is_plausible_email(req.email.trim()) {
            return Err(ApiError::BadRequest("Invalid email address".into()));
        }
        password::check_new_password(&req.password, &req.confirm_password)
            .map_err(|reason| ApiError::BadRequest(reason.into()))?;
        if req.registration_code != code {
            return Err(ApiError::Forbidden("Invalid admin registration code".into()));
        }
        Ok(())
    }

    /// Issue a token pair and persist the refresh token hash.
    async fn start_session(&self, admin_id: &str, email: &str) -> Result<TokenPair, ApiError> {
        let (access_token, expires_in_secs) = self
            .jwt
            .issue_access_token(admin_id, email)
            .map_err(|e| token_error(&e))?;
        let (refresh_token, refresh_exp) = self
            .jwt
            .issue_refresh_token(admin_id, email)
            .map_err(|e| token_error(&e))?;

        let token_id = uuid::Uuid::new_v4().to_string();
        let token_hash = JwtManager::hash_token(&refresh_token);
        self.db
            .create_token(&token_id, admin_id, &token_hash, refresh_exp)
            .await?;

        Ok(TokenPair {
            admin_id: admin_id.to_string(),
            access_token,
            refresh_token,
            expires_in_secs,
        })
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn register(&self, req: RegisterRequest) -> Result<TokenPair, ApiError> {
        self.validate_registration(&req)?;

        let email = normalize_email(&req.email);
        match self.db.get_admin_by_email(&email).await {
            Ok(_) => return Err(ApiError::Conflict("Email already registered".into())),
            Err(DatabaseError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        let hash = password::hash_password(&req.password)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;

        let admin_id = uuid::Uuid::new_v4().to_string();
        self.db
            .create_admin(NewAdmin {
                id: &admin_id,
                email: &email,
                display_name: req.display_name.trim(),
                phone: non_blank(req.phone.as_deref()),
                password_hash: &hash,
            })
            .await?;

        info!(admin_id = %admin_id, "Admin registered");
        self.start_session(&admin_id, &email).await
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<TokenPair, ApiError> {
        let email = normalize_email(&req.email);
        let admin = match self.db.get_admin_by_email(&email).await {
            Ok(admin) => admin,
            Err(DatabaseError::NotFound(_)) => {
                warn!("Login for unknown admin");
                return Err(ApiError::Unauthorized("Invalid credentials".into()));
            }
            Err(e) => return Err(e.into()),
        };

        let valid = password::verify_password(&req.password, &admin.password_hash)
            .map_err(|e| ApiError::Internal(format!("Password verification failed: {e}")))?;
        if !valid {
            warn!(admin_id = %admin.id, "Failed login attempt");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }

        info!(admin_id = %admin.id, "Admin logged in");
        self.start_session(&admin.id, &admin.email).await
    }

    /// Rotate a refresh token: the presented one is revoked.
    #[instrument(skip(self, req))]
    pub async fn refresh(&self, req: RefreshRequest) -> Result<TokenPair, ApiError> {
        let claims = self
            .jwt
            .validate(&req.refresh_token)
            .map_err(|_| ApiError::Unauthorized("Invalid refresh token".into()))?;
        if !claims.is_refresh() {
            return Err(ApiError::BadRequest("Not a refresh token".into()));
        }

        let token_hash = JwtManager::hash_token(&req.refresh_token);
        let stored = self
            .db
            .get_token_by_hash(&token_hash)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Refresh token revoked or expired".into()))?;

        if !self.db.revoke_token(&stored.id).await? {
            return Err(ApiError::Unauthorized("Refresh token already used".into()));
        }
        self.start_session(&claims.sub, &claims.email).await
    }

    #[instrument(skip(self))]
    pub async fn logout(&self, admin_id: &str) -> Result<u64, ApiError> {
        let revoked = self.db.revoke_admin_tokens(admin_id).await?;
        info!(admin_id, revoked, "Admin logged out");
        Ok(revoked)
    }

    async fn admin(&self, admin_id: &str) -> Result<Admin, ApiError> {
        match self.db.get_admin(admin_id).await {
            Ok(admin) => Ok(admin),
            // Account removed while the access token is still live.
            Err(DatabaseError::NotFound(_)) => {
                Err(ApiError::Unauthorized("Admin account not found".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn profile(&self, admin_id: &str) -> Result<AdminProfile, ApiError> {
        Ok(self.admin(admin_id).await?.into())
    }

    /// Email is immutable; only the display fields change.
    #[instrument(skip(self, req))]
    pub async fn update_profile(
        &self,
        admin_id: &str,
        req: UpdateProfileRequest,
    ) -> Result<AdminProfile, ApiError> {
        let display_name = req.display_name.trim();
        if display_name.is_empty() {
            return Err(ApiError::BadRequest("Display name is required".into()));
        }

        let admin = match self
            .db
            .update_admin_profile(
                admin_id,
                display_name,
                non_blank(req.phone.as_deref()),
                non_blank(req.photo_url.as_deref()),
            )
            .await
        {
            Ok(admin) => admin,
            Err(DatabaseError::NotFound(_)) => {
                return Err(ApiError::Unauthorized("Admin account not found".into()));
            }
            Err(e) => return Err(e.into()),
        };

        info!(admin_id, "Admin profile updated");
        Ok(admin.into())
    }

    /// Change password and end every other session.
    #[instrument(skip(self, req))]
    pub async fn change_password(
        &self,
        admin_id: &str,
        req: ChangePasswordRequest,
    ) -> Result<(), ApiError> {
        password::check_new_password(&req.new_password, &req.confirm_password)
            .map_err(|reason| ApiError::BadRequest(reason.into()))?;

        let admin = self.admin(admin_id).await?;
        let valid = password::verify_password(&req.current_password, &admin.password_hash)
            .map_err(|e| ApiError::Internal(format!("Password verification failed: {e}")))?;
        if !valid {
            return Err(ApiError::Unauthorized("Current password is incorrect".into()));
        }

        let hash = password::hash_password(&req.new_password)
            .map_err(|e| ApiError::Internal(format!("Password hashing failed: {e}")))?;
        self.db.update_admin_password(admin_id, &hash).await?;
        let revoked = self.db.revoke_admin_tokens(admin_id).await?;

        info!(admin_id, revoked, "Admin password changed");
        Ok(())
    }
}
