//! The signed-in admin's own profile.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use super::AppState;
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::server::auth_svc::{AdminProfile, ChangePasswordRequest, UpdateProfileRequest};

/// `GET /api/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    admin: AdminAuth,
) -> Result<Json<AdminProfile>, ApiError> {
    Ok(Json(state.auth.profile(admin.admin_id()).await?))
}

/// `PUT /api/profile`
pub async fn update_profile(
    State(state): State<AppState>,
    admin: AdminAuth,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<AdminProfile>, ApiError> {
    Ok(Json(
        state.auth.update_profile(admin.admin_id(), req).await?,
    ))
}

/// `PUT /api/profile/password`
pub async fn change_password(
    State(state): State<AppState>,
    admin: AdminAuth,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state.auth.change_password(admin.admin_id(), req).await?;
    Ok(StatusCode::NO_CONTENT)
}
