//! Sign-up, sign-in, token rotation and sign-out.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use super::AppState;
use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::server::auth_svc::{LoginRequest, RefreshRequest, RegisterRequest, TokenPair};

/// `POST /api/auth/register`
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenPair>), ApiError> {
    let session = state.auth.register(req).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// `POST /api/auth/login`
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    Ok(Json(state.auth.login(req).await?))
}

/// `POST /api/auth/refresh`
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    Ok(Json(state.auth.refresh(req).await?))
}

/// `POST /api/auth/logout`
pub async fn logout(
    State(state): State<AppState>,
    admin: AdminAuth,
) -> Result<Json<Value>, ApiError> {
    let revoked = state.auth.logout(admin.admin_id()).await?;
    Ok(Json(json!({ "revoked": revoked })))
}
