//! Bearer-token extractor for console routes.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use super::claims::Claims;
use crate::error::ApiError;
use crate::routes::AppState;

/// Claims of an authenticated admin; rejects with 401 when the request has
/// no valid access token.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub Claims);

impl AdminAuth {
    pub fn admin_id(&self) -> &str {
        &self.0.sub
    }
}

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("Missing authorization header".into()))?;

        let claims = state
            .auth
            .jwt()
            .validate(token)
            .map_err(|_| ApiError::Unauthorized("Invalid token".into()))?;

        if !claims.is_access() {
            return Err(ApiError::Unauthorized("Not an access token".into()));
        }

        Ok(Self(claims))
    }
}
