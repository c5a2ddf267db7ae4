//! Dashboard, record list/detail views, status edits and deletes.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::instrument;

use certdesk_core::model::{Certificate, UserDetail};
use certdesk_core::repository::CascadeReport;
use certdesk_core::stats::{self, Dashboard, StatisticsReport};
use certdesk_core::views::{ListView, Searchable, StatusFilter, StatusForm};
use certdesk_core::VerificationStatus;

use super::AppState;
use crate::auth::AdminAuth;
use crate::error::ApiError;

/// Search box and status filter of the list views.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl ListQuery {
    /// Apply to freshly fetched rows and render `{ state, total, rows }`.
    fn render<T: Searchable + serde::Serialize>(&self, rows: Vec<T>) -> Result<Response, ApiError> {
        let mut view = ListView::new();
        view.complete(Ok(rows));
        if let Some(q) = &self.q {
            view.search(q);
        }
        if let Some(status) = &self.status {
            view.filter(status.parse::<StatusFilter>()?);
        }
        Ok(Json(view.page()).into_response())
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub verification_status: String,
    pub score: f64,
    #[serde(default)]
    pub remarks: String,
}

/// `GET /api/dashboard`
#[instrument(skip_all)]
pub async fn dashboard(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Dashboard>, ApiError> {
    let (profiles, certificates) =
        tokio::try_join!(state.repo.list_profiles(), state.repo.list_certificates())?;
    Ok(Json(stats::dashboard(&certificates, profiles.len())))
}

/// `GET /api/users`: search only, users carry no verification status.
#[instrument(skip_all)]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    if let Some(status) = &query.status {
        if matches!(status.parse::<StatusFilter>()?, StatusFilter::Only(_)) {
            return Err(ApiError::BadRequest(
                "The user list cannot be filtered by status".into(),
            ));
        }
    }
    query.render(state.repo.list_user_summaries().await?)
}

/// `GET /api/users/{id}`
#[instrument(skip(state, _admin))]
pub async fn get_user(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<UserDetail>, ApiError> {
    Ok(Json(state.repo.user_detail(&id).await?))
}

/// `DELETE /api/users/{id}`: the user and every certificate they own.
#[instrument(skip(state, admin), fields(admin_id = %admin.admin_id()))]
pub async fn delete_user(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<CascadeReport>, ApiError> {
    Ok(Json(state.repo.delete_user_with_certificates(&id).await?))
}

/// `GET /api/certificates`
#[instrument(skip_all)]
pub async fn list_certificates(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    query.render(state.repo.list_certificates().await?)
}

/// `GET /api/certificates/{id}`
#[instrument(skip(state, _admin))]
pub async fn get_certificate(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<Certificate>, ApiError> {
    Ok(Json(state.repo.get_certificate(&id).await?))
}

/// `DELETE /api/certificates/{id}`
#[instrument(skip(state, admin), fields(admin_id = %admin.admin_id()))]
pub async fn delete_certificate(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.repo.delete_certificate(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/certificates/{id}/status`: the edit form, prefilled.
#[instrument(skip(state, _admin))]
pub async fn status_form(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Path(id): Path<String>,
) -> Result<Json<StatusForm>, ApiError> {
    let cert = state.repo.get_certificate(&id).await?;
    Ok(Json(StatusForm::for_certificate(&cert)))
}

/// `PUT /api/certificates/{id}/status`
#[instrument(skip(state, admin, req), fields(admin_id = %admin.admin_id()))]
pub async fn save_status(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Result<Json<StatusForm>, ApiError> {
    let status = VerificationStatus::parse(&req.verification_status).ok_or_else(|| {
        ApiError::BadRequest(format!(
            "Unknown verification status: {}",
            req.verification_status
        ))
    })?;

    let mut form = StatusForm::new(id, status, req.score, req.remarks);
    form.submit(&state.repo).await?;
    Ok(Json(form))
}

/// `GET /api/verifications`
#[instrument(skip_all)]
pub async fn list_verifications(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    query.render(state.repo.list_verifications().await?)
}

/// `GET /api/statistics`
#[instrument(skip_all)]
pub async fn statistics(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<StatisticsReport>, ApiError> {
    let (profiles, certificates) =
        tokio::try_join!(state.repo.list_profiles(), state.repo.list_certificates())?;
    Ok(Json(stats::report(&certificates, profiles.len())))
}
