//! HTTP error mapping for the console API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use certdesk_core::db::DatabaseError;
use certdesk_core::repository::CascadeReport;

/// Error response body: `{ "error": { code, message, ... } }`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    /// Console route to send the operator back to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<CascadeReport>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Partial delete: {} deleted, {} failed", .0.deleted.len(), .0.failed.len())]
    PartialDelete(CascadeReport),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Parent list route for a missing record.
    fn redirect_for(kind: &str) -> &'static str {
        match kind {
            "User" => "/users",
            "Certificate" => "/certificates",
            _ => "/dashboard",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::Store(_) => (StatusCode::BAD_GATEWAY, "STORE_ERROR"),
            Self::PartialDelete(_) => (StatusCode::INTERNAL_SERVER_ERROR, "PARTIAL_DELETE"),
            Self::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL")
            }
        };

        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };
        let redirect = match &self {
            Self::NotFound { kind, .. } => Some(Self::redirect_for(kind)),
            _ => None,
        };
        let report = match self {
            Self::PartialDelete(report) => Some(report),
            _ => None,
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                redirect,
                report,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<certdesk_core::Error> for ApiError {
    fn from(err: certdesk_core::Error) -> Self {
        use certdesk_core::Error;
        match err {
            Error::NotFound { kind, id } => Self::NotFound { kind, id },
            Error::Validation(msg) => Self::BadRequest(msg),
            Error::Store(e) => Self::Store(e.to_string()),
            Error::PartialDelete(report) => Self::PartialDelete(report),
            other @ (Error::Config(_) | Error::Json(_) | Error::Io(_)) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Duplicate(msg) => Self::Conflict(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}
