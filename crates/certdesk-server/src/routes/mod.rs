//! HTTP routes of the console API.

mod account;
mod auth;
mod records;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::routing::{get, post, put};
use serde_json::{Value, json};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use certdesk_core::Repository;

use crate::server::AuthService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    pub auth: Arc<AuthService>,
}

/// `GET /health`
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the router with every console route.
pub fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh))
        .route("/auth/logout", post(auth::logout))
        .route("/dashboard", get(records::dashboard))
        .route("/users", get(records::list_users))
        .route(
            "/users/{id}",
            get(records::get_user).delete(records::delete_user),
        )
        .route("/certificates", get(records::list_certificates))
        .route(
            "/certificates/{id}",
            get(records::get_certificate).delete(records::delete_certificate),
        )
        .route(
            "/certificates/{id}/status",
            get(records::status_form).put(records::save_status),
        )
        .route("/verifications", get(records::list_verifications))
        .route("/statistics", get(records::statistics))
        .route(
            "/profile",
            get(account::get_profile).put(account::update_profile),
        )
        .route("/profile/password", put(account::change_password));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
