#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use certdesk_core::Repository;
use certdesk_core::model::{CERTIFICATES, PROFILES};
use certdesk_core::store::{DocumentStore, MemoryStore};
use certdesk_server::auth::JwtManager;
use certdesk_server::routes::{AppState, build_router};
use certdesk_server::server::AuthService;
use certdesk_server::storage::AdminDatabase;

const CODE: &str = "ADMIN2024";

struct TestApp {
    state: AppState,
    store: Arc<MemoryStore>,
}

impl TestApp {
    async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        seed(&store).await;

        let admins = AdminDatabase::open_in_memory().await.unwrap();
        let jwt = Arc::new(JwtManager::new(b"test-secret", 3600, 86400));
        let state = AppState {
            repo: Repository::new(store.clone()),
            auth: Arc::new(AuthService::new(admins, jwt, Some(CODE.to_string()))),
        };
        Self { state, store }
    }

    /// Send a request and return (status, JSON body or Null).
    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let resp = build_router(self.state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn login(&self) -> String {
        let (status, body) = self
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({
                    "display_name": "Ops",
                    "email": "ops@certdesk.io",
                    "password": "hunter22",
                    "confirm_password": "hunter22",
                    "registration_code": CODE
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["access_token"].as_str().unwrap().to_string()
    }
}

async fn seed(store: &MemoryStore) {
    let profiles = [
        ("u1", json!({"email": "amy@uni.edu", "full_name": "Amy Chen", "student_id": "S-100"})),
        ("u2", json!({"email": "bo@uni.edu", "full_name": "Bo Li"})),
    ];
    for (id, fields) in profiles {
        store
            .set(PROFILES, id, fields.as_object().cloned().unwrap())
            .await
            .unwrap();
    }

    let certificates = [
        ("c1", json!({"user_email": "amy@uni.edu", "student_name": "Amy Chen", "certificate_title": "Rust Basics", "certificate_type": "Course", "score": 95, "verification_status": "VERIFIED", "institution_name": "MIT", "timestamp": 1_740_000_000_000_i64})),
        ("c2", json!({"user_email": "amy@uni.edu", "student_name": "Amy Chen", "certificate_title": "Async Rust", "certificate_type": "Workshop", "score": 82, "verification_status": "PENDING", "institution_name": "MIT", "timestamp": 1_741_000_000_000_i64})),
        ("c3", json!({"user_email": "bo@uni.edu", "student_name": "Bo Li", "certificate_title": "Databases", "score": 55, "verification_status": "REJECTED", "timestamp": 1_742_000_000_000_i64})),
    ];
    for (id, fields) in certificates {
        store
            .set(CERTIFICATES, id, fields.as_object().cloned().unwrap())
            .await
            .unwrap();
    }
}

// === Public routes ===

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn protected_routes_require_token() {
    let app = TestApp::new().await;
    for uri in ["/api/dashboard", "/api/users", "/api/certificates", "/api/statistics", "/api/profile"] {
        let (status, body) = app.send("GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    }

    let (status, _) = app
        .send("GET", "/api/dashboard", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn register_rejects_bad_input() {
    let app = TestApp::new().await;
    let (status, _) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "display_name": "Ops",
                "email": "ops@certdesk.io",
                "password": "hunter22",
                "confirm_password": "hunter23",
                "registration_code": CODE
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/register",
            None,
            Some(json!({
                "display_name": "Ops",
                "email": "ops@certdesk.io",
                "password": "hunter22",
                "confirm_password": "hunter22",
                "registration_code": "nope"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn login_and_refresh() {
    let app = TestApp::new().await;
    app.login().await;

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ops@certdesk.io", "password": "wrong"})),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, session) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "OPS@certdesk.io", "password": "hunter22"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, rotated) = app
        .send(
            "POST",
            "/api/auth/refresh",
            None,
            Some(json!({"refresh_token": session["refresh_token"]})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_ne!(rotated["refresh_token"], session["refresh_token"]);
}

// === Console views ===

#[tokio::test]
async fn dashboard_totals_and_recent() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (status, body) = app.send("GET", "/api/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_users"], 2);
    assert_eq!(body["total_certificates"], 3);
    assert_eq!(body["verified"], 1);
    assert_eq!(body["pending"], 1);
    assert_eq!(body["recent"][0]["id"], "c3");
}

#[tokio::test]
async fn user_list_search_and_detail() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (status, body) = app.send("GET", "/api/users?q=s-100", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "loaded");
    assert_eq!(body["total"], 2);
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["rows"][0]["certificates"], 2);

    let (status, body) = app.send("GET", "/api/users?status=verified", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = app.send("GET", "/api/users?status=all", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["rows"].as_array().unwrap().len(), 2);

    let (status, body) = app.send("GET", "/api/users/u1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["counts"]["verified"], 1);
    assert_eq!(body["counts"]["pending"], 1);

    let (status, body) = app.send("GET", "/api/users/ghost", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["redirect"], "/users");
}

#[tokio::test]
async fn certificate_list_filters() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (_, body) = app
        .send("GET", "/api/certificates?status=pending", Some(&token), None)
        .await;
    assert_eq!(body["rows"].as_array().unwrap().len(), 1);
    assert_eq!(body["rows"][0]["id"], "c2");

    let (_, body) = app
        .send("GET", "/api/certificates?q=zzz", Some(&token), None)
        .await;
    assert_eq!(body["state"], "empty");
    assert_eq!(body["total"], 3);

    let (status, _) = app
        .send("GET", "/api/certificates?status=archived", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verifications_exclude_pending() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (_, body) = app.send("GET", "/api/verifications", Some(&token), None).await;
    let ids: Vec<_> = body["rows"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["c1", "c3"]);
}

#[tokio::test]
async fn save_status_validates_then_persists() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (status, _) = app
        .send(
            "PUT",
            "/api/certificates/c2/status",
            Some(&token),
            Some(json!({"verification_status": "VERIFIED", "score": 120, "remarks": "x"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, cert) = app.send("GET", "/api/certificates/c2", Some(&token), None).await;
    assert_eq!(cert["verification_status"], "PENDING");
    assert_eq!(cert["score"], 82.0);

    let (status, form) = app
        .send(
            "PUT",
            "/api/certificates/c2/status",
            Some(&token),
            Some(json!({"verification_status": "verified", "score": 88.5, "remarks": "checked"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(form["phase"]["phase"], "saved");

    let (_, prefilled) = app
        .send("GET", "/api/certificates/c2/status", Some(&token), None)
        .await;
    assert_eq!(prefilled["status"], "VERIFIED");
    assert_eq!(prefilled["score"], 88.5);
    assert_eq!(prefilled["remarks"], "checked");
}

#[tokio::test]
async fn statistics_report() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (status, body) = app.send("GET", "/api/statistics", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["summary"]["total_certificates"], 3);
    assert_eq!(body["summary"]["verified_rate"], 33.3);

    let bands: Vec<_> = body["by_score"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["count"].as_u64().unwrap())
        .collect();
    assert_eq!(bands, [1, 1, 0, 0, 1]);
    assert_eq!(body["top_institutions"][0]["key"], "MIT");
}

// === Deletes ===

#[tokio::test]
async fn delete_certificate_then_not_found() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (status, _) = app
        .send("DELETE", "/api/certificates/c3", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = app
        .send("DELETE", "/api/certificates/c3", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["redirect"], "/certificates");
}

#[tokio::test]
async fn delete_user_cascades() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (status, report) = app.send("DELETE", "/api/users/u1", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["deleted"], json!(["c1", "c2"]));
    assert_eq!(report["profile_deleted"], true);

    assert!(app.store.get(PROFILES, "u1").await.unwrap().is_none());
    assert_eq!(app.store.list(CERTIFICATES).await.unwrap().len(), 1);
}

// === Admin profile ===

#[tokio::test]
async fn profile_update_and_password_change() {
    let app = TestApp::new().await;
    let token = app.login().await;

    let (status, profile) = app
        .send(
            "PUT",
            "/api/profile",
            Some(&token),
            Some(json!({"display_name": "Ops Lead", "phone": "+1 555 0100"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["display_name"], "Ops Lead");
    assert_eq!(profile["email"], "ops@certdesk.io");

    let (status, _) = app
        .send(
            "PUT",
            "/api/profile/password",
            Some(&token),
            Some(json!({
                "current_password": "hunter22",
                "new_password": "short",
                "confirm_password": "short"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .send(
            "PUT",
            "/api/profile/password",
            Some(&token),
            Some(json!({
                "current_password": "hunter22",
                "new_password": "correct-horse",
                "confirm_password": "correct-horse"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(
            "POST",
            "/api/auth/login",
            None,
            Some(json!({"email": "ops@certdesk.io", "password": "correct-horse"})),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
