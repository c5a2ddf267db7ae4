//! Cloud Firestore REST v1 document store.
//!
//! Translates between plain JSON documents and Firestore's typed value
//! encoding (`stringValue`, `integerValue`, `mapValue`, ...).

use std::path::Path;

use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use super::{Document, DocumentStore, Fields, StoreError};

/// Production REST endpoint.
const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

/// Environment variable holding the OAuth bearer token.
const ACCESS_TOKEN_ENV: &str = "CERTDESK_FIRESTORE_ACCESS_TOKEN";

/// Documents fetched per list page.
const PAGE_SIZE: u32 = 300;

/// Service account credentials loaded from a Google Cloud JSON key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    pub project_id: String,
    #[serde(default)]
    pub client_email: String,
}

impl ServiceAccountCredentials {
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoreError::Backend(format!(
                "Failed to read credentials file {}: {e}",
                path.display()
            ))
        })?;
        serde_json::from_str(&content)
            .map_err(|e| StoreError::Backend(format!("Failed to parse credentials JSON: {e}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    documents: Vec<RawDocument>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResult {
    document: Option<RawDocument>,
}

/// Firestore document store over the REST API.
#[derive(Debug)]
pub struct FirestoreStore {
    http: reqwest::Client,
    documents_url: Url,
    access_token: Option<String>,
}

impl FirestoreStore {
    /// Create a store for `project_id`. `base_url` overrides the production
    /// endpoint (emulator).
    pub fn new(project_id: &str, base_url: Option<&str>) -> Result<Self, StoreError> {
        if project_id.is_empty() {
            return Err(StoreError::Backend("Firestore project id is empty".into()));
        }

        // reqwest is built with rustls-no-provider; an Err here only means a
        // provider is already installed.
        let _ = rustls::crypto::ring::default_provider().install_default();

        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let access_token = std::env::var(ACCESS_TOKEN_ENV).ok();
        if access_token.is_none() {
            warn!("{ACCESS_TOKEN_ENV} is not set; Firestore requests are unauthenticated");
        }

        let base = base_url.unwrap_or(FIRESTORE_BASE_URL);
        let mut documents_url = Url::parse(base)
            .map_err(|e| StoreError::Backend(format!("Invalid Firestore base URL {base}: {e}")))?;
        documents_url
            .path_segments_mut()
            .map_err(|()| StoreError::Backend(format!("Firestore base URL {base} cannot carry a path")))?
            .pop_if_empty()
            .extend(["projects", project_id, "databases", "(default)", "documents"]);
        debug!(project_id, has_token = access_token.is_some(), "Firestore store initialized");

        Ok(Self {
            http,
            documents_url,
            access_token,
        })
    }

    /// Create a store from a service-account key file.
    pub fn from_credentials_file(path: &Path, base_url: Option<&str>) -> Result<Self, StoreError> {
        let credentials = ServiceAccountCredentials::from_file(path)?;
        Self::new(&credentials.project_id, base_url)
    }

    /// `segments` are appended one path segment each, percent-encoded.
    fn url_with(&self, segments: &[&str]) -> Url {
        let mut url = self.documents_url.clone();
        // Checked in `new`: the base URL is hierarchical.
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    fn collection_url(&self, collection: &str) -> Url {
        self.url_with(&[collection])
    }

    fn document_url(&self, collection: &str, id: &str) -> Url {
        self.url_with(&[collection, id])
    }

    fn run_query_url(&self) -> Url {
        let mut url = self.documents_url.clone();
        let path = format!("{}:runQuery", url.path());
        url.set_path(&path);
        url
    }

    fn request(&self, method: reqwest::Method, url: Url) -> reqwest::RequestBuilder {
        let builder = self.http.request(method, url);
        match &self.access_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let resp = builder
            .send()
            .await
            .map_err(|e| StoreError::Backend(format!("HTTP request failed: {e}")))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let message = resp
            .text()
            .await
            .unwrap_or_else(|_| "<failed to read body>".to_string());
        warn!(status = status.as_u16(), "Firestore API returned error");
        Err(StoreError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn write(
        &self,
        collection: &str,
        id: &str,
        fields: &Fields,
        mask: bool,
    ) -> Result<(), StoreError> {
        let mut url = self.document_url(collection, id);
        if mask {
            // Merge semantics: only the listed paths change, and the
            // document must already exist.
            let mut query = url.query_pairs_mut();
            query.append_pair("currentDocument.exists", "true");
            for key in fields.keys() {
                query.append_pair("updateMask.fieldPaths", &quote_field_path(key));
            }
        }
        let body = json!({ "fields": encode_fields(fields) });
        let result = self
            .send(self.request(reqwest::Method::PATCH, url).json(&body))
            .await;
        match result {
            Err(StoreError::Api { status: 404, .. }) => Err(StoreError::not_found(collection, id)),
            other => other.map(|_| ()),
        }
    }
}

/// Firestore ids may not contain `/`, be `.` or `..`, or match `__.*__`.
/// Such ids can never name a stored document.
fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains('/')
        && !(id.len() >= 4 && id.starts_with("__") && id.ends_with("__"))
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let mut docs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = self.collection_url(collection);
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("pageSize", &PAGE_SIZE.to_string());
                if let Some(token) = &page_token {
                    query.append_pair("pageToken", token);
                }
            }
            let page: ListResponse = self
                .send(self.request(reqwest::Method::GET, url))
                .await?
                .json()
                .await
                .map_err(|e| StoreError::Malformed(e.to_string()))?;

            docs.extend(page.documents.into_iter().map(decode_document));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        debug!(collection, count = docs.len(), "Listed Firestore collection");
        Ok(docs)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let url = self.document_url(collection, id);
        match self.send(self.request(reqwest::Method::GET, url)).await {
            Ok(resp) => {
                let raw: RawDocument = resp
                    .json()
                    .await
                    .map_err(|e| StoreError::Malformed(e.to_string()))?;
                Ok(Some(decode_document(raw)))
            }
            Err(StoreError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::Backend(format!("Invalid Firestore document id: {id}")));
        }
        self.write(collection, id, &fields, false).await
    }

    async fn update(&self, collection: &str, id: &str, partial: Fields) -> Result<(), StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::not_found(collection, id));
        }
        self.write(collection, id, &partial, true).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        if !is_valid_id(id) {
            return Err(StoreError::not_found(collection, id));
        }
        let url = self.document_url(collection, id);
        self.send(self.request(reqwest::Method::DELETE, url)).await?;
        Ok(())
    }

    async fn query_eq(
        &self,
        collection: &str,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Document>, StoreError> {
        let body = json!({
            "structuredQuery": {
                "from": [{ "collectionId": collection }],
                "where": {
                    "fieldFilter": {
                        "field": { "fieldPath": quote_field_path(field) },
                        "op": "EQUAL",
                        "value": encode_value(value),
                    }
                }
            }
        });
        let results: Vec<QueryResult> = self
            .send(self.request(reqwest::Method::POST, self.run_query_url()).json(&body))
            .await?
            .json()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        Ok(results
            .into_iter()
            .filter_map(|r| r.document)
            .map(decode_document)
            .collect())
    }
}

/// Field paths containing anything but `[A-Za-z0-9_]` must be back-quoted.
fn quote_field_path(field: &str) -> String {
    let simple = field
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if simple {
        field.to_string()
    } else {
        format!("`{}`", field.replace('`', "\\`"))
    }
}

fn decode_document(raw: RawDocument) -> Document {
    let id = raw
        .name
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string();
    let fields = raw
        .fields
        .into_iter()
        .map(|(k, v)| (k, decode_value(v)))
        .collect();
    Document::new(id, fields)
}

/// Convert a Firestore typed value into plain JSON.
pub fn decode_value(value: Value) -> Value {
    let Value::Object(mut typed) = value else {
        return Value::Null;
    };
    if let Some(v) = typed.remove("stringValue") {
        return v;
    }
    if let Some(v) = typed.remove("integerValue") {
        // Int64 values arrive as decimal strings.
        let parsed = v.as_str().and_then(|s| s.parse::<i64>().ok());
        return parsed.map_or(v, Value::from);
    }
    if let Some(v) = typed.remove("doubleValue") {
        return v;
    }
    if let Some(v) = typed.remove("booleanValue") {
        return v;
    }
    if let Some(v) = typed.remove("timestampValue") {
        return v;
    }
    if let Some(v) = typed
        .remove("referenceValue")
        .or_else(|| typed.remove("bytesValue"))
    {
        return v;
    }
    if let Some(v) = typed.remove("geoPointValue") {
        return v;
    }
    if let Some(Value::Object(mut array)) = typed.remove("arrayValue") {
        return match array.remove("values") {
            Some(Value::Array(values)) => Value::Array(values.into_iter().map(decode_value).collect()),
            _ => Value::Array(Vec::new()),
        };
    }
    if let Some(Value::Object(mut map)) = typed.remove("mapValue") {
        return match map.remove("fields") {
            Some(Value::Object(fields)) => Value::Object(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, decode_value(v)))
                    .collect(),
            ),
            _ => Value::Object(Map::new()),
        };
    }
    Value::Null
}

/// Convert plain JSON into a Firestore typed value.
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => n.as_i64().map_or_else(
            || json!({ "doubleValue": n.as_f64().unwrap_or_default() }),
            |i| json!({ "integerValue": i.to_string() }),
        ),
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => {
            json!({ "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() } })
        }
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

fn encode_fields(fields: &Fields) -> Map<String, Value> {
    fields
        .iter()
        .map(|(k, v)| (k.clone(), encode_value(v)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn decodes_scalar_values() {
        assert_eq!(decode_value(json!({"stringValue": "VERIFIED"})), json!("VERIFIED"));
        assert_eq!(decode_value(json!({"integerValue": "1712000000000"})), json!(1_712_000_000_000_i64));
        assert_eq!(decode_value(json!({"doubleValue": 87.25})), json!(87.25));
        assert_eq!(decode_value(json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(json!({"nullValue": null})), Value::Null);
    }

    #[test]
    fn decodes_nested_values() {
        let typed = json!({
            "mapValue": { "fields": {
                "tags": { "arrayValue": { "values": [ {"stringValue": "a"}, {"integerValue": "2"} ] } },
                "empty": { "arrayValue": {} }
            }}
        });
        assert_eq!(decode_value(typed), json!({"tags": ["a", 2], "empty": []}));
    }

    #[test]
    fn encode_then_decode_preserves_document() {
        let plain = json!({
            "score": 92.5,
            "timestamp": 1_712_000_000_000_i64,
            "verification_status": "PENDING",
            "meta": {"pages": [1, 2]}
        });
        assert_eq!(decode_value(encode_value(&plain)), plain);
    }

    #[test]
    fn integers_are_encoded_as_strings() {
        assert_eq!(encode_value(&json!(42)), json!({"integerValue": "42"}));
        assert_eq!(encode_value(&json!(4.5)), json!({"doubleValue": 4.5}));
    }

    #[test]
    fn document_id_is_last_path_segment() {
        let raw = RawDocument {
            name: "projects/p/databases/(default)/documents/certificates/abc123".into(),
            fields: Map::new(),
        };
        assert_eq!(decode_document(raw).id, "abc123");
    }

    #[test]
    fn field_paths_are_quoted_when_needed() {
        assert_eq!(quote_field_path("user_email"), "user_email");
        assert_eq!(quote_field_path("image-url"), "`image-url`");
        assert_eq!(quote_field_path("9lives"), "`9lives`");
    }

    #[test]
    fn urls_use_project_and_base() {
        let store = FirestoreStore::new("cert-project", Some("http://localhost:8081/v1/")).unwrap();
        assert_eq!(
            store.document_url("profiles", "u1").as_str(),
            "http://localhost:8081/v1/projects/cert-project/databases/(default)/documents/profiles/u1"
        );
        assert_eq!(
            store.run_query_url().path(),
            "/v1/projects/cert-project/databases/(default)/documents:runQuery"
        );
    }

    #[test]
    fn document_ids_stay_inside_their_segment() {
        let store = FirestoreStore::new("p", Some("http://localhost:8081/v1")).unwrap();
        let prefix = "/v1/projects/p/databases/(default)/documents/certificates/";

        let traversal = store.document_url("certificates", "../profiles/u1");
        assert_eq!(traversal.path(), format!("{prefix}..%2Fprofiles%2Fu1"));

        let punctuated = store.document_url("certificates", "a?b#c");
        assert_eq!(punctuated.path(), format!("{prefix}a%3Fb%23c"));
        assert_eq!(punctuated.query(), None);
        assert_eq!(punctuated.fragment(), None);
    }

    #[test]
    fn reserved_ids_are_invalid() {
        for id in ["", ".", "..", "a/b", "__name__"] {
            assert!(!is_valid_id(id), "{id:?} should be rejected");
        }
        for id in ["c1", "..x", "a?b#c", "__"] {
            assert!(is_valid_id(id), "{id:?} should be accepted");
        }
    }

    #[test]
    fn empty_project_is_rejected() {
        assert!(FirestoreStore::new("", None).is_err());
    }

    #[test]
    fn missing_credentials_file_is_error() {
        let err = ServiceAccountCredentials::from_file(Path::new("/nonexistent/key.json")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn credentials_file_provides_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.json");
        std::fs::write(&path, r#"{"project_id": "from-file", "client_email": "svc@x"}"#).unwrap();
        let creds = ServiceAccountCredentials::from_file(&path).unwrap();
        assert_eq!(creds.project_id, "from-file");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod api_tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::{Method, StatusCode, Uri};
    use axum::response::{IntoResponse, Response};

    use super::*;

    const DOCS: &str = "/v1/projects/p/databases/(default)/documents";

    /// Method, raw path and decoded query pairs of each request received.
    type Seen = Arc<Mutex<Vec<(Method, String, Vec<(String, String)>)>>>;

    fn raw_doc(path: &str, fields: Value) -> Value {
        json!({ "name": format!("projects/p/databases/(default)/documents/{path}"), "fields": fields })
    }

    async fn fake_firestore(State(seen): State<Seen>, method: Method, uri: Uri) -> Response {
        let path = uri.path().to_string();
        let pairs: Vec<(String, String)> = Url::parse(&format!("http://fake{uri}"))
            .unwrap()
            .query_pairs()
            .into_owned()
            .collect();
        seen.lock()
            .unwrap()
            .push((method.clone(), path.clone(), pairs.clone()));
        let page_token = pairs
            .iter()
            .find(|(k, _)| k == "pageToken")
            .map(|(_, v)| v.as_str());

        let rest = path.strip_prefix(DOCS).unwrap_or_default();
        if method == Method::GET && rest == "/certificates" {
            return match page_token {
                None => axum::Json(json!({
                    "documents": [raw_doc("certificates/c1", json!({"score": {"integerValue": "95"}}))],
                    "nextPageToken": "next/page+2",
                }))
                .into_response(),
                Some("next/page+2") => axum::Json(json!({
                    "documents": [raw_doc("certificates/c2", json!({"score": {"doubleValue": 82.5}}))],
                }))
                .into_response(),
                Some(_) => StatusCode::BAD_REQUEST.into_response(),
            };
        }
        if method == Method::PATCH {
            if rest == "/certificates/missing" {
                return (StatusCode::NOT_FOUND, "no document to update").into_response();
            }
            let id = rest.rsplit('/').next().unwrap_or_default();
            return axum::Json(raw_doc(&format!("certificates/{id}"), json!({}))).into_response();
        }
        if method == Method::POST && rest == ":runQuery" {
            return axum::Json(json!([
                { "document": raw_doc("certificates/c1", json!({"user_email": {"stringValue": "amy@uni.edu"}})) },
                { "readTime": "2025-03-10T08:00:00Z" },
            ]))
            .into_response();
        }
        if method == Method::DELETE {
            return axum::Json(json!({})).into_response();
        }
        StatusCode::NOT_FOUND.into_response()
    }

    async fn spawn_fake() -> (FirestoreStore, Seen) {
        let seen = Seen::default();
        let app = Router::new()
            .fallback(fake_firestore)
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let store = FirestoreStore::new("p", Some(&format!("http://{addr}/v1"))).unwrap();
        (store, seen)
    }

    #[tokio::test]
    async fn list_follows_page_tokens() {
        let (store, seen) = spawn_fake().await;
        let docs = store.list("certificates").await.unwrap();

        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["c1", "c2"]);
        assert_eq!(docs[0].get("score"), Some(&json!(95)));
        assert_eq!(docs[1].get("score"), Some(&json!(82.5)));
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_sends_mask_and_requires_existing_document() {
        let (store, seen) = spawn_fake().await;
        let mut partial = Fields::new();
        partial.insert("verification_status".into(), json!("VERIFIED"));
        partial.insert("image-url".into(), json!("https://img"));

        store.update("certificates", "c1", partial.clone()).await.unwrap();
        {
            let seen = seen.lock().unwrap();
            let (method, path, pairs) = &seen[0];
            assert_eq!(*method, Method::PATCH);
            assert_eq!(path, &format!("{DOCS}/certificates/c1"));
            assert!(pairs.contains(&("currentDocument.exists".into(), "true".into())));
            assert!(pairs.contains(&("updateMask.fieldPaths".into(), "verification_status".into())));
            assert!(pairs.contains(&("updateMask.fieldPaths".into(), "`image-url`".into())));
        }

        let err = store.update("certificates", "missing", partial).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { ref id, .. } if id == "missing"));
    }

    #[tokio::test]
    async fn equality_query_skips_empty_results() {
        let (store, seen) = spawn_fake().await;
        let docs = store
            .query_eq("certificates", "user_email", &json!("amy@uni.edu"))
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].get("user_email"), Some(&json!("amy@uni.edu")));
        assert_eq!(seen.lock().unwrap()[0].1, format!("{DOCS}:runQuery"));
    }

    #[tokio::test]
    async fn delete_targets_encoded_document() {
        let (store, seen) = spawn_fake().await;
        store.delete("certificates", "a?b#c").await.unwrap();
        assert_eq!(
            seen.lock().unwrap()[0].1,
            format!("{DOCS}/certificates/a%3Fb%23c")
        );
    }

    #[tokio::test]
    async fn traversal_ids_never_reach_the_api() {
        let (store, seen) = spawn_fake().await;
        assert!(store.get("certificates", "..").await.unwrap().is_none());
        assert!(matches!(
            store.delete("certificates", "../profiles/u1").await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(seen.lock().unwrap().is_empty());
    }
}
