//! Configuration resolution for certdesk.
//!
//! Implements hierarchical config resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/certdesk/settings.json)
//! 3. Project config (.certdesk/settings.json) or an explicit file
//! 4. Environment variables
//! 5. CLI arguments (highest priority, applied by the binary)

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Complete certdesk configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub log_level: String,
    pub log_json: bool,
    /// Path to the admin account database.
    pub admin_db_path: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            log_level: "info".to_string(),
            log_json: false,
            admin_db_path: None,
        }
    }
}

/// Which document store backs the record collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    #[default]
    Sqlite,
    Firestore,
}

impl std::str::FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "firestore" => Ok(Self::Firestore),
            other => Err(Error::Config(format!("Unknown store backend: {other}"))),
        }
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// `SQLite` document database path (sqlite backend).
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Firestore project id; read from the credentials file when absent.
    #[serde(default)]
    pub firestore_project_id: Option<String>,
    /// Service-account JSON key file for Firestore.
    #[serde(default)]
    pub firestore_credentials: Option<PathBuf>,
    /// Override for the Firestore REST base URL (emulator).
    #[serde(default)]
    pub firestore_base_url: Option<String>,
}

/// Admin authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub access_ttl_secs: i64,
    pub refresh_ttl_secs: i64,
    /// Code required to register a new admin. Registration is closed when unset.
    pub registration_code: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "dev-secret-change-me".to_string(),
            access_ttl_secs: 3600,
            refresh_ttl_secs: 7 * 24 * 60 * 60, // 7 days
            registration_code: None,
        }
    }
}

/// Load configuration with hierarchical resolution.
///
/// `explicit` replaces the project-level settings file when given. Each
/// file only overrides the keys it actually contains.
pub fn load_config(project_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Config> {
    let mut layers = Vec::new();
    if let Some(global_path) = global_config_path().filter(|p| p.exists()) {
        layers.push(global_path);
    }
    if let Some(path) = explicit {
        layers.push(path.to_path_buf());
    } else if let Some(dir) = project_dir {
        let project_path = dir.join(".certdesk").join("settings.json");
        if project_path.exists() {
            layers.push(project_path);
        }
    }

    let mut config = resolve_layers(&layers)?;
    apply_env_overrides(&mut config);
    config.auth.registration_code = config
        .auth
        .registration_code
        .filter(|code| !code.trim().is_empty());
    Ok(config)
}

/// Defaults with each settings file deep-merged on top, in order.
fn resolve_layers(paths: &[PathBuf]) -> Result<Config> {
    let mut merged = serde_json::to_value(Config::default())?;
    for path in paths {
        merge_values(&mut merged, load_config_file(path)?);
    }
    serde_json::from_value(merged)
        .map_err(|e| Error::Config(format!("Invalid configuration: {e}")))
}

/// Get the global config file path.
pub fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("settings.json"))
}

/// Default location of the `SQLite` document database.
pub fn default_store_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("records.db"))
}

/// Default location of the admin account database.
pub fn default_admin_db_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("admins.db"))
}

#[cfg(target_os = "linux")]
fn config_dir() -> Option<PathBuf> {
    std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| std::env::var("HOME").ok().map(|h| PathBuf::from(h).join(".config")))
        .map(|p| p.join("certdesk"))
}

#[cfg(target_os = "macos")]
fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join("Library/Application Support/certdesk"))
}

#[cfg(target_os = "windows")]
fn config_dir() -> Option<PathBuf> {
    std::env::var("USERPROFILE")
        .ok()
        .map(|h| PathBuf::from(h).join(".certdesk"))
}

#[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
fn config_dir() -> Option<PathBuf> {
    None
}

fn load_config_file(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    let value: Value = serde_json::from_str(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })?;
    if !value.is_object() {
        return Err(Error::Config(format!(
            "Config file {} must hold a JSON object",
            path.display()
        )));
    }
    Ok(value)
}

/// Objects merge key by key; any other overlay value replaces the base.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base), Value::Object(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => {
                        merge_values(slot, value);
                    }
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn apply_env_overrides(config: &mut Config) {
    if let Ok(val) = std::env::var("CERTDESK_ADDR") {
        if let Ok(addr) = val.parse() {
            config.server.addr = addr;
        }
    }
    if let Ok(val) = std::env::var("CERTDESK_LOG_LEVEL") {
        config.server.log_level = val;
    }
    if let Ok(val) = std::env::var("CERTDESK_STORE") {
        if let Ok(backend) = val.parse() {
            config.store.backend = backend;
        }
    }
    if let Ok(val) = std::env::var("CERTDESK_FIRESTORE_PROJECT") {
        config.store.firestore_project_id = Some(val);
    }
    if let Ok(val) = std::env::var("CERTDESK_JWT_SECRET") {
        config.auth.jwt_secret = val;
    }
    if let Ok(val) = std::env::var("CERTDESK_REGISTRATION_CODE") {
        config.auth.registration_code = Some(val).filter(|code| !code.trim().is_empty());
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_config_uses_sqlite_store() {
        let config = Config::default();
        assert_eq!(config.store.backend, StoreBackend::Sqlite);
        assert_eq!(config.auth.access_ttl_secs, 3600);
    }

    #[test]
    fn registration_closed_by_default() {
        assert!(Config::default().auth.registration_code.is_none());
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("Firestore".parse::<StoreBackend>().unwrap(), StoreBackend::Firestore);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    fn write_settings(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn explicit_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(
            dir.path(),
            "settings.json",
            r#"{
                "server": { "addr": "0.0.0.0:9000", "log_level": "debug", "log_json": true, "admin_db_path": null },
                "store": { "backend": "memory" }
            }"#,
        );

        let config = resolve_layers(&[path]).unwrap();
        assert_eq!(config.server.addr.port(), 9000);
        assert!(config.server.log_json);
        assert_eq!(config.store.backend, StoreBackend::Memory);
        // Missing auth section keeps defaults
        assert_eq!(config.auth.refresh_ttl_secs, 7 * 24 * 60 * 60);
    }

    #[test]
    fn partial_project_file_keeps_global_values() {
        let dir = tempfile::tempdir().unwrap();
        let global = write_settings(
            dir.path(),
            "global.json",
            r#"{
                "server": { "addr": "0.0.0.0:9000" },
                "auth": { "jwt_secret": "prod-secret", "access_ttl_secs": 60 }
            }"#,
        );
        let project = write_settings(
            dir.path(),
            "project.json",
            r#"{ "store": { "backend": "memory" }, "auth": { "registration_code": "X" } }"#,
        );

        let config = resolve_layers(&[global, project]).unwrap();
        assert_eq!(config.auth.jwt_secret, "prod-secret");
        assert_eq!(config.auth.access_ttl_secs, 60);
        assert_eq!(config.auth.registration_code.as_deref(), Some("X"));
        assert_eq!(config.server.addr.port(), 9000);
        assert_eq!(config.server.log_level, "info");
        assert_eq!(config.store.backend, StoreBackend::Memory);
    }

    #[test]
    fn later_file_wins_for_keys_it_sets() {
        let dir = tempfile::tempdir().unwrap();
        let global = write_settings(dir.path(), "a.json", r#"{"server": {"log_level": "warn"}}"#);
        let project = write_settings(dir.path(), "b.json", r#"{"server": {"log_level": "trace"}}"#);
        let config = resolve_layers(&[global, project]).unwrap();
        assert_eq!(config.server.log_level, "trace");
    }

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(dir.path(), "settings.json", "[1, 2]");
        assert!(matches!(resolve_layers(&[path]), Err(Error::Config(_))));
    }

    #[test]
    fn blank_registration_code_closes_registration() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_settings(
            dir.path(),
            "settings.json",
            r#"{"auth": {"registration_code": "  "}}"#,
        );
        let config = load_config(None, Some(&path)).unwrap();
        assert!(config.auth.registration_code.is_none());
    }

    #[test]
    fn unreadable_file_is_config_error() {
        let err = load_config_file(Path::new("/nonexistent/settings.json")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
