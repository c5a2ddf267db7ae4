//! Wiring of stores and services from resolved configuration.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use certdesk_core::config::{self, Config, StoreBackend, StoreConfig};
use certdesk_core::store::{DocumentDatabase, DocumentStore, MemoryStore, SqliteStore};
use certdesk_core::Repository;

use crate::auth::JwtManager;
use crate::routes::AppState;
use crate::server::AuthService;
use crate::storage::AdminDatabase;

/// Open the document store selected by `store.backend`.
pub async fn open_store(store: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match store.backend {
        StoreBackend::Memory => {
            info!("Using in-memory document store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Sqlite => {
            let path = match &store.database_path {
                Some(path) => path.clone(),
                None => config::default_store_path()
                    .context("Cannot determine default document database path")?,
            };
            info!(path = %path.display(), "Opening SQLite document store");
            let db = DocumentDatabase::open(&path).await?;
            Ok(Arc::new(SqliteStore::new(db)))
        }
        StoreBackend::Firestore => open_firestore(store),
    }
}

#[cfg(feature = "firestore")]
fn open_firestore(store: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    use certdesk_core::store::firestore::FirestoreStore;

    let base_url = store.firestore_base_url.as_deref();
    let firestore = match (&store.firestore_credentials, &store.firestore_project_id) {
        (Some(path), _) => FirestoreStore::from_credentials_file(path, base_url)?,
        (None, Some(project)) => FirestoreStore::new(project, base_url)?,
        (None, None) => anyhow::bail!(
            "Firestore backend needs a project id (CERTDESK_FIRESTORE_PROJECT) or a credentials file"
        ),
    };
    info!("Using Firestore document store");
    Ok(Arc::new(firestore))
}

#[cfg(not(feature = "firestore"))]
fn open_firestore(_store: &StoreConfig) -> anyhow::Result<Arc<dyn DocumentStore>> {
    anyhow::bail!("certdesk was built without the `firestore` feature")
}

fn admin_db_path(config: &Config) -> anyhow::Result<PathBuf> {
    match &config.server.admin_db_path {
        Some(path) => Ok(path.clone()),
        None => config::default_admin_db_path()
            .context("Cannot determine default admin database path"),
    }
}

/// Build the application state: record repository plus admin identity.
pub async fn app_state(config: &Config) -> anyhow::Result<AppState> {
    let store = open_store(&config.store).await?;

    let admin_db_path = admin_db_path(config)?;
    info!(path = %admin_db_path.display(), "Opening admin database");
    let admins = AdminDatabase::open(&admin_db_path).await?;

    let jwt = Arc::new(JwtManager::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.access_ttl_secs,
        config.auth.refresh_ttl_secs,
    ));
    if config.auth.registration_code.is_none() {
        info!("No registration code configured; admin sign-up is disabled");
    }

    Ok(AppState {
        repo: Repository::new(store),
        auth: Arc::new(AuthService::new(
            admins,
            jwt,
            config.auth.registration_code.clone(),
        )),
    })
}
