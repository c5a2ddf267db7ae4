//! `SQLite` plumbing shared by the document store and admin account storage.
//!
//! Both databases are opened through [`connect`] and get their typed wrapper
//! from [`define_database!`](crate::define_database).

use std::path::PathBuf;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);
const FILE_POOL_SIZE: u32 = 5;

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Cannot prepare database directory: {0}")]
    Io(String),

    #[error("Cannot open database: {0}")]
    Connection(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Unique constraint violated: {0}")]
    Duplicate(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<sqlx::Error> for DatabaseError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Duplicate(db.message().to_string())
            }
            _ => Self::Query(e.to_string()),
        }
    }
}

/// Where a pool points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    File(PathBuf),
    /// Private in-memory database; the pool holds a single connection so
    /// every query sees the same data.
    Memory,
}

/// Open a WAL-mode pool with foreign keys on. File databases get their
/// parent directory created on demand.
pub async fn connect(location: &Location) -> Result<Pool<Sqlite>, DatabaseError> {
    let (url, pool_size) = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| DatabaseError::Io(e.to_string()))?;
            }
            (format!("sqlite:{}?mode=rwc", path.display()), FILE_POOL_SIZE)
        }
        Location::Memory => ("sqlite::memory:".to_string(), 1),
    };

    let options = SqliteConnectOptions::from_str(&url)
        .map_err(|e| DatabaseError::Connection(e.to_string()))?
        .journal_mode(SqliteJournalMode::Wal)
        .foreign_keys(true)
        .busy_timeout(BUSY_TIMEOUT);

    let pool = SqlitePoolOptions::new()
        .max_connections(pool_size)
        .connect_with(options)
        .await
        .map_err(|e| DatabaseError::Connection(e.to_string()))?;

    if let Location::File(path) = location {
        info!(path = %path.display(), "Database opened");
    }
    Ok(pool)
}

/// Seconds since the Unix epoch.
#[allow(clippy::cast_possible_wrap)]
pub fn unix_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Milliseconds since the Unix epoch, the unit of every record timestamp.
#[allow(clippy::cast_possible_truncation)]
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Define a database handle type that migrates itself from the invoking
/// crate's `./migrations` directory on open.
///
/// ```ignore
/// certdesk_core::define_database!(AdminDatabase, "admin");
/// ```
#[macro_export]
macro_rules! define_database {
    ($name:ident, $label:literal) => {
        #[derive(Clone)]
        pub struct $name {
            pool: ::sqlx::Pool<::sqlx::Sqlite>,
        }

        impl $name {
            /// Open or create the database file at `path`.
            pub async fn open(
                path: &::std::path::Path,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                Self::connect(&$crate::db::Location::File(path.to_path_buf())).await
            }

            /// Fresh in-memory database.
            pub async fn open_in_memory() -> ::std::result::Result<Self, $crate::db::DatabaseError>
            {
                Self::connect(&$crate::db::Location::Memory).await
            }

            async fn connect(
                location: &$crate::db::Location,
            ) -> ::std::result::Result<Self, $crate::db::DatabaseError> {
                let pool = $crate::db::connect(location).await?;
                ::sqlx::migrate!("./migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| $crate::db::DatabaseError::Migration(e.to_string()))?;
                ::tracing::info!(database = $label, "Migrations applied");
                Ok(Self { pool })
            }

            pub const fn pool(&self) -> &::sqlx::Pool<::sqlx::Sqlite> {
                &self.pool
            }
        }
    };
}
