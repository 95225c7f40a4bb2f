//! # Local Database Module
//!
//! The durable local store backing the offline queue. A single SQLite file
//! holds one logical collection per record type plus the AI result cache.
//!
//! ## Guarantees
//!
//! - Every `put`/`delete` runs in its own transaction and is committed (WAL,
//!   `synchronous=FULL`) before the call returns, so a crash right after a
//!   successful `put` never loses the record.
//! - `list` returns a collection in insertion order. Overwriting an existing
//!   id keeps its original position.
//! - Failing to open the store is an error, never a silent fallback.
//!
//! ## Key Components
//!
//! - `LocalDatabase`: connection and schema management
//! - `schema.rs`: schema definition and migration versions
//! - `store.rs`: the collection-scoped key/value operations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use sitesync::client::local_db::{Collection, LocalDatabase};
//!
//! # async fn example() -> Result<(), sitesync::shared::SyncError> {
//! let db = LocalDatabase::open("/tmp/sitesync/local.db").await?;
//! db.put(Collection::AiCache, "risk::P1", &serde_json::json!({"level": "low"})).await?;
//! let cached: Option<serde_json::Value> = db.get(Collection::AiCache, "risk::P1").await?;
//! # Ok(())
//! # }
//! ```

pub mod schema;
pub mod store;

pub use store::Collection;

use crate::shared::error::SyncError;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use tracing::info;

/// Result type for local database operations
pub type Result<T> = std::result::Result<T, SyncError>;

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        SyncError::storage(err.to_string())
    }
}

/// Local database connection manager
#[derive(Debug)]
pub struct LocalDatabase {
    pool: SqlitePool,
    path: PathBuf,
}

impl LocalDatabase {
    /// Open or create the store at `path`
    ///
    /// Creates the parent directory and the database file if needed and
    /// brings the schema up to date.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .foreign_keys(true);

        // One connection: all writers are serialized through it.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let db = Self { pool, path };
        db.init_schema().await?;

        info!(path = %db.path.display(), "local store opened");
        Ok(db)
    }

    /// Open the store in the platform data directory
    pub async fn open_default() -> Result<Self> {
        Self::open(Self::default_db_path()).await
    }

    /// Open the store inside `data_dir`, or the platform default when unset
    pub async fn open_in(data_dir: Option<&Path>) -> Result<Self> {
        match data_dir {
            Some(dir) => Self::open(dir.join("local.db")).await,
            None => Self::open_default().await,
        }
    }

    /// Platform-specific path of the store file
    pub fn default_db_path() -> PathBuf {
        let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        path.push("sitesync");
        path.push("local.db");
        path
    }

    /// Path of the open store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get connection pool reference
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the store, flushing the WAL
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn init_schema(&self) -> Result<()> {
        sqlx::raw_sql(schema::BASE_SCHEMA).execute(&self.pool).await?;
        self.run_migrations().await
    }

    async fn run_migrations(&self) -> Result<()> {
        let applied: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await?;
        let applied = u32::try_from(applied)
            .map_err(|_| SyncError::storage(format!("invalid schema version {}", applied)))?;

        // A store written by a newer build may hold rows this one cannot read.
        if applied > schema::latest_version() {
            return Err(SyncError::storage(format!(
                "store schema v{} is newer than supported v{}",
                applied,
                schema::latest_version()
            )));
        }

        for migration in schema::pending(applied) {
            self.apply_migration(migration).await?;
        }
        Ok(())
    }

    async fn apply_migration(&self, migration: &schema::Migration) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        if !migration.sql.is_empty() {
            sqlx::raw_sql(migration.sql).execute(&mut *tx).await?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, applied_at) VALUES (?, ?)")
            .bind(i64::from(migration.version))
            .bind(chrono::Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!(version = migration.version, description = migration.description, "schema migration applied");
        Ok(())
    }

    /// Number of entries per collection
    pub async fn stats(&self) -> Result<DatabaseStats> {
        let rows = sqlx::query(
            "SELECT collection, COUNT(*) AS entries FROM store_entries GROUP BY collection",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut stats = DatabaseStats::default();
        for row in rows {
            let collection: String = row.try_get("collection")?;
            let entries: i64 = row.try_get("entries")?;
            let entries = entries as u64;
            match collection.parse::<Collection>() {
                Ok(Collection::Attendance) => stats.attendance = entries,
                Ok(Collection::MaterialRequest) => stats.material_requests = entries,
                Ok(Collection::Dpr) => stats.dprs = entries,
                Ok(Collection::Approval) => stats.approvals = entries,
                Ok(Collection::AiCache) => stats.cached_results = entries,
                Err(_) => stats.unknown += entries,
            }
        }
        Ok(stats)
    }
}

/// Database statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseStats {
    pub attendance: u64,
    pub material_requests: u64,
    pub dprs: u64,
    pub approvals: u64,
    pub cached_results: u64,
    /// Rows in collections this build does not know
    pub unknown: u64,
}

impl DatabaseStats {
    /// Queued writes across all record collections
    pub fn pending_writes(&self) -> u64 {
        self.attendance + self.material_requests + self.dprs + self.approvals
    }
}
