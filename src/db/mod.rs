//! Database module for persistent storage.
//!
//! Provides async SQLite database access using SQLx for:
//! - Banned IP patterns (admin-created and auto-ban rows)
//! - Whitelisted IP patterns
//! - Auto-ban path patterns
//! - Session role lookup (rows written by the authentication layer)

mod rules;
mod sessions;

pub use rules::{AutoBanPathRule, BanRecord, NewBan, RuleKind, RuleRepository, WhitelistEntry};
pub use sessions::SessionRepository;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Path value selecting a process-private in-memory database.
pub const MEMORY_PATH: &str = ":memory:";

static MEMDB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(sqlx::Error),
    #[error("migration error: {0}")]
    Migration(sqlx::migrate::MigrateError),
    #[error("pattern already exists: {0}")]
    Duplicate(String),
}

/// Database handle with connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// How long a caller waits for a pooled connection before giving up.
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

    /// File-backed connections idle longer than this are closed.
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    const FILE_MAX_CONNECTIONS: u32 = 5;

    /// Open the database at `path` (or `":memory:"`) and apply migrations.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let pool = if path == MEMORY_PATH {
            Self::open_memory().await?
        } else {
            Self::open_file(path).await?
        };

        info!(path = %path, "Database connected");

        Self::run_migrations(&pool).await?;

        // WAL lets request-time reads proceed while an auto-ban write is in progress.
        sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;
        sqlx::query("PRAGMA synchronous=NORMAL").execute(&pool).await?;

        Self::check_integrity(&pool).await?;

        Ok(Self { pool })
    }

    /// A private shared-cache memory database.
    ///
    /// SQLite drops a memory database when its last connection closes, so
    /// this pool pins exactly one connection for the lifetime of the handle.
    async fn open_memory() -> Result<SqlitePool, DbError> {
        let id = MEMDB_COUNTER.fetch_add(1, Ordering::Relaxed);
        let uri = format!(
            "file:sentinel-memdb-{}-{}?mode=memory&cache=shared",
            std::process::id(),
            id
        );

        let options = SqliteConnectOptions::new()
            .filename(&uri)
            .shared_cache(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    async fn open_file(path: &str) -> Result<SqlitePool, DbError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            tracing::warn!(path = %parent.display(), error = %e, "Failed to create database directory");
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(Self::FILE_MAX_CONNECTIONS)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Self::IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        Ok(pool)
    }

    async fn check_integrity(pool: &SqlitePool) -> Result<(), DbError> {
        let result: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(pool)
            .await?;

        if result == "ok" {
            return Ok(());
        }

        tracing::error!(integrity_check = %result, "Database integrity check failed");
        Err(DbError::Sqlx(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("integrity check failed: {}", result),
        ))))
    }

    /// Get reference to the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Run embedded migrations.
    async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(DbError::Migration)?;

        info!("Database migrations checked/applied");
        Ok(())
    }

    /// Get rule repository (bans, whitelist, auto-ban paths).
    pub fn rules(&self) -> RuleRepository<'_> {
        RuleRepository::new(&self.pool)
    }

    /// Get session repository.
    pub fn sessions(&self) -> SessionRepository<'_> {
        SessionRepository::new(&self.pool)
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        DbError::Sqlx(err)
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::Migration(err)
    }
}

/// Map a unique-constraint violation on insert to [`DbError::Duplicate`].
pub(crate) fn map_unique_violation(err: sqlx::Error, pattern: &str) -> DbError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DbError::Duplicate(pattern.to_string())
        }
        _ => DbError::Sqlx(err),
    }
}
