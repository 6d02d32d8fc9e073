//! ModKit database handle.
//!
//! A thin wrapper over one sqlx pool (SQLite or PostgreSQL) plus the SeaORM
//! connection built on top of it. The engine is chosen from the DSN scheme.
//!
//! ```rust,no_run
//! # async fn demo() -> modkit_db::Result<()> {
//! use modkit_db::{ConnectOpts, DbHandle};
//!
//! let db = DbHandle::connect("sqlite::memory:", ConnectOpts::in_memory()).await?;
//! let conn = db.sea();
//! # let _ = conn;
//! db.close().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use thiserror::Error;

mod pool_opts;
#[cfg(feature = "sqlite")]
mod sqlite;

use pool_opts::ApplyPoolOpts;

#[cfg(feature = "pg")]
use sqlx::{postgres::PgPoolOptions, PgPool};
#[cfg(feature = "sqlite")]
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};

#[cfg(feature = "sea-orm")]
use sea_orm::DatabaseConnection;
#[cfg(all(feature = "sea-orm", feature = "pg"))]
use sea_orm::SqlxPostgresConnector;
#[cfg(all(feature = "sea-orm", feature = "sqlite"))]
use sea_orm::SqlxSqliteConnector;

/// Library-local result type.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("Unknown DSN: {0}")]
    UnknownDsn(String),

    #[error("Feature not enabled: {0}")]
    FeatureDisabled(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[cfg(feature = "sea-orm")]
    #[error(transparent)]
    Sea(#[from] sea_orm::DbErr),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Supported engines.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DbEngine {
    Postgres,
    Sqlite,
}

impl DbEngine {
    /// Detect the engine from the DSN scheme. The tail (credentials etc.) is not inspected.
    pub fn detect(dsn: &str) -> Result<Self> {
        let s = dsn.trim_start();
        if s.starts_with("postgres://") || s.starts_with("postgresql://") {
            Ok(DbEngine::Postgres)
        } else if s.starts_with("sqlite:") {
            Ok(DbEngine::Sqlite)
        } else {
            Err(DbError::UnknownDsn(dsn.to_string()))
        }
    }
}

/// Pool knobs; each driver applies the subset it supports.
#[derive(Clone, Debug)]
pub struct ConnectOpts {
    pub max_conns: Option<u32>,
    pub min_conns: Option<u32>,
    pub acquire_timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub max_lifetime: Option<Duration>,
    /// Used when the DSN carries no `busy_timeout` parameter.
    pub sqlite_busy_timeout: Option<Duration>,
    /// For SQLite file DSNs, create parent directories if missing.
    pub create_sqlite_dirs: bool,
}

impl Default for ConnectOpts {
    fn default() -> Self {
        Self {
            max_conns: Some(10),
            min_conns: None,
            acquire_timeout: Some(Duration::from_secs(30)),
            idle_timeout: Some(Duration::from_secs(600)),
            max_lifetime: None,
            sqlite_busy_timeout: Some(Duration::from_millis(5000)),
            create_sqlite_dirs: true,
        }
    }
}

impl ConnectOpts {
    /// Options for `sqlite::memory:`: every pooled connection opens its own
    /// database, so the pool is pinned to a single connection that never expires.
    pub fn in_memory() -> Self {
        Self {
            max_conns: Some(1),
            min_conns: Some(1),
            idle_timeout: None,
            max_lifetime: None,
            ..Self::default()
        }
    }
}

/// One concrete sqlx pool.
#[derive(Clone, Debug)]
enum DbPool {
    #[cfg(feature = "pg")]
    Postgres(PgPool),
    #[cfg(feature = "sqlite")]
    Sqlite(SqlitePool),
}

/// Main handle.
#[derive(Debug)]
pub struct DbHandle {
    engine: DbEngine,
    pool: DbPool,
    dsn: String,
    #[cfg(feature = "sea-orm")]
    sea: DatabaseConnection,
}

impl DbHandle {
    /// Connect and build the handle.
    pub async fn connect(dsn: &str, opts: ConnectOpts) -> Result<Self> {
        let engine = DbEngine::detect(dsn)?;
        match engine {
            #[cfg(feature = "pg")]
            DbEngine::Postgres => {
                let pool = PgPoolOptions::new().apply(&opts).connect(dsn).await?;
                tracing::debug!(engine = ?engine, "database pool ready");
                #[cfg(feature = "sea-orm")]
                let sea = SqlxPostgresConnector::from_sqlx_postgres_pool(pool.clone());
                Ok(Self {
                    engine,
                    pool: DbPool::Postgres(pool),
                    dsn: dsn.to_string(),
                    #[cfg(feature = "sea-orm")]
                    sea,
                })
            }
            #[cfg(feature = "sqlite")]
            DbEngine::Sqlite => {
                sqlite::prepare_sqlite_path(dsn, opts.create_sqlite_dirs)?;
                let (clean_dsn, pragmas) = sqlite::split_pragmas(dsn);
                let memory = sqlite::is_memory_dsn(&clean_dsn);

                let mut conn_opts = clean_dsn
                    .parse::<SqliteConnectOptions>()?
                    .create_if_missing(true)
                    .foreign_keys(true);

                // WAL is meaningless for in-memory databases.
                if let Some(mode) = pragmas.journal_mode {
                    conn_opts = conn_opts.journal_mode(mode);
                } else if !memory {
                    conn_opts = conn_opts.journal_mode(SqliteJournalMode::Wal);
                }
                if let Some(sync) = pragmas.synchronous {
                    conn_opts = conn_opts.synchronous(sync);
                }
                if let Some(timeout) = pragmas.busy_timeout.or(opts.sqlite_busy_timeout) {
                    conn_opts = conn_opts.busy_timeout(timeout);
                }

                let pool = SqlitePoolOptions::new()
                    .apply(&opts)
                    .connect_with(conn_opts)
                    .await?;
                tracing::debug!(engine = ?engine, memory, "database pool ready");
                #[cfg(feature = "sea-orm")]
                let sea = SqlxSqliteConnector::from_sqlx_sqlite_pool(pool.clone());

                Ok(Self {
                    engine,
                    pool: DbPool::Sqlite(pool),
                    dsn: clean_dsn,
                    #[cfg(feature = "sea-orm")]
                    sea,
                })
            }
            #[cfg(not(feature = "pg"))]
            DbEngine::Postgres => Err(DbError::FeatureDisabled("PostgreSQL feature not enabled")),
            #[cfg(not(feature = "sqlite"))]
            DbEngine::Sqlite => Err(DbError::FeatureDisabled("SQLite feature not enabled")),
        }
    }

    /// Graceful pool close. Dropping the last handle closes the pool as well.
    pub async fn close(&self) {
        match &self.pool {
            #[cfg(feature = "pg")]
            DbPool::Postgres(p) => p.close().await,
            #[cfg(feature = "sqlite")]
            DbPool::Sqlite(p) => p.close().await,
        }
    }

    pub fn engine(&self) -> DbEngine {
        self.engine
    }

    /// DSN the pool was opened with (SQLite PRAGMA parameters removed).
    pub fn dsn(&self) -> &str {
        &self.dsn
    }

    #[cfg(feature = "sqlite")]
    pub fn sqlx_sqlite(&self) -> Option<&SqlitePool> {
        match &self.pool {
            DbPool::Sqlite(p) => Some(p),
            #[cfg(feature = "pg")]
            _ => None,
        }
    }

    /// SeaORM connection (clone of a pooled handle).
    #[cfg(feature = "sea-orm")]
    pub fn sea(&self) -> DatabaseConnection {
        self.sea.clone()
    }
}
