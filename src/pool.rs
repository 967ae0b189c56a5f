//! Connection pool manager for the durable checkpoint store.
//!
//! The pool is the only mutable shared resource the service holds after
//! initialization. It opens lazily during the first initialization attempt
//! and closes exactly once during shutdown; both operations are idempotent.

use std::str::FromStr;

use miette::Diagnostic;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::config::ServiceConfig;

/// Errors from pool lifecycle operations.
#[derive(Debug, Error, Diagnostic)]
pub enum PoolError {
    #[error("failed to open connection pool: {0}")]
    #[diagnostic(
        code(chatweave::pool::open),
        help("Check the database URL and that the target location is writable.")
    )]
    Open(#[from] sqlx::Error),
}

/// Owns the optional pool handle. Not a connection itself; `sqlx` pools are
/// cheap to clone and internally reference-counted, so `open` hands out a
/// clone of the shared handle.
#[derive(Debug, Default)]
pub struct PoolManager {
    pool: Option<SqlitePool>,
}

impl PoolManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the pool with the configured bounds. Idempotent: if a pool is
    /// already open, the existing handle is returned. Failure is reported to
    /// the caller, never swallowed.
    #[instrument(skip_all, err)]
    pub async fn open(&mut self, config: &ServiceConfig) -> Result<SqlitePool, PoolError> {
        if let Some(pool) = &self.pool {
            debug!("connection pool already open");
            return Ok(pool.clone());
        }
        let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_max_size)
            .idle_timeout(config.pool_max_idle)
            .connect_with(options)
            .await?;
        info!(
            max_size = config.pool_max_size,
            max_idle_secs = config.pool_max_idle.as_secs(),
            "connection pool opened"
        );
        self.pool = Some(pool.clone());
        Ok(pool)
    }

    /// The live pool handle, if open.
    #[must_use]
    pub fn handle(&self) -> Option<SqlitePool> {
        self.pool.clone()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.pool.is_some()
    }

    /// Close the pool and clear the handle. Idempotent: a second call is a
    /// logged no-op.
    #[instrument(skip_all)]
    pub async fn close(&mut self) {
        match self.pool.take() {
            Some(pool) => {
                pool.close().await;
                info!("connection pool closed");
            }
            None => info!("no connection pool to close"),
        }
    }
}
