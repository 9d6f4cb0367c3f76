//! Database connection management.
//!
//! Provides a `LocalPool` wrapper around `SQLx` that creates the database file on
//! first use and keeps in-memory databases alive for the lifetime of the pool.

use crate::error::{DatabaseError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

const IN_MEMORY: &str = ":memory:";

/// Connection pool over the agent-local `SQLite` database.
#[derive(Debug, Clone)]
pub struct LocalPool {
    pool: Pool<Sqlite>,
}

impl LocalPool {
    /// Open (or create) the database at `path`.
    ///
    /// `:memory:` opens a private in-memory database backed by a single
    /// connection that is never recycled, so its contents survive for the
    /// lifetime of the pool.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the path is not valid UTF-8, its parent
    /// directory cannot be created, or the connection cannot be established.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| {
            DatabaseError::Open("invalid database path: not valid UTF-8".to_string())
        })?;

        let in_memory = path_str == IN_MEMORY;
        if !in_memory {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut connect_options = SqliteConnectOptions::from_str(path_str)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
            .create_if_missing(true);
        if !in_memory {
            connect_options = connect_options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(2)
        };

        let pool = pool_options
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::Open(format!("failed to initialize pool: {e}")))?;

        tracing::info!("Local database pool created at {}", path_str);

        Ok(Self { pool })
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the connection pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Local database pool closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_pool_creation() {
        let pool = LocalPool::new(IN_MEMORY).await.expect("create pool");

        let one: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(pool.pool())
            .await
            .expect("run trivial query");
        assert_eq!(one, 1);
    }

    #[tokio::test]
    async fn test_file_pool_creates_parent_dirs() {
        let tmp = tempfile::TempDir::new().expect("create temp dir");
        let path = tmp.path().join("nested").join("autocote.db");

        let pool = LocalPool::new(&path).await.expect("create pool");
        assert!(path.exists());

        pool.close().await;
    }
}
