//! Autocote Database Layer
//!
//! Agent-local persistent storage backed by `SQLite`. The collection engine keeps
//! very little state between runs (most notably the cooldown timestamp), so the
//! schema is a single key/value `settings` table managed by embedded migrations.
//!
//! # Example
//!
//! ```ignore
//! use autocote_db::{settings, Database};
//!
//! let db = Database::new("autocote.db").await?;
//! db.run_migrations().await?;
//! settings::set_setting(db.pool(), "key", &serde_json::json!(1)).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod connection;
pub mod error;
pub mod migrations;
pub mod settings;

// Re-export commonly used types
pub use connection::LocalPool;
pub use error::{DatabaseError, Result};

use std::path::Path;

/// High-level database interface with migrations.
#[derive(Debug, Clone)]
pub struct Database {
    pool: LocalPool,
}

impl Database {
    /// Open the database at `path` (or `:memory:`).
    ///
    /// # Errors
    /// Returns `DatabaseError` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = LocalPool::new(path).await?;
        Ok(Self { pool })
    }

    /// Open the database and bring its schema up to date.
    ///
    /// # Errors
    /// Returns `DatabaseError` if opening or migrating fails.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = Self::new(path).await?;
        let schema_version = db.run_migrations().await?;
        tracing::info!(schema_version, "local storage ready");
        Ok(db)
    }

    /// Apply pending migrations; returns the schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<i64> {
        migrations::run_migrations(self.pool.pool()).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Sqlite> {
        self.pool.pool()
    }
}
