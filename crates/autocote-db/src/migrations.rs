//! Embedded schema migrations.
//!
//! The SQL files under `migrations/` are compiled into the binary, so a fresh
//! agent brings its own schema up to date on first open.

use crate::error::{DatabaseError, Result};
use sqlx::migrate::Migrator;
use sqlx::{Pool, Sqlite};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Apply pending migrations and return the resulting schema version.
///
/// Already-applied migrations are skipped, so this is safe on every open.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<i64> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    let version: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(version), 0) FROM _sqlx_migrations WHERE success = 1",
    )
    .fetch_one(pool)
    .await?;

    tracing::debug!(version, "schema migrations applied");
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::LocalPool;

    const LATEST_VERSION: i64 = 20_260_101_000_000;

    #[tokio::test]
    async fn test_migrations_create_settings_table() {
        let pool = LocalPool::new(":memory:").await.expect("create pool");

        let version = run_migrations(pool.pool()).await.expect("run migrations");
        assert_eq!(version, LATEST_VERSION);

        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations'",
        )
        .fetch_all(pool.pool())
        .await
        .expect("query tables");
        assert_eq!(tables, vec!["settings"]);
    }

    #[tokio::test]
    async fn test_rerunning_migrations_keeps_version() {
        let pool = LocalPool::new(":memory:").await.expect("create pool");

        let first = run_migrations(pool.pool()).await.expect("first run");
        let second = run_migrations(pool.pool()).await.expect("second run");
        assert_eq!(first, second);
    }
}
