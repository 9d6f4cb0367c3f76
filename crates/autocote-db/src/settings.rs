//! Key/value settings persisted between collection runs.
//!
//! Values are stored as JSON text so callers can keep small structured state
//! (timestamps, counters) without a dedicated table.

use crate::error::{DatabaseError, Result};
use serde_json::Value;
use sqlx::SqlitePool;

/// Insert or replace a setting.
pub async fn set_setting(pool: &SqlitePool, key: &str, value: &Value) -> Result<()> {
    let value_str = serde_json::to_string(value)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;

    sqlx::query(
        r"
        INSERT INTO settings (key, value, updated_at)
        VALUES (?, ?, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET
            value = excluded.value,
            updated_at = excluded.updated_at
        ",
    )
    .bind(key)
    .bind(value_str)
    .execute(pool)
    .await?;

    tracing::debug!(key, "setting stored");
    Ok(())
}

/// Read a setting, `None` if it was never written.
pub async fn get_setting(pool: &SqlitePool, key: &str) -> Result<Option<Value>> {
    let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
        .bind(key)
        .fetch_optional(pool)
        .await?;

    row.map(|(value_str,)| {
        serde_json::from_str(&value_str)
            .map_err(|e| DatabaseError::SerializationError(e.to_string()))
    })
    .transpose()
}
