//! Persisted timestamp of the last collection run, gating redirect collection.

use crate::error::{CollectError, Result};
use async_trait::async_trait;
use autocote_core::Timestamp;
use autocote_db::{settings, Database};
use std::sync::Mutex;

/// Settings key holding the RFC 3339 timestamp of the last collection.
pub const COOLDOWN_KEY: &str = "market.last_collection_at";

/// Read and write the last collection time.
#[async_trait]
pub trait CooldownStore: Send + Sync {
    /// Last recorded collection, or `None` if never collected.
    async fn last_collection(&self) -> Result<Option<Timestamp>>;

    /// Record a collection at `at`.
    async fn record_collection(&self, at: Timestamp) -> Result<()>;
}

/// Whether a redirected collection may run given the last collection time.
#[must_use]
pub fn is_redirect_allowed(last: Option<Timestamp>, now: Timestamp, cooldown_hours: u32) -> bool {
    last.map_or(true, |last| {
        now.since(&last) >= chrono::Duration::hours(i64::from(cooldown_hours))
    })
}

/// Cooldown kept in the local settings table.
#[derive(Debug, Clone)]
pub struct SqliteCooldownStore {
    db: Database,
}

impl SqliteCooldownStore {
    /// Store backed by the local settings table.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CooldownStore for SqliteCooldownStore {
    async fn last_collection(&self) -> Result<Option<Timestamp>> {
        let Some(value) = settings::get_setting(self.db.pool(), COOLDOWN_KEY).await? else {
            return Ok(None);
        };
        let text = value.as_str().ok_or_else(|| CollectError::InvalidState {
            key: COOLDOWN_KEY.to_string(),
            reason: format!("expected a string, found {value}"),
        })?;
        Timestamp::from_rfc3339(text)
            .map(Some)
            .map_err(|e| CollectError::InvalidState {
                key: COOLDOWN_KEY.to_string(),
                reason: e.to_string(),
            })
    }

    async fn record_collection(&self, at: Timestamp) -> Result<()> {
        let value = serde_json::Value::String(at.to_rfc3339());
        settings::set_setting(self.db.pool(), COOLDOWN_KEY, &value).await?;
        Ok(())
    }
}

/// In-process cooldown, for hosts without storage and for tests.
#[derive(Debug, Default)]
pub struct MemoryCooldownStore {
    last: Mutex<Option<Timestamp>>,
    writes: Mutex<usize>,
}

impl MemoryCooldownStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that last collected at `at`.
    #[must_use]
    pub fn with_last_collection(at: Timestamp) -> Self {
        Self {
            last: Mutex::new(Some(at)),
            writes: Mutex::new(0),
        }
    }

    /// Number of times the cooldown was written.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.lock().map_or(0, |w| *w)
    }

    /// Currently stored timestamp.
    #[must_use]
    pub fn current(&self) -> Option<Timestamp> {
        self.last.lock().ok().and_then(|l| *l)
    }
}

#[async_trait]
impl CooldownStore for MemoryCooldownStore {
    async fn last_collection(&self) -> Result<Option<Timestamp>> {
        Ok(self.current())
    }

    async fn record_collection(&self, at: Timestamp) -> Result<()> {
        if let Ok(mut last) = self.last.lock() {
            *last = Some(at);
        }
        if let Ok(mut writes) = self.writes.lock() {
            *writes += 1;
        }
        Ok(())
    }
}
