//! Process-wide state of the host.

use anyhow::{Context, Result};
use autocote_collector::RunGuard;
use autocote_core::AppConfig;
use autocote_db::Database;

/// State shared by every command of one process.
pub struct AppState {
    pub config: AppConfig,
    pub db: Database,
    /// Drops a collection trigger while another run is active
    pub guard: RunGuard,
}

impl AppState {
    /// Open (and migrate) the local database named by `config`.
    pub async fn open(config: AppConfig) -> Result<Self> {
        let db_path = config.database_path()?;
        tracing::info!("Database: {}", db_path.display());

        let db = Database::open(&db_path)
            .await
            .with_context(|| format!("failed to open database at {}", db_path.display()))?;

        Ok(Self {
            config,
            db,
            guard: RunGuard::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let mut config = AppConfig::default();
        config.storage.database_path = Some(temp_dir.path().join("data").join("autocote.db"));

        let state = AppState::open(config).await.expect("open state");
        assert!(temp_dir.path().join("data").join("autocote.db").exists());
        assert!(!state.guard.is_active());
    }
}
