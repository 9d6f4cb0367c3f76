//! Configuration management for Autocote.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/autocote/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Coordinator service settings
    pub coordinator: CoordinatorConfig,
    /// Collection pacing and validation thresholds
    pub collection: CollectionConfig,
    /// Per-marketplace settings
    pub sites: SitesConfig,
    /// Agent-local storage settings
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path, falling back to defaults if absent.
    pub fn load_from(config_path: &Path) -> ConfigResult<Self> {
        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(config_path)?;
            let config: Self = toml::from_str(&contents)?;
            config.validate()?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `AUTOCOTE_COORDINATOR_URL`: Override the coordinator base URL
    /// - `AUTOCOTE_COOLDOWN_HOURS`: Override the redirect cooldown window
    /// - `AUTOCOTE_DB_PATH`: Override the local database path
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply `AUTOCOTE_*` environment overrides in place.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("AUTOCOTE_COORDINATOR_URL") {
            if !val.trim().is_empty() {
                tracing::debug!("Override coordinator.base_url from env: {}", val);
                self.coordinator.base_url = val;
            }
        }

        if let Ok(val) = std::env::var("AUTOCOTE_COOLDOWN_HOURS") {
            if let Ok(hours) = val.parse() {
                self.collection.redirect_cooldown_hours = hours;
                tracing::debug!("Override collection.redirect_cooldown_hours from env: {}", hours);
            }
        }

        if let Ok(val) = std::env::var("AUTOCOTE_DB_PATH") {
            if !val.trim().is_empty() {
                tracing::debug!("Override storage.database_path from env: {}", val);
                self.storage.database_path = Some(PathBuf::from(val));
            }
        }
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        let c = &self.collection;
        if c.degraded_floor == 0 {
            return Err(invalid("collection.degraded_floor", "must be at least 1"));
        }
        if c.tier_delay_min_ms > c.tier_delay_max_ms {
            return Err(invalid(
                "collection.tier_delay_min_ms",
                "must not exceed tier_delay_max_ms",
            ));
        }
        if c.bonus_delay_min_ms > c.bonus_delay_max_ms {
            return Err(invalid(
                "collection.bonus_delay_min_ms",
                "must not exceed bonus_delay_max_ms",
            ));
        }
        for (field, value) in [
            ("sites.leboncoin_min_samples", self.sites.leboncoin_min_samples),
            ("sites.autoscout24_min_samples", self.sites.autoscout24_min_samples),
        ] {
            if value < c.degraded_floor {
                return Err(invalid(field, "must not be below collection.degraded_floor"));
            }
        }
        if self.coordinator.base_url.trim().is_empty() {
            return Err(invalid("coordinator.base_url", "cannot be empty"));
        }
        Ok(())
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| invalid("config_path", "no parent directory"))?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/autocote/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "autocote", "autocote").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/autocote`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "autocote", "autocote").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }

    /// Resolve the local database path, defaulting to `<data_dir>/autocote.db`.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("autocote.db")),
        }
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

/// Coordinator service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Base URL of the job-assignment service (no trailing slash needed)
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Upper bound for best-effort side-channel reports, in seconds
    pub report_timeout_secs: u64,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.autocote.fr/v1".to_string(),
            timeout_secs: 15,
            report_timeout_secs: 5,
        }
    }
}

/// Collection pacing and validation thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Minimum hours between two collections for a vehicle other than the viewed one
    pub redirect_cooldown_hours: u32,
    /// Smallest valid sample count that is still submitted (as low confidence)
    pub degraded_floor: usize,
    /// Prices at or below this value are discarded
    pub min_valid_price: u32,
    /// Queries older than this year skip the listing-year check
    pub year_filter_cutoff: i32,
    /// Lower bound of the randomized pause between cascade tiers
    pub tier_delay_min_ms: u64,
    /// Upper bound of the randomized pause between cascade tiers
    pub tier_delay_max_ms: u64,
    /// Lower bound of the randomized pause before each bonus job
    pub bonus_delay_min_ms: u64,
    /// Upper bound of the randomized pause before each bonus job
    pub bonus_delay_max_ms: u64,
    /// Maximum number of bonus jobs drained in one run
    pub max_bonus_jobs: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            redirect_cooldown_hours: 24,
            degraded_floor: 5,
            min_valid_price: 500,
            year_filter_cutoff: 1990,
            tier_delay_min_ms: 1_500,
            tier_delay_max_ms: 4_000,
            bonus_delay_min_ms: 3_000,
            bonus_delay_max_ms: 8_000,
            max_bonus_jobs: 3,
        }
    }
}

/// Per-marketplace settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitesConfig {
    /// Samples needed before a LeBonCoin tier is accepted
    pub leboncoin_min_samples: usize,
    /// Samples needed before an AutoScout24 tier is accepted
    pub autoscout24_min_samples: usize,
    /// Marketplace request timeout in seconds
    pub request_timeout_secs: u64,
    /// Listings requested per search
    pub page_limit: u32,
}

impl Default for SitesConfig {
    fn default() -> Self {
        Self {
            leboncoin_min_samples: 20,
            autoscout24_min_samples: 10,
            request_timeout_secs: 20,
            page_limit: 35,
        }
    }
}

/// Agent-local storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file; `None` resolves to the XDG data directory
    pub database_path: Option<PathBuf>,
}
