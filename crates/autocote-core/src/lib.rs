//! Autocote Core - Foundation crate for the market-price collection engine.
//!
//! This crate provides the vehicle domain types, error handling, configuration
//! management and failure classification that every other Autocote crate depends on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Vehicle query, price sample and identifier types
//! - [`teardown`] - Detection of failures caused by the host unloading the agent
//!
//! # Example
//!
//! ```rust
//! use autocote_core::{AppConfig, Fuel, VehicleQuery};
//!
//! let config = AppConfig::default();
//! assert_eq!(config.collection.redirect_cooldown_hours, 24);
//!
//! let query = VehicleQuery::new("Peugeot", "3008", 2021).with_fuel(Fuel::Diesel);
//! assert_eq!(query.fuel, Some(Fuel::Diesel));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod teardown;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, CollectionConfig, CoordinatorConfig, SitesConfig, StorageConfig,
};
pub use error::{ConfigError, ConfigResult, CoteError, Result};
pub use teardown::is_host_teardown;
pub use types::{
    fold_accents, Fuel, Gearbox, Location, PriceSample, RunId, SiteTokens, Timestamp,
    VehicleQuery,
};
