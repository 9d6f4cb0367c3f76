//! Autocote command-line host
//!
//! Thin shell that loads configuration, opens local storage and runs one
//! collection. Core business logic lives in the `crates/` directory.

mod state;

pub use state::AppState;

use anyhow::{bail, Context, Result};
use autocote_collector::{
    CollectorContext, HttpCoordinator, MarketCollector, PageContext, SqliteCooldownStore,
};
use autocote_core::{AppConfig, SiteTokens, VehicleQuery};
use autocote_sites::{HttpFetcher, Site, SiteAdapter};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "autocote",
    version,
    about = "Collect comparable asking prices for a used-car listing"
)]
pub struct Cli {
    /// Configuration file (defaults to the XDG config path)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one collection for the listing at --url
    Collect(CollectArgs),
    /// Show when the last collection ran
    Cooldown,
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug)]
pub struct CollectArgs {
    /// Listing page being viewed
    #[arg(long)]
    pub url: String,

    /// JSON file with the extracted vehicle attributes
    #[arg(long)]
    pub vehicle: PathBuf,

    /// Brand token scraped from the page
    #[arg(long, requires = "dom_model")]
    pub dom_brand: Option<String>,

    /// Model token scraped from the page
    #[arg(long, requires = "dom_brand")]
    pub dom_model: Option<String>,

    /// Override the marketplace's sample threshold
    #[arg(long)]
    pub min_samples: Option<usize>,
}

/// Initialize tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,autocote=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Load the configuration from `path` or the default location, with env overrides.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => AppConfig::load().context("failed to load config")?,
    };
    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Read the vehicle attributes handed over by the page extraction layer.
pub fn read_vehicle(path: &Path) -> Result<VehicleQuery> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read vehicle file {}", path.display()))?;
    let vehicle: VehicleQuery = serde_json::from_str(&raw)
        .with_context(|| format!("invalid vehicle JSON in {}", path.display()))?;
    vehicle.validate()?;
    Ok(vehicle)
}

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing();
    info!("Starting Autocote v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Collect(args) => collect(config, args).await,
        Command::Cooldown => show_cooldown(config).await,
        Command::Config => {
            let path = match cli.config {
                Some(path) => path,
                None => AppConfig::config_path()?,
            };
            println!("# {}", path.display());
            print!("{}", toml_config(&config)?);
            Ok(())
        }
    }
}

fn toml_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to serialize config")
}

async fn collect(config: AppConfig, args: CollectArgs) -> Result<()> {
    let site = Site::resolve(&args.url)?;
    if !site.is_ad_page(&args.url) {
        bail!("{} is not a {} vehicle listing", args.url, site);
    }

    let vehicle = read_vehicle(&args.vehicle)?;
    let dom_tokens = match (args.dom_brand, args.dom_model) {
        (Some(brand), Some(model)) => Some(SiteTokens::new(brand, model)),
        _ => None,
    };

    let state = AppState::open(config).await?;
    let Some(_permit) = state.guard.try_acquire() else {
        bail!("a collection is already running");
    };

    let fetcher = HttpFetcher::new(Duration::from_secs(state.config.sites.request_timeout_secs))?;
    let mut adapter = SiteAdapter::new(site, Arc::new(fetcher), &state.config.sites);
    if let Some(min_samples) = args.min_samples {
        adapter = adapter.with_min_samples(min_samples);
    }
    let coordinator = HttpCoordinator::new(&state.config.coordinator)?;
    let cooldown = SqliteCooldownStore::new(state.db.clone());

    let ctx = CollectorContext::new(
        Arc::new(coordinator),
        adapter,
        Arc::new(cooldown),
        &state.config,
    );
    let page = PageContext {
        vehicle,
        dom_tokens,
    };

    let outcome = MarketCollector::new(ctx).run(&page).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}

async fn show_cooldown(config: AppConfig) -> Result<()> {
    use autocote_collector::{is_redirect_allowed, CooldownStore};
    use autocote_core::Timestamp;

    let state = AppState::open(config).await?;
    let store = SqliteCooldownStore::new(state.db.clone());
    match store.last_collection().await? {
        Some(last) => {
            let allowed = is_redirect_allowed(
                Some(last),
                Timestamp::now(),
                state.config.collection.redirect_cooldown_hours,
            );
            println!("last collection: {last}");
            println!("redirects allowed: {allowed}");
        }
        None => println!("no collection recorded"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parses_collect() {
        let cli = Cli::try_parse_from([
            "autocote",
            "collect",
            "--url",
            "https://www.leboncoin.fr/ad/voitures/2841234567",
            "--vehicle",
            "vehicle.json",
            "--dom-brand",
            "PEUGEOT",
            "--dom-model",
            "PEUGEOT_3008",
        ])
        .expect("parse args");

        let Command::Collect(args) = cli.command else {
            panic!("expected collect");
        };
        assert_eq!(args.dom_brand.as_deref(), Some("PEUGEOT"));
        assert!(args.min_samples.is_none());
    }

    #[test]
    fn test_cli_requires_both_dom_tokens() {
        let result = Cli::try_parse_from([
            "autocote",
            "collect",
            "--url",
            "https://www.leboncoin.fr/ad/voitures/2841234567",
            "--vehicle",
            "vehicle.json",
            "--dom-brand",
            "PEUGEOT",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_vehicle() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("vehicle.json");
        std::fs::write(
            &path,
            r#"{"make": "Peugeot", "model": "3008", "year": 2021, "fuel": "diesel"}"#,
        )
        .expect("write vehicle");

        let vehicle = read_vehicle(&path).expect("read vehicle");
        assert_eq!(vehicle.model, "3008");

        std::fs::write(&path, r#"{"make": "", "model": "3008", "year": 2021}"#)
            .expect("write vehicle");
        assert!(read_vehicle(&path).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let temp_dir = TempDir::new().expect("create temp dir");
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[collection]\nmax_bonus_jobs = 1\n").expect("write config");

        let config = load_config(Some(&path)).expect("load config");
        assert_eq!(config.collection.max_bonus_jobs, 1);
        assert_eq!(config.sites.leboncoin_min_samples, 20);
    }

    #[test]
    fn test_toml_config_round_trips() {
        let rendered = toml_config(&AppConfig::default()).expect("render config");
        let parsed: AppConfig = toml::from_str(&rendered).expect("parse rendered config");
        assert_eq!(parsed.collection.redirect_cooldown_hours, 24);
    }
}
