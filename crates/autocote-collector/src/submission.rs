//! Submission decision and coordinator payloads.

use crate::cascade::{CascadeOutcome, SearchLogEntry};
use crate::filter::SanityFilter;
use crate::tokens::TokenProvenance;
use autocote_core::{Fuel, PriceSample, VehicleQuery};
use autocote_sites::Site;
use serde::{Deserialize, Serialize};

/// Precision reported for a degraded submission.
pub const DEGRADED_PRECISION: u8 = 1;

/// What to do with a cascade's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionDecision {
    /// Enough valid samples: submit at the cascade's precision.
    Full {
        /// Re-validated samples
        samples: Vec<PriceSample>,
        /// Precision of the selected tier
        precision: u8,
    },
    /// Fewer than the threshold but at least the floor: submit as low confidence.
    Degraded { samples: Vec<PriceSample> },
    /// Too few to submit; send a diagnostic instead.
    Insufficient { valid: usize },
}

impl SubmissionDecision {
    /// Re-validate `outcome` and pick the submission mode.
    #[must_use]
    pub fn decide(
        outcome: &CascadeOutcome,
        filter: &SanityFilter,
        min_samples: usize,
        degraded_floor: usize,
    ) -> Self {
        let samples = filter.valid(&outcome.samples);
        if samples.len() >= min_samples {
            Self::Full {
                samples,
                precision: outcome.precision_tier,
            }
        } else if samples.len() >= degraded_floor {
            Self::Degraded { samples }
        } else {
            Self::Insufficient {
                valid: samples.len(),
            }
        }
    }
}

/// Body of `POST market-prices`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    /// Brand as displayed
    pub make: String,
    /// Model as displayed
    pub model: String,
    /// Year of first registration
    pub year: i32,
    /// Region name, if known
    pub region: Option<String>,
    /// Asking prices in euros
    pub prices: Vec<u32>,
    /// Per-listing details in the same order as `prices`
    pub price_details: Vec<PriceSample>,
    /// Fuel type, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<Fuel>,
    /// 20 hp bucket of the query's power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_range: Option<String>,
    /// 1 (national, degraded) to 5 (around the listing)
    pub precision: u8,
    /// Tiers tried for the main target
    pub search_log: Vec<SearchLogEntry>,
    /// Origin of the brand/model tokens searched with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_provenance: Option<TokenProvenance>,
    /// Marketplace the prices came from
    pub source: Site,
}

impl SubmissionPayload {
    /// Payload for `samples` of `query`.
    #[must_use]
    pub fn new(
        query: &VehicleQuery,
        samples: Vec<PriceSample>,
        precision: u8,
        search_log: Vec<SearchLogEntry>,
        token_provenance: Option<TokenProvenance>,
        source: Site,
    ) -> Self {
        Self {
            make: query.make.clone(),
            model: query.model.clone(),
            year: query.year,
            region: query.region().map(str::to_string),
            prices: samples.iter().map(|s| s.price).collect(),
            price_details: samples,
            fuel: query.fuel,
            hp_range: query.hp_range(),
            precision,
            search_log,
            token_provenance,
            source,
        }
    }
}

/// Body of `POST market-prices/failed-search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedSearchReport {
    /// Brand as displayed
    pub make: String,
    /// Model as displayed
    pub model: String,
    /// Year of first registration
    pub year: i32,
    /// Region name, if known
    pub region: Option<String>,
    /// Fuel type, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<Fuel>,
    /// 20 hp bucket of the query's power
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_range: Option<String>,
    /// Origin of the brand/model tokens searched with
    pub token_provenance: TokenProvenance,
    /// Every tier tried
    pub search_log: Vec<SearchLogEntry>,
    /// Marketplace searched
    pub source: Site,
}

impl FailedSearchReport {
    /// Diagnostic for a search that found too few prices.
    #[must_use]
    pub fn new(
        query: &VehicleQuery,
        token_provenance: TokenProvenance,
        search_log: Vec<SearchLogEntry>,
        source: Site,
    ) -> Self {
        Self {
            make: query.make.clone(),
            model: query.model.clone(),
            year: query.year,
            region: query.region().map(str::to_string),
            fuel: query.fuel,
            hp_range: query.hp_range(),
            token_provenance,
            search_log,
            source,
        }
    }
}

/// Body of `POST market-prices/job-done`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDone {
    /// Bonus job identifier
    pub job_id: String,
    /// Whether the bonus job submitted prices
    pub success: bool,
}
