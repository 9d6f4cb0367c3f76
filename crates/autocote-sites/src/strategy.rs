//! Search strategy tiers shared by the planner and the marketplace adapters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Geographic extent of one search tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationScope {
    /// Radius search around the listing's coordinates
    Geo,
    /// Whole administrative region
    Region,
    /// Whole country
    National,
}

impl fmt::Display for LocationScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Geo => "geo",
            Self::Region => "region",
            Self::National => "national",
        })
    }
}

/// Attribute filters a tier may apply on top of make/model/year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchFilter {
    /// Same fuel type
    Fuel,
    /// Same gearbox
    Gearbox,
    /// Horse power within ±10 %
    Power,
    /// Mileage between half and one and a half times the query's
    Mileage,
}

/// One tier of the search cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchStrategy {
    /// Geographic extent
    pub location_scope: LocationScope,
    /// Accepted distance, in years, from the query's registration year
    pub year_spread: i32,
    /// Attribute filters applied by this tier
    pub filters: BTreeSet<SearchFilter>,
    /// Confidence of a sample found by this tier, 5 = tightest, 1 = loosest
    pub precision_tier: u8,
    /// Marketplace region code, set for region tiers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region_code: Option<String>,
}

impl SearchStrategy {
    /// Whether this tier applies `filter`.
    #[must_use]
    pub fn applies(&self, filter: SearchFilter) -> bool {
        self.filters.contains(&filter)
    }

    /// Inclusive registration-year window for a query year.
    #[must_use]
    pub fn year_window(&self, year: i32) -> (i32, i32) {
        (year - self.year_spread, year + self.year_spread)
    }

    /// Short human label, e.g. `"region ±2y fuel+gearbox"`.
    #[must_use]
    pub fn label(&self) -> String {
        let filters: Vec<&str> = self
            .filters
            .iter()
            .map(|f| match f {
                SearchFilter::Fuel => "fuel",
                SearchFilter::Gearbox => "gearbox",
                SearchFilter::Power => "power",
                SearchFilter::Mileage => "mileage",
            })
            .collect();
        if filters.is_empty() {
            format!("{} ±{}y", self.location_scope, self.year_spread)
        } else {
            format!(
                "{} ±{}y {}",
                self.location_scope,
                self.year_spread,
                filters.join("+")
            )
        }
    }
}

/// Power filter bounds (±10 %) for a horse-power value.
#[must_use]
pub fn power_window(hp: u32) -> (u32, u32) {
    let hp = u64::from(hp);
    let clamp = |v: u64| u32::try_from(v).unwrap_or(u32::MAX);
    (clamp(hp * 9 / 10), clamp((hp * 11).div_ceil(10)))
}

/// Mileage filter bounds for an odometer reading.
#[must_use]
pub fn mileage_window(km: u32) -> (u32, u32) {
    (km / 2, km.saturating_mul(3) / 2)
}
