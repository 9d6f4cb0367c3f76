//! Shared types used across the Autocote engine.
//!
//! This module defines the vehicle query handed over by the page extraction layer,
//! the price samples produced by marketplace adapters, and a few identifier newtypes.

use crate::error::CoteError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a single collection run, used to correlate log lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(String);

impl RunId {
    /// Create a new random `RunId` using UUID v4.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fuel type of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Fuel {
    /// Petrol ("essence")
    Petrol,
    /// Diesel
    Diesel,
    /// Battery electric
    Electric,
    /// Non-rechargeable hybrid
    Hybrid,
    /// Plug-in hybrid
    PlugInHybrid,
    /// Liquefied petroleum gas
    Lpg,
    /// Anything else (CNG, hydrogen, ethanol)
    Other,
}

impl Fuel {
    /// Parse a fuel label as printed by French and German marketplaces.
    ///
    /// Matching is case-insensitive and tolerant to accents; unknown labels yield `None`.
    #[must_use]
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = fold_accents(&label.trim().to_lowercase());
        let fuel = match normalized.as_str() {
            "essence" | "petrol" | "gasoline" | "benzin" | "b" => Self::Petrol,
            "diesel" | "gazole" | "d" => Self::Diesel,
            "electrique" | "electric" | "elektro" | "e" => Self::Electric,
            "hybride" | "hybrid" | "hybride essence" | "hybride diesel" => Self::Hybrid,
            "hybride rechargeable" | "plug-in hybrid" | "plug_in_hybrid" | "phev" => {
                Self::PlugInHybrid
            }
            "gpl" | "lpg" | "l" => Self::Lpg,
            "autre" | "other" | "gnv" | "cng" | "hydrogene" | "ethanol" => Self::Other,
            _ => return None,
        };
        Some(fuel)
    }

    /// Wire label used by the coordinator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Petrol => "petrol",
            Self::Diesel => "diesel",
            Self::Electric => "electric",
            Self::Hybrid => "hybrid",
            Self::PlugInHybrid => "plug_in_hybrid",
            Self::Lpg => "lpg",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Fuel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transmission type of a vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gearbox {
    /// Manual gearbox
    Manual,
    /// Automatic or semi-automatic gearbox
    Automatic,
}

impl Gearbox {
    /// Parse a gearbox label ("manuelle", "automatique", "manual", ...).
    #[must_use]
    pub fn parse_label(label: &str) -> Option<Self> {
        let normalized = fold_accents(&label.trim().to_lowercase());
        match normalized.as_str() {
            "manuelle" | "manual" | "manuel" | "boite manuelle" | "schaltgetriebe" | "m" => {
                Some(Self::Manual)
            }
            "automatique" | "automatic" | "auto" | "semi-automatique" | "boite automatique"
            | "automatik" | "a" => Some(Self::Automatic),
            _ => None,
        }
    }

    /// Wire label used by the coordinator.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Automatic => "automatic",
        }
    }
}

impl fmt::Display for Gearbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the viewed vehicle is offered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// City name
    pub city: Option<String>,
    /// Postal code
    pub zipcode: Option<String>,
    /// Latitude in decimal degrees
    pub lat: Option<f64>,
    /// Longitude in decimal degrees
    pub lng: Option<f64>,
    /// Administrative region name ("Île-de-France", "Bretagne", ...)
    pub region: Option<String>,
}

impl Location {
    /// Location known only by its region.
    #[must_use]
    pub fn region_only(region: impl Into<String>) -> Self {
        Self {
            region: Some(region.into()),
            ..Self::default()
        }
    }

    /// True only when coordinates, city and postal code are all present.
    #[must_use]
    pub fn has_geo(&self) -> bool {
        self.lat.is_some()
            && self.lng.is_some()
            && self.city.as_deref().is_some_and(|c| !c.trim().is_empty())
            && self.zipcode.as_deref().is_some_and(|z| !z.trim().is_empty())
    }
}

/// The vehicle to price, as extracted from the listing page.
///
/// Immutable for the duration of a collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleQuery {
    /// Brand as displayed ("Peugeot")
    pub make: String,
    /// Model as displayed ("3008")
    pub model: String,
    /// Year of first registration
    pub year: i32,
    /// Fuel type, if known
    #[serde(default)]
    pub fuel: Option<Fuel>,
    /// Gearbox, if known
    #[serde(default)]
    pub gearbox: Option<Gearbox>,
    /// DIN horse power, if known
    #[serde(default)]
    pub horse_power_hp: Option<u32>,
    /// Odometer reading in kilometres, if known
    #[serde(default)]
    pub mileage_km: Option<u32>,
    /// Listing location, if known
    #[serde(default)]
    pub location: Option<Location>,
}

impl VehicleQuery {
    /// Width of the power buckets reported to the coordinator.
    pub const HP_BUCKET: u32 = 20;

    /// Create a query with only the mandatory attributes.
    #[must_use]
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: i32) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year,
            fuel: None,
            gearbox: None,
            horse_power_hp: None,
            mileage_km: None,
            location: None,
        }
    }

    /// Set the fuel type.
    #[must_use]
    pub fn with_fuel(mut self, fuel: Fuel) -> Self {
        self.fuel = Some(fuel);
        self
    }

    /// Set the gearbox.
    #[must_use]
    pub fn with_gearbox(mut self, gearbox: Gearbox) -> Self {
        self.gearbox = Some(gearbox);
        self
    }

    /// Set the horse power.
    #[must_use]
    pub fn with_horse_power(mut self, hp: u32) -> Self {
        self.horse_power_hp = Some(hp);
        self
    }

    /// Set the mileage.
    #[must_use]
    pub fn with_mileage(mut self, km: u32) -> Self {
        self.mileage_km = Some(km);
        self
    }

    /// Set the location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Region name of the listing, if any.
    #[must_use]
    pub fn region(&self) -> Option<&str> {
        self.location.as_ref().and_then(|l| l.region.as_deref())
    }

    /// Whether precise geo data is available for a radius search.
    #[must_use]
    pub fn has_geo(&self) -> bool {
        self.location.as_ref().is_some_and(Location::has_geo)
    }

    /// Coordinator power bucket label, e.g. `"120-139"` for 130 hp.
    #[must_use]
    pub fn hp_range(&self) -> Option<String> {
        self.horse_power_hp.map(|hp| {
            let lo = hp / Self::HP_BUCKET * Self::HP_BUCKET;
            format!("{lo}-{}", lo + Self::HP_BUCKET - 1)
        })
    }

    /// Reject queries no marketplace search can be built from.
    pub fn validate(&self) -> Result<(), CoteError> {
        if self.make.trim().is_empty() || self.model.trim().is_empty() {
            return Err(CoteError::Validation(
                "vehicle query needs both make and model".to_string(),
            ));
        }
        if !(1900..=2100).contains(&self.year) {
            return Err(CoteError::Validation(format!(
                "vehicle year out of range: {}",
                self.year
            )));
        }
        Ok(())
    }
}

/// One asking price parsed from a marketplace search response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceSample {
    /// Asking price in euros
    pub price: u32,
    /// Year of first registration, when the listing shows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Mileage in kilometres, when the listing shows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mileage_km: Option<u32>,
    /// Fuel type, when the listing shows a recognised label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel: Option<Fuel>,
    /// Gearbox, when the listing shows a recognised label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gearbox: Option<Gearbox>,
}

impl PriceSample {
    /// Sample with a price only.
    #[must_use]
    pub fn new(price: u32) -> Self {
        Self {
            price,
            year: None,
            mileage_km: None,
            fuel: None,
            gearbox: None,
        }
    }

    /// Set the registration year.
    #[must_use]
    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }
}

/// Brand and model filter values in a marketplace's own vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteTokens {
    /// Brand token ("PEUGEOT", "mercedes-benz")
    pub brand: String,
    /// Model token ("PEUGEOT_3008", "serie-3")
    pub model: String,
}

impl SiteTokens {
    /// Build a token pair.
    #[must_use]
    pub fn new(brand: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            brand: brand.into(),
            model: model.into(),
        }
    }
}

/// Wrapper around `chrono::DateTime<Utc>` for consistent timestamp handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp representing the current moment.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Get the inner `DateTime<Utc>`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Parse a timestamp from an RFC3339 string.
    pub fn from_rfc3339(s: &str) -> Result<Self, CoteError> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| Self(dt.with_timezone(&Utc)))
            .map_err(|e| CoteError::Validation(format!("invalid timestamp: {e}")))
    }

    /// Format as RFC3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Time elapsed between `earlier` and this timestamp (negative if `earlier` is later).
    #[must_use]
    pub fn since(&self, earlier: &Timestamp) -> chrono::Duration {
        self.0 - earlier.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}

/// Replace the French accented letters marketplaces use with their ASCII base.
#[must_use]
pub fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'à' | 'â' | 'ä' | 'á' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'î' | 'ï' | 'í' => 'i',
            'ô' | 'ö' | 'ó' => 'o',
            'ù' | 'û' | 'ü' | 'ú' => 'u',
            'ç' => 'c',
            'À' | 'Â' | 'Ä' | 'Á' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Î' | 'Ï' | 'Í' => 'I',
            'Ô' | 'Ö' | 'Ó' => 'O',
            'Ù' | 'Û' | 'Ü' | 'Ú' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}
