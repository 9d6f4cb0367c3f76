//! Sanity filtering of parsed listings.

use autocote_core::{CollectionConfig, PriceSample};

/// Drops listings that cannot be comparables: placeholder prices and, for
/// recent vehicles, listings registered outside the tier's year window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanityFilter {
    min_valid_price: u32,
    year_filter_cutoff: i32,
}

impl SanityFilter {
    /// Filter discarding prices at or below `min_valid_price` and applying the
    /// year window only from `year_filter_cutoff` on.
    #[must_use]
    pub fn new(min_valid_price: u32, year_filter_cutoff: i32) -> Self {
        Self {
            min_valid_price,
            year_filter_cutoff,
        }
    }

    /// Filter using the collection thresholds.
    #[must_use]
    pub fn from_config(config: &CollectionConfig) -> Self {
        Self::new(config.min_valid_price, config.year_filter_cutoff)
    }

    /// Strict price validity, used again right before submission.
    #[must_use]
    pub fn has_valid_price(&self, sample: &PriceSample) -> bool {
        sample.price > self.min_valid_price
    }

    /// Listings without a year are kept.
    #[must_use]
    pub fn keeps(&self, sample: &PriceSample, query_year: i32, year_spread: i32) -> bool {
        if !self.has_valid_price(sample) {
            return false;
        }
        if query_year < self.year_filter_cutoff {
            return true;
        }
        sample
            .year
            .map_or(true, |year| (year - query_year).abs() <= year_spread)
    }

    /// Keep the samples that pass [`SanityFilter::keeps`]. Idempotent.
    #[must_use]
    pub fn apply(
        &self,
        samples: Vec<PriceSample>,
        query_year: i32,
        year_spread: i32,
    ) -> Vec<PriceSample> {
        samples
            .into_iter()
            .filter(|s| self.keeps(s, query_year, year_spread))
            .collect()
    }

    /// Samples passing the strict price check.
    #[must_use]
    pub fn valid(&self, samples: &[PriceSample]) -> Vec<PriceSample> {
        samples
            .iter()
            .filter(|s| self.has_valid_price(s))
            .cloned()
            .collect()
    }
}

impl Default for SanityFilter {
    fn default() -> Self {
        Self::from_config(&CollectionConfig::default())
    }
}
