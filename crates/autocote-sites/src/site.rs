//! Marketplace registry and per-site capability dispatch.
//!
//! Each supported marketplace is a variant of [`Site`]. Capabilities are plain
//! `match` dispatch so adding a marketplace forces every capability to handle it.

use crate::error::{Result, SiteError};
use crate::request::SearchRequest;
use crate::strategy::SearchStrategy;
use crate::{autoscout24, leboncoin};
use autocote_core::{Fuel, Gearbox, PriceSample, SitesConfig, SiteTokens, VehicleQuery};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported used-car marketplace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Site {
    /// leboncoin.fr
    LeBonCoin,
    /// autoscout24.fr and its sister domains
    AutoScout24,
}

impl Site {
    /// Every supported marketplace.
    pub const ALL: [Site; 2] = [Site::LeBonCoin, Site::AutoScout24];

    /// Stable identifier used on the wire and in logs.
    #[must_use]
    pub fn id(&self) -> &'static str {
        match self {
            Self::LeBonCoin => "leboncoin",
            Self::AutoScout24 => "autoscout24",
        }
    }

    /// Find the marketplace serving `page_url`.
    #[must_use]
    pub fn from_url(page_url: &str) -> Option<Self> {
        let parsed = url::Url::parse(page_url).ok()?;
        let host = parsed.host_str()?;
        Self::ALL.into_iter().find(|site| match site {
            Self::LeBonCoin => leboncoin::matches_host(host),
            Self::AutoScout24 => autoscout24::matches_host(host),
        })
    }

    /// Like [`Site::from_url`] but with an error for unknown hosts.
    pub fn resolve(page_url: &str) -> Result<Self> {
        Self::from_url(page_url).ok_or_else(|| SiteError::UnsupportedUrl(page_url.to_string()))
    }

    /// Whether `page_url` is a single vehicle listing on this marketplace.
    #[must_use]
    pub fn is_ad_page(&self, page_url: &str) -> bool {
        let Ok(parsed) = url::Url::parse(page_url) else {
            return false;
        };
        if Self::from_url(page_url) != Some(*self) {
            return false;
        }
        match self {
            Self::LeBonCoin => leboncoin::is_ad_path(parsed.path()),
            Self::AutoScout24 => autoscout24::is_ad_path(parsed.path()),
        }
    }

    /// Marketplace code for a fuel type.
    #[must_use]
    pub fn fuel_code_of(&self, fuel: Fuel) -> Option<&'static str> {
        match self {
            Self::LeBonCoin => leboncoin::fuel_code(fuel),
            Self::AutoScout24 => autoscout24::fuel_code(fuel),
        }
    }

    /// Marketplace code for a gearbox.
    #[must_use]
    pub fn gearbox_code_of(&self, gearbox: Gearbox) -> Option<&'static str> {
        match self {
            Self::LeBonCoin => leboncoin::gearbox_code(gearbox),
            Self::AutoScout24 => autoscout24::gearbox_code(gearbox),
        }
    }

    /// Marketplace code for an administrative region name, if the site maps it.
    #[must_use]
    pub fn region_code_of(&self, region: &str) -> Option<&'static str> {
        match self {
            Self::LeBonCoin => leboncoin::region_code(region),
            Self::AutoScout24 => autoscout24::region_code(region),
        }
    }

    /// Brand/model tokens computed locally when no better vocabulary is known.
    #[must_use]
    pub fn fallback_tokens(&self, make: &str, model: &str) -> SiteTokens {
        match self {
            Self::LeBonCoin => leboncoin::fallback_tokens(make, model),
            Self::AutoScout24 => autoscout24::fallback_tokens(make, model),
        }
    }

    /// Samples a tier must yield before the cascade accepts it.
    #[must_use]
    pub fn min_samples(&self, config: &SitesConfig) -> usize {
        match self {
            Self::LeBonCoin => config.leboncoin_min_samples,
            Self::AutoScout24 => config.autoscout24_min_samples,
        }
    }

    /// Build the search request for one cascade tier.
    #[must_use]
    pub fn build_search_request(
        &self,
        query: &VehicleQuery,
        strategy: &SearchStrategy,
        tokens: &SiteTokens,
        page_limit: u32,
    ) -> SearchRequest {
        match self {
            Self::LeBonCoin => leboncoin::build_request(query, strategy, tokens, page_limit),
            Self::AutoScout24 => autoscout24::build_request(query, strategy, tokens, page_limit),
        }
    }

    /// Turn a raw search response body into price samples.
    pub fn parse_response(&self, body: &str) -> Result<Vec<PriceSample>> {
        match self {
            Self::LeBonCoin => leboncoin::parse_response(body),
            Self::AutoScout24 => autoscout24::parse_response(body),
        }
    }
}

impl fmt::Display for Site {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_url() {
        assert_eq!(
            Site::from_url("https://www.leboncoin.fr/ad/voitures/2841234567"),
            Some(Site::LeBonCoin)
        );
        assert_eq!(
            Site::from_url("https://www.autoscout24.fr/offres/peugeot-3008-abc"),
            Some(Site::AutoScout24)
        );
        assert_eq!(
            Site::from_url("https://www.autoscout24.de/angebote/vw-golf"),
            Some(Site::AutoScout24)
        );
        assert_eq!(Site::from_url("https://www.lacentrale.fr/auto-occasion"), None);
        assert_eq!(Site::from_url("https://leboncoin.fr.evil.com/ad"), None);
        assert_eq!(Site::from_url("not a url"), None);
    }

    #[test]
    fn test_resolve_unknown_host() {
        let err = Site::resolve("https://example.com").expect_err("unknown host");
        assert!(matches!(err, SiteError::UnsupportedUrl(_)));
    }

    #[test]
    fn test_is_ad_page() {
        assert!(Site::LeBonCoin.is_ad_page("https://www.leboncoin.fr/ad/voitures/2841234567"));
        assert!(Site::LeBonCoin.is_ad_page("https://www.leboncoin.fr/voitures/2841234567.htm"));
        assert!(!Site::LeBonCoin.is_ad_page("https://www.leboncoin.fr/recherche?category=2"));
        assert!(!Site::LeBonCoin
            .is_ad_page("https://www.autoscout24.fr/offres/peugeot-3008-diesel-2b7c0e6a"));
        assert!(Site::AutoScout24
            .is_ad_page("https://www.autoscout24.fr/offres/peugeot-3008-diesel-2b7c0e6a"));
        assert!(!Site::AutoScout24.is_ad_page("https://www.autoscout24.fr/lst/peugeot/3008"));
    }

    #[test]
    fn test_min_samples_per_site() {
        let config = SitesConfig::default();
        assert_eq!(Site::LeBonCoin.min_samples(&config), 20);
        assert_eq!(Site::AutoScout24.min_samples(&config), 10);
    }

    #[test]
    fn test_site_serialization() {
        assert_eq!(
            serde_json::to_string(&Site::AutoScout24).expect("serialize site"),
            "\"autoscout24\""
        );
        assert_eq!(Site::LeBonCoin.to_string(), "leboncoin");
    }
}
