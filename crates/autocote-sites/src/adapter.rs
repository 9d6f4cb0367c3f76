//! Site adapter: one marketplace bound to a transport and its sample threshold.

use crate::error::Result;
use crate::fetcher::SiteFetcher;
use crate::request::SearchRequest;
use crate::site::Site;
use crate::strategy::SearchStrategy;
use autocote_core::{Fuel, Gearbox, PriceSample, SitesConfig, SiteTokens, VehicleQuery};
use std::sync::Arc;

/// Everything the cascade needs to search one marketplace.
#[derive(Clone)]
pub struct SiteAdapter {
    site: Site,
    fetcher: Arc<dyn SiteFetcher>,
    min_samples: usize,
    page_limit: u32,
}

impl SiteAdapter {
    /// Bind `site` to `fetcher` using the thresholds from `config`.
    #[must_use]
    pub fn new(site: Site, fetcher: Arc<dyn SiteFetcher>, config: &SitesConfig) -> Self {
        Self {
            site,
            fetcher,
            min_samples: site.min_samples(config),
            page_limit: config.page_limit,
        }
    }

    /// Override the sample threshold.
    #[must_use]
    pub fn with_min_samples(mut self, min_samples: usize) -> Self {
        self.min_samples = min_samples;
        self
    }

    /// Marketplace this adapter searches.
    #[must_use]
    pub fn site(&self) -> Site {
        self.site
    }

    /// Samples a tier must yield before the cascade stops.
    #[must_use]
    pub fn min_samples(&self) -> usize {
        self.min_samples
    }

    /// Whether `page_url` is a single vehicle listing on this marketplace.
    #[must_use]
    pub fn is_ad_page(&self, page_url: &str) -> bool {
        self.site.is_ad_page(page_url)
    }

    /// Marketplace filter value for `fuel`.
    #[must_use]
    pub fn fuel_code_of(&self, fuel: Fuel) -> Option<&'static str> {
        self.site.fuel_code_of(fuel)
    }

    /// Marketplace filter value for `gearbox`.
    #[must_use]
    pub fn gearbox_code_of(&self, gearbox: Gearbox) -> Option<&'static str> {
        self.site.gearbox_code_of(gearbox)
    }

    /// Marketplace code for a French region name, if mapped.
    #[must_use]
    pub fn region_code_of(&self, region: &str) -> Option<&'static str> {
        self.site.region_code_of(region)
    }

    /// Brand/model filter values derived locally from display names.
    #[must_use]
    pub fn fallback_tokens(&self, make: &str, model: &str) -> SiteTokens {
        self.site.fallback_tokens(make, model)
    }

    /// Build the request for one cascade tier.
    #[must_use]
    pub fn build_search_request(
        &self,
        query: &VehicleQuery,
        strategy: &SearchStrategy,
        tokens: &SiteTokens,
    ) -> SearchRequest {
        self.site
            .build_search_request(query, strategy, tokens, self.page_limit)
    }

    /// Send `request` and parse whatever prices the response lists.
    ///
    /// # Errors
    /// Returns the transport error, or a parse error for an unreadable body.
    pub async fn fetch_and_parse(&self, request: &SearchRequest) -> Result<Vec<PriceSample>> {
        let body = self.fetcher.fetch(request).await?;
        let samples = self.site.parse_response(&body)?;
        tracing::debug!(site = %self.site, samples = samples.len(), "parsed search page");
        Ok(samples)
    }
}

impl std::fmt::Debug for SiteAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteAdapter")
            .field("site", &self.site)
            .field("min_samples", &self.min_samples)
            .field("page_limit", &self.page_limit)
            .finish_non_exhaustive()
    }
}
