//! Brand/model token resolution for marketplace filters.
//!
//! Order of preference: tokens scraped from the page being viewed, tokens the
//! coordinator learned from other agents, then the marketplace's local fallback.

use autocote_core::{SiteTokens, VehicleQuery};
use autocote_sites::SiteAdapter;
use serde::{Deserialize, Serialize};

/// Origin of resolved brand/model tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    /// Scraped from the page being viewed
    Dom,
    /// Learned by the coordinator
    Learned,
    /// Derived locally from display names
    Fallback,
}

/// Where the submitted tokens came from, so the coordinator can learn DOM tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenProvenance {
    /// Marketplace searched
    pub source: TokenSource,
    /// Brand token used in the search
    pub brand: String,
    /// Model token used in the search
    pub model: String,
    /// Brand token scraped from the page, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_brand: Option<String>,
    /// Model token scraped from the page, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_model: Option<String>,
}

/// Tokens to search with, and where they came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTokens {
    /// Brand/model filter values
    pub tokens: SiteTokens,
    /// Provenance reported with the submission
    pub provenance: TokenProvenance,
}

fn usable(tokens: &SiteTokens) -> bool {
    !tokens.brand.trim().is_empty() && !tokens.model.trim().is_empty()
}

/// Resolve the tokens for `target`.
///
/// `dom` is only honoured when `target_is_viewed` is true: scraped tokens
/// describe the page's vehicle, not a redirect target.
#[must_use]
pub fn resolve_tokens(
    adapter: &SiteAdapter,
    target: &VehicleQuery,
    dom: Option<&SiteTokens>,
    learned: Option<&SiteTokens>,
    target_is_viewed: bool,
) -> ResolvedTokens {
    let dom = dom.filter(|t| target_is_viewed && usable(t));

    let (source, tokens) = if let Some(t) = dom {
        (TokenSource::Dom, t.clone())
    } else if let Some(t) = learned.filter(|t| usable(t)) {
        (TokenSource::Learned, t.clone())
    } else {
        (
            TokenSource::Fallback,
            adapter.fallback_tokens(&target.make, &target.model),
        )
    };

    ResolvedTokens {
        provenance: TokenProvenance {
            source,
            brand: tokens.brand.clone(),
            model: tokens.model.clone(),
            dom_brand: dom.map(|t| t.brand.clone()),
            dom_model: dom.map(|t| t.model.clone()),
        },
        tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use autocote_core::SitesConfig;
    use autocote_sites::{SearchRequest, Site, SiteError, SiteFetcher};
    use std::sync::Arc;

    struct Unused;

    #[async_trait]
    impl SiteFetcher for Unused {
        async fn fetch(&self, request: &SearchRequest) -> autocote_sites::Result<String> {
            Err(SiteError::Blocked { site: request.site })
        }
    }

    fn adapter() -> SiteAdapter {
        SiteAdapter::new(Site::LeBonCoin, Arc::new(Unused), &SitesConfig::default())
    }

    fn query() -> VehicleQuery {
        VehicleQuery::new("Mercedes-Benz", "Classe A", 2019)
    }

    #[test]
    fn test_dom_tokens_win_for_viewed_vehicle() {
        let dom = SiteTokens::new("MERCEDES-BENZ", "MERCEDES-BENZ_Classe A");
        let learned = SiteTokens::new("MERCEDES", "MERCEDES_Classe A");
        let resolved = resolve_tokens(&adapter(), &query(), Some(&dom), Some(&learned), true);

        assert_eq!(resolved.provenance.source, TokenSource::Dom);
        assert_eq!(resolved.tokens, dom);
        assert_eq!(resolved.provenance.dom_brand.as_deref(), Some("MERCEDES-BENZ"));
    }

    #[test]
    fn test_dom_tokens_ignored_for_redirect() {
        let dom = SiteTokens::new("PEUGEOT", "PEUGEOT_208");
        let learned = SiteTokens::new("MERCEDES", "MERCEDES_Classe A");
        let resolved = resolve_tokens(&adapter(), &query(), Some(&dom), Some(&learned), false);

        assert_eq!(resolved.provenance.source, TokenSource::Learned);
        assert_eq!(resolved.tokens, learned);
        assert!(resolved.provenance.dom_brand.is_none());
    }

    #[test]
    fn test_fallback_tokens() {
        let blank = SiteTokens::new("", "");
        let resolved = resolve_tokens(&adapter(), &query(), Some(&blank), None, true);

        assert_eq!(resolved.provenance.source, TokenSource::Fallback);
        assert_eq!(resolved.tokens, SiteTokens::new("MERCEDES", "MERCEDES_Classe A"));
    }

    #[test]
    fn test_provenance_wire_format() {
        let resolved = resolve_tokens(&adapter(), &query(), None, None, true);
        let json = serde_json::to_value(&resolved.provenance).expect("serialize provenance");
        assert_eq!(json["source"], "fallback");
        assert_eq!(json["brand"], "MERCEDES");
        assert!(json.get("domBrand").is_none());
    }
}
