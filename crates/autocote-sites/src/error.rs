//! Marketplace error types.

use crate::site::Site;
use thiserror::Error;

/// Failures building, fetching or parsing a marketplace search.
#[derive(Debug, Error)]
pub enum SiteError {
    /// URL belongs to no supported marketplace
    #[error("no marketplace adapter for URL: {0}")]
    UnsupportedUrl(String),

    /// Transport failure
    #[error("request to {site} failed: {message}")]
    Network { site: Site, message: String },

    /// Non-success status other than a block or rate limit
    #[error("{site} answered HTTP {status}")]
    Http { site: Site, status: u16 },

    /// HTTP 403 or a bot challenge page
    #[error("{site} served a bot challenge")]
    Blocked { site: Site },

    /// HTTP 429
    #[error("rate limited by {site}")]
    RateLimited { site: Site },

    /// Response did not have the expected shape
    #[error("unreadable {site} response: {reason}")]
    Parse { site: Site, reason: String },

    /// Request dropped because the host context went away
    #[error("host went away during {site} request: {message}")]
    HostTeardown { site: Site, message: String },

    /// HTTP client could not be constructed
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl SiteError {
    /// Whether the failure came from the hosting context being unloaded.
    #[must_use]
    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::HostTeardown { .. })
    }
}

/// Result type for marketplace operations.
pub type Result<T> = std::result::Result<T, SiteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SiteError::Http {
            site: Site::LeBonCoin,
            status: 503,
        };
        assert_eq!(err.to_string(), "leboncoin answered HTTP 503");

        let err = SiteError::Blocked {
            site: Site::AutoScout24,
        };
        assert!(err.to_string().contains("autoscout24"));
    }

    #[test]
    fn test_teardown_classification() {
        let err = SiteError::HostTeardown {
            site: Site::LeBonCoin,
            message: "runtime dropped the dispatch task".to_string(),
        };
        assert!(err.is_teardown());
        assert!(!SiteError::RateLimited {
            site: Site::LeBonCoin
        }
        .is_teardown());
    }
}
