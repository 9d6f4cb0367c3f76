//! Error types for coordinator calls and collection runs.

use autocote_core::is_host_teardown;
use autocote_db::DatabaseError;
use autocote_sites::SiteError;
use thiserror::Error;

/// Failures talking to the job coordinator.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Transport failure or timeout
    #[error("coordinator unreachable: {0}")]
    Unreachable(String),

    /// Non-success status, or an ack with `ok: false`
    #[error("coordinator rejected the request with HTTP {status}")]
    Rejected { status: u16 },

    /// Response body did not match the wire contract
    #[error("unreadable coordinator response: {0}")]
    Decode(String),

    /// Call dropped because the host context went away
    #[error("host went away during coordinator call: {0}")]
    HostTeardown(String),

    /// HTTP client could not be constructed
    #[error("failed to build coordinator client: {0}")]
    Client(String),
}

impl CoordinatorError {
    /// Classify a transport failure message.
    #[must_use]
    pub fn from_transport(message: String) -> Self {
        if is_host_teardown(&message) {
            Self::HostTeardown(message)
        } else {
            Self::Unreachable(message)
        }
    }

    /// Whether the host context went away mid-call.
    #[must_use]
    pub fn is_teardown(&self) -> bool {
        matches!(self, Self::HostTeardown(_))
    }
}

/// Result type for coordinator calls.
pub type CoordinatorResult<T> = std::result::Result<T, CoordinatorError>;

/// Failures that end a collection early.
#[derive(Debug, Error)]
pub enum CollectError {
    /// Coordinator call failed
    #[error("coordinator error: {0}")]
    Coordinator(#[from] CoordinatorError),

    /// Marketplace search failed
    #[error("site error: {0}")]
    Site(#[from] SiteError),

    /// Local storage failed
    #[error("storage error: {0}")]
    Database(#[from] DatabaseError),

    /// A persisted value could not be read back
    #[error("invalid stored value for {key}: {reason}")]
    InvalidState { key: String, reason: String },

    /// Host teardown; the run stops without reporting
    #[error("run aborted by host teardown: {0}")]
    Aborted(String),
}

impl CollectError {
    /// Whether the failure means the host went away.
    #[must_use]
    pub fn is_teardown(&self) -> bool {
        match self {
            Self::Aborted(_) => true,
            Self::Coordinator(e) => e.is_teardown(),
            Self::Site(e) => e.is_teardown() || is_host_teardown(&e.to_string()),
            Self::Database(_) | Self::InvalidState { .. } => false,
        }
    }
}

/// Result type for collection operations.
pub type Result<T> = std::result::Result<T, CollectError>;

#[cfg(test)]
mod tests {
    use super::*;
    use autocote_sites::Site;

    #[test]
    fn test_transport_classification() {
        let err = CoordinatorError::from_transport("connection refused".to_string());
        assert!(matches!(err, CoordinatorError::Unreachable(_)));

        let err = CoordinatorError::from_transport("Extension context invalidated.".to_string());
        assert!(err.is_teardown());
    }

    #[test]
    fn test_site_teardown_by_message() {
        let err: CollectError = SiteError::Network {
            site: Site::LeBonCoin,
            message: "The message port closed before a response was received".to_string(),
        }
        .into();
        assert!(err.is_teardown());

        let err: CollectError = SiteError::RateLimited {
            site: Site::LeBonCoin,
        }
        .into();
        assert!(!err.is_teardown());
    }
}
