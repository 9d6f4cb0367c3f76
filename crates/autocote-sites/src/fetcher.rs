//! Transport for marketplace search requests.

use crate::error::{Result, SiteError};
use crate::fingerprint::BrowserFingerprint;
use crate::request::{HttpMethod, SearchRequest};
use async_trait::async_trait;
use autocote_core::is_host_teardown;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;

/// Executes a [`SearchRequest`] and returns the raw response body.
///
/// The production implementation goes over HTTP; tests script responses.
#[async_trait]
pub trait SiteFetcher: Send + Sync {
    /// Perform the request.
    ///
    /// # Errors
    /// Returns a [`SiteError`] describing the transport or HTTP failure.
    async fn fetch(&self, request: &SearchRequest) -> Result<String>;
}

/// reqwest-backed fetcher with a randomized desktop browser identity.
pub struct HttpFetcher {
    client: Client,
    fingerprint: BrowserFingerprint,
}

impl HttpFetcher {
    /// Build a fetcher whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created.
    pub fn new(timeout: Duration) -> Result<Self> {
        let fingerprint = BrowserFingerprint::randomized();
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(fingerprint.user_agent.clone())
            .build()
            .map_err(|e| SiteError::Client(e.to_string()))?;

        Ok(Self {
            client,
            fingerprint,
        })
    }
}

#[async_trait]
impl SiteFetcher for HttpFetcher {
    async fn fetch(&self, request: &SearchRequest) -> Result<String> {
        let site = request.site;
        let builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };
        let builder = builder.header(header::ACCEPT_LANGUAGE, &self.fingerprint.accept_language);
        let builder = match &request.body {
            Some(body) => builder.json(body),
            None => builder,
        };

        tracing::debug!(site = %site, url = %request.url, "fetching search page");

        let response = builder.send().await.map_err(|e| {
            let message = e.to_string();
            if is_host_teardown(&message) {
                SiteError::HostTeardown { site, message }
            } else {
                SiteError::Network { site, message }
            }
        })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::FORBIDDEN => return Err(SiteError::Blocked { site }),
            StatusCode::TOO_MANY_REQUESTS => return Err(SiteError::RateLimited { site }),
            status => {
                return Err(SiteError::Http {
                    site,
                    status: status.as_u16(),
                })
            }
        }

        response.text().await.map_err(|e| SiteError::Network {
            site,
            message: e.to_string(),
        })
    }
}
