//! Marketplace search requests, independent of the HTTP client that sends them.

use crate::site::Site;
use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP verb of a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Query-string search page
    Get,
    /// JSON search API
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Get => "GET",
            Self::Post => "POST",
        })
    }
}

/// A fully built marketplace search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Marketplace the request targets
    pub site: Site,
    /// HTTP verb
    pub method: HttpMethod,
    /// Absolute URL including any query string
    pub url: String,
    /// JSON body for POST searches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

impl SearchRequest {
    /// Single-line description recorded in the search log.
    ///
    /// For JSON searches only the `filters` object is kept, which is what an
    /// operator needs to reproduce the query.
    #[must_use]
    pub fn descriptor(&self) -> String {
        match &self.body {
            Some(body) => {
                let filters = body.get("filters").unwrap_or(body);
                format!("{} {} {}", self.method, self.url, filters)
            }
            None => format!("{} {}", self.method, self.url),
        }
    }
}
