//! Marketplace adapters for the market-price collector.
//!
//! Each supported marketplace is a [`Site`] variant. A [`SiteAdapter`] binds a
//! site to a [`SiteFetcher`] and turns a [`SearchStrategy`] tier into a
//! [`SearchRequest`], then parses the response into price samples.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod adapter;
mod autoscout24;
pub mod error;
pub mod fetcher;
pub mod fingerprint;
mod leboncoin;
pub mod request;
pub mod site;
pub mod strategy;

pub use adapter::SiteAdapter;
pub use error::{Result, SiteError};
pub use fetcher::{HttpFetcher, SiteFetcher};
pub use request::{HttpMethod, SearchRequest};
pub use site::Site;
pub use strategy::{mileage_window, power_window, LocationScope, SearchFilter, SearchStrategy};
