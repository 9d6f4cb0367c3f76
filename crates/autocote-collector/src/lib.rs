//! Crowdsourced market-price collection engine.
//!
//! For the vehicle listing being viewed, [`MarketCollector`] asks the job
//! coordinator what to collect, searches the marketplace through an escalating
//! cascade of [`SearchStrategy`](autocote_sites::SearchStrategy) tiers, and
//! submits a precision-tagged price sample.
//!
//! # Example
//!
//! ```ignore
//! use autocote_collector::{CollectorContext, HttpCoordinator, MarketCollector, PageContext};
//!
//! let ctx = CollectorContext::new(coordinator, adapter, cooldown, &config);
//! let outcome = MarketCollector::new(ctx).run(&page).await;
//! println!("{:?}", outcome.status);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod cascade;
pub mod cooldown;
pub mod coordinator;
pub mod error;
pub mod filter;
pub mod guard;
pub mod orchestrator;
pub mod pacing;
pub mod planner;
pub mod progress;
pub mod submission;
pub mod tokens;

pub use cascade::{CascadeExecutor, CascadeOutcome, SearchLogEntry};
pub use cooldown::{
    is_redirect_allowed, CooldownStore, MemoryCooldownStore, SqliteCooldownStore, COOLDOWN_KEY,
};
pub use coordinator::{
    BonusJob, CollectionJob, Coordinator, HttpCoordinator, JobRequest, JobVehicle,
};
pub use error::{CollectError, CoordinatorError, CoordinatorResult, Result};
pub use filter::SanityFilter;
pub use guard::{RunGuard, RunPermit};
pub use orchestrator::{CollectorContext, MarketCollector, PageContext, RunOutcome, RunStatus};
pub use pacing::Pacing;
pub use progress::{NoopProgress, ProgressSink, StepStatus, TracingProgress};
pub use submission::{
    FailedSearchReport, JobDone, SubmissionDecision, SubmissionPayload, DEGRADED_PRECISION,
};
pub use tokens::{resolve_tokens, ResolvedTokens, TokenProvenance, TokenSource};
