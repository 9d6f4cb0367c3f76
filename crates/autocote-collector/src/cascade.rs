//! Cascade executor: walks search tiers until one yields enough comparables.

use crate::error::{CollectError, Result};
use crate::filter::SanityFilter;
use crate::pacing::Pacing;
use crate::progress::{ProgressSink, StepStatus};
use autocote_core::{PriceSample, SiteTokens, VehicleQuery};
use autocote_sites::{LocationScope, SearchFilter, SearchStrategy, SiteAdapter};
use serde::{Deserialize, Serialize};

/// Diagnostic record of one attempted tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchLogEntry {
    /// Position of the tier in the plan
    pub tier_index: usize,
    /// Precision the tier's samples would be submitted at
    pub precision_tier: u8,
    /// Geo, region or national scope
    pub location_type: LocationScope,
    /// Allowed distance from the query year
    pub year_spread: i32,
    /// Filters actually sent; filters without a query value are omitted
    pub filters_applied: Vec<SearchFilter>,
    /// Listings left after sanity filtering
    pub sample_count: usize,
    /// Whether these samples were kept
    pub selected: bool,
    /// Why the tier was selected, passed over or failed
    pub reason: String,
    /// Method and URL of the search
    pub request: String,
}

/// Result of walking the tiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeOutcome {
    /// Filtered samples of the selected tier (or the largest set seen)
    pub samples: Vec<PriceSample>,
    /// Precision of the tier the samples came from
    pub precision_tier: u8,
    /// Whether the selected tier met the threshold
    pub threshold_met: bool,
    /// One entry per tier tried, in order
    pub log: Vec<SearchLogEntry>,
}

/// Walks search tiers in order, pausing between requests, and stops at the
/// first tier that yields `min_samples` comparables.
pub struct CascadeExecutor<'a> {
    adapter: &'a SiteAdapter,
    filter: SanityFilter,
    pacing: Pacing,
    progress: &'a dyn ProgressSink,
    step_id: &'a str,
}

impl<'a> CascadeExecutor<'a> {
    /// Executor reporting sub-steps under `step_id`.
    #[must_use]
    pub fn new(
        adapter: &'a SiteAdapter,
        filter: SanityFilter,
        pacing: Pacing,
        progress: &'a dyn ProgressSink,
        step_id: &'a str,
    ) -> Self {
        Self {
            adapter,
            filter,
            pacing,
            progress,
            step_id,
        }
    }

    /// Run `strategies` in order, one request per tier at most.
    ///
    /// Per-tier site failures are recorded and the cascade moves on.
    ///
    /// # Errors
    /// Returns [`CollectError::Aborted`] when the host tears the run down.
    pub async fn run(
        &self,
        query: &VehicleQuery,
        strategies: &[SearchStrategy],
        tokens: &SiteTokens,
        min_samples: usize,
    ) -> Result<CascadeOutcome> {
        let mut log: Vec<SearchLogEntry> = Vec::with_capacity(strategies.len());
        // (log index, samples) of the largest set seen so far
        let mut best: Option<(usize, Vec<PriceSample>)> = None;

        for (index, strategy) in strategies.iter().enumerate() {
            if index > 0 {
                self.pacing.pause().await;
            }

            let label = strategy.label();
            self.progress
                .sub_step(self.step_id, &label, StepStatus::Running, None);

            let request = self.adapter.build_search_request(query, strategy, tokens);
            let mut entry = SearchLogEntry {
                tier_index: index,
                precision_tier: strategy.precision_tier,
                location_type: strategy.location_scope,
                year_spread: strategy.year_spread,
                filters_applied: strategy.filters.iter().copied().collect(),
                sample_count: 0,
                selected: false,
                reason: String::new(),
                request: request.descriptor(),
            };

            let samples = match self.adapter.fetch_and_parse(&request).await {
                Ok(raw) => self.filter.apply(raw, query.year, strategy.year_spread),
                Err(e) => {
                    let err = CollectError::from(e);
                    if err.is_teardown() {
                        tracing::info!(tier = index, "host teardown during cascade");
                        return Err(CollectError::Aborted(err.to_string()));
                    }
                    tracing::warn!(
                        tier = index,
                        site = %self.adapter.site(),
                        "tier failed: {}",
                        err
                    );
                    entry.reason = format!("error: {err}");
                    self.progress.sub_step(
                        self.step_id,
                        &label,
                        StepStatus::Error,
                        Some(entry.reason.as_str()),
                    );
                    log.push(entry);
                    continue;
                }
            };

            entry.sample_count = samples.len();
            tracing::debug!(
                tier = index,
                precision = strategy.precision_tier,
                samples = samples.len(),
                "{}",
                label
            );

            if samples.len() >= min_samples {
                entry.selected = true;
                entry.reason = format!("enough samples: {} >= {min_samples}", samples.len());
                let detail = format!("{} samples", samples.len());
                self.progress
                    .sub_step(self.step_id, &label, StepStatus::Done, Some(detail.as_str()));
                log.push(entry);
                return Ok(CascadeOutcome {
                    samples,
                    precision_tier: strategy.precision_tier,
                    threshold_met: true,
                    log,
                });
            }

            entry.reason = format!("insufficient: {} < {min_samples}", samples.len());
            self.progress
                .sub_step(self.step_id, &label, StepStatus::Warning, Some(entry.reason.as_str()));
            log.push(entry);

            if best.as_ref().map_or(true, |(_, b)| samples.len() > b.len()) {
                best = Some((log.len() - 1, samples));
            }
        }

        let Some((log_index, samples)) = best.filter(|(_, s)| !s.is_empty()) else {
            return Ok(CascadeOutcome {
                samples: Vec::new(),
                precision_tier: strategies.last().map_or(1, |s| s.precision_tier),
                threshold_met: false,
                log,
            });
        };

        let entry = &mut log[log_index];
        entry.selected = true;
        let precision_tier = entry.precision_tier;
        Ok(CascadeOutcome {
            samples,
            precision_tier,
            threshold_met: false,
            log,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner;
    use crate::progress::NoopProgress;
    use async_trait::async_trait;
    use autocote_core::SitesConfig;
    use autocote_sites::{SearchRequest, Site, SiteError, SiteFetcher};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Returns one scripted response per call; runs dry as an empty result.
    struct Scripted {
        responses: Mutex<VecDeque<autocote_sites::Result<String>>>,
        calls: Mutex<usize>,
    }

    impl Scripted {
        fn new(responses: Vec<autocote_sites::Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().expect("lock")
        }
    }

    #[async_trait]
    impl SiteFetcher for Scripted {
        async fn fetch(&self, _request: &SearchRequest) -> autocote_sites::Result<String> {
            *self.calls.lock().expect("lock") += 1;
            self.responses
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Ok(r#"{"ads": []}"#.to_string()))
        }
    }

    fn ads(count: usize) -> autocote_sites::Result<String> {
        let ads: Vec<String> = (0..count)
            .map(|i| format!(r#"{{"price": [{}]}}"#, 10_000 + i * 100))
            .collect();
        Ok(format!(r#"{{"ads": [{}]}}"#, ads.join(",")))
    }

    fn setup(responses: Vec<autocote_sites::Result<String>>) -> (Arc<Scripted>, SiteAdapter) {
        let fetcher = Arc::new(Scripted::new(responses));
        let adapter = SiteAdapter::new(Site::LeBonCoin, fetcher.clone(), &SitesConfig::default());
        (fetcher, adapter)
    }

    fn national_plan() -> (VehicleQuery, Vec<SearchStrategy>) {
        let query = VehicleQuery::new("Renault", "Clio", 2019);
        let strategies = planner::plan(&query, None);
        (query, strategies)
    }

    #[tokio::test]
    async fn test_stops_at_first_sufficient_tier() {
        let (fetcher, adapter) = setup(vec![ads(3), ads(21), ads(40)]);
        let (query, strategies) = national_plan();
        let tokens = adapter.fallback_tokens(&query.make, &query.model);
        let executor = CascadeExecutor::new(
            &adapter,
            SanityFilter::default(),
            Pacing::none(),
            &NoopProgress,
            "collection",
        );

        let outcome = executor
            .run(&query, &strategies, &tokens, 20)
            .await
            .expect("cascade");

        assert_eq!(fetcher.calls(), 2);
        assert!(outcome.threshold_met);
        assert_eq!(outcome.samples.len(), 21);
        assert_eq!(outcome.precision_tier, 3);
        assert_eq!(outcome.log.len(), 2);
        assert!(!outcome.log[0].selected);
        assert!(outcome.log[1].selected);
    }

    #[tokio::test]
    async fn test_falls_back_to_largest_set() {
        let (fetcher, adapter) = setup(vec![ads(4), ads(9), ads(9), ads(2)]);
        let (query, strategies) = national_plan();
        let tokens = adapter.fallback_tokens(&query.make, &query.model);
        let executor = CascadeExecutor::new(
            &adapter,
            SanityFilter::default(),
            Pacing::none(),
            &NoopProgress,
            "collection",
        );

        let outcome = executor
            .run(&query, &strategies, &tokens, 20)
            .await
            .expect("cascade");

        assert_eq!(fetcher.calls(), strategies.len());
        assert!(!outcome.threshold_met);
        assert_eq!(outcome.samples.len(), 9);
        // first of the two 9-sample tiers wins
        assert!(outcome.log[1].selected);
        assert!(!outcome.log[2].selected);
        assert_eq!(outcome.precision_tier, strategies[1].precision_tier);
    }

    #[tokio::test]
    async fn test_site_failure_is_logged_and_skipped() {
        let (_, adapter) = setup(vec![
            Err(SiteError::RateLimited {
                site: Site::LeBonCoin,
            }),
            ads(25),
        ]);
        let (query, strategies) = national_plan();
        let tokens = adapter.fallback_tokens(&query.make, &query.model);
        let executor = CascadeExecutor::new(
            &adapter,
            SanityFilter::default(),
            Pacing::none(),
            &NoopProgress,
            "collection",
        );

        let outcome = executor
            .run(&query, &strategies, &tokens, 20)
            .await
            .expect("cascade");

        assert_eq!(outcome.log[0].sample_count, 0);
        assert!(outcome.log[0].reason.starts_with("error:"));
        assert!(outcome.threshold_met);
    }

    #[tokio::test]
    async fn test_teardown_aborts() {
        let (fetcher, adapter) = setup(vec![Err(SiteError::HostTeardown {
            site: Site::LeBonCoin,
            message: "Extension context invalidated.".to_string(),
        })]);
        let (query, strategies) = national_plan();
        let tokens = adapter.fallback_tokens(&query.make, &query.model);
        let executor = CascadeExecutor::new(
            &adapter,
            SanityFilter::default(),
            Pacing::none(),
            &NoopProgress,
            "collection",
        );

        let err = executor
            .run(&query, &strategies, &tokens, 20)
            .await
            .expect_err("teardown");
        assert!(matches!(err, CollectError::Aborted(_)));
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_pause_before_first_request() {
        let (_, adapter) = setup(vec![ads(25)]);
        let (query, strategies) = national_plan();
        let tokens = adapter.fallback_tokens(&query.make, &query.model);
        let executor = CascadeExecutor::new(
            &adapter,
            SanityFilter::default(),
            Pacing::from_millis(5_000, 5_000),
            &NoopProgress,
            "collection",
        );

        let start = tokio::time::Instant::now();
        executor
            .run(&query, &strategies, &tokens, 20)
            .await
            .expect("cascade");
        assert!(start.elapsed() < std::time::Duration::from_millis(5_000));
    }
}
