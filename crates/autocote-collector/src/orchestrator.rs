//! Collection run orchestration.
//!
//! A run asks the coordinator which vehicle most needs prices, applies the
//! redirect cooldown, walks the search cascade, submits (or reports why it
//! could not) and finally drains the coordinator's bonus jobs.

use crate::cascade::{CascadeExecutor, CascadeOutcome, SearchLogEntry};
use crate::coordinator::{BonusJob, Coordinator, JobRequest};
use crate::cooldown::{is_redirect_allowed, CooldownStore};
use crate::error::{CollectError, CoordinatorResult, Result};
use crate::filter::SanityFilter;
use crate::pacing::Pacing;
use crate::planner;
use crate::progress::{steps, ProgressSink, StepStatus, TracingProgress};
use crate::submission::{
    FailedSearchReport, JobDone, SubmissionDecision, SubmissionPayload, DEGRADED_PRECISION,
};
use crate::tokens::{resolve_tokens, TokenProvenance};
use autocote_core::{AppConfig, CollectionConfig, RunId, SiteTokens, Timestamp, VehicleQuery};
use autocote_sites::SiteAdapter;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

/// Collaborators of a collection run.
pub struct CollectorContext {
    /// Job coordinator client
    pub coordinator: Arc<dyn Coordinator>,
    /// Marketplace of the viewed listing
    pub adapter: SiteAdapter,
    /// Redirect cooldown storage
    pub cooldown: Arc<dyn CooldownStore>,
    /// Receiver of lifecycle events
    pub progress: Arc<dyn ProgressSink>,
    /// Pacing, thresholds and bonus limits
    pub settings: CollectionConfig,
    /// Upper bound for best-effort reports
    pub report_timeout: Duration,
}

impl CollectorContext {
    /// Context with [`TracingProgress`] and settings from `config`.
    #[must_use]
    pub fn new(
        coordinator: Arc<dyn Coordinator>,
        adapter: SiteAdapter,
        cooldown: Arc<dyn CooldownStore>,
        config: &AppConfig,
    ) -> Self {
        Self {
            coordinator,
            adapter,
            cooldown,
            progress: Arc::new(TracingProgress),
            settings: config.collection.clone(),
            report_timeout: Duration::from_secs(config.coordinator.report_timeout_secs),
        }
    }

    /// Replace the progress sink.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }
}

/// What the page extraction layer hands over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    /// Vehicle extracted from the listing
    pub vehicle: VehicleQuery,
    /// Brand/model filter values scraped from the page, when available
    #[serde(default)]
    pub dom_tokens: Option<SiteTokens>,
}

/// How a collection run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Coordinator asked for no collection and had no bonus work
    Skipped,
    /// Job request failed; nothing else happened
    CoordinatorUnreachable,
    /// Redirect target skipped because the last collection is too recent
    CooldownActive,
    /// Submitted at the cascade's precision
    Submitted,
    /// Submitted below the sample threshold, at the lowest precision
    Degraded,
    /// Too few prices; a failed-search diagnostic was sent
    InsufficientData,
    /// Coordinator refused the submission
    Rejected,
    /// Host went away mid-run
    Aborted,
}

/// Summary of one collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    /// Identifier shared by the run's log lines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    /// How the run ended
    pub status: RunStatus,
    /// Whether the coordinator accepted a submission
    pub submitted: bool,
    /// Precision of the submission, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u8>,
    /// Valid samples found for the main target
    pub sample_count: usize,
    /// Tiers tried for the main target
    pub search_log: Vec<SearchLogEntry>,
    /// Bonus jobs processed, successful or not
    pub bonus_jobs_completed: usize,
}

impl RunOutcome {
    /// Outcome with nothing collected.
    #[must_use]
    pub fn new(status: RunStatus) -> Self {
        Self {
            run_id: None,
            status,
            submitted: false,
            precision: None,
            sample_count: 0,
            search_log: Vec::new(),
            bonus_jobs_completed: 0,
        }
    }
}

struct BonusRun {
    completed: usize,
    aborted: bool,
}

/// Runs collections for the listing being viewed.
pub struct MarketCollector {
    ctx: CollectorContext,
    filter: SanityFilter,
}

impl MarketCollector {
    /// Collector running with `ctx`.
    #[must_use]
    pub fn new(ctx: CollectorContext) -> Self {
        let filter = SanityFilter::from_config(&ctx.settings);
        Self { ctx, filter }
    }

    /// Collaborators this collector runs with.
    #[must_use]
    pub fn context(&self) -> &CollectorContext {
        &self.ctx
    }

    /// Run one collection for the vehicle on `page`. Never fails: every
    /// failure mode maps to a [`RunStatus`].
    pub async fn run(&self, page: &PageContext) -> RunOutcome {
        let run_id = RunId::generate();
        let span = tracing::info_span!(
            "collection_run",
            run_id = %run_id,
            site = %self.ctx.adapter.site(),
        );
        let mut outcome = self.execute(page).instrument(span).await;
        tracing::info!(
            run_id = %run_id,
            status = ?outcome.status,
            submitted = outcome.submitted,
            samples = outcome.sample_count,
            "collection run finished"
        );
        outcome.run_id = Some(run_id);
        outcome
    }

    async fn execute(&self, page: &PageContext) -> RunOutcome {
        let progress = self.ctx.progress.as_ref();
        progress.step_update(steps::COORDINATOR, StepStatus::Running, None);

        let request = JobRequest::for_vehicle(&page.vehicle);
        let job = match self.ctx.coordinator.next_job(&request).await {
            Ok(job) => job,
            Err(e) if e.is_teardown() => {
                tracing::info!("host teardown while asking for a job: {}", e);
                return RunOutcome::new(RunStatus::Aborted);
            }
            Err(e) => {
                tracing::warn!("coordinator unreachable: {}", e);
                progress.step_update(
                    steps::COORDINATOR,
                    StepStatus::Error,
                    Some(e.to_string().as_str()),
                );
                return RunOutcome::new(RunStatus::CoordinatorUnreachable);
            }
        };
        progress.step_update(steps::COORDINATOR, StepStatus::Done, None);
        tracing::debug!(
            should_collect = job.should_collect,
            is_redirect = job.is_redirect,
            bonus_jobs = job.bonus_jobs.len(),
            "job assigned"
        );

        if !job.should_collect {
            progress.step_update(steps::COLLECTION, StepStatus::Skip, Some("no collection needed"));
            let mut outcome = RunOutcome::new(RunStatus::Skipped);
            if job.bonus_jobs.is_empty() {
                return outcome;
            }
            let bonus = self.drain_bonus_jobs(&job.bonus_jobs).await;
            outcome.bonus_jobs_completed = bonus.completed;
            if bonus.aborted {
                outcome.status = RunStatus::Aborted;
                return outcome;
            }
            self.persist_cooldown().await;
            return outcome;
        }

        let redirect_target = job.target_vehicle.as_ref().filter(|_| job.is_redirect);
        let learned = job
            .target_vehicle
            .as_ref()
            .and_then(|v| v.site_tokens.clone());
        let target = match redirect_target {
            Some(vehicle) => vehicle.to_query(job.target_region.as_deref()),
            None => page.vehicle.clone(),
        };

        if redirect_target.is_some() && !self.redirect_allowed().await {
            tracing::info!(make = %target.make, model = %target.model, "redirect cooldown active");
            progress.step_update(
                steps::COLLECTION,
                StepStatus::Skip,
                Some("redirect cooldown active"),
            );
            let mut outcome = RunOutcome::new(RunStatus::CooldownActive);
            let bonus = self.drain_bonus_jobs(&job.bonus_jobs).await;
            outcome.bonus_jobs_completed = bonus.completed;
            if bonus.aborted {
                outcome.status = RunStatus::Aborted;
            }
            return outcome;
        }

        let mut outcome = match self
            .collect_and_submit(
                &target,
                page.dom_tokens.as_ref(),
                learned.as_ref(),
                redirect_target.is_none(),
            )
            .await
        {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::info!("collection aborted: {}", e);
                return RunOutcome::new(RunStatus::Aborted);
            }
        };

        if outcome.submitted && !job.bonus_jobs.is_empty() {
            let bonus = self.drain_bonus_jobs(&job.bonus_jobs).await;
            outcome.bonus_jobs_completed = bonus.completed;
            if bonus.aborted {
                outcome.status = RunStatus::Aborted;
                return outcome;
            }
        }

        self.persist_cooldown().await;
        outcome
    }

    /// Read the cooldown once. An unreadable cooldown keeps the gate closed.
    async fn redirect_allowed(&self) -> bool {
        match self.ctx.cooldown.last_collection().await {
            Ok(last) => is_redirect_allowed(
                last,
                Timestamp::now(),
                self.ctx.settings.redirect_cooldown_hours,
            ),
            Err(e) => {
                tracing::warn!("cooldown unreadable, skipping redirect: {}", e);
                false
            }
        }
    }

    async fn persist_cooldown(&self) {
        if let Err(e) = self.ctx.cooldown.record_collection(Timestamp::now()).await {
            tracing::warn!("failed to persist collection cooldown: {}", e);
        }
    }

    fn cascade<'a>(&'a self, step_id: &'a str) -> CascadeExecutor<'a> {
        CascadeExecutor::new(
            &self.ctx.adapter,
            self.filter,
            Pacing::from_millis(
                self.ctx.settings.tier_delay_min_ms,
                self.ctx.settings.tier_delay_max_ms,
            ),
            self.ctx.progress.as_ref(),
            step_id,
        )
    }

    async fn collect_and_submit(
        &self,
        target: &VehicleQuery,
        dom: Option<&SiteTokens>,
        learned: Option<&SiteTokens>,
        target_is_viewed: bool,
    ) -> Result<RunOutcome> {
        let adapter = &self.ctx.adapter;
        let region_code = target.region().and_then(|r| adapter.region_code_of(r));
        let strategies = planner::plan(target, region_code);
        let resolved = resolve_tokens(adapter, target, dom, learned, target_is_viewed);
        tracing::info!(
            make = %target.make,
            model = %target.model,
            year = target.year,
            tiers = strategies.len(),
            tokens = ?resolved.provenance.source,
            "starting search cascade"
        );

        let progress = self.ctx.progress.as_ref();
        progress.step_update(steps::COLLECTION, StepStatus::Running, None);
        let cascade = self
            .cascade(steps::COLLECTION)
            .run(target, &strategies, &resolved.tokens, adapter.min_samples())
            .await?;
        let status = if cascade.threshold_met {
            StepStatus::Done
        } else {
            StepStatus::Warning
        };
        progress.step_update(steps::COLLECTION, status, None);

        self.submit_or_report(target, cascade, resolved.provenance)
            .await
    }

    /// Submit the cascade result; when it is too thin, send the failed-search
    /// diagnostic instead.
    async fn submit_or_report(
        &self,
        target: &VehicleQuery,
        cascade: CascadeOutcome,
        provenance: TokenProvenance,
    ) -> Result<RunOutcome> {
        let outcome = self.submit(target, cascade, provenance.clone()).await?;
        if outcome.status == RunStatus::InsufficientData {
            let report = FailedSearchReport::new(
                target,
                provenance,
                outcome.search_log.clone(),
                self.ctx.adapter.site(),
            );
            self.best_effort(
                "failed-search",
                self.ctx.coordinator.report_failed_search(&report),
            )
            .await;
        }
        Ok(outcome)
    }

    /// Submit the cascade result when it clears the degraded floor.
    async fn submit(
        &self,
        target: &VehicleQuery,
        cascade: CascadeOutcome,
        provenance: TokenProvenance,
    ) -> Result<RunOutcome> {
        let progress = self.ctx.progress.as_ref();
        let site = self.ctx.adapter.site();
        let decision = SubmissionDecision::decide(
            &cascade,
            &self.filter,
            self.ctx.adapter.min_samples(),
            self.ctx.settings.degraded_floor,
        );

        let (samples, precision, status) = match decision {
            SubmissionDecision::Full { samples, precision } => {
                (samples, precision, RunStatus::Submitted)
            }
            SubmissionDecision::Degraded { samples } => {
                (samples, DEGRADED_PRECISION, RunStatus::Degraded)
            }
            SubmissionDecision::Insufficient { valid } => {
                tracing::info!(valid, tiers = cascade.log.len(), "not enough prices to submit");
                progress.step_update(
                    steps::SUBMISSION,
                    StepStatus::Warning,
                    Some("insufficient data"),
                );
                let mut outcome = RunOutcome::new(RunStatus::InsufficientData);
                outcome.sample_count = valid;
                outcome.search_log = cascade.log;
                return Ok(outcome);
            }
        };

        progress.step_update(steps::SUBMISSION, StepStatus::Running, None);
        let mut outcome = RunOutcome::new(status);
        outcome.sample_count = samples.len();
        outcome.precision = Some(precision);
        outcome.search_log = cascade.log.clone();

        let payload = SubmissionPayload::new(
            target,
            samples,
            precision,
            cascade.log,
            Some(provenance),
            site,
        );
        match self.ctx.coordinator.submit_prices(&payload).await {
            Ok(()) => {
                tracing::info!(
                    precision,
                    samples = payload.prices.len(),
                    degraded = status == RunStatus::Degraded,
                    "market prices submitted"
                );
                progress.step_update(steps::SUBMISSION, StepStatus::Done, None);
                outcome.submitted = true;
            }
            Err(e) if e.is_teardown() => return Err(CollectError::Aborted(e.to_string())),
            Err(e) => {
                tracing::warn!("submission rejected: {}", e);
                progress.step_update(
                    steps::SUBMISSION,
                    StepStatus::Error,
                    Some(e.to_string().as_str()),
                );
                outcome.status = RunStatus::Rejected;
            }
        }
        Ok(outcome)
    }

    async fn drain_bonus_jobs(&self, jobs: &[BonusJob]) -> BonusRun {
        let progress = self.ctx.progress.as_ref();
        let pacing = Pacing::from_millis(
            self.ctx.settings.bonus_delay_min_ms,
            self.ctx.settings.bonus_delay_max_ms,
        );
        let limit = self.ctx.settings.max_bonus_jobs;
        if jobs.len() > limit {
            tracing::debug!(assigned = jobs.len(), limit, "capping bonus jobs");
        }

        progress.step_update(steps::BONUS, StepStatus::Running, None);
        let mut run = BonusRun {
            completed: 0,
            aborted: false,
        };

        for job in jobs.iter().take(limit) {
            pacing.pause().await;

            let label = format!("{} {} {}", job.vehicle.make, job.vehicle.model, job.vehicle.year);
            progress.sub_step(steps::BONUS, &label, StepStatus::Running, None);

            let success = match self.run_bonus_job(job).await {
                Ok(outcome) => outcome.submitted,
                Err(e) if e.is_teardown() => {
                    tracing::info!(job_id = %job.job_id, "bonus job aborted: {}", e);
                    run.aborted = true;
                    return run;
                }
                Err(e) => {
                    tracing::warn!(job_id = %job.job_id, "bonus job failed: {}", e);
                    false
                }
            };

            let report = JobDone {
                job_id: job.job_id.clone(),
                success,
            };
            self.best_effort("job-done", self.ctx.coordinator.report_job_done(&report))
                .await;

            run.completed += 1;
            let status = if success {
                StepStatus::Done
            } else {
                StepStatus::Warning
            };
            progress.sub_step(steps::BONUS, &label, status, None);
            tracing::debug!(job_id = %job.job_id, success, "bonus job done");
        }

        progress.step_update(steps::BONUS, StepStatus::Done, None);
        run
    }

    async fn run_bonus_job(&self, job: &BonusJob) -> Result<RunOutcome> {
        let adapter = &self.ctx.adapter;
        let query = job.vehicle.to_query(job.region.as_deref());
        let region_code = query.region().and_then(|r| adapter.region_code_of(r));
        let strategies = planner::plan_bonus(&query, region_code);
        let learned = job.vehicle.site_tokens.as_ref();
        let resolved = resolve_tokens(adapter, &query, None, learned, false);

        let cascade = self
            .cascade(steps::BONUS)
            .run(&query, &strategies, &resolved.tokens, adapter.min_samples())
            .await?;
        // bonus work is reported through job-done only
        self.submit(&query, cascade, resolved.provenance).await
    }

    /// Await a side-channel report under the report timeout; failures are only logged.
    async fn best_effort<F>(&self, report: &'static str, call: F)
    where
        F: Future<Output = CoordinatorResult<()>>,
    {
        match tokio::time::timeout(self.ctx.report_timeout, call).await {
            Ok(Ok(())) => tracing::debug!(report, "report delivered"),
            Ok(Err(e)) => tracing::warn!(report, "best-effort report failed: {}", e),
            Err(_) => tracing::warn!(report, "best-effort report timed out"),
        }
    }
}
