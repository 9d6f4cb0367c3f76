//! Lifecycle events for whatever displays collection progress.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Step identifiers emitted by the collector.
pub mod steps {
    /// Job request
    pub const COORDINATOR: &str = "coordinator";
    /// Search cascade for the main target
    pub const COLLECTION: &str = "collection";
    /// Price submission
    pub const SUBMISSION: &str = "submission";
    /// Bonus job queue
    pub const BONUS: &str = "bonus";
}

/// State of a step as shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    /// Not started
    Pending,
    /// In progress
    Running,
    /// Finished successfully
    Done,
    /// Finished with a degraded result
    Warning,
    /// Failed
    Error,
    /// Not run
    Skip,
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Done => "done",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Skip => "skip",
        })
    }
}

/// Receiver of progress events. Implementations must not block.
pub trait ProgressSink: Send + Sync {
    /// A top-level step changed state.
    fn step_update(&self, step_id: &str, status: StepStatus, detail: Option<&str>);

    /// A sub-step (cascade tier, bonus job) under `parent_id` changed state.
    fn sub_step(&self, parent_id: &str, label: &str, status: StepStatus, detail: Option<&str>);
}

/// Writes progress events as structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn step_update(&self, step_id: &str, status: StepStatus, detail: Option<&str>) {
        tracing::info!(step = step_id, %status, detail = detail.unwrap_or(""), "step");
    }

    fn sub_step(&self, parent_id: &str, label: &str, status: StepStatus, detail: Option<&str>) {
        tracing::debug!(
            step = parent_id,
            label,
            %status,
            detail = detail.unwrap_or(""),
            "sub-step"
        );
    }
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn step_update(&self, _step_id: &str, _status: StepStatus, _detail: Option<&str>) {}

    fn sub_step(&self, _parent_id: &str, _label: &str, _status: StepStatus, _detail: Option<&str>) {
    }
}
