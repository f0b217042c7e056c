//! Flow Report: structured result of one flow run
//!
//! Lists every sealed step in order with what happened to it, the per-item
//! terminal failures collected along the way, and, on abort, where
//! execution stopped.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flow::phase::Phase;
use crate::flow::step::FlowStep;
use crate::stage::{ItemFailure, StageKind};

/// What happened to one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Stage ran with no item failures
    Completed,
    /// Stage ran; some work items ended unresolved
    CompletedWithFailures,
    /// Execution stopped at this step
    Aborted,
    /// Never invoked because an earlier step aborted the flow
    NotRun,
}

impl StepOutcome {
    /// Whether the stage ran to completion
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed | Self::CompletedWithFailures)
    }

    /// Whether the stage was invoked at all
    pub fn was_executed(&self) -> bool {
        !matches!(self, Self::NotRun)
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => write!(f, "OK"),
            Self::CompletedWithFailures => write!(f, "WARN"),
            Self::Aborted => write!(f, "ABORT"),
            Self::NotRun => write!(f, "SKIP"),
        }
    }
}

/// Result of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    pub position: usize,
    pub phase: Phase,
    pub stage: StageKind,
    pub outcome: StepOutcome,
    pub duration_ms: u64,
    /// Item failures reported by this step
    #[serde(default)]
    pub item_failures: usize,
}

impl StepRecord {
    pub fn new(step: &FlowStep, outcome: StepOutcome, duration: Duration) -> Self {
        Self {
            position: step.position,
            phase: step.phase,
            stage: step.stage,
            outcome,
            duration_ms: duration.as_millis() as u64,
            item_failures: 0,
        }
    }

    pub fn not_run(step: &FlowStep) -> Self {
        Self::new(step, StepOutcome::NotRun, Duration::ZERO)
    }
}

/// Overall status of the run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    Aborted {
        position: usize,
        stage: StageKind,
        reason: String,
    },
}

impl RunStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Complete flow report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowReport {
    pub run_id: String,
    /// Effort profile the flow was built from
    pub profile: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// One record per sealed step, in execution order
    pub steps: Vec<StepRecord>,
    /// Terminal per-item failures across all steps
    #[serde(default)]
    pub item_failures: Vec<ItemFailure>,
    pub status: RunStatus,
}

impl FlowReport {
    pub fn new(run_id: impl Into<String>, profile: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            profile: profile.into(),
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
            steps: Vec::new(),
            item_failures: Vec::new(),
            status: RunStatus::Completed,
        }
    }

    /// Record a step together with the item failures it reported
    pub fn add_step(&mut self, mut record: StepRecord, failures: Vec<ItemFailure>) {
        record.item_failures = failures.len();
        self.item_failures.extend(failures);
        self.steps.push(record);
    }

    /// Mark the run aborted at `step`
    pub fn abort(&mut self, step: &FlowStep, reason: impl Into<String>) {
        self.status = RunStatus::Aborted {
            position: step.position,
            stage: step.stage,
            reason: reason.into(),
        };
    }

    pub fn finalize(&mut self, total_duration: Duration) {
        self.finished_at = Some(Utc::now());
        self.duration_ms = total_duration.as_millis() as u64;
    }

    /// Steps whose stage was invoked
    pub fn executed(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.outcome.was_executed())
    }

    /// Steps whose stage ran to completion
    pub fn completed(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps.iter().filter(|s| s.outcome.is_completed())
    }

    /// Position and stage where execution stopped, if the run aborted
    pub fn aborted_at(&self) -> Option<(usize, StageKind)> {
        match &self.status {
            RunStatus::Completed => None,
            RunStatus::Aborted {
                position, stage, ..
            } => Some((*position, *stage)),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_completed()
    }

    /// Compact summary for logging
    pub fn summary(&self) -> String {
        let steps: Vec<String> = self
            .steps
            .iter()
            .map(|s| format!("{}:{}", s.stage, s.outcome))
            .collect();

        let status = match &self.status {
            RunStatus::Completed => "COMPLETED".to_string(),
            RunStatus::Aborted {
                position, stage, ..
            } => format!("ABORTED at #{position} {stage}"),
        };

        format!(
            "[{}] {}: {}/{} steps completed, {} item failures ({}ms) [{}]",
            status,
            self.profile,
            self.completed().count(),
            self.steps.len(),
            self.item_failures.len(),
            self.duration_ms,
            steps.join(" → "),
        )
    }
}
