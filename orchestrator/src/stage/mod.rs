//! Stages: named units of pipeline work
//!
//! Every stage kind has exactly one canonical instance, owned by the
//! [`crate::registry::StageRegistry`] and shared by every flow built
//! against that registry. Stages may carry internal state (run counters,
//! escalation statistics) that accumulates across flows.
//!
//! # Result taxonomy
//!
//! ```text
//! Ok(StageOutcome::Success)                       → step completed
//! Ok(StageOutcome::RecoverableItemFailure(items)) → step completed, items reported
//! Err(StageError)                                 → fatal, flow aborts here
//! ```

pub mod optimization;
pub mod placement;
pub mod routing;

use serde::{Deserialize, Serialize};

use crate::design::Design;
use crate::error::StageError;
use crate::escalation::{AttemptRecord, ChainStats};

pub use optimization::{AreaOptimization, PowerOptimization, TimingOptimization};
pub use placement::{ClockNetworkSynthesis, DetailedPlacement, GlobalPlacement};
pub use routing::{DetailedRouting, GlobalRouting};

/// The stage kinds known to the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    GlobalPlacement,
    DetailedPlacement,
    ClockNetworkSynthesis,
    GlobalRouting,
    DetailedRouting,
    TimingOptimization,
    PowerOptimization,
    AreaOptimization,
}

impl StageKind {
    pub const ALL: [StageKind; 8] = [
        Self::GlobalPlacement,
        Self::DetailedPlacement,
        Self::ClockNetworkSynthesis,
        Self::GlobalRouting,
        Self::DetailedRouting,
        Self::TimingOptimization,
        Self::PowerOptimization,
        Self::AreaOptimization,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlobalPlacement => "global_placement",
            Self::DetailedPlacement => "detailed_placement",
            Self::ClockNetworkSynthesis => "clock_network_synthesis",
            Self::GlobalRouting => "global_routing",
            Self::DetailedRouting => "detailed_routing",
            Self::TimingOptimization => "timing_optimization",
            Self::PowerOptimization => "power_optimization",
            Self::AreaOptimization => "area_optimization",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A work item that ended in terminal failure after exhausting its chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    /// Stage that owned the escalation chain
    pub stage: StageKind,
    /// Item identifier (e.g. net name)
    pub item: String,
    /// Every tier that was tried, in order
    pub attempts: Vec<AttemptRecord>,
}

/// Non-fatal stage result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Success,
    /// The stage completed but some work items ended unresolved
    RecoverableItemFailure(Vec<ItemFailure>),
}

impl StageOutcome {
    /// Collapse an empty failure list into `Success`
    pub fn from_failures(failures: Vec<ItemFailure>) -> Self {
        if failures.is_empty() {
            Self::Success
        } else {
            Self::RecoverableItemFailure(failures)
        }
    }

    pub fn item_failures(&self) -> &[ItemFailure] {
        match self {
            Self::Success => &[],
            Self::RecoverableItemFailure(items) => items,
        }
    }
}

pub type StageResult = Result<StageOutcome, StageError>;

/// Stage SPI.
///
/// `run` performs one unit of pipeline work against the design. It is
/// called once per flow step; the same instance may be called many times
/// within one flow and across flows.
pub trait Stage: Send {
    fn kind(&self) -> StageKind;

    fn run(&mut self, design: &mut Design) -> StageResult;

    /// Cumulative number of `run` calls on this instance
    fn runs(&self) -> u64;

    /// Cumulative escalation counters, for stages backed by a chain
    fn escalation_stats(&self) -> Option<ChainStats> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_kind_names_unique() {
        let mut names: Vec<&str> = StageKind::ALL.iter().map(|k| k.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), StageKind::ALL.len());
    }

    #[test]
    fn test_stage_kind_serde_matches_display() {
        for kind in StageKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{kind}\""));
        }
    }

    #[test]
    fn test_outcome_from_failures() {
        assert_eq!(StageOutcome::from_failures(vec![]), StageOutcome::Success);
        let failure = ItemFailure {
            stage: StageKind::DetailedRouting,
            item: "n1".to_string(),
            attempts: vec![],
        };
        let outcome = StageOutcome::from_failures(vec![failure.clone()]);
        assert_eq!(outcome.item_failures(), &[failure]);
    }
}
