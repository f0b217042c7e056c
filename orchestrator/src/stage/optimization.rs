//! Optimization passes
//!
//! None of these have preconditions; each nudges one metric and may pay a
//! small cost on another. Repeated passes converge rather than diverge.

use crate::design::Design;
use crate::stage::{Stage, StageKind, StageOutcome, StageResult};

/// Fraction of the remaining negative slack recovered per timing pass
const SLACK_RECOVERY: f64 = 0.5;
/// Power reduction per pass
const POWER_SCALE: f64 = 0.9;
/// Area reduction per pass
const AREA_SCALE: f64 = 0.95;
/// Slack cost of downsizing cells during power recovery
const POWER_SLACK_COST_PS: f64 = 1.0;

#[derive(Debug, Default)]
pub struct TimingOptimization {
    runs: u64,
}

impl Stage for TimingOptimization {
    fn kind(&self) -> StageKind {
        StageKind::TimingOptimization
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;
        let metrics = &mut design.metrics;
        if metrics.worst_slack_ps < 0.0 {
            metrics.worst_slack_ps *= 1.0 - SLACK_RECOVERY;
        }
        tracing::info!(
            worst_slack_ps = metrics.worst_slack_ps,
            pass = self.runs,
            "Timing optimization done"
        );
        Ok(StageOutcome::Success)
    }

    fn runs(&self) -> u64 {
        self.runs
    }
}

#[derive(Debug, Default)]
pub struct PowerOptimization {
    runs: u64,
}

impl Stage for PowerOptimization {
    fn kind(&self) -> StageKind {
        StageKind::PowerOptimization
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;
        let metrics = &mut design.metrics;
        metrics.total_power_mw *= POWER_SCALE;
        metrics.worst_slack_ps -= POWER_SLACK_COST_PS;
        tracing::info!(
            total_power_mw = metrics.total_power_mw,
            pass = self.runs,
            "Power optimization done"
        );
        Ok(StageOutcome::Success)
    }

    fn runs(&self) -> u64 {
        self.runs
    }
}

#[derive(Debug, Default)]
pub struct AreaOptimization {
    runs: u64,
}

impl Stage for AreaOptimization {
    fn kind(&self) -> StageKind {
        StageKind::AreaOptimization
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;
        design.metrics.total_area_um2 *= AREA_SCALE;
        tracing::info!(
            total_area_um2 = design.metrics.total_area_um2,
            pass = self.runs,
            "Area optimization done"
        );
        Ok(StageOutcome::Success)
    }

    fn runs(&self) -> u64 {
        self.runs
    }
}
