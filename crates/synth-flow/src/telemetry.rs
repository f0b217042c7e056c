//! Run output: the console summary and the JSON report sink.

use std::path::Path;

use anyhow::{Context, Result};
use orchestrator::escalation::ChainStats;
use orchestrator::{Design, FlowReport, RunStatus, StepOutcome};
use serde::Serialize;
use tracing::info;

/// Everything written to `--report`
#[derive(Debug, Serialize)]
pub struct RunArtifact<'a> {
    pub report: &'a FlowReport,
    pub design: DesignSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation: Option<&'a ChainStats>,
}

/// Final design state worth keeping alongside the report
#[derive(Debug, Clone, Serialize)]
pub struct DesignSnapshot {
    pub name: String,
    pub cells: usize,
    pub nets: usize,
    pub routed_nets: usize,
    pub worst_slack_ps: f64,
    pub total_power_mw: f64,
    pub total_area_um2: f64,
}

impl From<&Design> for DesignSnapshot {
    fn from(design: &Design) -> Self {
        Self {
            name: design.name.clone(),
            cells: design.cells.len(),
            nets: design.nets.len(),
            routed_nets: design.routed_nets(),
            worst_slack_ps: design.metrics.worst_slack_ps,
            total_power_mw: design.metrics.total_power_mw,
            total_area_um2: design.metrics.total_area_um2,
        }
    }
}

/// Write the run artifact as pretty JSON.
pub fn write_report(artifact: &RunArtifact<'_>, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(artifact).context("failed to serialize report")?;
    std::fs::write(path, json)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    info!(path = %path.display(), "Wrote flow report");
    Ok(())
}

/// Human-readable report for stdout
pub fn render_report(artifact: &RunArtifact<'_>) -> String {
    let report = artifact.report;
    let mut out = String::new();

    out.push_str(&format!(
        "flow {} ({} steps, profile {})\n",
        report.run_id,
        report.steps.len(),
        report.profile
    ));
    for step in &report.steps {
        let note = match step.outcome {
            StepOutcome::CompletedWithFailures => format!("  {} item failure(s)", step.item_failures),
            _ => String::new(),
        };
        out.push_str(&format!(
            "  {:>3}  {:<5} {:<11} {:<24}{}\n",
            step.position,
            step.outcome.to_string(),
            step.phase.to_string(),
            step.stage.to_string(),
            note
        ));
    }

    for failure in &report.item_failures {
        let tried: Vec<&str> = failure.attempts.iter().map(|a| a.handler.as_str()).collect();
        out.push_str(&format!(
            "  unresolved {} in {} (tried {})\n",
            failure.item,
            failure.stage,
            tried.join(" → ")
        ));
    }

    if let Some(stats) = artifact.escalation {
        out.push_str(&format!(
            "  escalation: {} nets handled, {} resolved, {} unresolved\n",
            stats.items_handled, stats.resolved, stats.unresolved
        ));
    }

    let design = &artifact.design;
    out.push_str(&format!(
        "  design {}: {}/{} nets routed, slack {:.1}ps, power {:.2}mW, area {:.1}um2\n",
        design.name,
        design.routed_nets,
        design.nets,
        design.worst_slack_ps,
        design.total_power_mw,
        design.total_area_um2
    ));

    match &report.status {
        RunStatus::Completed => out.push_str("COMPLETED\n"),
        RunStatus::Aborted {
            position,
            stage,
            reason,
        } => out.push_str(&format!("ABORTED at #{position} {stage}: {reason}\n")),
    }
    out
}
