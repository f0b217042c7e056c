//! Placement and clock-tree stages

use crate::design::{Design, PlacementState};
use crate::error::StageError;
use crate::stage::{Stage, StageKind, StageOutcome, StageResult};

/// Horizontal site pitch used when snapping cells during legalization
const SITE_PITCH: u32 = 2;

/// Clock skew penalty applied to worst slack once a tree is built
const CLOCK_SKEW_PS: f64 = 5.0;

/// Coarse placement: assigns every cell a grid location.
///
/// Re-running global placement invalidates everything downstream
/// (legalization, clock tree, routes).
#[derive(Debug, Default)]
pub struct GlobalPlacement {
    runs: u64,
}

impl Stage for GlobalPlacement {
    fn kind(&self) -> StageKind {
        StageKind::GlobalPlacement
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;

        let cols = (design.cells.len() as f64).sqrt().ceil().max(1.0) as u32;
        for (idx, cell) in design.cells.iter_mut().enumerate() {
            let idx = idx as u32;
            // odd offsets so detailed placement has something to snap
            cell.location = Some(((idx % cols) * 3 + 1, idx / cols));
        }

        design.placement = PlacementState::Global;
        design.clock_tree_built = false;
        design.global_routed = false;
        for net in &mut design.nets {
            net.rip_up();
            net.global_route = false;
        }

        tracing::info!(cells = design.cells.len(), cols, "Global placement done");
        Ok(StageOutcome::Success)
    }

    fn runs(&self) -> u64 {
        self.runs
    }
}

/// Legalization: snaps every placed cell onto the site grid.
#[derive(Debug, Default)]
pub struct DetailedPlacement {
    runs: u64,
}

impl Stage for DetailedPlacement {
    fn kind(&self) -> StageKind {
        StageKind::DetailedPlacement
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;

        if design.placement < PlacementState::Global || !design.all_cells_placed() {
            return Err(StageError::precondition(
                self.kind(),
                "design has unplaced cells; run global placement first",
            ));
        }

        let mut moved = 0usize;
        for cell in &mut design.cells {
            if let Some((x, y)) = cell.location {
                let snapped = x - x % SITE_PITCH;
                if snapped != x {
                    moved += 1;
                }
                cell.location = Some((snapped, y));
            }
        }

        design.placement = PlacementState::Legalized;
        tracing::info!(moved, pass = self.runs, "Detailed placement done");
        Ok(StageOutcome::Success)
    }

    fn runs(&self) -> u64 {
        self.runs
    }
}

/// Clock-tree synthesis over a legalized placement.
#[derive(Debug, Default)]
pub struct ClockNetworkSynthesis {
    runs: u64,
}

impl Stage for ClockNetworkSynthesis {
    fn kind(&self) -> StageKind {
        StageKind::ClockNetworkSynthesis
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;

        if design.placement != PlacementState::Legalized {
            return Err(StageError::precondition(
                self.kind(),
                format!("placement is {:?}, expected Legalized", design.placement),
            ));
        }

        if !design.clock_tree_built {
            design.metrics.worst_slack_ps -= CLOCK_SKEW_PS;
        }
        design.clock_tree_built = true;
        tracing::info!(sinks = design.cells.len(), "Clock network synthesized");
        Ok(StageOutcome::Success)
    }

    fn runs(&self) -> u64 {
        self.runs
    }
}
