//! Design state: the cells and nets the pipeline stages operate on
//!
//! A small model of the design database. Stages mutate
//! it through `&mut Design`; the flow driver owns the borrow for the
//! duration of one run.

use serde::{Deserialize, Serialize};

/// (width, height)
pub type Shape = (u32, u32);
/// (x, y)
pub type Location = (u32, u32);

/// A placeable standard cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: u32,
    /// `None` until global placement assigns a location
    #[serde(default)]
    pub location: Option<Location>,
    pub shape: Shape,
    /// Drive strength / library size name (e.g. "X1")
    pub size: String,
}

/// A net to be routed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Net {
    pub name: String,
    pub num_pins: u32,
    /// Whether detailed routing has completed for this net
    #[serde(default)]
    pub routed: bool,
    /// Which escalation tier routed the net
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routed_by: Option<String>,
    /// Whether global routing has produced a route guide
    #[serde(default)]
    pub global_route: bool,
    /// Detailed routing attempts made on this net, across all tiers
    #[serde(default)]
    pub attempts: u32,
}

impl Net {
    pub fn new(name: impl Into<String>, num_pins: u32) -> Self {
        Self {
            name: name.into(),
            num_pins,
            routed: false,
            routed_by: None,
            global_route: false,
            attempts: 0,
        }
    }

    /// Rip up any existing detailed route
    pub fn rip_up(&mut self) {
        self.routed = false;
        self.routed_by = None;
    }
}

/// Placement progress of the design
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementState {
    #[default]
    Unplaced,
    /// Every cell has a (possibly overlapping) location
    Global,
    /// Locations are legal (on-grid, non-overlapping)
    Legalized,
}

/// Quality-of-results metrics mutated by the optimization stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignMetrics {
    pub worst_slack_ps: f64,
    pub total_power_mw: f64,
    pub total_area_um2: f64,
}

impl Default for DesignMetrics {
    fn default() -> Self {
        Self {
            worst_slack_ps: -120.0,
            total_power_mw: 50.0,
            total_area_um2: 1_000.0,
        }
    }
}

/// The full design state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    pub name: String,
    #[serde(default)]
    pub cells: Vec<Cell>,
    #[serde(default)]
    pub nets: Vec<Net>,
    #[serde(default)]
    pub placement: PlacementState,
    #[serde(default)]
    pub clock_tree_built: bool,
    #[serde(default)]
    pub global_routed: bool,
    #[serde(default)]
    pub metrics: DesignMetrics,
}

impl Design {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Deterministic synthetic design.
    ///
    /// Net pin counts cycle through 2..=7 so every default routing tier
    /// gets exercised.
    pub fn synthetic(name: impl Into<String>, cells: u32, nets: u32) -> Self {
        let cells = (0..cells)
            .map(|id| Cell {
                id,
                location: None,
                shape: (2 + id % 3, 1),
                size: "X1".to_string(),
            })
            .collect();
        let nets = (0..nets)
            .map(|i| Net::new(format!("n{i}"), 2 + i % 6))
            .collect();
        Self {
            name: name.into(),
            cells,
            nets,
            ..Default::default()
        }
    }

    /// Whether every cell has a location
    pub fn all_cells_placed(&self) -> bool {
        self.cells.iter().all(|c| c.location.is_some())
    }

    pub fn unrouted_nets(&self) -> usize {
        self.nets.iter().filter(|n| !n.routed).count()
    }

    pub fn routed_nets(&self) -> usize {
        self.nets.len() - self.unrouted_nets()
    }
}
