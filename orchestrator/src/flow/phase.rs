//! Flow build phases

use serde::{Deserialize, Serialize};

/// The three build phases, in their protocol order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Placement,
    ClockTree,
    Routing,
}

impl Phase {
    /// Fixed build order shared by every builder
    pub const ORDER: [Phase; 3] = [Self::Placement, Self::ClockTree, Self::Routing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Placement => "placement",
            Self::ClockTree => "clock_tree",
            Self::Routing => "routing",
        }
    }

    /// The phase that must follow this one, if any
    pub fn next(&self) -> Option<Phase> {
        match self {
            Self::Placement => Some(Self::ClockTree),
            Self::ClockTree => Some(Self::Routing),
            Self::Routing => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
