use serde::{Deserialize, Serialize};

use crate::flow::phase::Phase;
use crate::stage::StageKind;

/// One bound invocation: which stage to run, at which position, for which phase.
///
/// Carries only the tag. The stage instance is looked up in the registry
/// when the step executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStep {
    /// 1-based position in the flow
    pub position: usize,
    pub phase: Phase,
    pub stage: StageKind,
}

impl std::fmt::Display for FlowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}/{}", self.position, self.phase, self.stage)
    }
}
