//! Effort profiles: data tables describing which stages each flow runs
//!
//! A profile lists, per build phase, the ordered stages and how many times
//! each is repeated. A single generic builder
//! ([`crate::flow::ProfileFlowBuilder`]) interprets the table, so adding an
//! effort level is a data change.
//!
//! # Built-in profiles
//!
//! ```text
//! low:    placement  GP DP TO
//!         clock_tree CNS
//!         routing    GR DR TO
//! medium: placement  GP DP TO PO
//!         clock_tree CNS TO
//!         routing    GR TO DR TO
//! high:   placement  GP DP TO DP TO DP PO
//!         clock_tree CNS DP TO PO
//!         routing    GR DP TO DR TO PO
//! ```
//!
//! # TOML
//!
//! ```toml
//! [[profile]]
//! name = "signoff"
//! placement = [{ stage = "global_placement" }, { stage = "detailed_placement", repeat = 2 }]
//! clock_tree = [{ stage = "clock_network_synthesis" }]
//! routing = [{ stage = "global_routing" }, { stage = "detailed_routing" }]
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};
use crate::flow::phase::Phase;
use crate::stage::StageKind;

/// Built-in effort levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffortLevel {
    Low,
    Medium,
    High,
}

impl EffortLevel {
    pub const ALL: [EffortLevel; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn profile(&self) -> EffortProfile {
        EffortProfile::builtin(*self)
    }
}

impl std::fmt::Display for EffortLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EffortLevel {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(FlowError::UnknownProfile(other.to_string())),
        }
    }
}

/// Upper bound on `StepSpec::repeat`
pub const MAX_REPEAT: u32 = 64;

fn one() -> u32 {
    1
}

/// One table entry: a stage and its repetition count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSpec {
    pub stage: StageKind,
    #[serde(default = "one")]
    pub repeat: u32,
}

impl StepSpec {
    pub fn once(stage: StageKind) -> Self {
        Self { stage, repeat: 1 }
    }
}

fn seq(kinds: &[StageKind]) -> Vec<StepSpec> {
    kinds.iter().copied().map(StepSpec::once).collect()
}

/// Per-phase stage table for one effort level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffortProfile {
    pub name: String,
    #[serde(default)]
    pub placement: Vec<StepSpec>,
    #[serde(default)]
    pub clock_tree: Vec<StepSpec>,
    #[serde(default)]
    pub routing: Vec<StepSpec>,
}

impl EffortProfile {
    pub fn builtin(level: EffortLevel) -> Self {
        use StageKind::*;

        let (placement, clock_tree, routing) = match level {
            EffortLevel::Low => (
                seq(&[GlobalPlacement, DetailedPlacement, TimingOptimization]),
                seq(&[ClockNetworkSynthesis]),
                seq(&[GlobalRouting, DetailedRouting, TimingOptimization]),
            ),
            EffortLevel::Medium => (
                seq(&[
                    GlobalPlacement,
                    DetailedPlacement,
                    TimingOptimization,
                    PowerOptimization,
                ]),
                seq(&[ClockNetworkSynthesis, TimingOptimization]),
                seq(&[
                    GlobalRouting,
                    TimingOptimization,
                    DetailedRouting,
                    TimingOptimization,
                ]),
            ),
            // optimization is interleaved after each placement pass
            EffortLevel::High => (
                seq(&[
                    GlobalPlacement,
                    DetailedPlacement,
                    TimingOptimization,
                    DetailedPlacement,
                    TimingOptimization,
                    DetailedPlacement,
                    PowerOptimization,
                ]),
                seq(&[
                    ClockNetworkSynthesis,
                    DetailedPlacement,
                    TimingOptimization,
                    PowerOptimization,
                ]),
                seq(&[
                    GlobalRouting,
                    DetailedPlacement,
                    TimingOptimization,
                    DetailedRouting,
                    TimingOptimization,
                    PowerOptimization,
                ]),
            ),
        };

        Self {
            name: level.as_str().to_string(),
            placement,
            clock_tree,
            routing,
        }
    }

    pub fn phase(&self, phase: Phase) -> &[StepSpec] {
        match phase {
            Phase::Placement => &self.placement,
            Phase::ClockTree => &self.clock_tree,
            Phase::Routing => &self.routing,
        }
    }

    /// Stage sequence for a phase with repetitions expanded
    pub fn expand(&self, phase: Phase) -> Vec<StageKind> {
        self.phase(phase)
            .iter()
            .flat_map(|spec| std::iter::repeat(spec.stage).take(spec.repeat as usize))
            .collect()
    }

    /// Number of bound invocations this profile produces for a phase
    pub fn step_count(&self, phase: Phase) -> usize {
        self.phase(phase).iter().map(|s| s.repeat as usize).sum()
    }

    pub fn total_steps(&self) -> usize {
        Phase::ORDER.iter().map(|p| self.step_count(*p)).sum()
    }

    pub fn validate(&self) -> FlowResult<()> {
        let invalid = |reason: String| FlowError::InvalidProfile {
            profile: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("profile name is empty".to_string()));
        }
        for phase in Phase::ORDER {
            if let Some(spec) = self.phase(phase).iter().find(|s| s.repeat == 0) {
                return Err(invalid(format!(
                    "{phase} step '{}' has repeat = 0",
                    spec.stage
                )));
            }
            if let Some(spec) = self.phase(phase).iter().find(|s| s.repeat > MAX_REPEAT) {
                return Err(invalid(format!(
                    "{phase} step '{}' has repeat = {}, max is {MAX_REPEAT}",
                    spec.stage, spec.repeat
                )));
            }
        }
        if self.total_steps() == 0 {
            return Err(invalid("profile produces an empty flow".to_string()));
        }
        Ok(())
    }
}

/// Lookup table of known profiles: the built-ins plus any custom ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSet {
    profiles: Vec<EffortProfile>,
}

impl ProfileSet {
    pub fn builtins() -> Self {
        Self {
            profiles: EffortLevel::ALL.iter().map(|l| l.profile()).collect(),
        }
    }

    /// Built-ins extended with custom profiles.
    ///
    /// A custom profile whose name matches an earlier one (ignoring ASCII
    /// case) replaces it.
    pub fn with_custom(custom: &[EffortProfile]) -> FlowResult<Self> {
        let mut set = Self::builtins();
        for profile in custom {
            profile.validate()?;
            match set
                .profiles
                .iter_mut()
                .find(|p| p.name.eq_ignore_ascii_case(&profile.name))
            {
                Some(existing) => {
                    tracing::debug!(profile = %profile.name, "Custom profile overrides built-in");
                    *existing = profile.clone();
                }
                None => set.profiles.push(profile.clone()),
            }
        }
        Ok(set)
    }

    pub fn get(&self, name: &str) -> FlowResult<&EffortProfile> {
        let wanted = name.trim();
        self.profiles
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FlowError::UnknownProfile(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EffortProfile> {
        self.profiles.iter()
    }
}

impl Default for ProfileSet {
    fn default() -> Self {
        Self::builtins()
    }
}
