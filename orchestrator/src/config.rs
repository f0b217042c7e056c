//! Orchestrator configuration
//!
//! Loaded from an optional TOML file, then overridden by environment
//! variables, then by per-run overrides (CLI flags).
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `SYNTH_FAILURE_POLICY` | `tolerant` | `tolerant` or `zero_tolerance` |
//! | `SYNTH_ILP_ENABLED` | `true` | Enable the ILP routing tier |
//! | `SYNTH_GREEDY_MAX_PINS` | `4` | Greedy maze router handles nets with fewer pins |
//! | `SYNTH_ASTAR_MAX_PINS` | `6` | A* router handles nets with fewer pins |
//!
//! # File format
//!
//! ```toml
//! failure_policy = "zero_tolerance"
//!
//! [routing]
//! ilp_enabled = false
//!
//! [[profile]]
//! name = "signoff"
//! placement = [{ stage = "global_placement" }, { stage = "detailed_placement", repeat = 3 }]
//! ```

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::profile::{EffortProfile, ProfileSet};

/// What a flow does when a stage reports per-item terminal failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Collect item failures in the report and keep going
    #[default]
    Tolerant,
    /// Abort the flow at the first stage that reports any item failure
    ZeroTolerance,
}

impl std::fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tolerant => write!(f, "tolerant"),
            Self::ZeroTolerance => write!(f, "zero_tolerance"),
        }
    }
}

impl FromStr for FailurePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "tolerant" => Ok(Self::Tolerant),
            "zero_tolerance" | "strict" => Ok(Self::ZeroTolerance),
            other => Err(ConfigError::Invalid(format!(
                "unknown failure policy '{other}'"
            ))),
        }
    }
}

/// Thresholds for the rip-up-and-reroute escalation chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Greedy maze routing succeeds for nets with fewer pins than this
    pub greedy_max_pins: u32,
    /// A* routing succeeds for nets with fewer pins than this
    pub a_star_max_pins: u32,
    /// Include the ILP tier (always succeeds) at the end of the chain
    pub ilp_enabled: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            greedy_max_pins: 4,
            a_star_max_pins: 6,
            ilp_enabled: true,
        }
    }
}

impl RoutingConfig {
    pub fn validate(&self) -> ConfigResult<()> {
        if self.a_star_max_pins < self.greedy_max_pins {
            return Err(ConfigError::Invalid(format!(
                "a_star_max_pins ({}) must be >= greedy_max_pins ({}): later tiers must be at least as capable",
                self.a_star_max_pins, self.greedy_max_pins
            )));
        }
        Ok(())
    }
}

/// Per-run overrides. Only `Some` values are applied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub failure_policy: Option<FailurePolicy>,
    pub ilp_enabled: Option<bool>,
}

/// Top-level orchestrator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Custom effort profiles, in addition to the built-ins
    #[serde(default, rename = "profile", skip_serializing_if = "Vec::is_empty")]
    pub profiles: Vec<EffortProfile>,
}

impl OrchestratorConfig {
    /// Load from a TOML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.apply_env()?;
        config.validate()?;
        tracing::debug!(path = %path.display(), profiles = config.profiles.len(), "Loaded config");
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> ConfigResult<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_from(|var| std::env::var(var).ok())
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SYNTH_FAILURE_POLICY") {
            self.failure_policy = v.parse()?;
        }
        if let Some(v) = lookup("SYNTH_ILP_ENABLED") {
            self.routing.ilp_enabled = parse_bool_env_value(&v);
        }
        if let Some(v) = lookup("SYNTH_GREEDY_MAX_PINS") {
            self.routing.greedy_max_pins = parse_u32("SYNTH_GREEDY_MAX_PINS", &v)?;
        }
        if let Some(v) = lookup("SYNTH_ASTAR_MAX_PINS") {
            self.routing.a_star_max_pins = parse_u32("SYNTH_ASTAR_MAX_PINS", &v)?;
        }
        Ok(())
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.failure_policy {
            self.failure_policy = v;
        }
        if let Some(v) = overrides.ilp_enabled {
            self.routing.ilp_enabled = v;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.routing.validate()?;
        self.profile_set()?;
        Ok(())
    }

    /// Built-in profiles merged with the custom ones from this config
    pub fn profile_set(&self) -> ConfigResult<ProfileSet> {
        Ok(ProfileSet::with_custom(&self.profiles)?)
    }
}

/// Accepts "1", "true", or "yes" (case-insensitive).
fn parse_bool_env_value(value: &str) -> bool {
    let v = value.trim().to_lowercase();
    v == "1" || v == "true" || v == "yes"
}

fn parse_u32(var: &str, value: &str) -> ConfigResult<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("{var}: expected an integer, got '{value}'")))
}
