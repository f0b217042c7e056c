//! Orchestrator error types
//!
//! Three concerns, three enums:
//! - [`FlowError`]: usage errors in how the builder/director/flow API is
//!   driven. Never retried, always surfaced to the caller.
//! - [`StageError`]: a stage could not complete at all. Aborts the
//!   remaining flow.
//! - [`ConfigError`]: configuration could not be loaded or is invalid.
//!
//! Per-item terminal failures are not errors; they travel as
//! [`crate::stage::ItemFailure`] values inside stage outcomes.

use std::path::PathBuf;

use thiserror::Error;

use crate::flow::lifecycle::FlowState;
use crate::stage::StageKind;

/// Result type alias for builder, director and flow operations
pub type FlowResult<T> = Result<T, FlowError>;

/// Usage errors raised by the orchestration API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// A build phase was invoked before `start_flow`
    #[error("Flow builder not initialized: call start_flow() before building phases")]
    NotInitialized,

    /// A build step was invoked twice or out of the
    /// placement → clock-tree → routing → get_flow order
    #[error("Unexpected builder phase order: expected {expected}, found {found}")]
    UnknownBuilderPhaseOrder { expected: String, found: String },

    /// The flow has already left the Sealed state; flows are single-use
    #[error("Flow {run_id} is {state} and cannot be run again; build a fresh flow")]
    AlreadyExecuted { run_id: String, state: FlowState },

    /// The lifecycle transition table rejected a transition
    #[error("Illegal flow state transition: {from} → {to}")]
    IllegalTransition { from: FlowState, to: FlowState },

    /// No effort profile with this name is known
    #[error("Unknown effort profile: {0}")]
    UnknownProfile(String),

    /// An effort profile table is malformed
    #[error("Invalid effort profile '{profile}': {reason}")]
    InvalidProfile { profile: String, reason: String },
}

/// Fatal stage errors: the stage could not run at all
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StageError {
    /// A precondition on the design state does not hold
    #[error("{stage}: precondition violated: {reason}")]
    PreconditionViolated { stage: StageKind, reason: String },

    /// Another thread panicked while holding the stage lock
    #[error("{stage}: stage lock poisoned by a previous panic")]
    LockPoisoned { stage: StageKind },

    /// The stage failed for any other reason
    #[error("{stage}: {message}")]
    Failed { stage: StageKind, message: String },
}

impl StageError {
    /// The stage that raised the error
    pub fn stage(&self) -> StageKind {
        match self {
            Self::PreconditionViolated { stage, .. }
            | Self::LockPoisoned { stage }
            | Self::Failed { stage, .. } => *stage,
        }
    }

    pub fn precondition(stage: StageKind, reason: impl Into<String>) -> Self {
        Self::PreconditionViolated {
            stage,
            reason: reason.into(),
        }
    }
}

/// Result type alias for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the expected schema
    #[error("Failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Config parsed but failed validation
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<FlowError> for ConfigError {
    fn from(err: FlowError) -> Self {
        Self::Invalid(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_reports_stage() {
        let err = StageError::precondition(StageKind::DetailedRouting, "no global routes");
        assert_eq!(err.stage(), StageKind::DetailedRouting);
        assert_eq!(
            err.to_string(),
            "detailed_routing: precondition violated: no global routes"
        );
    }

    #[test]
    fn test_phase_order_message() {
        let err = FlowError::UnknownBuilderPhaseOrder {
            expected: "clock_tree".to_string(),
            found: "routing".to_string(),
        };
        assert!(err.to_string().contains("expected clock_tree, found routing"));
    }
}
