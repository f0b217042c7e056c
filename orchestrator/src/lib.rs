//! Synthesis Pipeline Orchestrator
//!
//! This library provides:
//! - A registry holding one shared instance of every physical-design stage
//! - Effort profiles describing which stages a flow runs, per phase
//! - A builder/director pair that assembles sealed, single-use flows
//! - Escalating fault recovery for per-item work (rip-up-and-reroute)
//! - Structured run reports
//!
//! # Usage
//!
//! ```no_run
//! use orchestrator::{Design, EffortLevel, FlowDirector, OrchestratorConfig, RegistryCell};
//!
//! let config = OrchestratorConfig::from_env()?;
//! let registry = RegistryCell::new(config.routing.clone());
//!
//! let mut director = FlowDirector::for_profile(EffortLevel::High.profile(), registry.get());
//! let mut flow = director.create_flow()?;
//!
//! let mut design = Design::synthetic("demo", 64, 32);
//! let report = flow.run(&mut design)?;
//! println!("{}", report.summary());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod design;
pub mod error;
pub mod escalation;
pub mod flow;
pub mod profile;
pub mod registry;
pub mod stage;

pub use config::{ConfigOverrides, FailurePolicy, OrchestratorConfig, RoutingConfig};
pub use design::Design;
pub use error::{ConfigError, FlowError, FlowResult, StageError};
pub use escalation::{EscalationChain, Outcome, Resolution};
pub use flow::{
    Flow, FlowBuilder, FlowDirector, FlowReport, FlowState, Phase, ProfileFlowBuilder, RunStatus,
    StepOutcome,
};
pub use profile::{EffortLevel, EffortProfile, ProfileSet, StepSpec};
pub use registry::{RegistryCell, RegistryHandle, StageRegistry};
pub use stage::{ItemFailure, Stage, StageKind, StageOutcome, StageResult};
