//! Flow construction and execution
//!
//! A [`FlowDirector`] drives a [`FlowBuilder`] through the placement,
//! clock-tree and routing phases and hands back a sealed [`Flow`]. Running
//! the flow produces a [`FlowReport`].

pub mod builder;
pub mod director;
pub mod executable;
pub mod lifecycle;
pub mod phase;
pub mod report;
pub mod step;

pub use builder::{FlowBuilder, ProfileFlowBuilder};
pub use director::FlowDirector;
pub use executable::Flow;
pub use lifecycle::{FlowLifecycle, FlowState, TransitionRecord};
pub use phase::Phase;
pub use report::{FlowReport, RunStatus, StepOutcome, StepRecord};
pub use step::FlowStep;
