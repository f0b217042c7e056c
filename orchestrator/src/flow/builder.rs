//! Flow builders
//!
//! [`FlowBuilder`] is the SPI a director drives. [`ProfileFlowBuilder`] is
//! the one generic implementation: it reads an [`EffortProfile`] table and
//! appends that profile's stages for each phase.
//!
//! Builders enforce the phase protocol themselves:
//!
//! ```text
//! start_flow → placement → clock_tree → routing → get_flow
//! ```
//!
//! A phase before `start_flow` is `NotInitialized`. A phase out of order or
//! repeated, or `get_flow` before routing, is `UnknownBuilderPhaseOrder`.
//! `start_flow` always discards the in-progress flow and starts over.

use tokio_util::sync::CancellationToken;

use crate::config::FailurePolicy;
use crate::error::{FlowError, FlowResult};
use crate::flow::executable::Flow;
use crate::flow::phase::Phase;
use crate::profile::EffortProfile;
use crate::registry::RegistryHandle;

const GET_FLOW: &str = "get_flow";

/// Builder SPI
#[cfg_attr(test, mockall::automock)]
pub trait FlowBuilder: Send {
    /// Name of the profile this builder produces flows for
    fn profile_name(&self) -> &str;

    /// Reset to a fresh, empty in-progress flow.
    fn start_flow(&mut self);

    fn build_placement_phase(&mut self) -> FlowResult<()>;

    fn build_clock_tree_phase(&mut self) -> FlowResult<()>;

    fn build_routing_phase(&mut self) -> FlowResult<()>;

    /// Seal and hand out the in-progress flow.
    fn get_flow(&mut self) -> FlowResult<Flow>;
}

/// Flow in progress plus the next step the protocol allows
#[derive(Debug)]
struct Draft {
    flow: Flow,
    next: Option<Phase>,
}

/// Generic table-driven builder
#[derive(Debug)]
pub struct ProfileFlowBuilder {
    profile: EffortProfile,
    registry: RegistryHandle,
    policy: FailurePolicy,
    cancel: Option<CancellationToken>,
    draft: Option<Draft>,
}

impl ProfileFlowBuilder {
    pub fn new(profile: EffortProfile, registry: RegistryHandle) -> Self {
        Self {
            profile,
            registry,
            policy: FailurePolicy::default(),
            cancel: None,
            draft: None,
        }
    }

    /// Failure policy stamped on every flow this builder hands out
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Cancellation token shared by every flow this builder hands out
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn profile(&self) -> &EffortProfile {
        &self.profile
    }

    fn build_phase(&mut self, phase: Phase) -> FlowResult<()> {
        let draft = self.draft.as_mut().ok_or(FlowError::NotInitialized)?;
        if draft.next != Some(phase) {
            return Err(FlowError::UnknownBuilderPhaseOrder {
                expected: expected_name(draft.next),
                found: phase.to_string(),
            });
        }

        for stage in self.profile.expand(phase) {
            draft.flow.push(phase, stage)?;
        }
        draft.flow.mark_phase_built(phase)?;
        draft.next = phase.next();

        tracing::debug!(
            profile = %self.profile.name,
            phase = %phase,
            steps = self.profile.step_count(phase),
            "Built flow phase"
        );
        Ok(())
    }
}

fn expected_name(next: Option<Phase>) -> String {
    next.map_or_else(|| GET_FLOW.to_string(), |p| p.to_string())
}

impl FlowBuilder for ProfileFlowBuilder {
    fn profile_name(&self) -> &str {
        &self.profile.name
    }

    fn start_flow(&mut self) {
        if self.draft.is_some() {
            tracing::debug!(profile = %self.profile.name, "Discarding in-progress flow");
        }
        let mut flow = Flow::building(&self.profile.name, self.registry.clone())
            .with_failure_policy(self.policy);
        if let Some(token) = &self.cancel {
            flow = flow.with_cancellation(token.clone());
        }
        self.draft = Some(Draft {
            flow,
            next: Some(Phase::Placement),
        });
    }

    fn build_placement_phase(&mut self) -> FlowResult<()> {
        self.build_phase(Phase::Placement)
    }

    fn build_clock_tree_phase(&mut self) -> FlowResult<()> {
        self.build_phase(Phase::ClockTree)
    }

    fn build_routing_phase(&mut self) -> FlowResult<()> {
        self.build_phase(Phase::Routing)
    }

    fn get_flow(&mut self) -> FlowResult<Flow> {
        let draft = self.draft.as_ref().ok_or(FlowError::NotInitialized)?;
        if let Some(next) = draft.next {
            return Err(FlowError::UnknownBuilderPhaseOrder {
                expected: next.to_string(),
                found: GET_FLOW.to_string(),
            });
        }

        let mut flow = match self.draft.take() {
            Some(draft) => draft.flow,
            None => return Err(FlowError::NotInitialized),
        };
        flow.seal()?;

        tracing::info!(
            profile = %self.profile.name,
            run_id = %flow.run_id(),
            steps = flow.len(),
            "Flow sealed"
        );
        Ok(flow)
    }
}
