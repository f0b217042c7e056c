use crate::error::FlowResult;
use crate::flow::builder::{FlowBuilder, ProfileFlowBuilder};
use crate::flow::executable::Flow;
use crate::profile::EffortProfile;
use crate::registry::RegistryHandle;

/// Drives one builder through the fixed phase order.
///
/// The director owns exactly one active builder. Swapping it with
/// [`FlowDirector::set_builder`] only affects later `create_flow` calls.
pub struct FlowDirector {
    builder: Box<dyn FlowBuilder>,
}

impl FlowDirector {
    pub fn new(builder: Box<dyn FlowBuilder>) -> Self {
        Self { builder }
    }

    /// Director over the generic builder for `profile`
    pub fn for_profile(profile: EffortProfile, registry: RegistryHandle) -> Self {
        Self::new(Box::new(ProfileFlowBuilder::new(profile, registry)))
    }

    /// Replace the active builder, returning the previous one
    pub fn set_builder(&mut self, builder: Box<dyn FlowBuilder>) -> Box<dyn FlowBuilder> {
        tracing::debug!(
            from = %self.builder.profile_name(),
            to = %builder.profile_name(),
            "Swapping flow builder"
        );
        std::mem::replace(&mut self.builder, builder)
    }

    pub fn profile_name(&self) -> &str {
        self.builder.profile_name()
    }

    /// start → placement → clock tree → routing → sealed flow
    pub fn create_flow(&mut self) -> FlowResult<Flow> {
        self.builder.start_flow();
        self.builder.build_placement_phase()?;
        self.builder.build_clock_tree_phase()?;
        self.builder.build_routing_phase()?;
        self.builder.get_flow()
    }
}

impl std::fmt::Debug for FlowDirector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowDirector")
            .field("profile", &self.builder.profile_name())
            .finish()
    }
}
