//! The executable flow
//!
//! A [`Flow`] is an ordered sequence of [`FlowStep`]s bound to a registry.
//! Steps can only be appended while the flow is `Building`; once sealed the
//! sequence is frozen and `run` executes it exactly once, in insertion
//! order, on the calling thread.

use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::config::FailurePolicy;
use crate::design::Design;
use crate::error::{FlowError, FlowResult};
use crate::flow::lifecycle::{FlowLifecycle, FlowState, TransitionRecord};
use crate::flow::phase::Phase;
use crate::flow::report::{FlowReport, StepOutcome, StepRecord};
use crate::flow::step::FlowStep;
use crate::registry::RegistryHandle;
use crate::stage::{StageKind, StageOutcome};

#[derive(Debug)]
pub struct Flow {
    run_id: String,
    profile: String,
    steps: Vec<FlowStep>,
    registry: RegistryHandle,
    lifecycle: FlowLifecycle,
    policy: FailurePolicy,
    cancel: CancellationToken,
}

impl Flow {
    /// Empty flow for `profile`, resolving stages against `registry`
    pub fn new(profile: impl Into<String>, registry: RegistryHandle) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            profile: profile.into(),
            steps: Vec::new(),
            registry,
            lifecycle: FlowLifecycle::new(),
            policy: FailurePolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Flow already in `Building`, as handed out by `start_flow`
    pub(crate) fn building(profile: impl Into<String>, registry: RegistryHandle) -> Self {
        Self {
            lifecycle: FlowLifecycle::started("start_flow"),
            ..Self::new(profile, registry)
        }
    }

    /// Empty → Building
    pub fn begin(&mut self) -> FlowResult<()> {
        self.lifecycle.advance(FlowState::Building, Some("start_flow"))
    }

    /// Append one bound invocation. Only legal while `Building`.
    pub fn push(&mut self, phase: Phase, stage: StageKind) -> FlowResult<()> {
        if self.lifecycle.current() != FlowState::Building {
            return Err(FlowError::IllegalTransition {
                from: self.lifecycle.current(),
                to: FlowState::Building,
            });
        }
        self.steps.push(FlowStep {
            position: self.steps.len() + 1,
            phase,
            stage,
        });
        Ok(())
    }

    /// Record that a build phase finished (Building → Building)
    pub fn mark_phase_built(&mut self, phase: Phase) -> FlowResult<()> {
        self.lifecycle.advance(FlowState::Building, Some(phase.as_str()))
    }

    /// Building → Sealed. The step sequence is immutable afterwards.
    pub fn seal(&mut self) -> FlowResult<()> {
        self.lifecycle.advance(FlowState::Sealed, Some("get_flow"))
    }

    /// Abort remaining steps when `token` is cancelled.
    ///
    /// Run options may be set at any point before `run`, including on a
    /// sealed flow. Sealing freezes the step sequence, not how it runs.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// How item failures are treated during `run`. See [`Flow::with_cancellation`].
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    pub fn steps(&self) -> &[FlowStep] {
        &self.steps
    }

    /// Stage kinds in execution order
    pub fn stages(&self) -> Vec<StageKind> {
        self.steps.iter().map(|s| s.stage).collect()
    }

    /// Stage kinds of one phase, in execution order
    pub fn phase_stages(&self, phase: Phase) -> Vec<StageKind> {
        self.steps
            .iter()
            .filter(|s| s.phase == phase)
            .map(|s| s.stage)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn state(&self) -> FlowState {
        self.lifecycle.current()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        self.lifecycle.transitions()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn registry(&self) -> &RegistryHandle {
        &self.registry
    }

    /// Execute every step once, in order, against `design`.
    ///
    /// Returns `Ok` with a report whether the flow completed or aborted;
    /// the report's status says which. `Err` means the flow was not in a
    /// runnable state (flows are single-use).
    pub fn run(&mut self, design: &mut Design) -> FlowResult<FlowReport> {
        let state = self.lifecycle.current();
        if state != FlowState::Sealed {
            return Err(FlowError::AlreadyExecuted {
                run_id: self.run_id.clone(),
                state,
            });
        }
        self.lifecycle.advance(FlowState::Executing, None)?;

        let started = Instant::now();
        let mut report = FlowReport::new(&self.run_id, &self.profile);

        tracing::info!(
            run_id = %self.run_id,
            profile = %self.profile,
            steps = self.steps.len(),
            policy = %self.policy,
            design = %design.name,
            "Flow started"
        );

        let mut stopped_at = None;
        for (idx, step) in self.steps.iter().enumerate() {
            if self.cancel.is_cancelled() {
                tracing::warn!(run_id = %self.run_id, step = %step, "Flow cancelled before step");
                report.abort(step, "cancelled before execution");
                stopped_at = Some(idx);
                break;
            }

            tracing::debug!(run_id = %self.run_id, step = %step, "Step started");
            let step_started = Instant::now();
            let result = self.registry.run_stage(step.stage, design);
            let elapsed = step_started.elapsed();

            match result {
                Ok(StageOutcome::Success) => {
                    report.add_step(StepRecord::new(step, StepOutcome::Completed, elapsed), vec![]);
                }
                Ok(StageOutcome::RecoverableItemFailure(failures)) => {
                    let count = failures.len();
                    if self.policy == FailurePolicy::ZeroTolerance {
                        tracing::error!(
                            run_id = %self.run_id,
                            step = %step,
                            item_failures = count,
                            "Item failures under zero-tolerance policy; aborting flow"
                        );
                        report.add_step(StepRecord::new(step, StepOutcome::Aborted, elapsed), failures);
                        report.abort(
                            step,
                            format!("{count} item failure(s) under zero_tolerance policy"),
                        );
                        stopped_at = Some(idx + 1);
                        break;
                    }
                    tracing::warn!(
                        run_id = %self.run_id,
                        step = %step,
                        item_failures = count,
                        "Step completed with item failures"
                    );
                    report.add_step(
                        StepRecord::new(step, StepOutcome::CompletedWithFailures, elapsed),
                        failures,
                    );
                }
                Err(err) => {
                    tracing::error!(run_id = %self.run_id, step = %step, error = %err, "Fatal stage error; aborting flow");
                    report.add_step(StepRecord::new(step, StepOutcome::Aborted, elapsed), vec![]);
                    report.abort(step, err.to_string());
                    stopped_at = Some(idx + 1);
                    break;
                }
            }
        }

        if let Some(rest) = stopped_at {
            for step in &self.steps[rest..] {
                report.add_step(StepRecord::not_run(step), vec![]);
            }
        }

        report.finalize(started.elapsed());
        let final_state = if report.is_completed() {
            FlowState::Completed
        } else {
            FlowState::Aborted
        };
        self.lifecycle.advance(final_state, None)?;

        tracing::info!(
            run_id = %self.run_id,
            summary = %report.summary(),
            lifecycle = %self.lifecycle.summary(),
            "Flow finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoutingConfig;
    use crate::registry::StageRegistry;
    use std::sync::Arc;

    fn sealed(stages: &[(Phase, StageKind)]) -> Flow {
        let registry = Arc::new(StageRegistry::with_defaults(&RoutingConfig::default()));
        let mut flow = Flow::new("test", registry);
        flow.begin().unwrap();
        for (phase, stage) in stages {
            flow.push(*phase, *stage).unwrap();
        }
        flow.seal().unwrap();
        flow
    }

    #[test]
    fn test_positions_follow_insertion_order() {
        let flow = sealed(&[
            (Phase::Placement, StageKind::GlobalPlacement),
            (Phase::Placement, StageKind::DetailedPlacement),
            (Phase::ClockTree, StageKind::ClockNetworkSynthesis),
        ]);
        let positions: Vec<usize> = flow.steps().iter().map(|s| s.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);
        assert_eq!(flow.state(), FlowState::Sealed);
    }

    #[test]
    fn test_push_after_seal_rejected() {
        let mut flow = sealed(&[(Phase::Placement, StageKind::GlobalPlacement)]);
        assert!(flow
            .push(Phase::Routing, StageKind::GlobalRouting)
            .is_err());
        assert_eq!(flow.len(), 1);
    }

    #[test]
    fn test_push_before_begin_rejected() {
        let registry = Arc::new(StageRegistry::with_defaults(&RoutingConfig::default()));
        let mut flow = Flow::new("test", registry);
        assert!(flow
            .push(Phase::Placement, StageKind::GlobalPlacement)
            .is_err());
    }

    #[test]
    fn test_run_is_single_use() {
        let mut flow = sealed(&[(Phase::Placement, StageKind::GlobalPlacement)]);
        let mut design = Design::synthetic("d", 4, 2);
        let report = flow.run(&mut design).unwrap();
        assert!(report.is_completed());
        assert_eq!(flow.state(), FlowState::Completed);

        let err = flow.run(&mut design).unwrap_err();
        assert!(matches!(
            err,
            FlowError::AlreadyExecuted {
                state: FlowState::Completed,
                ..
            }
        ));
    }

    #[test]
    fn test_unsealed_flow_cannot_run() {
        let registry = Arc::new(StageRegistry::with_defaults(&RoutingConfig::default()));
        let mut flow = Flow::new("test", registry);
        flow.begin().unwrap();
        let err = flow.run(&mut Design::new("d")).unwrap_err();
        assert!(matches!(
            err,
            FlowError::AlreadyExecuted {
                state: FlowState::Building,
                ..
            }
        ));
    }

    #[test]
    fn test_precondition_failure_aborts() {
        // detailed placement before global placement
        let mut flow = sealed(&[
            (Phase::Placement, StageKind::TimingOptimization),
            (Phase::Placement, StageKind::DetailedPlacement),
            (Phase::Placement, StageKind::AreaOptimization),
        ]);
        let mut design = Design::synthetic("d", 4, 2);
        let report = flow.run(&mut design).unwrap();

        assert_eq!(flow.state(), FlowState::Aborted);
        assert_eq!(report.aborted_at(), Some((2, StageKind::DetailedPlacement)));
        let outcomes: Vec<StepOutcome> = report.steps.iter().map(|s| s.outcome).collect();
        assert_eq!(
            outcomes,
            vec![StepOutcome::Completed, StepOutcome::Aborted, StepOutcome::NotRun]
        );
        // area pass never touched the design
        assert_eq!(design.metrics.total_area_um2, 1_000.0);
    }

    #[test]
    fn test_cancelled_flow_runs_nothing() {
        let token = CancellationToken::new();
        token.cancel();
        let mut flow = sealed(&[
            (Phase::Placement, StageKind::GlobalPlacement),
            (Phase::Placement, StageKind::DetailedPlacement),
        ])
        .with_cancellation(token);

        let report = flow.run(&mut Design::synthetic("d", 4, 2)).unwrap();
        assert_eq!(report.executed().count(), 0);
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.aborted_at(), Some((1, StageKind::GlobalPlacement)));
        assert_eq!(flow.state(), FlowState::Aborted);
    }

    #[test]
    fn test_run_options_leave_sealed_steps_intact() {
        let flow = sealed(&[
            (Phase::Placement, StageKind::GlobalPlacement),
            (Phase::Routing, StageKind::GlobalRouting),
        ]);
        let before = flow.steps().to_vec();
        let flow = flow
            .with_failure_policy(FailurePolicy::ZeroTolerance)
            .with_cancellation(CancellationToken::new());

        assert_eq!(flow.state(), FlowState::Sealed);
        assert_eq!(flow.steps(), before.as_slice());
        assert_eq!(flow.failure_policy(), FailurePolicy::ZeroTolerance);
    }

    #[test]
    fn test_transition_log_records_run() {
        let mut flow = sealed(&[(Phase::Placement, StageKind::GlobalPlacement)]);
        flow.run(&mut Design::synthetic("d", 2, 1)).unwrap();
        let states: Vec<FlowState> = flow.transitions().iter().map(|t| t.to).collect();
        assert_eq!(
            states,
            vec![
                FlowState::Building,
                FlowState::Sealed,
                FlowState::Executing,
                FlowState::Completed
            ]
        );
    }
}
