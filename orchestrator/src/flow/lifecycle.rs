//! Flow lifecycle: explicit states and legal transition guards.
//!
//! Every flow starts `Empty` and ends in `Completed` or `Aborted`. Each
//! transition is checked against a fixed table and recorded, so a finished
//! flow carries the full history of how it got there.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, FlowResult};

/// The set of flow states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    /// Created, no build has started.
    Empty,
    /// A builder is appending steps.
    Building,
    /// Handed out by the builder; the step sequence is frozen.
    Sealed,
    /// `run` is iterating the steps.
    Executing,
    /// Every step ran. Terminal.
    Completed,
    /// Stopped early. Terminal.
    Aborted,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted)
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Building => write!(f, "Building"),
            Self::Sealed => write!(f, "Sealed"),
            Self::Executing => write!(f, "Executing"),
            Self::Completed => write!(f, "Completed"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}

/// Legal transitions between flow states.
///
/// ```text
/// Empty     → Building
/// Building  → Building | Sealed
/// Sealed    → Executing
/// Executing → Completed | Aborted
/// ```
fn is_legal_transition(from: FlowState, to: FlowState) -> bool {
    use FlowState::*;

    matches!(
        (from, to),
        (Empty, Building)
            // one self-transition per build phase
            | (Building, Building)
            | (Building, Sealed)
            | (Sealed, Executing)
            | (Executing, Completed)
            | (Executing, Aborted)
    )
}

/// A single recorded state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: FlowState,
    pub to: FlowState,
    /// Milliseconds since the lifecycle was created.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Current state plus the transition log.
#[derive(Debug, Clone)]
pub struct FlowLifecycle {
    current: FlowState,
    created_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl FlowLifecycle {
    pub fn new() -> Self {
        Self {
            current: FlowState::Empty,
            created_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    /// Lifecycle that has already taken Empty → Building
    pub fn started(reason: &str) -> Self {
        let mut lc = Self::new();
        lc.record(FlowState::Building, Some(reason));
        lc
    }

    pub fn current(&self) -> FlowState {
        self.current
    }

    /// Move to `to`, or fail with [`FlowError::IllegalTransition`].
    pub fn advance(&mut self, to: FlowState, reason: Option<&str>) -> FlowResult<()> {
        if !is_legal_transition(self.current, to) {
            return Err(FlowError::IllegalTransition {
                from: self.current,
                to,
            });
        }

        self.record(to, reason);
        Ok(())
    }

    fn record(&mut self, to: FlowState, reason: Option<&str>) {
        tracing::trace!(from = %self.current, to = %to, reason, "Flow state transition");

        self.transitions.push(TransitionRecord {
            from: self.current,
            to,
            elapsed_ms: self.created_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.current = to;
    }

    pub fn is_terminal(&self) -> bool {
        self.current.is_terminal()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Compact history, e.g. `Empty → Building → Sealed (2 transitions)`
    pub fn summary(&self) -> String {
        let mut states = vec![FlowState::Empty.to_string()];
        states.extend(self.transitions.iter().map(|t| t.to.to_string()));
        states.dedup();
        format!(
            "{} ({} transitions)",
            states.join(" → "),
            self.transitions.len()
        )
    }
}

impl Default for FlowLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn executing() -> FlowLifecycle {
        let mut lc = FlowLifecycle::new();
        lc.advance(FlowState::Building, None).unwrap();
        lc.advance(FlowState::Sealed, None).unwrap();
        lc.advance(FlowState::Executing, None).unwrap();
        lc
    }

    #[test]
    fn test_initial_state() {
        let lc = FlowLifecycle::new();
        assert_eq!(lc.current(), FlowState::Empty);
        assert!(!lc.is_terminal());
        assert!(lc.transitions().is_empty());
    }

    #[test]
    fn test_happy_path() {
        let mut lc = FlowLifecycle::new();
        lc.advance(FlowState::Building, Some("start_flow")).unwrap();
        lc.advance(FlowState::Building, Some("placement")).unwrap();
        lc.advance(FlowState::Building, Some("clock_tree")).unwrap();
        lc.advance(FlowState::Building, Some("routing")).unwrap();
        lc.advance(FlowState::Sealed, None).unwrap();
        lc.advance(FlowState::Executing, None).unwrap();
        lc.advance(FlowState::Completed, None).unwrap();

        assert!(lc.is_terminal());
        assert_eq!(lc.transitions().len(), 7);
        assert_eq!(lc.transitions()[1].reason.as_deref(), Some("placement"));
    }

    #[test]
    fn test_started_is_building() {
        let mut lc = FlowLifecycle::started("start_flow");
        assert_eq!(lc.current(), FlowState::Building);
        assert_eq!(lc.transitions().len(), 1);
        assert_eq!(lc.transitions()[0].from, FlowState::Empty);
        assert_eq!(lc.transitions()[0].reason.as_deref(), Some("start_flow"));
        lc.advance(FlowState::Sealed, None).unwrap();
    }

    #[test]
    fn test_executing_can_abort() {
        let mut lc = executing();
        lc.advance(FlowState::Aborted, Some("fatal")).unwrap();
        assert_eq!(lc.current(), FlowState::Aborted);
    }

    #[test]
    fn test_no_transition_returns_to_earlier_state() {
        let mut lc = executing();
        lc.advance(FlowState::Completed, None).unwrap();
        for to in [
            FlowState::Empty,
            FlowState::Building,
            FlowState::Sealed,
            FlowState::Executing,
            FlowState::Aborted,
        ] {
            let err = lc.advance(to, None).unwrap_err();
            assert_eq!(
                err,
                FlowError::IllegalTransition {
                    from: FlowState::Completed,
                    to
                }
            );
        }
    }

    #[test]
    fn test_cannot_skip_sealing() {
        let mut lc = FlowLifecycle::new();
        lc.advance(FlowState::Building, None).unwrap();
        assert!(lc.advance(FlowState::Executing, None).is_err());
        assert!(lc.advance(FlowState::Empty, None).is_err());
    }

    #[test]
    fn test_sealed_cannot_rebuild() {
        let mut lc = FlowLifecycle::new();
        lc.advance(FlowState::Building, None).unwrap();
        lc.advance(FlowState::Sealed, None).unwrap();
        assert!(lc.advance(FlowState::Building, None).is_err());
        assert!(lc.advance(FlowState::Completed, None).is_err());
    }

    #[test]
    fn test_summary_collapses_building() {
        let mut lc = FlowLifecycle::new();
        lc.advance(FlowState::Building, None).unwrap();
        lc.advance(FlowState::Building, None).unwrap();
        lc.advance(FlowState::Sealed, None).unwrap();
        assert_eq!(lc.summary(), "Empty → Building → Sealed (3 transitions)");
    }

    #[test]
    fn test_transition_record_serde() {
        let record = TransitionRecord {
            from: FlowState::Executing,
            to: FlowState::Aborted,
            elapsed_ms: 42,
            reason: Some("cancelled".into()),
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"executing\""));
        let restored: TransitionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);
    }
}
