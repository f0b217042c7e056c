//! Escalation Chain: ordered recovery strategies for a single work item
//!
//! Handlers are tried in order, cheapest first, until one succeeds. There is
//! no back-edge: a `handle` call visits each handler at most once and always
//! moves toward higher capability.
//!
//! ```text
//! handle(item)
//!   ├─ greedy_maze → Success → Resolved { by: "greedy_maze" }
//!   ├─ greedy_maze → Failure, a_star → Success → Resolved { by: "a_star" }
//!   └─ every handler → Failure → Unresolved (terminal for this item only)
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use orchestrator::escalation::{EscalationChain, Outcome};
//!
//! let mut chain = EscalationChain::new("rip_up_reroute")
//!     .add_handler("greedy_maze", 1, |net: &mut Net| route_greedy(net))
//!     .add_handler("a_star", 4, |net: &mut Net| route_a_star(net))
//!     .add_handler("ilp", 16, |net: &mut Net| route_ilp(net));
//!
//! let resolution = chain.handle(&mut net);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result of one handler attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<bool> for Outcome {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

type AttemptFn<W> = Box<dyn FnMut(&mut W) -> Outcome + Send>;

/// One strategy in the chain.
///
/// The attempt function may mutate the item even when it fails (partial
/// progress); the next handler receives the same item.
pub struct EscalationHandler<W> {
    name: String,
    cost: u32,
    attempt_fn: AttemptFn<W>,
}

impl<W> EscalationHandler<W> {
    pub fn new<F>(name: &str, cost: u32, attempt_fn: F) -> Self
    where
        F: FnMut(&mut W) -> Outcome + Send + 'static,
    {
        Self {
            name: name.to_string(),
            cost,
            attempt_fn: Box::new(attempt_fn),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Relative cost; must be non-decreasing along the chain
    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn attempt(&mut self, item: &mut W) -> Outcome {
        (self.attempt_fn)(item)
    }
}

impl<W> std::fmt::Debug for EscalationHandler<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationHandler")
            .field("name", &self.name)
            .field("cost", &self.cost)
            .finish_non_exhaustive()
    }
}

/// A single recorded attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    pub handler: String,
    pub outcome: Outcome,
}

/// Final outcome of `handle` for one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum Resolution {
    /// A handler succeeded; later handlers were not consulted
    Resolved {
        by: String,
        attempts: Vec<AttemptRecord>,
    },
    /// Every handler failed; terminal failure for this item
    Unresolved { attempts: Vec<AttemptRecord> },
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    /// The ordered attempt trail
    pub fn attempts(&self) -> &[AttemptRecord] {
        match self {
            Self::Resolved { attempts, .. } | Self::Unresolved { attempts } => attempts,
        }
    }

    pub fn resolved_by(&self) -> Option<&str> {
        match self {
            Self::Resolved { by, .. } => Some(by),
            Self::Unresolved { .. } => None,
        }
    }
}

/// Cumulative counters for a single handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerStats {
    pub name: String,
    pub attempts: u64,
    pub successes: u64,
}

/// Cumulative counters for a chain, across every `handle` call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainStats {
    pub items_handled: u64,
    pub resolved: u64,
    pub unresolved: u64,
    pub handlers: Vec<HandlerStats>,
}

impl ChainStats {
    pub fn handler(&self, name: &str) -> Option<&HandlerStats> {
        self.handlers.iter().find(|h| h.name == name)
    }
}

/// Structural problems with a chain
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("escalation chain '{0}' has no handlers")]
    Empty(String),

    #[error("escalation chain '{chain}': handler '{handler}' (cost {cost}) is cheaper than its predecessor (cost {previous})")]
    OutOfOrder {
        chain: String,
        handler: String,
        cost: u32,
        previous: u32,
    },
}

/// Ordered chain of escalation handlers for work items of type `W`.
pub struct EscalationChain<W> {
    name: String,
    handlers: Vec<EscalationHandler<W>>,
    stats: ChainStats,
}

impl<W> EscalationChain<W> {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            handlers: Vec::new(),
            stats: ChainStats::default(),
        }
    }

    /// Append a handler built from a closure.
    pub fn add_handler<F>(self, name: &str, cost: u32, attempt_fn: F) -> Self
    where
        F: FnMut(&mut W) -> Outcome + Send + 'static,
    {
        self.with_handler(EscalationHandler::new(name, cost, attempt_fn))
    }

    /// Append a pre-built handler.
    pub fn with_handler(mut self, handler: EscalationHandler<W>) -> Self {
        self.stats.handlers.push(HandlerStats {
            name: handler.name.clone(),
            ..Default::default()
        });
        self.handlers.push(handler);
        self
    }

    /// Check the chain is non-empty and ordered cheapest-first.
    pub fn validate(&self) -> Result<(), ChainError> {
        if self.handlers.is_empty() {
            return Err(ChainError::Empty(self.name.clone()));
        }
        for pair in self.handlers.windows(2) {
            if pair[1].cost < pair[0].cost {
                return Err(ChainError::OutOfOrder {
                    chain: self.name.clone(),
                    handler: pair[1].name.clone(),
                    cost: pair[1].cost,
                    previous: pair[0].cost,
                });
            }
        }
        Ok(())
    }

    /// Run the item through the chain until a handler succeeds.
    ///
    /// Never panics or aborts on exhaustion; an exhausted chain yields
    /// [`Resolution::Unresolved`].
    pub fn handle(&mut self, item: &mut W) -> Resolution {
        let mut attempts = Vec::with_capacity(self.handlers.len());
        self.stats.items_handled += 1;

        for (idx, handler) in self.handlers.iter_mut().enumerate() {
            let outcome = handler.attempt(item);
            let stats = &mut self.stats.handlers[idx];
            stats.attempts += 1;
            attempts.push(AttemptRecord {
                handler: handler.name.clone(),
                outcome,
            });

            if outcome.is_success() {
                stats.successes += 1;
                self.stats.resolved += 1;
                if idx > 0 {
                    tracing::debug!(
                        chain = %self.name,
                        handler = %handler.name,
                        escalations = idx,
                        "Item resolved after escalation"
                    );
                }
                return Resolution::Resolved {
                    by: handler.name.clone(),
                    attempts,
                };
            }

            tracing::trace!(chain = %self.name, handler = %handler.name, "Attempt failed");
        }

        self.stats.unresolved += 1;
        tracing::debug!(
            chain = %self.name,
            tiers = self.handlers.len(),
            "All escalation tiers exhausted"
        );
        Resolution::Unresolved { attempts }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler_names(&self) -> Vec<&str> {
        self.handlers.iter().map(|h| h.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn stats(&self) -> &ChainStats {
        &self.stats
    }
}

impl<W> std::fmt::Debug for EscalationChain<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationChain")
            .field("name", &self.name)
            .field("handlers", &self.handlers)
            .field("stats", &self.stats)
            .finish()
    }
}
