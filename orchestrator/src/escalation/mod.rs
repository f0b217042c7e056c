//! Escalating fault recovery
//!
//! An [`EscalationChain`] tries a work item against an ordered list of
//! handlers, cheapest first, stopping at the first success. Exhausting the
//! chain is a terminal failure for that one item, never for the caller.
//!
//! # Rip-up-and-reroute ladder
//!
//! ```text
//! greedy_maze (cost 1)  nets with few pins
//!     │ Failure
//!     ▼
//! a_star      (cost 4)  mid-size nets
//!     │ Failure
//!     ▼
//! ilp         (cost 16) always succeeds (optional tier)
//!     │ Failure / absent
//!     ▼
//! Unresolved → ItemFailure in the stage outcome
//! ```

pub mod chain;

pub use chain::{
    AttemptRecord, ChainError, ChainStats, EscalationChain, EscalationHandler, HandlerStats,
    Outcome, Resolution,
};
