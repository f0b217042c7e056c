//! Routing stages
//!
//! Detailed routing is the escalation-backed stage: every unrouted net goes
//! through the rip-up-and-reroute chain, cheapest router first.
//!
//! ```text
//! greedy_maze (pins < greedy_max_pins)
//!     │ failure
//!     ▼
//! a_star      (pins < a_star_max_pins)
//!     │ failure
//!     ▼
//! ilp         (always, when enabled)
//!     │ failure
//!     ▼
//! ItemFailure (reported, flow continues)
//! ```

use crate::config::RoutingConfig;
use crate::design::{Design, Net, PlacementState};
use crate::error::StageError;
use crate::escalation::{ChainError, ChainStats, EscalationChain, Outcome, Resolution};
use crate::stage::{ItemFailure, Stage, StageKind, StageOutcome, StageResult};

/// Coarse routing: assigns a route guide to every net.
#[derive(Debug, Default)]
pub struct GlobalRouting {
    runs: u64,
}

impl Stage for GlobalRouting {
    fn kind(&self) -> StageKind {
        StageKind::GlobalRouting
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;

        if design.placement != PlacementState::Legalized {
            return Err(StageError::precondition(
                self.kind(),
                format!("placement is {:?}, expected Legalized", design.placement),
            ));
        }

        for net in &mut design.nets {
            net.global_route = true;
        }
        design.global_routed = true;
        tracing::info!(nets = design.nets.len(), "Global routing done");
        Ok(StageOutcome::Success)
    }

    fn runs(&self) -> u64 {
        self.runs
    }
}

/// Build a router tier. The tier marks the net routed on success and
/// counts every attempt, successful or not.
fn router_tier(name: &'static str, max_pins: Option<u32>) -> impl FnMut(&mut Net) -> Outcome + Send {
    move |net: &mut Net| {
        net.attempts += 1;
        let fits = match max_pins {
            Some(limit) => net.num_pins < limit,
            None => true,
        };
        if fits {
            net.routed = true;
            net.routed_by = Some(name.to_string());
        }
        tracing::trace!(net = %net.name, pins = net.num_pins, tier = name, routed = fits, "Route attempt");
        Outcome::from(fits)
    }
}

/// Build the default rip-up-and-reroute chain from routing config.
pub fn rip_up_reroute_chain(config: &RoutingConfig) -> EscalationChain<Net> {
    let mut chain = EscalationChain::new("rip_up_reroute")
        .add_handler("greedy_maze", 1, router_tier("greedy_maze", Some(config.greedy_max_pins)))
        .add_handler("a_star", 4, router_tier("a_star", Some(config.a_star_max_pins)));
    if config.ilp_enabled {
        chain = chain.add_handler("ilp", 16, router_tier("ilp", None));
    }
    chain
}

/// Detailed routing backed by an escalation chain per net.
#[derive(Debug)]
pub struct DetailedRouting {
    runs: u64,
    chain: EscalationChain<Net>,
}

impl DetailedRouting {
    pub fn new(config: &RoutingConfig) -> Self {
        // default tiers are non-empty and cost-ordered
        Self {
            runs: 0,
            chain: rip_up_reroute_chain(config),
        }
    }

    /// Use a custom chain (alternative routers, test doubles).
    ///
    /// The chain must be non-empty and ordered cheapest-first.
    pub fn with_chain(chain: EscalationChain<Net>) -> Result<Self, ChainError> {
        chain.validate()?;
        Ok(Self { runs: 0, chain })
    }

    /// Cumulative escalation statistics across every run
    pub fn chain_stats(&self) -> &ChainStats {
        self.chain.stats()
    }
}

impl Default for DetailedRouting {
    fn default() -> Self {
        Self::new(&RoutingConfig::default())
    }
}

impl Stage for DetailedRouting {
    fn kind(&self) -> StageKind {
        StageKind::DetailedRouting
    }

    fn run(&mut self, design: &mut Design) -> StageResult {
        self.runs += 1;

        if !design.global_routed {
            return Err(StageError::precondition(
                self.kind(),
                "no global routes; run global routing first",
            ));
        }

        let mut failures = Vec::new();
        let mut resolved = 0usize;
        for net in design.nets.iter_mut().filter(|n| !n.routed) {
            match self.chain.handle(net) {
                Resolution::Resolved { .. } => resolved += 1,
                Resolution::Unresolved { attempts } => {
                    tracing::warn!(
                        net = %net.name,
                        pins = net.num_pins,
                        tiers = attempts.len(),
                        "Net left unrouted after escalation"
                    );
                    failures.push(ItemFailure {
                        stage: self.kind(),
                        item: net.name.clone(),
                        attempts,
                    });
                }
            }
        }

        tracing::info!(
            resolved,
            unresolved = failures.len(),
            pass = self.runs,
            "Detailed routing done"
        );
        Ok(StageOutcome::from_failures(failures))
    }

    fn runs(&self) -> u64 {
        self.runs
    }

    fn escalation_stats(&self) -> Option<ChainStats> {
        Some(self.chain.stats().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::{DetailedPlacement, GlobalPlacement};

    fn globally_routed(nets: u32) -> Design {
        let mut design = Design::synthetic("r", 4, nets);
        GlobalPlacement::default().run(&mut design).unwrap();
        DetailedPlacement::default().run(&mut design).unwrap();
        GlobalRouting::default().run(&mut design).unwrap();
        design
    }

    #[test]
    fn test_default_chain_routes_everything() {
        let mut design = globally_routed(12);
        let mut stage = DetailedRouting::default();
        let outcome = stage.run(&mut design).unwrap();

        assert_eq!(outcome, StageOutcome::Success);
        assert_eq!(design.unrouted_nets(), 0);

        let by = |name: &str| design.nets.iter().find(|n| n.name == name).unwrap().routed_by.clone();
        assert_eq!(by("n0").as_deref(), Some("greedy_maze")); // 2 pins
        assert_eq!(by("n2").as_deref(), Some("a_star")); // 4 pins
        assert_eq!(by("n4").as_deref(), Some("ilp")); // 6 pins
    }

    #[test]
    fn test_attempts_count_every_tier() {
        let mut design = globally_routed(6);
        DetailedRouting::default().run(&mut design).unwrap();
        let attempts: Vec<u32> = design.nets.iter().map(|n| n.attempts).collect();
        // pins 2,3 → 1 attempt; 4,5 → 2; 6,7 → 3
        assert_eq!(attempts, vec![1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn test_without_ilp_large_nets_fail_recoverably() {
        let config = RoutingConfig {
            ilp_enabled: false,
            ..Default::default()
        };
        let mut design = globally_routed(6);
        let mut stage = DetailedRouting::new(&config);
        let outcome = stage.run(&mut design).unwrap();

        let failed: Vec<&str> = outcome
            .item_failures()
            .iter()
            .map(|f| f.item.as_str())
            .collect();
        assert_eq!(failed, vec!["n4", "n5"]);
        assert!(outcome.item_failures().iter().all(|f| f.attempts.len() == 2));
        assert_eq!(design.routed_nets(), 4);
    }

    #[test]
    fn test_rerun_only_touches_unrouted_nets() {
        let config = RoutingConfig {
            ilp_enabled: false,
            ..Default::default()
        };
        let mut design = globally_routed(6);
        let mut stage = DetailedRouting::new(&config);
        stage.run(&mut design).unwrap();
        stage.run(&mut design).unwrap();

        let stats = stage.chain_stats();
        // 6 nets first pass + 2 still-unrouted nets second pass
        assert_eq!(stats.items_handled, 8);
        assert_eq!(stats.unresolved, 4);
        assert_eq!(stage.runs(), 2);
    }

    #[test]
    fn test_requires_global_routing() {
        let mut design = Design::synthetic("r", 2, 2);
        let err = DetailedRouting::default().run(&mut design).unwrap_err();
        assert_eq!(err.stage(), StageKind::DetailedRouting);
    }

    #[test]
    fn test_custom_chain_must_escalate() {
        let backwards = EscalationChain::new("backwards")
            .add_handler("ilp", 16, router_tier("ilp", None))
            .add_handler("greedy_maze", 1, router_tier("greedy_maze", Some(4)));
        match DetailedRouting::with_chain(backwards) {
            Err(ChainError::OutOfOrder { handler, .. }) => assert_eq!(handler, "greedy_maze"),
            other => panic!("expected OutOfOrder, got {other:?}"),
        }

        let empty: EscalationChain<Net> = EscalationChain::new("empty");
        assert!(matches!(
            DetailedRouting::with_chain(empty),
            Err(ChainError::Empty(_))
        ));
    }

    #[test]
    fn test_custom_chain_accepted_when_ordered() {
        let chain = EscalationChain::new("maze_only")
            .add_handler("greedy_maze", 1, router_tier("greedy_maze", None));
        let mut stage = DetailedRouting::with_chain(chain).unwrap();
        let mut design = globally_routed(4);
        assert_eq!(stage.run(&mut design).unwrap(), StageOutcome::Success);
        assert_eq!(stage.chain_stats().handlers.len(), 1);
    }

    #[test]
    fn test_default_chain_is_ordered() {
        let chain = rip_up_reroute_chain(&RoutingConfig::default());
        assert!(chain.validate().is_ok());
        assert_eq!(chain.handler_names(), vec!["greedy_maze", "a_star", "ilp"]);
    }
}
