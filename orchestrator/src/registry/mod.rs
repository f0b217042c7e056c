//! Stage Registry: the canonical, shared stage instances
//!
//! Holds exactly one instance per [`StageKind`]. Every flow built against a
//! registry resolves its steps to these same instances, so stage-local state
//! (run counters, escalation statistics) is shared across flows.
//!
//! The registry is constructed explicitly and handed to builders as a
//! [`RegistryHandle`]. [`RegistryCell`] gives the top-level orchestrator a
//! construct-on-first-use holder that is safe under concurrent first access.
//!
//! Each entry sits behind its own mutex: two flows executing on different
//! threads serialize on a stage they both use, never on the whole registry.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::config::RoutingConfig;
use crate::design::Design;
use crate::error::StageError;
use crate::escalation::ChainStats;
use crate::stage::{
    AreaOptimization, ClockNetworkSynthesis, DetailedPlacement, DetailedRouting, GlobalPlacement,
    GlobalRouting, PowerOptimization, Stage, StageKind, StageResult, TimingOptimization,
};

/// A stage instance shared between flows
pub type SharedStage = Arc<Mutex<Box<dyn Stage>>>;

/// Shared, read-mostly handle to a registry
pub type RegistryHandle = Arc<StageRegistry>;

fn default_stage(kind: StageKind, routing: &RoutingConfig) -> Box<dyn Stage> {
    match kind {
        StageKind::GlobalPlacement => Box::new(GlobalPlacement::default()),
        StageKind::DetailedPlacement => Box::new(DetailedPlacement::default()),
        StageKind::ClockNetworkSynthesis => Box::new(ClockNetworkSynthesis::default()),
        StageKind::GlobalRouting => Box::new(GlobalRouting::default()),
        StageKind::DetailedRouting => Box::new(DetailedRouting::new(routing)),
        StageKind::TimingOptimization => Box::new(TimingOptimization::default()),
        StageKind::PowerOptimization => Box::new(PowerOptimization::default()),
        StageKind::AreaOptimization => Box::new(AreaOptimization::default()),
    }
}

/// One instance per stage kind
pub struct StageRegistry {
    entries: BTreeMap<StageKind, SharedStage>,
}

impl StageRegistry {
    /// Registry populated with the default stage implementations
    pub fn with_defaults(routing: &RoutingConfig) -> Self {
        Self::builder(routing).build()
    }

    /// Start a registry that can replace individual stages before freezing
    pub fn builder(routing: &RoutingConfig) -> StageRegistryBuilder {
        StageRegistryBuilder {
            routing: routing.clone(),
            overrides: BTreeMap::new(),
        }
    }

    /// The canonical instance for a kind
    pub fn get(&self, kind: StageKind) -> &SharedStage {
        // a built registry always has every kind
        &self.entries[&kind]
    }

    /// Lock the stage and run it once against the design.
    pub fn run_stage(&self, kind: StageKind, design: &mut Design) -> StageResult {
        let mut stage = self
            .get(kind)
            .lock()
            .map_err(|_| StageError::LockPoisoned { stage: kind })?;
        stage.run(design)
    }

    /// Cumulative `run` count of the canonical instance
    pub fn runs(&self, kind: StageKind) -> Result<u64, StageError> {
        self.inspect(kind, |stage| stage.runs())
    }

    /// Cumulative escalation counters of the canonical instance, if it has a chain
    pub fn escalation_stats(&self, kind: StageKind) -> Result<Option<ChainStats>, StageError> {
        self.inspect(kind, |stage| stage.escalation_stats())
    }

    fn inspect<R>(&self, kind: StageKind, f: impl FnOnce(&dyn Stage) -> R) -> Result<R, StageError> {
        let stage = self
            .get(kind)
            .lock()
            .map_err(|_| StageError::LockPoisoned { stage: kind })?;
        Ok(f(stage.as_ref()))
    }

    pub fn kinds(&self) -> impl Iterator<Item = StageKind> + '_ {
        self.entries.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for StageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageRegistry")
            .field("kinds", &self.entries.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for a [`StageRegistry`] with replaced stages
pub struct StageRegistryBuilder {
    routing: RoutingConfig,
    overrides: BTreeMap<StageKind, Box<dyn Stage>>,
}

impl StageRegistryBuilder {
    /// Replace the default implementation for `stage.kind()`.
    ///
    /// Replacing the same kind twice keeps the last one.
    pub fn replace(mut self, stage: Box<dyn Stage>) -> Self {
        let kind = stage.kind();
        if self.overrides.insert(kind, stage).is_some() {
            tracing::debug!(stage = %kind, "Stage replaced twice; keeping the last");
        }
        self
    }

    /// Freeze the registry, filling every kind not replaced with its default.
    pub fn build(mut self) -> StageRegistry {
        let entries = StageKind::ALL
            .iter()
            .map(|&kind| {
                let stage = self
                    .overrides
                    .remove(&kind)
                    .unwrap_or_else(|| default_stage(kind, &self.routing));
                (kind, Arc::new(Mutex::new(stage)))
            })
            .collect();
        StageRegistry { entries }
    }
}

type RegistryFactory = Box<dyn Fn() -> StageRegistry + Send + Sync>;

/// Construct-on-first-use holder for the shared registry.
///
/// Owned by the top-level orchestrator and passed around by reference.
/// Under concurrent first access exactly one caller runs the factory; all
/// callers observe the same instance.
pub struct RegistryCell {
    cell: OnceLock<RegistryHandle>,
    factory: RegistryFactory,
}

impl RegistryCell {
    /// Cell that builds the default registry for this routing config
    pub fn new(routing: RoutingConfig) -> Self {
        Self::with_factory(move || StageRegistry::with_defaults(&routing))
    }

    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn() -> StageRegistry + Send + Sync + 'static,
    {
        Self {
            cell: OnceLock::new(),
            factory: Box::new(factory),
        }
    }

    /// The shared registry, constructing it on first call
    pub fn get(&self) -> RegistryHandle {
        self.cell
            .get_or_init(|| {
                tracing::info!("Constructing stage registry");
                Arc::new((self.factory)())
            })
            .clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl Default for RegistryCell {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::StageOutcome;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingStage {
        kind: StageKind,
        runs: u64,
    }

    impl Stage for CountingStage {
        fn kind(&self) -> StageKind {
            self.kind
        }

        fn run(&mut self, _design: &mut Design) -> StageResult {
            self.runs += 1;
            Ok(StageOutcome::Success)
        }

        fn runs(&self) -> u64 {
            self.runs
        }
    }

    #[test]
    fn test_defaults_cover_every_kind() {
        let registry = StageRegistry::with_defaults(&RoutingConfig::default());
        assert_eq!(registry.len(), StageKind::ALL.len());
        let kinds: Vec<StageKind> = registry.kinds().collect();
        assert_eq!(kinds, StageKind::ALL.to_vec());
        for kind in StageKind::ALL {
            assert_eq!(registry.get(kind).lock().unwrap().kind(), kind);
        }
    }

    #[test]
    fn test_get_returns_same_instance() {
        let registry = StageRegistry::with_defaults(&RoutingConfig::default());
        let a = registry.get(StageKind::TimingOptimization).clone();
        let b = registry.get(StageKind::TimingOptimization).clone();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_replace_stage() {
        let registry = StageRegistry::builder(&RoutingConfig::default())
            .replace(Box::new(CountingStage {
                kind: StageKind::AreaOptimization,
                runs: 0,
            }))
            .build();

        let mut design = Design::new("d");
        registry
            .run_stage(StageKind::AreaOptimization, &mut design)
            .unwrap();
        assert_eq!(registry.runs(StageKind::AreaOptimization).unwrap(), 1);
        // the real area pass never ran
        assert_eq!(design.metrics.total_area_um2, 1_000.0);
    }

    #[test]
    fn test_escalation_stats_only_for_routing() {
        let registry = StageRegistry::with_defaults(&RoutingConfig::default());
        assert!(registry
            .escalation_stats(StageKind::DetailedRouting)
            .unwrap()
            .is_some());
        assert!(registry
            .escalation_stats(StageKind::GlobalPlacement)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_cell_constructs_once() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let cell = RegistryCell::with_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            StageRegistry::with_defaults(&RoutingConfig::default())
        });

        assert!(!cell.is_initialized());
        let a = cell.get();
        let b = cell.get();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(cell.is_initialized());
        assert_eq!(built.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cell_concurrent_first_access() {
        let built = Arc::new(AtomicUsize::new(0));
        let counter = built.clone();
        let cell = Arc::new(RegistryCell::with_factory(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(5));
            StageRegistry::with_defaults(&RoutingConfig::default())
        }));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cell = cell.clone();
                std::thread::spawn(move || cell.get())
            })
            .collect();
        let registries: Vec<RegistryHandle> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(built.load(Ordering::SeqCst), 1);
        assert!(registries.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn test_poisoned_stage_is_fatal() {
        let registry = Arc::new(StageRegistry::with_defaults(&RoutingConfig::default()));
        let poisoner = registry.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.get(StageKind::PowerOptimization).lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let mut design = Design::new("d");
        let err = registry
            .run_stage(StageKind::PowerOptimization, &mut design)
            .unwrap_err();
        assert_eq!(
            err,
            StageError::LockPoisoned {
                stage: StageKind::PowerOptimization
            }
        );
    }
}
