//! Integration tests for the shared stage registry across threads

use std::sync::Arc;
use std::thread;

use orchestrator::{
    Design, EffortLevel, FlowDirector, Phase, RegistryCell, RegistryHandle, RoutingConfig,
    StageKind,
};

/// Test: get() from many threads yields one registry
#[test]
fn test_registry_singleton_across_threads() {
    let cell = Arc::new(RegistryCell::new(RoutingConfig::default()));
    let handles: Vec<_> = (0..16)
        .map(|_| {
            let cell = cell.clone();
            thread::spawn(move || cell.get())
        })
        .collect();

    let registries: Vec<RegistryHandle> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let first = &registries[0];
    assert!(registries.iter().all(|r| Arc::ptr_eq(r, first)));
    for kind in StageKind::ALL {
        assert!(Arc::ptr_eq(first.get(kind), cell.get().get(kind)));
    }
}

/// Test: Flows built and run concurrently serialize on shared stages without losing runs
#[test]
fn test_concurrent_flows_share_stage_state() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();

    let threads = 6;
    let cell = Arc::new(RegistryCell::new(RoutingConfig::default()));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let cell = cell.clone();
            thread::spawn(move || {
                let mut director =
                    FlowDirector::for_profile(EffortLevel::Medium.profile(), cell.get());
                let mut flow = director.create_flow().unwrap();
                let mut design = Design::synthetic(format!("d{i}"), 16, 12);
                let report = flow.run(&mut design).unwrap();
                assert!(report.is_completed(), "{}", report.summary());
                design.unrouted_nets()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 0);
    }

    let registry = cell.get();
    let medium = EffortLevel::Medium.profile();
    let timing_per_flow = Phase::ORDER
        .iter()
        .flat_map(|p| medium.expand(*p))
        .filter(|k| *k == StageKind::TimingOptimization)
        .count() as u64;

    assert_eq!(
        registry.runs(StageKind::TimingOptimization).unwrap(),
        timing_per_flow * threads as u64
    );
    assert_eq!(
        registry.runs(StageKind::GlobalPlacement).unwrap(),
        threads as u64
    );

    let stats = registry
        .escalation_stats(StageKind::DetailedRouting)
        .unwrap()
        .unwrap();
    assert_eq!(stats.items_handled, 12 * threads as u64);
    assert_eq!(stats.unresolved, 0);
}
