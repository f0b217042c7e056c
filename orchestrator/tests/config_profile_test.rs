//! Integration tests for custom effort profiles loaded from config

use std::io::Write;
use std::sync::Arc;

use orchestrator::{
    Design, FailurePolicy, FlowDirector, OrchestratorConfig, Phase, ProfileFlowBuilder,
    StageKind, StageRegistry,
};

const CONFIG: &str = r#"
failure_policy = "tolerant"

[routing]
ilp_enabled = true

[[profile]]
name = "signoff"
placement = [
    { stage = "global_placement" },
    { stage = "detailed_placement" },
    { stage = "timing_optimization", repeat = 3 },
    { stage = "area_optimization" },
]
clock_tree = [{ stage = "clock_network_synthesis" }]
routing = [
    { stage = "global_routing" },
    { stage = "detailed_routing" },
    { stage = "timing_optimization", repeat = 2 },
]
"#;

fn load() -> OrchestratorConfig {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{CONFIG}").unwrap();
    OrchestratorConfig::load(file.path()).unwrap()
}

/// Test: A profile defined only in TOML builds and runs like a built-in
#[test]
fn test_custom_profile_from_toml() {
    let config = load();
    let profiles = config.profile_set().unwrap();
    assert_eq!(profiles.names(), vec!["low", "medium", "high", "signoff"]);

    let profile = profiles.get("signoff").unwrap().clone();
    let registry = Arc::new(StageRegistry::with_defaults(&config.routing));
    let builder = ProfileFlowBuilder::new(profile, registry.clone())
        .with_failure_policy(config.failure_policy);
    let mut flow = FlowDirector::new(Box::new(builder)).create_flow().unwrap();

    assert_eq!(flow.len(), 11);
    assert_eq!(
        flow.phase_stages(Phase::Placement),
        vec![
            StageKind::GlobalPlacement,
            StageKind::DetailedPlacement,
            StageKind::TimingOptimization,
            StageKind::TimingOptimization,
            StageKind::TimingOptimization,
            StageKind::AreaOptimization,
        ]
    );
    assert_eq!(flow.failure_policy(), FailurePolicy::Tolerant);

    let mut design = Design::synthetic("custom", 20, 10);
    let report = flow.run(&mut design).unwrap();
    assert!(report.is_completed(), "{}", report.summary());
    assert_eq!(registry.runs(StageKind::TimingOptimization).unwrap(), 5);
    assert!(design.metrics.total_area_um2 < 1_000.0);
}

/// Test: Unknown profile names are usage errors
#[test]
fn test_unknown_profile_name() {
    let config = load();
    let err = config.profile_set().unwrap().get("turbo").unwrap_err();
    assert_eq!(err.to_string(), "Unknown effort profile: turbo");
}
