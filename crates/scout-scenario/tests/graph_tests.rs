//! Scenario Graph Tests
//!
//! Dependency resolution, cycles and unknown ids.
//!
use pretty_assertions::assert_eq;
use scout_scenario::{ScenarioDefinition, ScenarioError, ScenarioGraph};
use scout_test_utils::{fake_config, FakeDevice, ScriptedDecisionProvider};

fn base() -> scout_core::AgentConfig {
    let device = FakeDevice::new();
    let provider = ScriptedDecisionProvider::achieving();
    fake_config(&device, &provider, &std::env::temp_dir())
}

fn shop_graph() -> ScenarioGraph {
    ScenarioGraph::from_definitions([
        ScenarioDefinition::new("pay", "Pay for the order")
            .with_dependency("cart")
            .with_max_retry(1)
            .with_max_step(20),
        ScenarioDefinition::new("open", "Open the shop"),
        ScenarioDefinition::new("cart", "Put an item in the cart").with_dependency("open"),
        ScenarioDefinition::new("profile", "Open the profile").with_dependency("open"),
    ])
    .unwrap()
}

#[test]
fn test_resolve_puts_ancestors_first() {
    let scenario = shop_graph().resolve("pay", &base()).unwrap();

    assert_eq!(scenario.id(), "pay");
    assert_eq!(
        scenario.goals().collect::<Vec<_>>(),
        vec!["Open the shop", "Put an item in the cart", "Pay for the order"]
    );
    assert_eq!(scenario.retry_budget(), 1);
    assert_eq!(scenario.tasks()[2].max_step, 20);
    assert_eq!(scenario.tasks()[0].max_step, scout_core::DEFAULT_MAX_STEP);
}

#[test]
fn test_resolve_root_has_single_task() {
    let scenario = shop_graph().resolve("open", &base()).unwrap();
    assert_eq!(scenario.goals().collect::<Vec<_>>(), vec!["Open the shop"]);
    assert_eq!(scenario.retry_budget(), scout_scenario::DEFAULT_MAX_RETRY);
}

#[test]
fn test_resolve_all_follows_insertion_order() {
    let scenarios = shop_graph().resolve_all(&base()).unwrap();
    let ids: Vec<&str> = scenarios.iter().map(|s| s.id()).collect();
    assert_eq!(ids, vec!["pay", "open", "cart", "profile"]);
    assert_eq!(scenarios[3].tasks().len(), 2);
}

#[test]
fn test_cycle_is_detected() {
    let graph = ScenarioGraph::from_definitions([
        ScenarioDefinition::new("root", "Root"),
        ScenarioDefinition::new("a", "A").with_dependency("b"),
        ScenarioDefinition::new("b", "B").with_dependency("a"),
    ])
    .unwrap();

    match graph.resolve("root", &base()) {
        Err(ScenarioError::CycleDetected { path }) => {
            assert_eq!(path.len(), 3);
            assert_eq!(path.first(), path.last());
            assert!(path.contains(&"a".to_string()));
            assert!(path.contains(&"b".to_string()));
        }
        other => panic!("expected cycle, got {other:?}"),
    }
    assert!(matches!(
        graph.validate(),
        Err(ScenarioError::CycleDetected { .. })
    ));
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let graph = ScenarioGraph::from_definitions([
        ScenarioDefinition::new("loop", "Loop").with_dependency("loop")
    ])
    .unwrap();

    match graph.validate() {
        Err(ScenarioError::CycleDetected { path }) => {
            assert_eq!(path, vec!["loop".to_string(), "loop".to_string()]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_unknown_ids_are_rejected() {
    let graph = shop_graph();
    assert!(matches!(
        graph.resolve("missing", &base()),
        Err(ScenarioError::UnknownScenario(id)) if id == "missing"
    ));

    let dangling = ScenarioGraph::from_definitions([
        ScenarioDefinition::new("login", "Log in").with_dependency("signup")
    ])
    .unwrap();
    assert!(matches!(
        dangling.resolve("login", &base()),
        Err(ScenarioError::UnknownScenario(id)) if id == "signup"
    ));
}

#[test]
fn test_duplicate_ids_are_rejected() {
    let mut graph = shop_graph();
    let err = graph
        .add(ScenarioDefinition::new("open", "Open it again"))
        .unwrap_err();
    assert!(matches!(err, ScenarioError::DuplicateScenario(id) if id == "open"));
    assert_eq!(graph.len(), 4);
}
