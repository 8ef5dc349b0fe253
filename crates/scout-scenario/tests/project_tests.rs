//! Project File Tests
//!
//! YAML parsing, defaults, loading from disk and whole-project runs.
//!
use pretty_assertions::assert_eq;
use scout_scenario::{
    run_all, InitializeMethod, ProjectFile, ScenarioDefinition, ScenarioError,
    ScenarioExecutorConfig,
};
use scout_test_utils::{fake_config, FakeDevice, ScriptedDecisionProvider};
use std::io::Write;
use std::time::Duration;
use tokio::runtime::Handle;

const PROJECT: &str = r"
scenarios:
  - id: open-app
    goal: Open the app and dismiss the onboarding
    initializeMethods:
      - { type: ClearAppData, appId: com.example }
      - { type: LaunchApp, appId: com.example }
  - id: login
    goal: Log in with the test account
    dependency: open-app
    maxRetry: 2
    maxStep: 15
";

#[test]
fn test_parse_with_defaults() {
    let project = ProjectFile::from_yaml_str(PROJECT).unwrap();

    assert_eq!(project.scenarios.len(), 2);
    let open = &project.scenarios[0];
    assert_eq!(open.max_retry, 3);
    assert_eq!(open.max_step, 10);
    assert_eq!(open.dependency, None);
    assert_eq!(
        open.initialize_methods,
        vec![
            InitializeMethod::ClearAppData {
                app_id: "com.example".into()
            },
            InitializeMethod::LaunchApp {
                app_id: "com.example".into()
            },
        ]
    );

    let login = &project.scenarios[1];
    assert_eq!(login.dependency.as_deref(), Some("open-app"));
    assert_eq!(login.max_retry, 2);
    assert_eq!(login.max_step, 15);
    assert!(login.initialize_methods.is_empty());
}

#[test]
fn test_yaml_survives_rewrite() {
    let project = ProjectFile::from_yaml_str(PROJECT).unwrap();
    let again = ProjectFile::from_yaml_str(&project.to_yaml_string().unwrap()).unwrap();
    assert_eq!(project, again);
}

#[test]
fn test_load_from_disk() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(PROJECT.as_bytes()).unwrap();

    let graph = ProjectFile::load(file.path()).unwrap().into_graph().unwrap();
    assert_eq!(graph.len(), 2);
    assert_eq!(
        graph.get("login").map(|d| d.goal.as_str()),
        Some("Log in with the test account")
    );
}

#[test]
fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ProjectFile::load(dir.path().join("missing.yaml")),
        Err(ScenarioError::Io(_))
    ));
    assert!(matches!(
        ProjectFile::from_yaml_str("scenarios: [ { id: a } ]"),
        Err(ScenarioError::Parse(_))
    ));
}

#[test]
fn test_into_graph_validates() {
    let duplicate = ProjectFile {
        scenarios: vec![
            ScenarioDefinition::new("a", "A"),
            ScenarioDefinition::new("a", "A again"),
        ],
    };
    assert!(matches!(
        duplicate.into_graph(),
        Err(ScenarioError::DuplicateScenario(_))
    ));

    let cyclic = ProjectFile {
        scenarios: vec![
            ScenarioDefinition::new("a", "A").with_dependency("b"),
            ScenarioDefinition::new("b", "B").with_dependency("a"),
        ],
    };
    assert!(matches!(
        cyclic.into_graph(),
        Err(ScenarioError::CycleDetected { .. })
    ));
}

#[tokio::test]
async fn test_run_whole_project() {
    let dir = tempfile::tempdir().unwrap();
    let device = FakeDevice::new();
    let provider = ScriptedDecisionProvider::achieving();
    let base = fake_config(&device, &provider, dir.path());
    let graph = ProjectFile::from_yaml_str(PROJECT)
        .unwrap()
        .into_graph()
        .unwrap();

    let outcomes = run_all(
        &graph,
        &base,
        ScenarioExecutorConfig::default().with_finish_debounce(Duration::from_millis(10)),
        Handle::current(),
    )
    .await
    .unwrap();

    let ids: Vec<&str> = outcomes.iter().map(|o| o.scenario_id.as_str()).collect();
    assert_eq!(ids, vec!["open-app", "login"]);
    assert!(outcomes.iter().all(|o| o.succeeded && o.attempts == 1));
    // open-app alone, then open-app again before login
    assert_eq!(provider.calls(), 3);
}
