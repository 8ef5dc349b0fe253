//! YAML project files
//!
//! ```yaml
//! scenarios:
//!   - id: open-app
//!     goal: Open the app and dismiss the onboarding
//!     initializeMethods: [{ type: ClearAppData, appId: com.example }]
//!   - id: login
//!     goal: Log in with the test account
//!     dependency: open-app
//!     maxRetry: 2
//!     maxStep: 15
//! ```

use crate::error::Result;
use crate::executor::{ScenarioExecutor, ScenarioExecutorConfig, ScenarioOutcome};
use crate::graph::{ScenarioDefinition, ScenarioGraph};
use scout_core::AgentConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::runtime::Handle;

/// Parsed project file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFile {
    /// Declared scenarios
    #[serde(default)]
    pub scenarios: Vec<ScenarioDefinition>,
}

impl ProjectFile {
    /// Parse YAML text
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Read and parse a project file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)?;
        let project = Self::from_yaml_str(&yaml)?;
        tracing::info!(
            path = %path.display(),
            scenarios = project.scenarios.len(),
            "project file loaded"
        );
        Ok(project)
    }

    /// Serialize back to YAML
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Build and validate the dependency graph
    pub fn into_graph(self) -> Result<ScenarioGraph> {
        let graph = ScenarioGraph::from_definitions(self.scenarios)?;
        graph.validate()?;
        Ok(graph)
    }
}

/// Resolve every scenario of a graph and run each on its own executor
///
/// Scenarios run concurrently; each executor sequences its own tasks.
/// Resolution errors are returned before any agent starts.
pub async fn run_all(
    graph: &ScenarioGraph,
    base_config: &AgentConfig,
    executor_config: ScenarioExecutorConfig,
    handle: Handle,
) -> Result<Vec<ScenarioOutcome>> {
    let scenarios = graph.resolve_all(base_config)?;
    let runs = scenarios.into_iter().map(|scenario| {
        let executor = ScenarioExecutor::new(executor_config.clone(), handle.clone());
        async move { executor.execute(scenario).await }
    });
    Ok(futures::future::join_all(runs).await)
}
