//! Scout Scenario - multi-task scenarios on top of Scout Core agents
//!
//! Provides:
//! - Tasks and resolved scenarios
//! - The scenario executor: sequential tasks, scenario-level retry,
//!   aggregate running/archived observables
//! - Dependency resolution over declared scenarios
//! - Device reset (initialize methods) on the initializer chain
//! - YAML project files
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_scenario::prelude::*;
//!
//! # async fn example(base: scout_core::AgentConfig) -> scout_scenario::Result<()> {
//! let graph = ProjectFile::load("scout.yaml")?.into_graph()?;
//! let scenario = graph.resolve("login", &base)?;
//!
//! let executor = ScenarioExecutor::new(ScenarioExecutorConfig::default(), tokio::runtime::Handle::current());
//! let outcome = executor.execute(scenario).await;
//! println!("{}: {}", outcome.scenario_id, outcome.succeeded);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod error;
pub mod executor;
pub mod graph;
pub mod initialize;
pub mod project;
pub mod task;

pub use error::{Result, ScenarioError};
pub use executor::{
    RunningInfo, ScenarioExecutor, ScenarioExecutorConfig, ScenarioOutcome, ScenarioReport,
    TaskAgent, TaskReport, DEFAULT_FINISH_DEBOUNCE,
};
pub use graph::{ScenarioDefinition, ScenarioGraph};
pub use initialize::{InitializeInterceptor, InitializeMethod};
pub use project::{run_all, ProjectFile};
pub use task::{Scenario, Task, DEFAULT_MAX_RETRY};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Scout Scenario
    pub use crate::{
        InitializeMethod, ProjectFile, RunningInfo, Scenario, ScenarioDefinition,
        ScenarioExecutor, ScenarioExecutorConfig, ScenarioGraph, ScenarioOutcome, Task,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
