//! Scenario dependency graph
//!
//! Every [`ScenarioDefinition`] may name one prerequisite scenario. Resolving
//! a scenario flattens its prerequisite chain, ancestors first, into the
//! task list of a [`Scenario`]. Ordering comes from a topological sort of
//! the whole graph, so a cycle anywhere fails resolution instead of looping.

use crate::error::{Result, ScenarioError};
use crate::initialize::{InitializeInterceptor, InitializeMethod};
use crate::task::{Scenario, Task, DEFAULT_MAX_RETRY};
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use scout_core::{AgentConfig, DEFAULT_MAX_STEP};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Declared scenario, as written in a project file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioDefinition {
    /// Unique id
    pub id: String,
    /// Goal handed to the agent
    pub goal: String,
    /// Prerequisite scenario id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency: Option<String>,
    /// Device reset before the agent steps
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub initialize_methods: Vec<InitializeMethod>,
    /// Retries after the first attempt
    #[serde(default = "default_max_retry")]
    pub max_retry: usize,
    /// Step budget per agent attempt
    #[serde(default = "default_max_step")]
    pub max_step: usize,
}

fn default_max_retry() -> usize {
    DEFAULT_MAX_RETRY
}

fn default_max_step() -> usize {
    DEFAULT_MAX_STEP
}

impl ScenarioDefinition {
    /// Definition with defaults and no prerequisite
    #[must_use]
    pub fn new(id: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            goal: goal.into(),
            dependency: None,
            initialize_methods: Vec::new(),
            max_retry: DEFAULT_MAX_RETRY,
            max_step: DEFAULT_MAX_STEP,
        }
    }

    /// With prerequisite scenario
    #[must_use]
    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    /// With device reset methods
    #[must_use]
    pub fn with_initialize_methods(mut self, methods: Vec<InitializeMethod>) -> Self {
        self.initialize_methods = methods;
        self
    }

    /// With retry budget
    #[inline]
    #[must_use]
    pub fn with_max_retry(mut self, max_retry: usize) -> Self {
        self.max_retry = max_retry;
        self
    }

    /// With step budget
    #[inline]
    #[must_use]
    pub fn with_max_step(mut self, max_step: usize) -> Self {
        self.max_step = max_step;
        self
    }

    /// Task for this definition, with its reset methods on the initializer chain
    #[must_use]
    pub fn to_task(&self, base_config: &AgentConfig) -> Task {
        let config = if self.initialize_methods.is_empty() {
            base_config.clone()
        } else {
            base_config
                .to_builder()
                .add_initializer(InitializeInterceptor::new(self.initialize_methods.clone()))
                .build()
        };
        Task::new(self.goal.clone(), config).with_max_step(self.max_step)
    }
}

/// Set of scenario definitions keyed by id
#[derive(Debug, Clone, Default)]
pub struct ScenarioGraph {
    definitions: Vec<ScenarioDefinition>,
    index: HashMap<String, usize>,
}

impl ScenarioGraph {
    /// Create empty graph
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition; ids must be unique
    pub fn add(&mut self, definition: ScenarioDefinition) -> Result<()> {
        if self.index.contains_key(&definition.id) {
            return Err(ScenarioError::DuplicateScenario(definition.id));
        }
        self.index
            .insert(definition.id.clone(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    /// Build from definitions, rejecting duplicate ids
    pub fn from_definitions(definitions: impl IntoIterator<Item = ScenarioDefinition>) -> Result<Self> {
        let mut graph = Self::new();
        for definition in definitions {
            graph.add(definition)?;
        }
        Ok(graph)
    }

    /// Definition by id
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ScenarioDefinition> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    /// Definitions in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &ScenarioDefinition> {
        self.definitions.iter()
    }

    /// Number of definitions
    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the graph has no definitions
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Check every dependency exists and the graph is acyclic
    pub fn validate(&self) -> Result<()> {
        self.topological_order().map(|_| ())
    }

    /// Definition indices with every prerequisite before its dependents
    fn topological_order(&self) -> Result<Vec<usize>> {
        let mut graph = DiGraphMap::<usize, ()>::new();
        for (i, definition) in self.definitions.iter().enumerate() {
            graph.add_node(i);
            if let Some(dependency) = &definition.dependency {
                let parent = self
                    .index
                    .get(dependency)
                    .copied()
                    .ok_or_else(|| ScenarioError::UnknownScenario(dependency.clone()))?;
                graph.add_edge(parent, i, ());
            }
        }
        toposort(&graph, None).map_err(|cycle| ScenarioError::CycleDetected {
            path: self.cycle_path(cycle.node_id()),
        })
    }

    /// Follow prerequisites from `start` until an id repeats
    fn cycle_path(&self, start: usize) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut path = Vec::new();
        let mut current = Some(start);
        while let Some(i) = current {
            let definition = &self.definitions[i];
            path.push(definition.id.clone());
            if !seen.insert(i) {
                break;
            }
            current = definition
                .dependency
                .as_ref()
                .and_then(|dependency| self.index.get(dependency).copied());
        }
        // trim the lead-in so the path starts and ends on the same id
        if let Some(last) = path.last().cloned() {
            if let Some(first) = path.iter().position(|id| *id == last) {
                path.drain(..first);
            }
        }
        path
    }

    /// Resolve a scenario into its run plan, prerequisites first
    ///
    /// The retry budget is the target scenario's; every ancestor contributes
    /// one task built from `base_config` plus its own reset methods.
    pub fn resolve(&self, id: &str, base_config: &AgentConfig) -> Result<Scenario> {
        let target = self
            .index
            .get(id)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownScenario(id.to_owned()))?;
        let order = self.topological_order()?;

        let mut chain = HashSet::new();
        let mut current = Some(target);
        while let Some(i) = current {
            chain.insert(i);
            current = self.definitions[i]
                .dependency
                .as_ref()
                .and_then(|dependency| self.index.get(dependency).copied());
        }

        let tasks: Vec<Task> = order
            .into_iter()
            .filter(|i| chain.contains(i))
            .map(|i| self.definitions[i].to_task(base_config))
            .collect();
        tracing::debug!(scenario = id, tasks = tasks.len(), "scenario resolved");

        Ok(Scenario::new(id, tasks).with_retry_budget(self.definitions[target].max_retry))
    }

    /// Resolve every scenario, in insertion order
    pub fn resolve_all(&self, base_config: &AgentConfig) -> Result<Vec<Scenario>> {
        self.definitions
            .iter()
            .map(|definition| self.resolve(&definition.id, base_config))
            .collect()
    }
}
