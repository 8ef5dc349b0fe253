//! Tasks and resolved scenarios

use scout_core::{AgentConfig, CommandVocabulary, DEFAULT_MAX_STEP};

/// Default number of retries after the first attempt of a scenario
pub const DEFAULT_MAX_RETRY: usize = 3;

/// One goal to hand to one agent
#[derive(Debug, Clone)]
pub struct Task {
    /// Natural-language goal
    pub goal: String,
    /// Step budget of each agent attempt
    pub max_step: usize,
    /// Config of the agent created for this task
    pub agent_config: AgentConfig,
}

impl Task {
    /// Task with the default step budget
    #[must_use]
    pub fn new(goal: impl Into<String>, agent_config: AgentConfig) -> Self {
        Self {
            goal: goal.into(),
            max_step: DEFAULT_MAX_STEP,
            agent_config,
        }
    }

    /// With step budget
    #[inline]
    #[must_use]
    pub fn with_max_step(mut self, max_step: usize) -> Self {
        self.max_step = max_step;
        self
    }

    /// Commands the agent may choose from, per the config's form factor
    #[must_use]
    pub fn vocabulary(&self) -> CommandVocabulary {
        CommandVocabulary::for_form_factor(self.agent_config.form_factor())
    }
}

/// Resolved, dependency-ordered run plan
#[derive(Debug, Clone)]
pub struct Scenario {
    id: String,
    tasks: Vec<Task>,
    retry_budget: usize,
}

impl Scenario {
    /// Create a scenario from tasks in run order
    #[must_use]
    pub fn new(id: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self {
            id: id.into(),
            tasks,
            retry_budget: DEFAULT_MAX_RETRY,
        }
    }

    /// With number of retries after the first attempt
    #[inline]
    #[must_use]
    pub fn with_retry_budget(mut self, retry_budget: usize) -> Self {
        self.retry_budget = retry_budget;
        self
    }

    /// Id of the scenario this plan was resolved for
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Tasks in run order
    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Retries allowed after the first attempt
    #[inline]
    #[must_use]
    pub fn retry_budget(&self) -> usize {
        self.retry_budget
    }

    /// Goals in run order
    pub fn goals(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.goal.as_str())
    }
}
