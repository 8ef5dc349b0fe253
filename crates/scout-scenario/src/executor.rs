//! Scenario executor
//!
//! Runs the tasks of a [`Scenario`] one after another, each on a fresh
//! [`Agent`], with scenario-level retry:
//!
//! ```text
//! attempt 0..=retry_budget:
//!     cancel previous agents -> one new agent per task -> publish list
//!     for each task: publish RunningInfo, run agent to completion,
//!                    stop the walk if it did not archive
//!     every agent archived? -> success, stop retrying
//! clear RunningInfo
//! ```
//!
//! A retry always starts over from the first task.

use crate::task::{Scenario, Task};
use futures::future::{select_all, FutureExt};
use parking_lot::{Mutex, RwLock};
use scout_core::{Agent, AgentReport};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;

/// Default settle time of [`ScenarioExecutor::wait_until_finished`]
pub const DEFAULT_FINISH_DEBOUNCE: Duration = Duration::from_millis(100);

/// Executor configuration
#[derive(Debug, Clone)]
pub struct ScenarioExecutorConfig {
    /// How long "nothing running" must hold before a wait completes
    pub finish_debounce: Duration,
}

impl Default for ScenarioExecutorConfig {
    fn default() -> Self {
        Self {
            finish_debounce: DEFAULT_FINISH_DEBOUNCE,
        }
    }
}

impl ScenarioExecutorConfig {
    /// Create new config with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With finish debounce
    #[inline]
    #[must_use]
    pub fn with_finish_debounce(mut self, debounce: Duration) -> Self {
        self.finish_debounce = debounce;
        self
    }
}

/// Progress snapshot of a running scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningInfo {
    /// Tasks in the scenario
    pub total_tasks: usize,
    /// Zero-based index of the task being run
    pub current_task_index: usize,
    /// Retries consumed before the current attempt
    pub retries_used: usize,
    /// Retries allowed after the first attempt
    pub retry_budget: usize,
}

/// Result of one scenario run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Scenario that ran
    pub scenario_id: String,
    /// Whether every task's agent archived in the final attempt
    pub succeeded: bool,
    /// Attempts started, including the first
    pub attempts: usize,
}

/// A task together with the agent running it
#[derive(Debug, Clone)]
pub struct TaskAgent {
    /// Task
    pub task: Task,
    /// Agent created for the task in the current attempt
    pub agent: Agent,
}

/// Serializable state of every current agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioReport {
    /// Scenario of the last run, if any
    pub scenario_id: Option<String>,
    /// Whether every current agent is archived
    pub all_archived: bool,
    /// Progress of the in-flight run
    pub running_info: Option<RunningInfo>,
    /// One entry per current task, in run order
    pub tasks: Vec<TaskReport>,
}

/// Report of one task's agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskReport {
    /// Goal of the task
    pub goal: String,
    /// Agent attempts for the goal
    pub agent: AgentReport,
}

struct ExecutorInner {
    config: ScenarioExecutorConfig,
    handle: Handle,
    agents: watch::Sender<Arc<Vec<TaskAgent>>>,
    running_info: watch::Sender<Option<RunningInfo>>,
    in_flight: watch::Sender<bool>,
    scenario_id: RwLock<Option<String>>,
    attempts: AtomicUsize,
    task: Mutex<Option<AbortHandle>>,
    generation: AtomicU64,
}

/// Scenario executor handle; clones share the same executor
#[derive(Clone)]
pub struct ScenarioExecutor {
    inner: Arc<ExecutorInner>,
}

impl ScenarioExecutor {
    /// Create an idle executor whose runs and agents are spawned on `handle`
    #[must_use]
    pub fn new(config: ScenarioExecutorConfig, handle: Handle) -> Self {
        let (agents, _) = watch::channel(Arc::new(Vec::new()));
        let (running_info, _) = watch::channel(None);
        let (in_flight, _) = watch::channel(false);
        Self {
            inner: Arc::new(ExecutorInner {
                config,
                handle,
                agents,
                running_info,
                in_flight,
                scenario_id: RwLock::new(None),
                attempts: AtomicUsize::new(0),
                task: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Executor configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ScenarioExecutorConfig {
        &self.inner.config
    }

    /// Run a scenario to completion
    ///
    /// Never fails; an unsuccessful or cancelled run reports
    /// `succeeded: false`.
    pub async fn execute(&self, scenario: Scenario) -> ScenarioOutcome {
        let scenario_id = scenario.id().to_owned();
        let executor = self.clone();
        let task = self.launch(move |generation| async move {
            executor.run(scenario, generation).await
        });
        let abort = AbortOnDrop(task.abort_handle());
        let outcome = match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                if e.is_cancelled() {
                    tracing::info!(scenario = %scenario_id, "scenario run cancelled");
                } else {
                    tracing::error!(scenario = %scenario_id, error = %e, "scenario run failed");
                }
                ScenarioOutcome {
                    scenario_id,
                    succeeded: false,
                    attempts: self.inner.attempts.load(Ordering::SeqCst),
                }
            }
        };
        drop(abort);
        outcome
    }

    /// Cancel the in-flight run and every published agent
    pub fn cancel(&self) {
        {
            let mut slot = self.inner.task.lock();
            self.inner.generation.fetch_add(1, Ordering::SeqCst);
            if let Some(task) = slot.take() {
                tracing::info!("cancelling scenario run");
                task.abort();
            }
            self.inner.running_info.send_replace(None);
            self.inner.in_flight.send_replace(false);
        }
        self.cancel_agents();
    }

    /// Whether every current agent is archived; false when there are none
    #[must_use]
    pub fn all_archived(&self) -> bool {
        let agents = self.agents();
        !agents.is_empty() && agents.iter().all(|entry| entry.agent.is_archived())
    }

    /// Whether any current agent is running
    #[must_use]
    pub fn any_running(&self) -> bool {
        self.agents().iter().any(|entry| entry.agent.is_running())
    }

    /// Whether a scenario run is in flight
    #[must_use]
    pub fn is_running(&self) -> bool {
        *self.inner.in_flight.borrow()
    }

    /// Progress of the in-flight run
    #[must_use]
    pub fn running_info(&self) -> Option<RunningInfo> {
        *self.inner.running_info.borrow()
    }

    /// Subscribe to progress snapshots
    #[must_use]
    pub fn running_info_receiver(&self) -> watch::Receiver<Option<RunningInfo>> {
        self.inner.running_info.subscribe()
    }

    /// Current (task, agent) list, in run order
    #[must_use]
    pub fn agents(&self) -> Arc<Vec<TaskAgent>> {
        Arc::clone(&self.inner.agents.borrow())
    }

    /// Subscribe to agent list replacements
    #[must_use]
    pub fn agents_receiver(&self) -> watch::Receiver<Arc<Vec<TaskAgent>>> {
        self.inner.agents.subscribe()
    }

    /// Wait until no run is in flight and no agent is running
    ///
    /// The idle state must hold for the configured debounce, so the short
    /// gap between two tasks or two attempts does not end the wait.
    pub async fn wait_until_finished(&self) {
        loop {
            self.wait_idle().await;
            tokio::time::sleep(self.inner.config.finish_debounce).await;
            if !self.is_running() && !self.any_running() {
                return;
            }
        }
    }

    async fn wait_idle(&self) {
        loop {
            // subscribe before reading so no change slips between check and wait
            let mut agents_rx = self.inner.agents.subscribe();
            let mut in_flight_rx = self.inner.in_flight.subscribe();
            let agents = Arc::clone(&agents_rx.borrow_and_update());
            let mut running: Vec<_> = agents.iter().map(|e| e.agent.running_receiver()).collect();

            let busy = *in_flight_rx.borrow_and_update() || running.iter().any(|rx| *rx.borrow());
            if !busy {
                return;
            }

            let mut changes = vec![
                agents_rx.changed().map(|_| ()).boxed(),
                in_flight_rx.changed().map(|_| ()).boxed(),
            ];
            changes.extend(running.iter_mut().map(|rx| rx.changed().map(|_| ()).boxed()));
            select_all(changes).await;
        }
    }

    /// Serializable state of the current agents
    #[must_use]
    pub fn report(&self) -> ScenarioReport {
        let agents = self.agents();
        ScenarioReport {
            scenario_id: self.inner.scenario_id.read().clone(),
            all_archived: self.all_archived(),
            running_info: self.running_info(),
            tasks: agents
                .iter()
                .map(|entry| TaskReport {
                    goal: entry.task.goal.clone(),
                    agent: entry.agent.report(),
                })
                .collect(),
        }
    }

    /// Spawn a run tagged with a new generation
    ///
    /// The generation only changes while the task slot is locked, so
    /// [`Self::publish_running_info`] and [`Self::cancel`] never interleave.
    fn launch<F, Fut>(&self, run: F) -> tokio::task::JoinHandle<ScenarioOutcome>
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ScenarioOutcome> + Send + 'static,
    {
        let generation = {
            let _slot = self.inner.task.lock();
            self.inner.in_flight.send_replace(true);
            self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1
        };
        let guard = RunGuard {
            inner: Arc::clone(&self.inner),
            generation,
        };
        let run = run(generation);
        let task = self.inner.handle.spawn(async move {
            let _guard = guard;
            run.await
        });

        let mut slot = self.inner.task.lock();
        if self.inner.generation.load(Ordering::SeqCst) == generation {
            if let Some(previous) = slot.replace(task.abort_handle()) {
                previous.abort();
            }
        } else {
            // cancelled or superseded before the slot was taken
            task.abort();
        }
        task
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) != generation
    }

    /// Publish progress unless the run was cancelled or superseded
    fn publish_running_info(&self, generation: u64, info: Option<RunningInfo>) -> bool {
        let _slot = self.inner.task.lock();
        if self.is_stale(generation) {
            return false;
        }
        self.inner.running_info.send_replace(info);
        true
    }

    async fn run(&self, scenario: Scenario, generation: u64) -> ScenarioOutcome {
        let budget = scenario.retry_budget();
        *self.inner.scenario_id.write() = Some(scenario.id().to_owned());
        tracing::info!(
            scenario = %scenario.id(),
            tasks = scenario.tasks().len(),
            retry_budget = budget,
            "scenario run started"
        );

        let mut succeeded = false;
        let mut attempts = 0;
        for attempt in 0..=budget {
            attempts = attempt + 1;
            self.inner.attempts.store(attempts, Ordering::SeqCst);
            if attempt > 0 {
                tracing::info!(scenario = %scenario.id(), attempt, "retrying scenario");
            }
            let Some(agents) = self.start_generation(&scenario, generation) else {
                break;
            };
            self.walk(&scenario, &agents, attempt, generation).await;

            if self.is_stale(generation) {
                break;
            }
            if self.all_archived() {
                succeeded = true;
                break;
            }
        }

        self.publish_running_info(generation, None);
        tracing::info!(scenario = %scenario.id(), succeeded, attempts, "scenario run finished");
        ScenarioOutcome {
            scenario_id: scenario.id().to_owned(),
            succeeded,
            attempts,
        }
    }

    /// Cancel the previous agents and publish a fresh one per task
    ///
    /// Returns `None` once the run has been cancelled or superseded.
    fn start_generation(&self, scenario: &Scenario, generation: u64) -> Option<Arc<Vec<TaskAgent>>> {
        let agents: Arc<Vec<TaskAgent>> = Arc::new(
            scenario
                .tasks()
                .iter()
                .map(|task| TaskAgent {
                    task: task.clone(),
                    agent: Agent::new(task.agent_config.clone(), self.inner.handle.clone()),
                })
                .collect(),
        );
        let _slot = self.inner.task.lock();
        if self.is_stale(generation) {
            return None;
        }
        self.cancel_agents();
        self.inner.agents.send_replace(Arc::clone(&agents));
        Some(agents)
    }

    /// Run tasks in order, stopping at the first one that does not archive
    async fn walk(&self, scenario: &Scenario, agents: &[TaskAgent], attempt: usize, generation: u64) {
        for (index, entry) in agents.iter().enumerate() {
            let info = RunningInfo {
                total_tasks: agents.len(),
                current_task_index: index,
                retries_used: attempt,
                retry_budget: scenario.retry_budget(),
            };
            if !self.publish_running_info(generation, Some(info)) {
                return;
            }
            let status = entry
                .agent
                .execute(&entry.task.goal, entry.task.max_step, entry.task.vocabulary())
                .await;
            if !entry.agent.is_archived() {
                tracing::warn!(
                    scenario = %scenario.id(),
                    task = index,
                    goal = %entry.task.goal,
                    status = ?status,
                    "task not achieved, stopping attempt"
                );
                return;
            }
        }
    }

    fn cancel_agents(&self) {
        for entry in self.agents().iter() {
            entry.agent.cancel();
        }
    }
}

impl std::fmt::Debug for ScenarioExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioExecutor")
            .field("running", &self.is_running())
            .field("agents", &self.agents().len())
            .field("running_info", &self.running_info())
            .finish_non_exhaustive()
    }
}

/// Clears the in-flight flag when a run ends, unless a newer run took over
struct RunGuard {
    inner: Arc<ExecutorInner>,
    generation: u64,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let _slot = self.inner.task.lock();
        if self.inner.generation.load(Ordering::SeqCst) == self.generation {
            self.inner.running_info.send_replace(None);
            self.inner.in_flight.send_replace(false);
        }
    }
}

/// Aborts the spawned run if the awaiting caller goes away
struct AbortOnDrop(AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}
