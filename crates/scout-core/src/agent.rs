//! Goal-directed agent
//!
//! An [`Agent`] owns the context history of its current goal attempt and runs
//! the bounded step loop:
//!
//! ```text
//! Idle --execute--> Running --goal achieved--> Archived
//!                      |
//!                      +--steps exhausted / error / cancel--> Idle
//! ```
//!
//! Runs are spawned on the runtime handle given at construction, so
//! [`Agent::cancel`] can abort them from anywhere. Observers read the
//! `running` flag and context snapshots; only the run itself mutates them.

use crate::command::CommandVocabulary;
use crate::config::AgentConfig;
use crate::context::{ContextHistory, ContextSnapshot};
use crate::error::AgentError;
use crate::interceptor::{InitializerInput, StepInput, StepResult};
use crate::step::AgentChains;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::AbortHandle;
use ulid::Ulid;

/// Default step budget of one goal attempt
pub const DEFAULT_MAX_STEP: usize = 10;

/// Unique agent identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Ulid);

impl AgentId {
    /// Generate new agent ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How one run of an agent ended
#[derive(Debug, Clone)]
pub enum RunStatus {
    /// The context history holds a goal-achieved step
    GoalAchieved,
    /// The step budget ran out first
    StepsExhausted,
    /// An error terminated the run
    Failed(AgentError),
    /// The run was cancelled
    Cancelled,
}

impl RunStatus {
    /// Whether the goal was achieved
    #[inline]
    #[must_use]
    pub fn is_goal_achieved(&self) -> bool {
        matches!(self, Self::GoalAchieved)
    }
}

/// Serializable record of every attempt of an agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReport {
    /// Agent the attempts belong to
    pub agent_id: AgentId,
    /// Whether the latest attempt achieved its goal
    pub archived: bool,
    /// Attempts in execution order
    pub attempts: Vec<ContextSnapshot>,
}

struct AgentInner {
    id: AgentId,
    config: AgentConfig,
    chains: AgentChains,
    handle: Handle,
    running: watch::Sender<bool>,
    latest: watch::Sender<Option<Arc<ContextHistory>>>,
    attempts: RwLock<Vec<Arc<ContextHistory>>>,
    task: Mutex<Option<AbortHandle>>,
    generation: AtomicU64,
}

/// Agent handle; clones share the same agent
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

impl Agent {
    /// Create an idle agent whose runs are spawned on `handle`
    #[must_use]
    pub fn new(config: AgentConfig, handle: Handle) -> Self {
        let (running, _) = watch::channel(false);
        let (latest, _) = watch::channel(None);
        Self {
            inner: Arc::new(AgentInner {
                id: AgentId::new(),
                chains: AgentChains::build(&config),
                config,
                handle,
                running,
                latest,
                attempts: RwLock::new(Vec::new()),
                task: Mutex::new(None),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Agent ID
    #[inline]
    #[must_use]
    pub fn id(&self) -> AgentId {
        self.inner.id
    }

    /// Configuration the agent was built from
    #[inline]
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    /// Run one goal attempt to completion
    ///
    /// Creates a fresh context history, runs the initializer chain once, then
    /// takes up to `max_step` steps while the goal is not achieved. Errors end
    /// the run and are reported in the returned status, never propagated.
    pub async fn execute(
        &self,
        goal: &str,
        max_step: usize,
        vocabulary: CommandVocabulary,
    ) -> RunStatus {
        let agent = self.clone();
        let goal = goal.to_owned();
        let task = self.launch(async move { agent.attempt(goal, max_step, vocabulary).await });
        let abort = AbortOnDrop(task.abort_handle());
        let status = match task.await {
            Ok(status) => status,
            Err(e) => join_failure(self.id(), e),
        };
        drop(abort);
        status
    }

    /// Run up to `max_retry + 1` attempts, stopping once the goal is achieved
    ///
    /// Every retry starts a new context history.
    pub async fn run_with_retry(
        &self,
        goal: &str,
        max_step: usize,
        max_retry: usize,
        vocabulary: CommandVocabulary,
    ) -> RunStatus {
        let agent = self.clone();
        let goal = goal.to_owned();
        let task = self.launch(async move { agent.retry_loop(goal, max_step, max_retry, vocabulary).await });
        let abort = AbortOnDrop(task.abort_handle());
        let status = match task.await {
            Ok(status) => status,
            Err(e) => join_failure(self.id(), e),
        };
        drop(abort);
        status
    }

    /// Cancel any in-flight run and start a retrying run in the background
    pub fn execute_async(
        &self,
        goal: &str,
        max_step: usize,
        max_retry: usize,
        vocabulary: CommandVocabulary,
    ) {
        self.cancel();
        let agent = self.clone();
        let goal = goal.to_owned();
        drop(self.launch(async move {
            agent.retry_loop(goal, max_step, max_retry, vocabulary).await
        }));
    }

    /// Abort the in-flight run, if any, and clear the running flag
    ///
    /// Steps already recorded stay in the context history.
    pub fn cancel(&self) {
        self.inner.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.inner.task.lock().take() {
            tracing::info!(agent = %self.id(), "cancelling agent run");
            task.abort();
        }
        self.inner.running.send_replace(false);
    }

    /// Wait until the agent is not running
    pub async fn wait_until_finished(&self) {
        let mut running = self.inner.running.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = running.wait_for(|running| !*running).await;
    }

    /// Whether a run is active
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        *self.inner.running.borrow()
    }

    /// Subscribe to the running flag
    #[must_use]
    pub fn running_receiver(&self) -> watch::Receiver<bool> {
        self.inner.running.subscribe()
    }

    /// Whether the current context history holds a goal-achieved step
    #[must_use]
    pub fn is_archived(&self) -> bool {
        self.inner
            .latest
            .borrow()
            .as_ref()
            .is_some_and(|context| context.is_goal_achieved())
    }

    /// Context history of the current (or last) attempt
    #[must_use]
    pub fn latest_context(&self) -> Option<Arc<ContextHistory>> {
        self.inner.latest.borrow().clone()
    }

    /// Subscribe to context replacements
    #[must_use]
    pub fn latest_context_receiver(&self) -> watch::Receiver<Option<Arc<ContextHistory>>> {
        self.inner.latest.subscribe()
    }

    /// Every context history this agent created, oldest first
    #[must_use]
    pub fn attempts(&self) -> Vec<Arc<ContextHistory>> {
        self.inner.attempts.read().clone()
    }

    /// Serializable record of every attempt
    #[must_use]
    pub fn report(&self) -> AgentReport {
        AgentReport {
            agent_id: self.id(),
            archived: self.is_archived(),
            attempts: self.attempts().iter().map(|c| c.snapshot()).collect(),
        }
    }

    /// Spawn a run on the agent's handle, flagging it running until it ends
    fn launch<F>(&self, run: F) -> tokio::task::JoinHandle<RunStatus>
    where
        F: Future<Output = RunStatus> + Send + 'static,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.running.send_replace(true);
        let guard = RunningGuard {
            inner: Arc::clone(&self.inner),
            generation,
        };
        let task = self.inner.handle.spawn(async move {
            let _guard = guard;
            run.await
        });
        if let Some(previous) = self.inner.task.lock().replace(task.abort_handle()) {
            previous.abort();
        }
        task
    }

    async fn retry_loop(
        &self,
        goal: String,
        max_step: usize,
        max_retry: usize,
        vocabulary: CommandVocabulary,
    ) -> RunStatus {
        let mut status = RunStatus::StepsExhausted;
        for retry in 0..=max_retry {
            if retry > 0 {
                tracing::info!(agent = %self.id(), retry, max_retry, "retrying goal");
            }
            status = self.attempt(goal.clone(), max_step, vocabulary.clone()).await;
            if self.is_archived() {
                break;
            }
        }
        status
    }

    /// One goal attempt on a fresh context history
    async fn attempt(&self, goal: String, max_step: usize, vocabulary: CommandVocabulary) -> RunStatus {
        let context = Arc::new(ContextHistory::new(goal));
        self.inner.attempts.write().push(Arc::clone(&context));
        self.inner.latest.send_replace(Some(Arc::clone(&context)));
        tracing::info!(agent = %self.id(), goal = %context.goal(), max_step, "agent run started");

        match self.step_loop(&context, max_step, vocabulary).await {
            Ok(status) => {
                tracing::info!(
                    agent = %self.id(),
                    steps = context.len(),
                    status = ?status,
                    "agent run finished"
                );
                status
            }
            Err(e) => {
                tracing::error!(agent = %self.id(), error = %e, "agent run terminated");
                RunStatus::Failed(e)
            }
        }
    }

    async fn step_loop(
        &self,
        context: &Arc<ContextHistory>,
        max_step: usize,
        vocabulary: CommandVocabulary,
    ) -> Result<RunStatus, AgentError> {
        let config = &self.inner.config;
        self.inner
            .chains
            .initializer
            .run(InitializerInput {
                agent_id: self.id(),
                device: Arc::clone(config.device()),
            })
            .await?;

        for step_index in 0..max_step {
            if context.is_goal_achieved() {
                break;
            }
            let input = StepInput {
                agent_id: self.id(),
                step_index,
                context: Arc::clone(context),
                vocabulary: vocabulary.clone(),
                device: Arc::clone(config.device()),
                form_factor: config.form_factor(),
                decision_provider: Arc::clone(config.decision_provider()),
            };
            match self.inner.chains.step.run(input).await? {
                StepResult::GoalAchieved => break,
                StepResult::Continue => {
                    tokio::task::yield_now().await;
                    if !config.step_delay().is_zero() {
                        tokio::time::sleep(config.step_delay()).await;
                    }
                }
            }
        }

        Ok(if context.is_goal_achieved() {
            RunStatus::GoalAchieved
        } else {
            RunStatus::StepsExhausted
        })
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.inner.id)
            .field("running", &self.is_running())
            .field("archived", &self.is_archived())
            .finish_non_exhaustive()
    }
}

/// Clears the running flag when a run ends, unless a newer run took over
struct RunningGuard {
    inner: Arc<AgentInner>,
    generation: u64,
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if self.inner.generation.load(Ordering::SeqCst) == self.generation {
            self.inner.running.send_replace(false);
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

fn join_failure(agent: AgentId, error: tokio::task::JoinError) -> RunStatus {
    match AgentError::from(error) {
        AgentError::Cancelled => {
            tracing::info!(agent = %agent, "agent run cancelled");
            RunStatus::Cancelled
        }
        e => {
            tracing::error!(agent = %agent, error = %e, "agent run panicked");
            RunStatus::Failed(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Command, FormFactor};
    use crate::decision::{Decision, MockDecisionProvider};
    use crate::device::MockDevice;
    use crate::error::{CaptureError, DecisionError};

    fn quiet_device() -> MockDevice {
        let mut device = MockDevice::new();
        device.expect_capture_screenshot().returning(|_| Ok(()));
        device.expect_view_tree().returning(|| Ok("<hierarchy/>".to_string()));
        device.expect_execute_commands().returning(|_| Ok(()));
        device
    }

    fn agent_with(device: MockDevice, provider: MockDecisionProvider, form_factor: FormFactor) -> Agent {
        let config = AgentConfig::builder(Arc::new(device), Arc::new(provider))
            .with_form_factor(form_factor)
            .build();
        Agent::new(config, Handle::current())
    }

    #[tokio::test]
    async fn decision_failure_ends_run_without_archiving() {
        let mut provider = MockDecisionProvider::new();
        provider
            .expect_decide()
            .times(1)
            .returning(|_| Err(DecisionError::RequestFailed("503".into())));
        let agent = agent_with(quiet_device(), provider, FormFactor::Mobile);

        let status = agent
            .execute("open inbox", 5, CommandVocabulary::for_form_factor(FormFactor::Mobile))
            .await;

        assert!(matches!(status, RunStatus::Failed(AgentError::Decision(_))));
        assert!(!agent.is_running());
        assert!(!agent.is_archived());
        assert_eq!(agent.latest_context().map(|c| c.len()), Some(0));
    }

    #[tokio::test]
    async fn screenshot_failure_does_not_abort_step() {
        let mut device = MockDevice::new();
        device
            .expect_capture_screenshot()
            .returning(|_| Err(CaptureError("no display".into())));
        device.expect_view_tree().returning(|| Ok("<hierarchy/>".to_string()));
        device.expect_focused_tree().never();
        device.expect_execute_commands().never();

        let mut provider = MockDecisionProvider::new();
        provider
            .expect_decide()
            .withf(|input| input.screenshot.is_none() && input.focus_tree.is_none())
            .returning(|_| Ok(Decision::single(Command::GoalAchieved, "already there")));
        let agent = agent_with(device, provider, FormFactor::Mobile);

        let status = agent
            .execute("open inbox", 5, CommandVocabulary::for_form_factor(FormFactor::Mobile))
            .await;

        assert!(status.is_goal_achieved());
        assert!(agent.is_archived());
        let steps = agent.latest_context().map(|c| c.steps()).unwrap_or_default();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].screenshot, None);
    }

    #[tokio::test]
    async fn tv_steps_include_focus_tree() {
        let mut device = quiet_device();
        device
            .expect_focused_tree()
            .times(1)
            .returning(|| Ok("<focused/>".to_string()));

        let mut provider = MockDecisionProvider::new();
        provider
            .expect_decide()
            .withf(|input| input.focus_tree.as_deref() == Some("<focused/>"))
            .returning(|_| Ok(Decision::single(Command::GoalAchieved, "done")));
        let agent = agent_with(device, provider, FormFactor::Tv);

        let status = agent
            .execute("play video", 3, CommandVocabulary::for_form_factor(FormFactor::Tv))
            .await;
        assert!(status.is_goal_achieved());
    }

    #[tokio::test]
    async fn step_budget_bounds_the_loop() {
        let mut provider = MockDecisionProvider::new();
        provider
            .expect_decide()
            .times(3)
            .returning(|_| Ok(Decision::single(Command::BackPress, "going back")));
        let agent = agent_with(quiet_device(), provider, FormFactor::Mobile);

        let status = agent
            .execute("never", 3, CommandVocabulary::for_form_factor(FormFactor::Mobile))
            .await;

        assert!(matches!(status, RunStatus::StepsExhausted));
        assert!(!agent.is_archived());
        assert_eq!(agent.latest_context().map(|c| c.len()), Some(3));
    }

    #[tokio::test]
    async fn cancel_on_idle_agent_is_noop() {
        let agent = agent_with(MockDevice::new(), MockDecisionProvider::new(), FormFactor::Mobile);
        agent.cancel();
        agent.cancel();
        assert!(!agent.is_running());
        assert!(agent.latest_context().is_none());
        agent.wait_until_finished().await;
    }

    #[tokio::test]
    async fn retries_start_fresh_histories() {
        let mut provider = MockDecisionProvider::new();
        provider
            .expect_decide()
            .returning(|_| Ok(Decision::single(Command::Wait { duration_ms: 1 }, "waiting")));
        let agent = agent_with(quiet_device(), provider, FormFactor::Mobile);

        let status = agent
            .run_with_retry("never", 2, 2, CommandVocabulary::for_form_factor(FormFactor::Mobile))
            .await;

        assert!(matches!(status, RunStatus::StepsExhausted));
        let attempts = agent.attempts();
        assert_eq!(attempts.len(), 3);
        assert!(attempts.iter().all(|c| c.len() == 2));
        assert_eq!(agent.report().attempts.len(), 3);
    }
}
