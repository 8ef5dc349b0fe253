//! Testing utilities for the Scout workspace
//!
//! Fake devices, scripted decision providers and recording interceptors.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use scout_core::{
    AgentConfig, AgentInterceptor, CaptureError, Command, Decision, DecisionError, DecisionInput,
    DecisionProvider, Device, DeviceError, Interceptor, Next,
};
use scout_core::interceptor::{
    DecisionInterceptor, DecisionResult, ExecuteCommandsInput, ExecuteCommandsInterceptor,
    ExecuteCommandsResult, InitializeResult, InitializerInput, InitializerInterceptor, StepInput,
    StepOutcome,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Install test tracing once; later calls are no-ops
pub fn init_test_tracing() {
    let _ = scout_core::logging::init_tracing("warn,scout_core=debug,scout_scenario=debug");
}

/// Device that records every command it is given
#[derive(Debug, Default)]
pub struct FakeDevice {
    executed: Mutex<Vec<Command>>,
    calls: Mutex<usize>,
    failing_calls: Mutex<HashSet<usize>>,
    fail_screenshots: Mutex<bool>,
    disconnected: Mutex<bool>,
    view_tree: Mutex<String>,
    focused_tree_requests: Mutex<usize>,
    screenshots: Mutex<Vec<PathBuf>>,
    command_delay: Mutex<Duration>,
}

impl FakeDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            view_tree: Mutex::new("<hierarchy><node text=\"Home\"/></hierarchy>".to_string()),
            ..Self::default()
        })
    }

    /// Fail the `index`-th `execute_commands` call (0-based) with a recoverable error
    pub fn fail_call(&self, index: usize) {
        self.failing_calls.lock().insert(index);
    }

    pub fn fail_screenshots(&self) {
        *self.fail_screenshots.lock() = true;
    }

    /// Every later device call fails with a non-recoverable error
    pub fn disconnect(&self) {
        *self.disconnected.lock() = true;
    }

    pub fn set_view_tree(&self, tree: impl Into<String>) {
        *self.view_tree.lock() = tree.into();
    }

    /// Sleep this long in every `execute_commands` call
    pub fn set_command_delay(&self, delay: Duration) {
        *self.command_delay.lock() = delay;
    }

    /// Commands the device accepted, in order
    pub fn executed(&self) -> Vec<Command> {
        self.executed.lock().clone()
    }

    pub fn execute_calls(&self) -> usize {
        *self.calls.lock()
    }

    pub fn focused_tree_requests(&self) -> usize {
        *self.focused_tree_requests.lock()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.screenshots.lock().clone()
    }
}

#[async_trait]
impl Device for FakeDevice {
    async fn execute_commands(&self, commands: &[Command]) -> Result<(), DeviceError> {
        let delay = *self.command_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if *self.disconnected.lock() {
            return Err(DeviceError::Disconnected("fake device unplugged".into()));
        }
        let index = {
            let mut calls = self.calls.lock();
            let index = *calls;
            *calls += 1;
            index
        };
        if self.failing_calls.lock().contains(&index) {
            return Err(DeviceError::CommandFailed(format!("call {index} rejected")));
        }
        self.executed.lock().extend_from_slice(commands);
        Ok(())
    }

    async fn view_tree(&self) -> Result<String, DeviceError> {
        if *self.disconnected.lock() {
            return Err(DeviceError::Disconnected("fake device unplugged".into()));
        }
        Ok(self.view_tree.lock().clone())
    }

    async fn focused_tree(&self) -> Result<String, DeviceError> {
        *self.focused_tree_requests.lock() += 1;
        Ok("<focused><node focused=\"true\" text=\"Play\"/></focused>".to_string())
    }

    async fn capture_screenshot(&self, path: &Path) -> Result<(), CaptureError> {
        if *self.fail_screenshots.lock() {
            return Err(CaptureError("fake display off".into()));
        }
        self.screenshots.lock().push(path.to_path_buf());
        Ok(())
    }
}

type DecideFn = dyn Fn(&DecisionInput) -> Result<Decision, DecisionError> + Send + Sync;

/// Decision provider driven by a closure, recording what it was asked
pub struct ScriptedDecisionProvider {
    decide: Box<DecideFn>,
    inputs: Mutex<Vec<DecisionInput>>,
}

impl ScriptedDecisionProvider {
    pub fn new<F>(decide: F) -> Arc<Self>
    where
        F: Fn(&DecisionInput) -> Result<Decision, DecisionError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            decide: Box::new(decide),
            inputs: Mutex::new(Vec::new()),
        })
    }

    /// Always answer with the same decision
    pub fn always(decision: Decision) -> Arc<Self> {
        Self::new(move |_| Ok(decision.clone()))
    }

    /// Answer goal achieved right away
    pub fn achieving() -> Arc<Self> {
        Self::always(Decision::single(Command::GoalAchieved, "goal reached"))
    }

    /// Answer from a list, repeating the last entry once it runs out
    pub fn sequence(decisions: Vec<Decision>) -> Arc<Self> {
        let decisions = Mutex::new(decisions.into_iter().collect::<std::collections::VecDeque<_>>());
        Self::new(move |_| {
            let mut decisions = decisions.lock();
            let next = if decisions.len() > 1 {
                decisions.pop_front()
            } else {
                decisions.front().cloned()
            };
            next.ok_or_else(|| DecisionError::InvalidDecision("script exhausted".into()))
        })
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().len()
    }

    pub fn inputs(&self) -> Vec<DecisionInput> {
        self.inputs.lock().clone()
    }

    /// Goals of every request, in order
    pub fn goals(&self) -> Vec<String> {
        self.inputs.lock().iter().map(|i| i.goal().to_string()).collect()
    }
}

impl std::fmt::Debug for ScriptedDecisionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedDecisionProvider")
            .field("calls", &self.calls())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DecisionProvider for ScriptedDecisionProvider {
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError> {
        self.inputs.lock().push(input.clone());
        (self.decide)(input)
    }
}

/// Shared, ordered log of interceptor events
pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Interceptor that logs `"{name} enter {kind}"` and `"{name} exit {kind}"`
#[derive(Debug, Clone)]
pub struct RecordingInterceptor {
    name: String,
    log: EventLog,
}

impl RecordingInterceptor {
    pub fn new(name: impl Into<String>, log: EventLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.into(),
            log,
        })
    }

    /// Register one recorder on all four chains
    pub fn on_all_chains(name: impl Into<String>, log: EventLog) -> Vec<AgentInterceptor> {
        let this = Self::new(name, log);
        vec![
            AgentInterceptor::Initializer(Arc::clone(&this) as Arc<InitializerInterceptor>),
            AgentInterceptor::Decision(Arc::clone(&this) as Arc<DecisionInterceptor>),
            AgentInterceptor::ExecuteCommands(Arc::clone(&this) as Arc<ExecuteCommandsInterceptor>),
            AgentInterceptor::Step(this),
        ]
    }

    fn record(&self, event: &str, kind: &str) {
        self.log.lock().push(format!("{} {event} {kind}", self.name));
    }
}

#[async_trait]
impl Interceptor<InitializerInput, InitializeResult> for RecordingInterceptor {
    async fn intercept(
        &self,
        input: InitializerInput,
        next: Next<'_, InitializerInput, InitializeResult>,
    ) -> InitializeResult {
        self.record("enter", "initializer");
        let result = next.proceed(input).await;
        self.record("exit", "initializer");
        result
    }
}

#[async_trait]
impl Interceptor<DecisionInput, DecisionResult> for RecordingInterceptor {
    async fn intercept(
        &self,
        input: DecisionInput,
        next: Next<'_, DecisionInput, DecisionResult>,
    ) -> DecisionResult {
        self.record("enter", "decision");
        let result = next.proceed(input).await;
        self.record("exit", "decision");
        result
    }
}

#[async_trait]
impl Interceptor<ExecuteCommandsInput, ExecuteCommandsResult> for RecordingInterceptor {
    async fn intercept(
        &self,
        input: ExecuteCommandsInput,
        next: Next<'_, ExecuteCommandsInput, ExecuteCommandsResult>,
    ) -> ExecuteCommandsResult {
        self.record("enter", "execute_commands");
        let result = next.proceed(input).await;
        self.record("exit", "execute_commands");
        result
    }
}

#[async_trait]
impl Interceptor<StepInput, StepOutcome> for RecordingInterceptor {
    async fn intercept(&self, input: StepInput, next: Next<'_, StepInput, StepOutcome>) -> StepOutcome {
        self.record("enter", "step");
        let result = next.proceed(input).await;
        self.record("exit", "step");
        result
    }
}

/// New empty event log
pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Agent config over a fake device and scripted provider, screenshots in `dir`
pub fn fake_config(
    device: &Arc<FakeDevice>,
    provider: &Arc<ScriptedDecisionProvider>,
    dir: &Path,
) -> AgentConfig {
    AgentConfig::builder(
        Arc::clone(device) as Arc<dyn Device>,
        Arc::clone(provider) as Arc<dyn DecisionProvider>,
    )
    .with_screenshot_dir(dir)
    .build()
}
