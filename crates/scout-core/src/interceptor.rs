//! The four interception points of an agent
//!
//! Every externally visible operation of an agent runs through a [`Chain`]:
//!
//! | kind | input | output |
//! |---|---|---|
//! | initialize | [`InitializerInput`] | [`InitializeResult`] |
//! | decide | [`DecisionInput`] | [`DecisionResult`] |
//! | execute commands | [`ExecuteCommandsInput`] | [`ExecuteCommandsResult`] |
//! | step | [`StepInput`] | [`StepOutcome`] |
//!
//! Interceptors are registered on the agent config as one ordered list of
//! [`AgentInterceptor`]s; each chain keeps the ones of its kind, in order.

use crate::agent::AgentId;
use crate::chain::{Chain, Interceptor, Next};
use crate::command::{Command, CommandVocabulary, FormFactor};
use crate::context::ContextHistory;
use crate::decision::{DecisionInput, DecisionOutput, DecisionProvider};
use crate::device::Device;
use crate::error::AgentError;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Input of the initializer chain
#[derive(Clone)]
pub struct InitializerInput {
    /// Agent being initialized
    pub agent_id: AgentId,
    /// Device to reset
    pub device: Arc<dyn Device>,
}

/// Output of the initializer chain
pub type InitializeResult = Result<(), AgentError>;

/// Output of the decision chain
pub type DecisionResult = Result<DecisionOutput, AgentError>;

/// Input of the execute-commands chain
#[derive(Clone)]
pub struct ExecuteCommandsInput {
    /// Commands chosen by the provider, in order
    pub commands: Vec<Command>,
    /// History receiving failure steps
    pub context: Arc<ContextHistory>,
    /// Device to drive
    pub device: Arc<dyn Device>,
    /// Screenshot of the step that produced the commands
    pub screenshot: Option<PathBuf>,
}

/// Counts of an executed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteCommandsOutput {
    /// Commands the device accepted
    pub executed: usize,
    /// Commands recorded as failure steps
    pub failed: usize,
}

/// Output of the execute-commands chain
pub type ExecuteCommandsResult = Result<ExecuteCommandsOutput, AgentError>;

/// Input of the step chain
#[derive(Clone)]
pub struct StepInput {
    /// Agent taking the step
    pub agent_id: AgentId,
    /// Zero-based index of the step within the attempt
    pub step_index: usize,
    /// History of the current attempt
    pub context: Arc<ContextHistory>,
    /// Command kinds the provider may choose from
    pub vocabulary: CommandVocabulary,
    /// Device to observe and drive
    pub device: Arc<dyn Device>,
    /// Interaction model of the device
    pub form_factor: FormFactor,
    /// Provider asked for the next commands
    pub decision_provider: Arc<dyn DecisionProvider>,
}

/// Result of one step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// The provider declared the goal achieved; the loop stops
    GoalAchieved,
    /// Commands were applied; the loop continues
    Continue,
}

/// Output of the step chain
pub type StepOutcome = Result<StepResult, AgentError>;

/// Initializer interceptor
pub type InitializerInterceptor = dyn Interceptor<InitializerInput, InitializeResult>;
/// Decision interceptor
pub type DecisionInterceptor = dyn Interceptor<DecisionInput, DecisionResult>;
/// Execute-commands interceptor
pub type ExecuteCommandsInterceptor = dyn Interceptor<ExecuteCommandsInput, ExecuteCommandsResult>;
/// Step interceptor
pub type StepInterceptor = dyn Interceptor<StepInput, StepOutcome>;

/// Initializer chain
pub type InitializerChain = Chain<InitializerInput, InitializeResult>;
/// Decision chain
pub type DecisionChain = Chain<DecisionInput, DecisionResult>;
/// Execute-commands chain
pub type ExecuteCommandsChain = Chain<ExecuteCommandsInput, ExecuteCommandsResult>;
/// Step chain
pub type StepChain = Chain<StepInput, StepOutcome>;

/// Interceptor registered on an agent config, tagged with its chain kind
#[derive(Clone)]
pub enum AgentInterceptor {
    /// Wraps device/app reset before stepping
    Initializer(Arc<InitializerInterceptor>),
    /// Wraps the decision provider call
    Decision(Arc<DecisionInterceptor>),
    /// Wraps applying commands to the device
    ExecuteCommands(Arc<ExecuteCommandsInterceptor>),
    /// Wraps one full step
    Step(Arc<StepInterceptor>),
}

impl AgentInterceptor {
    /// Chain kind name, for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Initializer(_) => "initializer",
            Self::Decision(_) => "decision",
            Self::ExecuteCommands(_) => "execute_commands",
            Self::Step(_) => "step",
        }
    }
}

impl fmt::Debug for AgentInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AgentInterceptor").field(&self.kind()).finish()
    }
}

/// Split a mixed interceptor list into per-kind lists, keeping order
pub(crate) struct InterceptorSets {
    pub(crate) initializer: Vec<Arc<InitializerInterceptor>>,
    pub(crate) decision: Vec<Arc<DecisionInterceptor>>,
    pub(crate) execute_commands: Vec<Arc<ExecuteCommandsInterceptor>>,
    pub(crate) step: Vec<Arc<StepInterceptor>>,
}

impl InterceptorSets {
    pub(crate) fn split(interceptors: &[AgentInterceptor]) -> Self {
        let mut sets = Self {
            initializer: Vec::new(),
            decision: Vec::new(),
            execute_commands: Vec::new(),
            step: Vec::new(),
        };
        for interceptor in interceptors {
            match interceptor {
                AgentInterceptor::Initializer(i) => sets.initializer.push(Arc::clone(i)),
                AgentInterceptor::Decision(i) => sets.decision.push(Arc::clone(i)),
                AgentInterceptor::ExecuteCommands(i) => sets.execute_commands.push(Arc::clone(i)),
                AgentInterceptor::Step(i) => sets.step.push(Arc::clone(i)),
            }
        }
        sets
    }
}

/// Logs every operation of the chain it is registered on through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl LoggingInterceptor {
    /// Register this logger on all four chains
    #[must_use]
    pub fn all() -> Vec<AgentInterceptor> {
        let this = Arc::new(Self);
        vec![
            AgentInterceptor::Initializer(Arc::clone(&this) as Arc<InitializerInterceptor>),
            AgentInterceptor::Decision(Arc::clone(&this) as Arc<DecisionInterceptor>),
            AgentInterceptor::ExecuteCommands(Arc::clone(&this) as Arc<ExecuteCommandsInterceptor>),
            AgentInterceptor::Step(this),
        ]
    }
}

#[async_trait::async_trait]
impl Interceptor<InitializerInput, InitializeResult> for LoggingInterceptor {
    async fn intercept(
        &self,
        input: InitializerInput,
        next: Next<'_, InitializerInput, InitializeResult>,
    ) -> InitializeResult {
        let agent = input.agent_id;
        tracing::debug!(agent = %agent, "initializing device");
        let result = next.proceed(input).await;
        if let Err(e) = &result {
            tracing::warn!(agent = %agent, error = %e, "initialization failed");
        }
        result
    }
}

#[async_trait::async_trait]
impl Interceptor<DecisionInput, DecisionResult> for LoggingInterceptor {
    async fn intercept(
        &self,
        input: DecisionInput,
        next: Next<'_, DecisionInput, DecisionResult>,
    ) -> DecisionResult {
        tracing::debug!(
            goal = %input.goal(),
            history = input.context.steps.len(),
            screenshot = input.screenshot.is_some(),
            "requesting decision"
        );
        let result = next.proceed(input).await;
        match &result {
            Ok(output) => tracing::debug!(commands = ?output.commands, memo = %output.step.memo, "decided"),
            Err(e) => tracing::warn!(error = %e, "decision failed"),
        }
        result
    }
}

#[async_trait::async_trait]
impl Interceptor<ExecuteCommandsInput, ExecuteCommandsResult> for LoggingInterceptor {
    async fn intercept(
        &self,
        input: ExecuteCommandsInput,
        next: Next<'_, ExecuteCommandsInput, ExecuteCommandsResult>,
    ) -> ExecuteCommandsResult {
        tracing::debug!(commands = input.commands.len(), "executing commands");
        let result = next.proceed(input).await;
        if let Ok(output) = &result {
            tracing::debug!(executed = output.executed, failed = output.failed, "commands executed");
        }
        result
    }
}

#[async_trait::async_trait]
impl Interceptor<StepInput, StepOutcome> for LoggingInterceptor {
    async fn intercept(&self, input: StepInput, next: Next<'_, StepInput, StepOutcome>) -> StepOutcome {
        let agent = input.agent_id;
        let step = input.step_index;
        tracing::info!(agent = %agent, step, goal = %input.context.goal(), "step started");
        let result = next.proceed(input).await;
        tracing::info!(agent = %agent, step, result = ?result, "step finished");
        result
    }
}
