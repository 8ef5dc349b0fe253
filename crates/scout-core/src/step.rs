//! Terminal operations of the four agent chains
//!
//! These are the innermost operations the interceptors wrap: the no-op
//! initializer, the decision provider call, per-command device execution and
//! the full observe-decide-act step.

use crate::chain::Chain;
use crate::config::AgentConfig;
use crate::context::Step;
use crate::decision::{DecisionInput, DecisionOutput, DecisionProvider};
use crate::device::Device;
use crate::error::DecisionError;
use crate::interceptor::{
    DecisionChain, DecisionResult, ExecuteCommandsChain, ExecuteCommandsInput,
    ExecuteCommandsOutput, ExecuteCommandsResult, InitializerChain, InterceptorSets, StepChain,
    StepInput, StepOutcome, StepResult,
};
use futures::FutureExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The four chains of an agent, folded once from its config
#[derive(Debug, Clone)]
pub(crate) struct AgentChains {
    pub(crate) initializer: InitializerChain,
    pub(crate) step: StepChain,
}

impl AgentChains {
    pub(crate) fn build(config: &AgentConfig) -> Self {
        let sets = InterceptorSets::split(config.interceptors());

        let initializer = Chain::new(sets.initializer, |_input| async { Ok(()) }.boxed());

        let provider = Arc::clone(config.decision_provider());
        let decision: DecisionChain = Chain::new(sets.decision, move |input| {
            decide(Arc::clone(&provider), input).boxed()
        });

        let execute: ExecuteCommandsChain =
            Chain::new(sets.execute_commands, |input| execute_commands(input).boxed());

        let screenshot_dir = config.screenshot_dir().to_path_buf();
        let step = Chain::new(sets.step, move |input| {
            take_step(
                input,
                decision.clone(),
                execute.clone(),
                screenshot_dir.clone(),
            )
            .boxed()
        });

        Self { initializer, step }
    }
}

/// Decision chain terminal: ask the provider and turn its answer into a step
async fn decide(provider: Arc<dyn DecisionProvider>, input: DecisionInput) -> DecisionResult {
    let decision = provider.decide(&input).await?;
    if decision.commands.is_empty() {
        return Err(DecisionError::InvalidDecision("decision contains no command".into()).into());
    }
    for command in &decision.commands {
        if !input.vocabulary.allows(command.kind()) {
            tracing::warn!(command = %command, "decision uses a command outside the vocabulary");
        }
    }
    let step = decision.to_step(input.screenshot.clone());
    Ok(DecisionOutput {
        commands: decision.commands,
        step,
    })
}

/// Execute-commands chain terminal: one device call per command
///
/// A recoverable failure is recorded as a failure step and the remaining
/// commands still run.
async fn execute_commands(input: ExecuteCommandsInput) -> ExecuteCommandsResult {
    let mut output = ExecuteCommandsOutput::default();
    for command in &input.commands {
        if command.is_goal_achieved() {
            continue;
        }
        match input.device.execute_commands(std::slice::from_ref(command)).await {
            Ok(()) => output.executed += 1,
            Err(e) if e.is_recoverable() => {
                tracing::warn!(command = %command, error = %e, "command failed, continuing batch");
                input.context.add_step(
                    Step::command_failure(command, &e).with_screenshot(input.screenshot.clone()),
                );
                output.failed += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(output)
}

/// Step chain terminal: screenshot, decide, record, act
async fn take_step(
    input: StepInput,
    decision: DecisionChain,
    execute: ExecuteCommandsChain,
    screenshot_dir: PathBuf,
) -> StepOutcome {
    let screenshot = capture_screenshot(&*input.device, &screenshot_dir).await;

    let view_tree = input.device.view_tree().await?;
    let focus_tree = if input.form_factor.requires_focus_tree() {
        Some(input.device.focused_tree().await?)
    } else {
        None
    };

    let decision_input = DecisionInput {
        context: input.context.snapshot(),
        screenshot: screenshot.clone(),
        view_tree,
        focus_tree,
        vocabulary: input.vocabulary.clone(),
        form_factor: input.form_factor,
    };
    let output = decision.run(decision_input).await?;

    let goal_achieved = output.is_goal_achieved();
    input.context.add_step(output.step);
    if goal_achieved {
        return Ok(StepResult::GoalAchieved);
    }

    execute
        .run(ExecuteCommandsInput {
            commands: output.commands,
            context: Arc::clone(&input.context),
            device: Arc::clone(&input.device),
            screenshot,
        })
        .await?;
    Ok(StepResult::Continue)
}

/// Best-effort screenshot; failures are logged and yield no reference
async fn capture_screenshot(device: &dyn Device, dir: &Path) -> Option<PathBuf> {
    if let Err(e) = tokio::fs::create_dir_all(dir).await {
        tracing::warn!(dir = %dir.display(), error = %e, "cannot create screenshot directory");
        return None;
    }
    let path = dir.join(format!("{}.png", uuid::Uuid::new_v4()));
    match device.capture_screenshot(&path).await {
        Ok(()) => Some(path),
        Err(e) => {
            tracing::warn!(error = %e, "screenshot capture failed, continuing without it");
            None
        }
    }
}
