//! Decision provider capability
//!
//! Given the goal, the steps taken so far and the current screen, a
//! [`DecisionProvider`] answers with the next commands and a textual record
//! of how it got there. Prompt construction and transport are its own concern.

use crate::command::{Command, CommandVocabulary, FormFactor};
use crate::context::{ContextSnapshot, Step};
use crate::error::DecisionError;
use std::path::PathBuf;

/// Everything the provider sees when choosing the next commands
#[derive(Debug, Clone)]
pub struct DecisionInput {
    /// Goal and step history of the current attempt
    pub context: ContextSnapshot,
    /// Screenshot taken for this step, if capture succeeded
    pub screenshot: Option<PathBuf>,
    /// Structured dump of the view hierarchy
    pub view_tree: String,
    /// Focus-only dump, present for directional-pad devices
    pub focus_tree: Option<String>,
    /// Command kinds the provider may choose from
    pub vocabulary: CommandVocabulary,
    /// Interaction model of the device
    pub form_factor: FormFactor,
}

impl DecisionInput {
    /// Goal of the current attempt
    #[inline]
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.context.goal
    }
}

/// Raw answer of a decision provider
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// Commands to apply, in order; never empty
    pub commands: Vec<Command>,
    /// Short reasoning record
    pub memo: String,
    /// Text sent to the underlying model
    pub request_text: Option<String>,
    /// Text received from the underlying model
    pub response_text: Option<String>,
}

impl Decision {
    /// Decision with one command and a memo
    #[must_use]
    pub fn single(command: Command, memo: impl Into<String>) -> Self {
        Self {
            commands: vec![command],
            memo: memo.into(),
            request_text: None,
            response_text: None,
        }
    }

    /// Whether this decision is exactly the goal-achieved marker
    #[must_use]
    pub fn is_goal_achieved(&self) -> bool {
        matches!(self.commands.as_slice(), [only] if only.is_goal_achieved())
    }

    /// Turn the decision into the step recorded for it
    ///
    /// A single-command decision records that command; a batch lists its
    /// commands in the memo instead.
    #[must_use]
    pub fn to_step(&self, screenshot: Option<PathBuf>) -> Step {
        let step = match self.commands.as_slice() {
            [only] => Step::new(self.memo.clone()).with_command(only.clone()),
            many => {
                let listed: Vec<String> = many.iter().map(ToString::to_string).collect();
                Step::new(format!("{} [{}]", self.memo, listed.join(", ")))
            }
        };
        step.with_screenshot(screenshot)
            .with_ai_texts(self.request_text.clone(), self.response_text.clone())
    }
}

/// Output of the decision chain
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutput {
    /// Commands to apply, in order
    pub commands: Vec<Command>,
    /// Step to append to the context history
    pub step: Step,
}

impl DecisionOutput {
    /// Whether the command set is exactly the goal-achieved marker
    #[must_use]
    pub fn is_goal_achieved(&self) -> bool {
        matches!(self.commands.as_slice(), [only] if only.is_goal_achieved())
    }
}

/// External decision maker consumed by the agent
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Choose the next commands
    async fn decide(&self, input: &DecisionInput) -> Result<Decision, DecisionError>;
}
