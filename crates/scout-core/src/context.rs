//! Per-goal context history
//!
//! A [`ContextHistory`] is the append-only record of every step taken for one
//! goal attempt. It is the source of truth for whether the goal is achieved:
//! the goal counts as achieved as soon as any recorded step carries the
//! [`Command::GoalAchieved`] marker.

use crate::command::Command;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// One observe-decide-act cycle's recorded outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Reasoning or failure description
    pub memo: String,
    /// Screenshot taken before the decision, if capture succeeded
    pub screenshot: Option<PathBuf>,
    /// Text sent to the decision provider
    pub ai_request: Option<String>,
    /// Text returned by the decision provider
    pub ai_response: Option<String>,
    /// Command this step issued
    pub command: Option<Command>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl Step {
    /// Create a step with only a memo
    #[must_use]
    pub fn new(memo: impl Into<String>) -> Self {
        Self {
            memo: memo.into(),
            screenshot: None,
            ai_request: None,
            ai_response: None,
            command: None,
            created_at: Utc::now(),
        }
    }

    /// With issued command
    #[inline]
    #[must_use]
    pub fn with_command(mut self, command: Command) -> Self {
        self.command = Some(command);
        self
    }

    /// With screenshot reference
    #[inline]
    #[must_use]
    pub fn with_screenshot(mut self, screenshot: Option<PathBuf>) -> Self {
        self.screenshot = screenshot;
        self
    }

    /// With provider request/response texts
    #[inline]
    #[must_use]
    pub fn with_ai_texts(mut self, request: Option<String>, response: Option<String>) -> Self {
        self.ai_request = request;
        self.ai_response = response;
        self
    }

    /// Step recorded when one command of a batch fails on the device
    #[must_use]
    pub fn command_failure(command: &Command, error: &impl std::fmt::Display) -> Self {
        Self::new(format!("Failed to execute {command}: {error}")).with_command(command.clone())
    }

    /// Whether this step declares the goal achieved
    #[inline]
    #[must_use]
    pub fn is_goal_achieved(&self) -> bool {
        self.command.as_ref().is_some_and(Command::is_goal_achieved)
    }
}

/// Immutable copy of a context history at one point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Goal of the attempt
    pub goal: String,
    /// Steps recorded so far, in order
    pub steps: Vec<Step>,
}

impl ContextSnapshot {
    /// Whether any step declares the goal achieved
    #[must_use]
    pub fn is_goal_achieved(&self) -> bool {
        self.steps.iter().any(Step::is_goal_achieved)
    }
}

/// Append-only step record for one goal attempt
#[derive(Debug)]
pub struct ContextHistory {
    goal: String,
    steps: RwLock<Vec<Step>>,
    achieved: AtomicBool,
}

impl ContextHistory {
    /// Start an empty history for a goal
    #[must_use]
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            steps: RwLock::new(Vec::new()),
            achieved: AtomicBool::new(false),
        }
    }

    /// Goal of this attempt
    #[inline]
    #[must_use]
    pub fn goal(&self) -> &str {
        &self.goal
    }

    /// Append a step
    ///
    /// The achieved flag is updated under the same lock as the append, so
    /// observers never see a goal-achieved step with the flag still false.
    pub fn add_step(&self, step: Step) {
        let mut steps = self.steps.write();
        let achieved = step.is_goal_achieved();
        steps.push(step);
        if achieved {
            self.achieved.store(true, Ordering::Release);
        }
    }

    /// Whether any recorded step declares the goal achieved
    #[inline]
    #[must_use]
    pub fn is_goal_achieved(&self) -> bool {
        self.achieved.load(Ordering::Acquire)
    }

    /// Number of recorded steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.read().len()
    }

    /// Whether nothing was recorded yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.read().is_empty()
    }

    /// Copy of the recorded steps
    #[must_use]
    pub fn steps(&self) -> Vec<Step> {
        self.steps.read().clone()
    }

    /// Immutable copy of the whole history
    #[must_use]
    pub fn snapshot(&self) -> ContextSnapshot {
        ContextSnapshot {
            goal: self.goal.clone(),
            steps: self.steps(),
        }
    }
}
