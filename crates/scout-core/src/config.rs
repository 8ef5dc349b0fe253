//! Agent configuration
//!
//! An [`AgentConfig`] bundles the capabilities an agent drives (device and
//! decision provider) with its policy (form factor, interceptors, pacing).
//! It is built once through [`AgentConfigBuilder`] and treated as immutable;
//! [`AgentConfig::to_builder`] derives variants, e.g. a per-task initializer
//! or a remote-control vocabulary for a TV device.

use crate::chain::Interceptor;
use crate::command::FormFactor;
use crate::decision::{DecisionInput, DecisionProvider};
use crate::device::Device;
use crate::interceptor::{
    AgentInterceptor, DecisionResult, ExecuteCommandsInput, ExecuteCommandsResult,
    InitializeResult, InitializerInput, StepInput, StepOutcome,
};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Directory name used under the system temp dir when none is configured
pub const DEFAULT_SCREENSHOT_DIR: &str = "scout-screenshots";

/// Capabilities and policy of an agent
#[derive(Clone)]
pub struct AgentConfig {
    device: Arc<dyn Device>,
    decision_provider: Arc<dyn DecisionProvider>,
    form_factor: FormFactor,
    interceptors: Vec<AgentInterceptor>,
    screenshot_dir: PathBuf,
    step_delay: Duration,
}

impl AgentConfig {
    /// Start building a config around a device and a decision provider
    #[inline]
    #[must_use]
    pub fn builder(
        device: Arc<dyn Device>,
        decision_provider: Arc<dyn DecisionProvider>,
    ) -> AgentConfigBuilder {
        AgentConfigBuilder::new(device, decision_provider)
    }

    /// Copy this config into a builder to derive a variant
    #[must_use]
    pub fn to_builder(&self) -> AgentConfigBuilder {
        AgentConfigBuilder {
            device: Arc::clone(&self.device),
            decision_provider: Arc::clone(&self.decision_provider),
            form_factor: self.form_factor,
            interceptors: self.interceptors.clone(),
            screenshot_dir: self.screenshot_dir.clone(),
            step_delay: self.step_delay,
        }
    }

    /// Device driven by the agent
    #[inline]
    #[must_use]
    pub fn device(&self) -> &Arc<dyn Device> {
        &self.device
    }

    /// Decision provider consulted by the agent
    #[inline]
    #[must_use]
    pub fn decision_provider(&self) -> &Arc<dyn DecisionProvider> {
        &self.decision_provider
    }

    /// Interaction model of the device
    #[inline]
    #[must_use]
    pub fn form_factor(&self) -> FormFactor {
        self.form_factor
    }

    /// Interceptors in registration order
    #[inline]
    #[must_use]
    pub fn interceptors(&self) -> &[AgentInterceptor] {
        &self.interceptors
    }

    /// Directory screenshots are written to
    #[inline]
    #[must_use]
    pub fn screenshot_dir(&self) -> &Path {
        &self.screenshot_dir
    }

    /// Pause between steps
    #[inline]
    #[must_use]
    pub fn step_delay(&self) -> Duration {
        self.step_delay
    }
}

impl fmt::Debug for AgentConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfig")
            .field("form_factor", &self.form_factor)
            .field("interceptors", &self.interceptors)
            .field("screenshot_dir", &self.screenshot_dir)
            .field("step_delay", &self.step_delay)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AgentConfig`]
pub struct AgentConfigBuilder {
    device: Arc<dyn Device>,
    decision_provider: Arc<dyn DecisionProvider>,
    form_factor: FormFactor,
    interceptors: Vec<AgentInterceptor>,
    screenshot_dir: PathBuf,
    step_delay: Duration,
}

impl AgentConfigBuilder {
    /// Create builder with defaults: mobile, no interceptors, no step delay
    #[must_use]
    pub fn new(device: Arc<dyn Device>, decision_provider: Arc<dyn DecisionProvider>) -> Self {
        Self {
            device,
            decision_provider,
            form_factor: FormFactor::default(),
            interceptors: Vec::new(),
            screenshot_dir: std::env::temp_dir().join(DEFAULT_SCREENSHOT_DIR),
            step_delay: Duration::ZERO,
        }
    }

    /// With device
    #[inline]
    #[must_use]
    pub fn with_device(mut self, device: Arc<dyn Device>) -> Self {
        self.device = device;
        self
    }

    /// With decision provider
    #[inline]
    #[must_use]
    pub fn with_decision_provider(mut self, decision_provider: Arc<dyn DecisionProvider>) -> Self {
        self.decision_provider = decision_provider;
        self
    }

    /// With form factor
    #[inline]
    #[must_use]
    pub fn with_form_factor(mut self, form_factor: FormFactor) -> Self {
        self.form_factor = form_factor;
        self
    }

    /// With screenshot directory
    #[inline]
    #[must_use]
    pub fn with_screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshot_dir = dir.into();
        self
    }

    /// With pause between steps
    #[inline]
    #[must_use]
    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    /// Register an interceptor; later registrations wrap earlier ones
    #[inline]
    #[must_use]
    pub fn add_interceptor(mut self, interceptor: AgentInterceptor) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Register several interceptors in order
    #[must_use]
    pub fn add_interceptors(mut self, interceptors: impl IntoIterator<Item = AgentInterceptor>) -> Self {
        self.interceptors.extend(interceptors);
        self
    }

    /// Register an initializer interceptor
    #[must_use]
    pub fn add_initializer(
        self,
        interceptor: impl Interceptor<InitializerInput, InitializeResult> + 'static,
    ) -> Self {
        self.add_interceptor(AgentInterceptor::Initializer(Arc::new(interceptor)))
    }

    /// Register a decision interceptor
    #[must_use]
    pub fn add_decision_interceptor(
        self,
        interceptor: impl Interceptor<DecisionInput, DecisionResult> + 'static,
    ) -> Self {
        self.add_interceptor(AgentInterceptor::Decision(Arc::new(interceptor)))
    }

    /// Register an execute-commands interceptor
    #[must_use]
    pub fn add_execute_commands_interceptor(
        self,
        interceptor: impl Interceptor<ExecuteCommandsInput, ExecuteCommandsResult> + 'static,
    ) -> Self {
        self.add_interceptor(AgentInterceptor::ExecuteCommands(Arc::new(interceptor)))
    }

    /// Register a step interceptor
    #[must_use]
    pub fn add_step_interceptor(
        self,
        interceptor: impl Interceptor<StepInput, StepOutcome> + 'static,
    ) -> Self {
        self.add_interceptor(AgentInterceptor::Step(Arc::new(interceptor)))
    }

    /// Finish the config
    #[must_use]
    pub fn build(self) -> AgentConfig {
        AgentConfig {
            device: self.device,
            decision_provider: self.decision_provider,
            form_factor: self.form_factor,
            interceptors: self.interceptors,
            screenshot_dir: self.screenshot_dir,
            step_delay: self.step_delay,
        }
    }
}

impl fmt::Debug for AgentConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentConfigBuilder")
            .field("form_factor", &self.form_factor)
            .field("interceptors", &self.interceptors)
            .finish_non_exhaustive()
    }
}
