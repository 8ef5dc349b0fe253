//! Scout Core - goal-directed UI exploration agent
//!
//! The agent that:
//! - Captures device state (screenshot, view hierarchy)
//! - Asks a decision provider for the next commands
//! - Applies them to the device, isolating per-command failures
//! - Records every step until the goal is achieved or the budget runs out
//!
//! Every externally visible operation runs through one of four interception
//! chains (initialize, decide, execute commands, step).
//!
//! # Example
//!
//! ```rust,ignore
//! use scout_core::prelude::*;
//!
//! # async fn example(device: Arc<dyn Device>, ai: Arc<dyn DecisionProvider>) {
//! let config = AgentConfig::builder(device, ai)
//!     .add_interceptors(LoggingInterceptor::all())
//!     .build();
//! let agent = Agent::new(config, tokio::runtime::Handle::current());
//!
//! let vocabulary = CommandVocabulary::for_form_factor(FormFactor::Mobile);
//! let status = agent.execute("Open the settings screen", 10, vocabulary).await;
//! println!("archived: {}", agent.is_archived());
//! # }
//! ```

#![warn(unreachable_pub)]

// Core modules
pub mod agent;
pub mod chain;
pub mod command;
pub mod config;
pub mod context;
pub mod decision;
pub mod device;
pub mod error;
pub mod interceptor;
pub mod logging;
mod step;

// Re-exports for convenience
pub use agent::{Agent, AgentId, AgentReport, RunStatus, DEFAULT_MAX_STEP};
pub use chain::{Chain, Interceptor, Next};
pub use command::{Command, CommandKind, CommandVocabulary, FormFactor, ScrollDirection};
pub use config::{AgentConfig, AgentConfigBuilder};
pub use context::{ContextHistory, ContextSnapshot, Step};
pub use decision::{Decision, DecisionInput, DecisionOutput, DecisionProvider};
pub use device::Device;
pub use error::{AgentError, CaptureError, DecisionError, DeviceError};
pub use interceptor::{
    AgentInterceptor, DecisionResult, ExecuteCommandsInput, ExecuteCommandsOutput,
    ExecuteCommandsResult, InitializeResult, InitializerInput, LoggingInterceptor, StepInput,
    StepOutcome, StepResult,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Scout Core
    pub use crate::{
        Agent, AgentConfig, AgentInterceptor, Command, CommandVocabulary, Decision,
        DecisionProvider, Device, FormFactor, Interceptor, LoggingInterceptor, Next, RunStatus,
    };
    pub use std::sync::Arc;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
