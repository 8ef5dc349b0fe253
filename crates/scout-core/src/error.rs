//! Error types for Scout Core
//!
//! Provides the error taxonomy of the agent loop:
//! - Device automation failures (recovered per command)
//! - Screenshot capture failures (recovered per step)
//! - Decision provider failures (terminate the current run)
//! - Cancellation (never surfaced as a failure to the caller)

/// Device automation error raised by a [`Device`](crate::device::Device)
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeviceError {
    /// A command could not be applied to the device
    #[error("command failed: {0}")]
    CommandFailed(String),

    /// The view hierarchy could not be dumped
    #[error("view hierarchy dump failed: {0}")]
    DumpFailed(String),

    /// The device is not reachable anymore
    #[error("device disconnected: {0}")]
    Disconnected(String),
}

impl DeviceError {
    /// Check if the failure only affects the command that raised it
    #[inline]
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CommandFailed(_))
    }
}

/// Screenshot capture error
#[derive(Debug, Clone, thiserror::Error)]
#[error("screenshot capture failed: {0}")]
pub struct CaptureError(pub String);

/// Decision provider error
#[derive(Debug, Clone, thiserror::Error)]
pub enum DecisionError {
    /// The provider could not be reached or answered with an error
    #[error("provider request failed: {0}")]
    RequestFailed(String),

    /// The provider answered but the answer is unusable
    #[error("invalid decision: {0}")]
    InvalidDecision(String),
}

/// Main agent error type
///
/// Every variant ends the current run of an agent; none of them propagate
/// past the [`Agent`](crate::agent::Agent) boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AgentError {
    /// Device failure outside of per-command isolation
    #[error("device error: {0}")]
    Device(#[from] DeviceError),

    /// Screenshot failure that an interceptor chose to escalate
    #[error("capture error: {0}")]
    Capture(#[from] CaptureError),

    /// Decision provider failure
    #[error("decision error: {0}")]
    Decision(#[from] DecisionError),

    /// Raised by interceptors that reject a step or an initialization
    #[error("interceptor rejected operation: {0}")]
    Rejected(String),

    /// The run panicked or its task failed unexpectedly
    #[error("internal error: {0}")]
    Internal(String),

    /// Cancelled
    #[error("operation cancelled")]
    Cancelled,
}

impl From<tokio::task::JoinError> for AgentError {
    fn from(value: tokio::task::JoinError) -> Self {
        if value.is_cancelled() {
            Self::Cancelled
        } else {
            Self::Internal(value.to_string())
        }
    }
}

impl AgentError {
    /// Check if the error is a cancellation rather than a failure
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
