//! Device driver capability
//!
//! The concrete automation protocol lives outside this crate; the agent only
//! needs to run command batches, dump view hierarchies and capture screenshots.

use crate::command::Command;
use crate::error::{CaptureError, DeviceError};
use std::path::Path;

/// Device driver consumed by the agent
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait Device: Send + Sync {
    /// Apply a batch of commands in order
    async fn execute_commands(&self, commands: &[Command]) -> Result<(), DeviceError>;

    /// Dump the current view hierarchy as structured text
    async fn view_tree(&self) -> Result<String, DeviceError>;

    /// Dump the focus-only view tree (directional-pad devices)
    async fn focused_tree(&self) -> Result<String, DeviceError>;

    /// Write a screenshot to `path`
    async fn capture_screenshot(&self, path: &Path) -> Result<(), CaptureError>;
}
