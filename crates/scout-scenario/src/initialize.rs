//! Device reset run before an agent starts stepping
//!
//! A scenario lists [`InitializeMethod`]s; [`InitializeInterceptor`] turns
//! them into device commands on the initializer chain of every agent
//! created for that scenario's task.

use scout_core::interceptor::{InitializeResult, InitializerInput};
use scout_core::{Command, Interceptor, Next};
use serde::{Deserialize, Serialize};

/// One device reset action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum InitializeMethod {
    /// Press back `times` times
    Back {
        /// Number of presses
        times: u32,
    },
    /// Let the device settle
    Wait {
        /// Pause in milliseconds
        duration_ms: u64,
    },
    /// Start an application
    LaunchApp {
        /// Application (package) id
        app_id: String,
    },
    /// Wipe an application's data
    ClearAppData {
        /// Application (package) id
        app_id: String,
    },
    /// Open a deep link
    OpenLink {
        /// Link or URL
        link: String,
    },
    /// Do nothing
    Noop,
}

impl InitializeMethod {
    /// Device commands that carry out this method, in order
    #[must_use]
    pub fn commands(&self) -> Vec<Command> {
        match self {
            Self::Back { times } => (0..*times).map(|_| Command::BackPress).collect(),
            Self::Wait { duration_ms } => vec![Command::Wait {
                duration_ms: *duration_ms,
            }],
            Self::LaunchApp { app_id } => vec![Command::LaunchApp {
                app_id: app_id.clone(),
            }],
            Self::ClearAppData { app_id } => vec![Command::ClearAppData {
                app_id: app_id.clone(),
            }],
            Self::OpenLink { link } => vec![Command::OpenLink { link: link.clone() }],
            Self::Noop => Vec::new(),
        }
    }
}

/// Initializer interceptor applying a list of reset methods
///
/// Failed reset commands are logged and skipped; the agent run continues.
#[derive(Debug, Clone, Default)]
pub struct InitializeInterceptor {
    methods: Vec<InitializeMethod>,
}

impl InitializeInterceptor {
    /// Create from methods in run order
    #[must_use]
    pub fn new(methods: Vec<InitializeMethod>) -> Self {
        Self { methods }
    }

    /// Methods in run order
    #[must_use]
    pub fn methods(&self) -> &[InitializeMethod] {
        &self.methods
    }
}

#[async_trait::async_trait]
impl Interceptor<InitializerInput, InitializeResult> for InitializeInterceptor {
    async fn intercept(
        &self,
        input: InitializerInput,
        next: Next<'_, InitializerInput, InitializeResult>,
    ) -> InitializeResult {
        for method in &self.methods {
            for command in method.commands() {
                if let Err(e) = input
                    .device
                    .execute_commands(std::slice::from_ref(&command))
                    .await
                {
                    tracing::warn!(
                        agent = %input.agent_id,
                        command = %command,
                        error = %e,
                        "initialize command failed, continuing"
                    );
                }
            }
        }
        next.proceed(input).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn back_expands_to_presses() {
        let method = InitializeMethod::Back { times: 3 };
        assert_eq!(method.commands(), vec![Command::BackPress; 3]);
        assert!(InitializeMethod::Noop.commands().is_empty());
    }

    #[test]
    fn methods_parse_from_yaml() {
        let methods: Vec<InitializeMethod> = serde_yaml::from_str(
            "- { type: LaunchApp, appId: com.example }\n- { type: Wait, durationMs: 500 }\n- type: Noop\n",
        )
        .unwrap();
        assert_eq!(
            methods,
            vec![
                InitializeMethod::LaunchApp {
                    app_id: "com.example".into()
                },
                InitializeMethod::Wait { duration_ms: 500 },
                InitializeMethod::Noop,
            ]
        );
    }
}
