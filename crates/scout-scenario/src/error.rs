//! Error types for scenario resolution and project loading

/// Scenario-level error
///
/// Raised while building a run plan, before any agent starts. Running a
/// scenario never fails with this type; unsuccessful runs are reported in
/// [`ScenarioOutcome`](crate::executor::ScenarioOutcome).
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The dependency declarations form a cycle
    #[error("dependency cycle detected: {}", path.join(" -> "))]
    CycleDetected {
        /// Scenario ids along the cycle, first id repeated at the end
        path: Vec<String>,
    },

    /// A scenario id or dependency does not exist
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    /// Two scenarios share an id
    #[error("duplicate scenario id: {0}")]
    DuplicateScenario(String),

    /// Project file is not valid YAML for the expected schema
    #[error("invalid project file: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Project file could not be read
    #[error("cannot read project file: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for scenario operations
pub type Result<T> = std::result::Result<T, ScenarioError>;
