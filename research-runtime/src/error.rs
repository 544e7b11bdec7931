/// Configuration problems detected before any research iteration runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("max_iterations must be at least 1")]
    ZeroMaxIterations,

    #[error("max_actions_per_iteration must be at least 1")]
    ZeroActionLimit,

    #[error("execution_timeout_secs must be at least 1 when set")]
    ZeroExecutionTimeout,

    #[error("research question must not be empty")]
    EmptyResearchQuestion,

    #[error("malformed domain '{0}': expected lowercase letters, digits, '_' or '-'")]
    MalformedDomain(String),

    #[error("invalid value for {key}: '{value}'")]
    InvalidOverride { key: String, value: String },

    #[error("config parse error: {0}")]
    Parse(String),
}

/// Violations of the research plan's mutation contracts.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("hypothesis '{0}' is already in the pool")]
    DuplicateHypothesis(String),

    #[error("hypothesis '{0}' is not in the pool")]
    UnknownHypothesis(String),

    #[error("experiment '{0}' is already queued")]
    DuplicateExperiment(String),
}

/// Errors produced by runtime operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
