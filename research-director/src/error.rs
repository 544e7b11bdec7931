use std::time::Duration;

use research_runtime::ConfigError;
use research_runtime::PlanError;
use research_templates::TemplateError;

/// Errors produced while setting up or driving a research run.
#[derive(Debug, thiserror::Error)]
pub enum DirectorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Plan(#[from] PlanError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("{role} failed: {message}")]
    Collaborator { role: &'static str, message: String },

    #[error("execution timed out after {0:?}")]
    Timeout(Duration),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl DirectorError {
    pub fn collaborator(role: &'static str, message: impl Into<String>) -> Self {
        Self::Collaborator {
            role,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DirectorError>;
