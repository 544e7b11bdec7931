/// Errors produced by template registration and protocol generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("invalid template: {}", .0.join(", "))]
    Invalid(Vec<String>),

    #[error("template '{0}' already registered")]
    Duplicate(String),

    #[error("template '{template}' does not apply to hypothesis '{hypothesis_id}'")]
    NotApplicable {
        template: String,
        hypothesis_id: String,
    },

    #[error("estimated {resource} of {estimated} exceeds the limit of {limit}")]
    ResourceLimitExceeded {
        resource: &'static str,
        estimated: f64,
        limit: f64,
    },
}

pub type Result<T> = std::result::Result<T, TemplateError>;
