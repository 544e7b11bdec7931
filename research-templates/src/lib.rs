pub mod builtin;
pub mod error;
pub mod registry;
pub mod template;

pub use builtin::{CorrelationTemplate, TTestComparisonTemplate, default_registry};
pub use error::{Result, TemplateError};
pub use registry::{RegistryStatistics, TemplateRegistry};
pub use template::{
    ControlGroup, CustomizationParams, ExperimentProtocol, ExperimentTemplate, ProtocolStep,
    ResourceRequirements, TemplateMetadata, ValidationReport, Variable, VariableKind,
};
