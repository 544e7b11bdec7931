pub mod collaborators;
pub mod designer;
pub mod director;
pub mod error;
pub mod report;

pub use collaborators::{
    Analysis, CodeExecutor, Collaborators, ExperimentDesign, ExperimentDesigner,
    HypothesisGenerator, NoSkills, ResearchContext, ResultAnalyzer, SkillProvider, Verdict,
};
pub use designer::{DesignLimits, TemplateDesigner};
pub use director::ResearchDirector;
pub use error::{DirectorError, Result};
pub use report::{Finding, ReportFormat, RunReport};
