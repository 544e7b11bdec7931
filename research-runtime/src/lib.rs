pub mod config;
pub mod controller;
pub mod error;
pub mod execution;
pub mod guardrails;
pub mod plan;
pub mod workflow;

pub use config::{
    DomainCheck, ExecutionFailurePolicy, ResearchConfig, default_enabled_domains,
    normalize_domain, validate_domain,
};
pub use controller::{Decision, ResearchLoopController, decide};
pub use error::{ConfigError, PlanError, Result, RuntimeError};
pub use execution::{CellOutput, ExecutionOutcome};
pub use guardrails::{ActionCounter, ConvergenceReason, MAX_ACTIONS_PER_ITERATION, SafetyLimits};
pub use plan::{
    Experiment, ExperimentResult, ExperimentType, Hypothesis, PlanSnapshot, ResearchPlan,
};
pub use workflow::{NextAction, Transition, Workflow, WorkflowState};
