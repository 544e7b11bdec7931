//! Interfaces to the agents a run delegates to.
//!
//! Each collaborator is injected into the director as an `Arc<dyn ...>`;
//! nothing here is process-global, so concurrent or test runs never share
//! hidden state.

use std::sync::Arc;

use async_trait::async_trait;
use research_runtime::ExecutionOutcome;
use research_runtime::Experiment;
use research_runtime::ExperimentResult;
use research_runtime::Hypothesis;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;

/// What a collaborator is told about the run it is serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchContext {
    pub research_question: String,
    pub domain: String,
    /// Completed research cycles so far.
    pub iteration: u32,
    pub max_iterations: u32,
    /// Domain guidance loaded once per run. Empty when none is available.
    #[serde(default)]
    pub skills: String,
}

/// An experiment as proposed by a designer, before the director assigns it an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentDesign {
    pub protocol_name: String,
    pub code: String,
}

/// A concluded reading of the evidence. There is no "inconclusive" verdict:
/// that is an [`Analysis`] without one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Supported,
    Refuted,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Supported => "supported",
            Verdict::Refuted => "refuted",
        }
    }
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An analyzer's reading of one result. `verdict` is None when the analysis
/// could not reach a conclusion; the hypothesis then stays untested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    pub verdict: Option<Verdict>,
    pub summary: String,
}

impl Analysis {
    pub fn concluded(verdict: Verdict, summary: impl Into<String>) -> Self {
        Self {
            verdict: Some(verdict),
            summary: summary.into(),
        }
    }

    pub fn inconclusive(summary: impl Into<String>) -> Self {
        Self {
            verdict: None,
            summary: summary.into(),
        }
    }
}

#[async_trait]
pub trait HypothesisGenerator: Send + Sync {
    async fn generate(&self, ctx: &ResearchContext) -> Result<Vec<Hypothesis>>;

    /// Propose successors to `hypothesis` in light of what has been learned.
    async fn refine(&self, hypothesis: &Hypothesis, ctx: &ResearchContext)
    -> Result<Vec<Hypothesis>>;
}

#[async_trait]
pub trait ExperimentDesigner: Send + Sync {
    async fn design(&self, hypothesis: &Hypothesis, ctx: &ResearchContext)
    -> Result<ExperimentDesign>;
}

#[async_trait]
pub trait CodeExecutor: Send + Sync {
    async fn execute(&self, experiment: &Experiment) -> Result<ExecutionOutcome>;
}

#[async_trait]
pub trait ResultAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        result: &ExperimentResult,
        hypothesis: &Hypothesis,
        ctx: &ResearchContext,
    ) -> Result<Analysis>;
}

/// Supplies domain-specific guidance that is handed to every collaborator.
#[async_trait]
pub trait SkillProvider: Send + Sync {
    async fn load_skills(&self, task: &str, domain: &str) -> Result<String>;
}

/// A provider with nothing to offer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSkills;

#[async_trait]
impl SkillProvider for NoSkills {
    async fn load_skills(&self, _task: &str, _domain: &str) -> Result<String> {
        Ok(String::new())
    }
}

/// The full set of collaborators one run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn HypothesisGenerator>,
    pub designer: Arc<dyn ExperimentDesigner>,
    pub executor: Arc<dyn CodeExecutor>,
    pub analyzer: Arc<dyn ResultAnalyzer>,
    pub skills: Arc<dyn SkillProvider>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
