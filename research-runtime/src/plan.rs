use std::collections::BTreeSet;
use std::collections::VecDeque;

use chrono::DateTime;
use chrono::Utc;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::error::PlanError;
use crate::execution::ExecutionOutcome;

/// Broad category of experiment a hypothesis can be tested with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentType {
    Computational,
    DataAnalysis,
    LiteratureSynthesis,
}

impl ExperimentType {
    pub const ALL: [ExperimentType; 3] = [
        ExperimentType::Computational,
        ExperimentType::DataAnalysis,
        ExperimentType::LiteratureSynthesis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ExperimentType::Computational => "computational",
            ExperimentType::DataAnalysis => "data_analysis",
            ExperimentType::LiteratureSynthesis => "literature_synthesis",
        }
    }
}

impl std::fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExperimentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ExperimentType::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| format!("unknown experiment type: {s}"))
    }
}

/// A testable claim about the research domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    pub id: String,
    pub statement: String,
    pub domain: String,
    pub research_question: String,
    #[serde(default)]
    pub rationale: String,
    /// Set when this hypothesis was produced by refining another one.
    pub parent_id: Option<String>,
    #[serde(default)]
    pub suggested_experiment_types: Vec<ExperimentType>,
    pub created_at: DateTime<Utc>,
}

impl Hypothesis {
    pub fn new(
        id: impl Into<String>,
        statement: impl Into<String>,
        domain: impl Into<String>,
        research_question: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            statement: statement.into(),
            domain: domain.into(),
            research_question: research_question.into(),
            rationale: String::new(),
            parent_id: None,
            suggested_experiment_types: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = rationale.into();
        self
    }

    pub fn refined_from(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn suggesting(mut self, experiment_type: ExperimentType) -> Self {
        if !self.suggested_experiment_types.contains(&experiment_type) {
            self.suggested_experiment_types.push(experiment_type);
        }
        self
    }
}

/// A queued unit of work designed to test one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: String,
    pub hypothesis_id: String,
    pub protocol_name: String,
    pub code: String,
}

/// Outcome of running an experiment, awaiting analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub experiment_id: String,
    pub hypothesis_id: String,
    pub outcome: ExecutionOutcome,
    pub completed_at: DateTime<Utc>,
}

impl ExperimentResult {
    pub fn new(experiment: &Experiment, outcome: ExecutionOutcome) -> Self {
        Self {
            experiment_id: experiment.id.clone(),
            hypothesis_id: experiment.hypothesis_id.clone(),
            outcome,
            completed_at: Utc::now(),
        }
    }
}

/// Counts the decision table reads. Plain data so decisions can be tested
/// without building a plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanSnapshot {
    pub hypotheses: usize,
    pub untested_hypotheses: usize,
    pub queued_experiments: usize,
    pub pending_results: usize,
    pub iteration_count: u32,
    pub max_iterations: u32,
}

impl PlanSnapshot {
    /// Any queued experiment, unanalyzed result, or untested hypothesis left.
    pub fn has_remaining_work(&self) -> bool {
        self.queued_experiments > 0 || self.pending_results > 0 || self.untested_hypotheses > 0
    }

    pub fn iterations_exhausted(&self) -> bool {
        self.iteration_count >= self.max_iterations
    }
}

/// Mutable state of one research run. Single owner: the orchestrator driving it.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchPlan {
    research_question: String,
    hypothesis_pool: IndexMap<String, Hypothesis>,
    tested_hypotheses: BTreeSet<String>,
    experiment_queue: VecDeque<Experiment>,
    results: VecDeque<ExperimentResult>,
    iteration_count: u32,
    max_iterations: u32,
}

impl ResearchPlan {
    pub fn new(research_question: &str, max_iterations: u32) -> Result<Self, ConfigError> {
        if research_question.trim().is_empty() {
            return Err(ConfigError::EmptyResearchQuestion);
        }
        if max_iterations == 0 {
            return Err(ConfigError::ZeroMaxIterations);
        }
        Ok(Self {
            research_question: research_question.to_string(),
            hypothesis_pool: IndexMap::new(),
            tested_hypotheses: BTreeSet::new(),
            experiment_queue: VecDeque::new(),
            results: VecDeque::new(),
            iteration_count: 0,
            max_iterations,
        })
    }

    pub fn research_question(&self) -> &str {
        &self.research_question
    }

    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    // -- hypotheses ---------------------------------------------------------

    pub fn add_hypothesis(&mut self, hypothesis: Hypothesis) -> Result<(), PlanError> {
        if self.hypothesis_pool.contains_key(&hypothesis.id) {
            return Err(PlanError::DuplicateHypothesis(hypothesis.id));
        }
        self.hypothesis_pool
            .insert(hypothesis.id.clone(), hypothesis);
        Ok(())
    }

    pub fn hypothesis(&self, id: &str) -> Option<&Hypothesis> {
        self.hypothesis_pool.get(id)
    }

    /// All hypotheses in insertion order.
    pub fn hypotheses(&self) -> impl Iterator<Item = &Hypothesis> {
        self.hypothesis_pool.values()
    }

    pub fn hypothesis_count(&self) -> usize {
        self.hypothesis_pool.len()
    }

    pub fn tested_hypotheses(&self) -> &BTreeSet<String> {
        &self.tested_hypotheses
    }

    /// Pool minus tested, in insertion order.
    pub fn get_untested_hypotheses(&self) -> Vec<&Hypothesis> {
        self.hypothesis_pool
            .values()
            .filter(|h| !self.tested_hypotheses.contains(&h.id))
            .collect()
    }

    pub fn mark_tested(&mut self, hypothesis_id: &str) -> Result<bool, PlanError> {
        if !self.hypothesis_pool.contains_key(hypothesis_id) {
            return Err(PlanError::UnknownHypothesis(hypothesis_id.to_string()));
        }
        Ok(self.tested_hypotheses.insert(hypothesis_id.to_string()))
    }

    // -- experiments --------------------------------------------------------

    pub fn enqueue_experiment(&mut self, experiment: Experiment) -> Result<(), PlanError> {
        if !self.hypothesis_pool.contains_key(&experiment.hypothesis_id) {
            return Err(PlanError::UnknownHypothesis(experiment.hypothesis_id));
        }
        if self.experiment_queue.iter().any(|e| e.id == experiment.id) {
            return Err(PlanError::DuplicateExperiment(experiment.id));
        }
        self.experiment_queue.push_back(experiment);
        Ok(())
    }

    /// Remove the next experiment from the queue as it begins execution.
    pub fn start_next_experiment(&mut self) -> Option<Experiment> {
        self.experiment_queue.pop_front()
    }

    pub fn experiment_queue(&self) -> &VecDeque<Experiment> {
        &self.experiment_queue
    }

    pub fn has_queued_experiment_for(&self, hypothesis_id: &str) -> bool {
        self.experiment_queue
            .iter()
            .any(|e| e.hypothesis_id == hypothesis_id)
    }

    // -- results ------------------------------------------------------------

    pub fn record_result(&mut self, result: ExperimentResult) {
        self.results.push_back(result);
    }

    /// Remove the oldest unanalyzed result as analysis consumes it.
    pub fn take_next_result(&mut self) -> Option<ExperimentResult> {
        self.results.pop_front()
    }

    pub fn results(&self) -> &VecDeque<ExperimentResult> {
        &self.results
    }

    // -- iteration ----------------------------------------------------------

    /// Close one outer pass. Call exactly once per pass.
    pub fn complete_iteration(&mut self) -> u32 {
        self.iteration_count += 1;
        self.iteration_count
    }

    pub fn has_remaining_work(&self) -> bool {
        self.snapshot().has_remaining_work()
    }

    pub fn snapshot(&self) -> PlanSnapshot {
        let untested = self
            .hypothesis_pool
            .keys()
            .filter(|id| !self.tested_hypotheses.contains(*id))
            .count();
        PlanSnapshot {
            hypotheses: self.hypothesis_pool.len(),
            untested_hypotheses: untested,
            queued_experiments: self.experiment_queue.len(),
            pending_results: self.results.len(),
            iteration_count: self.iteration_count,
            max_iterations: self.max_iterations,
        }
    }
}
