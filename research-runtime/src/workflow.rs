use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Lifecycle phase of a research run. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Initializing,
    GeneratingHypotheses,
    DesigningExperiments,
    Executing,
    Analyzing,
    /// Terminal. Every action maps back here.
    Converged,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 6] = [
        WorkflowState::Initializing,
        WorkflowState::GeneratingHypotheses,
        WorkflowState::DesigningExperiments,
        WorkflowState::Executing,
        WorkflowState::Analyzing,
        WorkflowState::Converged,
    ];

    pub fn is_terminal(self) -> bool {
        self == WorkflowState::Converged
    }

    /// State the run enters once `action` has been carried out.
    pub fn after(self, action: NextAction) -> WorkflowState {
        if self.is_terminal() {
            return WorkflowState::Converged;
        }
        match action {
            NextAction::GenerateHypothesis => WorkflowState::GeneratingHypotheses,
            NextAction::DesignExperiment => WorkflowState::DesigningExperiments,
            NextAction::ExecuteExperiment => WorkflowState::Executing,
            NextAction::AnalyzeResult => WorkflowState::Analyzing,
            // Refined hypotheses re-enter the pool and go through design again.
            NextAction::RefineHypothesis => WorkflowState::GeneratingHypotheses,
            NextAction::Converge => WorkflowState::Converged,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Initializing => "initializing",
            WorkflowState::GeneratingHypotheses => "generating_hypotheses",
            WorkflowState::DesigningExperiments => "designing_experiments",
            WorkflowState::Executing => "executing",
            WorkflowState::Analyzing => "analyzing",
            WorkflowState::Converged => "converged",
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        WorkflowState::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| format!("unknown workflow state: {s}"))
    }
}

/// Closed set of actions the controller can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    GenerateHypothesis,
    DesignExperiment,
    ExecuteExperiment,
    AnalyzeResult,
    RefineHypothesis,
    Converge,
}

impl NextAction {
    /// Whether carrying out this action closes one outer research cycle.
    ///
    /// A cycle ends once evidence has been evaluated or the hypothesis set
    /// has been revised; the orchestrator bumps `iteration_count` exactly
    /// once when this returns true.
    pub fn completes_iteration(self) -> bool {
        matches!(self, NextAction::AnalyzeResult | NextAction::RefineHypothesis)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NextAction::GenerateHypothesis => "generate_hypothesis",
            NextAction::DesignExperiment => "design_experiment",
            NextAction::ExecuteExperiment => "execute_experiment",
            NextAction::AnalyzeResult => "analyze_result",
            NextAction::RefineHypothesis => "refine_hypothesis",
            NextAction::Converge => "converge",
        }
    }
}

impl std::fmt::Display for NextAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded move of the workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub action: NextAction,
    pub at: DateTime<Utc>,
}

/// Tracks the current lifecycle state of a research run.
#[derive(Debug, Clone)]
pub struct Workflow {
    current: WorkflowState,
    history: Vec<Transition>,
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            current: WorkflowState::Initializing,
            history: Vec::new(),
        }
    }

    pub fn current_state(&self) -> WorkflowState {
        self.current
    }

    /// Move to the state that follows a completed `action`.
    pub fn apply(&mut self, action: NextAction) -> WorkflowState {
        let from = self.current;
        let to = from.after(action);
        if from != to {
            tracing::info!(from = %from, to = %to, action = %action, "workflow transition");
        }
        self.history.push(Transition {
            from,
            to,
            action,
            at: Utc::now(),
        });
        self.current = to;
        to
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    pub fn is_converged(&self) -> bool {
        self.current.is_terminal()
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        let workflow = Workflow::new();
        assert_eq!(workflow.current_state(), WorkflowState::Initializing);
        assert!(workflow.history().is_empty());
        assert!(!workflow.is_converged());
    }

    #[test]
    fn test_action_transitions() {
        let mut workflow = Workflow::new();

        workflow.apply(NextAction::GenerateHypothesis);
        assert_eq!(workflow.current_state(), WorkflowState::GeneratingHypotheses);

        workflow.apply(NextAction::DesignExperiment);
        assert_eq!(workflow.current_state(), WorkflowState::DesigningExperiments);

        workflow.apply(NextAction::ExecuteExperiment);
        assert_eq!(workflow.current_state(), WorkflowState::Executing);

        workflow.apply(NextAction::AnalyzeResult);
        assert_eq!(workflow.current_state(), WorkflowState::Analyzing);

        workflow.apply(NextAction::RefineHypothesis);
        assert_eq!(workflow.current_state(), WorkflowState::GeneratingHypotheses);

        workflow.apply(NextAction::Converge);
        assert_eq!(workflow.current_state(), WorkflowState::Converged);
        assert_eq!(workflow.history().len(), 6);
    }

    #[test]
    fn test_converged_is_absorbing() {
        let mut workflow = Workflow::new();
        workflow.apply(NextAction::Converge);
        for action in [
            NextAction::GenerateHypothesis,
            NextAction::ExecuteExperiment,
            NextAction::RefineHypothesis,
        ] {
            assert_eq!(workflow.apply(action), WorkflowState::Converged);
        }
        assert!(workflow.is_converged());
    }

    #[test]
    fn test_history_records_from_and_to() {
        let mut workflow = Workflow::new();
        workflow.apply(NextAction::GenerateHypothesis);
        let t = &workflow.history()[0];
        assert_eq!(t.from, WorkflowState::Initializing);
        assert_eq!(t.to, WorkflowState::GeneratingHypotheses);
        assert_eq!(t.action, NextAction::GenerateHypothesis);
    }

    #[test]
    fn test_iteration_boundaries() {
        assert!(NextAction::AnalyzeResult.completes_iteration());
        assert!(NextAction::RefineHypothesis.completes_iteration());
        assert!(!NextAction::GenerateHypothesis.completes_iteration());
        assert!(!NextAction::DesignExperiment.completes_iteration());
        assert!(!NextAction::ExecuteExperiment.completes_iteration());
        assert!(!NextAction::Converge.completes_iteration());
    }

    #[test]
    fn test_state_parsing() {
        assert_eq!(
            "designing_experiments".parse::<WorkflowState>(),
            Ok(WorkflowState::DesigningExperiments)
        );
        assert_eq!(
            "EXECUTING".parse::<WorkflowState>(),
            Ok(WorkflowState::Executing)
        );
        assert_eq!(
            "generating-hypotheses".parse::<WorkflowState>(),
            Ok(WorkflowState::GeneratingHypotheses)
        );
        assert!("sleeping".parse::<WorkflowState>().is_err());
    }

    #[test]
    fn test_serialization_matches_display() {
        for state in WorkflowState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
        let json = serde_json::to_string(&NextAction::RefineHypothesis).unwrap();
        assert_eq!(json, "\"refine_hypothesis\"");
    }
}
