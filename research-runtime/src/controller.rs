//! The research loop controller: picks the single next action for a run.
//!
//! The decision itself is the pure function [`decide`], a table from
//! `(state, plan snapshot, action count)` to [`Decision`]. Two safety checks
//! run before the table: the per-iteration action limit and the global
//! iteration limit. Past those, convergence is only chosen when no queued
//! experiment, unanalyzed result, or untested hypothesis remains.

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::guardrails::ActionCounter;
use crate::guardrails::ConvergenceReason;
use crate::guardrails::SafetyLimits;
use crate::plan::PlanSnapshot;
use crate::plan::ResearchPlan;
use crate::workflow::NextAction;
use crate::workflow::WorkflowState;

/// The outcome of one decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub action: NextAction,
    /// Set when `action` is `Converge` and the cause is known.
    pub convergence_reason: Option<ConvergenceReason>,
    /// True when a safety limit overrode the table.
    pub forced: bool,
}

impl Decision {
    fn act(action: NextAction) -> Self {
        Self {
            action,
            convergence_reason: None,
            forced: false,
        }
    }

    fn converge(reason: ConvergenceReason) -> Self {
        Self {
            action: NextAction::Converge,
            convergence_reason: Some(reason),
            forced: reason.is_forced(),
        }
    }
}

/// Decide the next action. Total over every input; never panics.
pub fn decide(
    state: WorkflowState,
    plan: &PlanSnapshot,
    actions_this_iteration: u32,
    limits: &SafetyLimits,
) -> Decision {
    if actions_this_iteration >= limits.max_actions_per_iteration {
        return Decision::converge(ConvergenceReason::ActionLimitExceeded);
    }
    if plan.iterations_exhausted() {
        return Decision::converge(ConvergenceReason::IterationLimitExceeded);
    }

    let has_queue = plan.queued_experiments > 0;
    let has_results = plan.pending_results > 0;
    let has_untested = plan.untested_hypotheses > 0;

    let action = match state {
        WorkflowState::Initializing => NextAction::GenerateHypothesis,
        WorkflowState::GeneratingHypotheses => {
            if plan.hypotheses == 0 {
                NextAction::GenerateHypothesis
            } else {
                NextAction::DesignExperiment
            }
        }
        WorkflowState::DesigningExperiments => {
            if has_queue {
                NextAction::ExecuteExperiment
            } else if has_untested {
                NextAction::DesignExperiment
            } else if has_results {
                NextAction::AnalyzeResult
            } else {
                NextAction::Converge
            }
        }
        WorkflowState::Executing => {
            if has_queue {
                NextAction::ExecuteExperiment
            } else if has_results {
                NextAction::AnalyzeResult
            } else {
                // Executor consumed its work and produced nothing usable.
                NextAction::RefineHypothesis
            }
        }
        WorkflowState::Analyzing => {
            if has_results {
                NextAction::AnalyzeResult
            } else if has_queue {
                NextAction::ExecuteExperiment
            } else if has_untested {
                NextAction::RefineHypothesis
            } else {
                NextAction::Converge
            }
        }
        WorkflowState::Converged => {
            return Decision {
                action: NextAction::Converge,
                convergence_reason: (!plan.has_remaining_work())
                    .then_some(ConvergenceReason::NoWorkRemaining),
                forced: false,
            };
        }
    };

    if action == NextAction::Converge {
        Decision::converge(ConvergenceReason::NoWorkRemaining)
    } else {
        Decision::act(action)
    }
}

/// Owns the per-iteration action counter and applies [`decide`].
#[derive(Debug, Clone)]
pub struct ResearchLoopController {
    limits: SafetyLimits,
    counter: ActionCounter,
    last_decision: Option<Decision>,
}

impl ResearchLoopController {
    pub fn new(limits: SafetyLimits) -> Result<Self, ConfigError> {
        if limits.max_actions_per_iteration == 0 {
            return Err(ConfigError::ZeroActionLimit);
        }
        Ok(Self {
            limits,
            counter: ActionCounter::new(),
            last_decision: None,
        })
    }

    /// Resume with a per-iteration count already on the books.
    pub fn with_actions_this_iteration(mut self, actions: u32) -> Self {
        self.counter = ActionCounter::starting_at(actions);
        self
    }

    /// Name the next action for `plan` and count the decision.
    pub fn decide_next_action(&mut self, state: WorkflowState, plan: &ResearchPlan) -> NextAction {
        self.decide_from_snapshot(state, &plan.snapshot()).action
    }

    /// Same as [`Self::decide_next_action`], returning the full decision.
    pub fn decide_from_snapshot(&mut self, state: WorkflowState, plan: &PlanSnapshot) -> Decision {
        let decision = decide(state, plan, self.counter.this_iteration(), &self.limits);
        let count = self.counter.record();
        tracing::debug!(
            state = %state,
            action = %decision.action,
            actions_this_iteration = count,
            forced = decision.forced,
            "decided next action"
        );
        if let Some(reason) = decision.convergence_reason.filter(|_| decision.forced) {
            tracing::warn!(reason = %reason, "forcing convergence");
        }
        self.last_decision = Some(decision);
        decision
    }

    /// Reset the per-iteration counter (call at the start of each iteration).
    pub fn begin_iteration(&mut self) {
        self.counter.reset_iteration();
    }

    pub fn actions_this_iteration(&self) -> u32 {
        self.counter.this_iteration()
    }

    pub fn total_actions(&self) -> u64 {
        self.counter.total()
    }

    pub fn last_decision(&self) -> Option<Decision> {
        self.last_decision
    }

    pub fn limits(&self) -> &SafetyLimits {
        &self.limits
    }
}

impl Default for ResearchLoopController {
    fn default() -> Self {
        Self {
            limits: SafetyLimits::default(),
            counter: ActionCounter::new(),
            last_decision: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guardrails::MAX_ACTIONS_PER_ITERATION;
    use crate::plan::Experiment;
    use crate::plan::Hypothesis;

    fn snapshot(hypotheses: usize, untested: usize, queued: usize, results: usize) -> PlanSnapshot {
        PlanSnapshot {
            hypotheses,
            untested_hypotheses: untested,
            queued_experiments: queued,
            pending_results: results,
            iteration_count: 0,
            max_iterations: 10,
        }
    }

    fn action(state: WorkflowState, plan: PlanSnapshot) -> NextAction {
        decide(state, &plan, 0, &SafetyLimits::default()).action
    }

    #[test]
    fn test_designing_with_queued_experiments_executes() {
        let plan = snapshot(1, 0, 2, 0);
        assert_eq!(
            action(WorkflowState::DesigningExperiments, plan),
            NextAction::ExecuteExperiment
        );
    }

    #[test]
    fn test_designing_prefers_untested_over_stale_results() {
        let plan = snapshot(1, 1, 0, 1);
        assert_eq!(
            action(WorkflowState::DesigningExperiments, plan),
            NextAction::DesignExperiment
        );
    }

    #[test]
    fn test_designing_with_only_results_analyzes() {
        let plan = snapshot(1, 0, 0, 1);
        assert_eq!(
            action(WorkflowState::DesigningExperiments, plan),
            NextAction::AnalyzeResult
        );
    }

    #[test]
    fn test_designing_empty_converges() {
        let plan = snapshot(1, 0, 0, 0);
        let decision = decide(
            WorkflowState::DesigningExperiments,
            &plan,
            0,
            &SafetyLimits::default(),
        );
        assert_eq!(decision.action, NextAction::Converge);
        assert_eq!(
            decision.convergence_reason,
            Some(ConvergenceReason::NoWorkRemaining)
        );
        assert!(!decision.forced);
    }

    #[test]
    fn test_executing_transitions() {
        assert_eq!(
            action(WorkflowState::Executing, snapshot(1, 0, 1, 0)),
            NextAction::ExecuteExperiment
        );
        assert_eq!(
            action(WorkflowState::Executing, snapshot(1, 1, 0, 1)),
            NextAction::AnalyzeResult
        );
        // Stuck state: nothing queued, nothing produced.
        assert_eq!(
            action(WorkflowState::Executing, snapshot(1, 1, 0, 0)),
            NextAction::RefineHypothesis
        );
    }

    #[test]
    fn test_analyzing_transitions() {
        assert_eq!(
            action(WorkflowState::Analyzing, snapshot(1, 1, 0, 1)),
            NextAction::AnalyzeResult
        );
        assert_eq!(
            action(WorkflowState::Analyzing, snapshot(1, 0, 1, 0)),
            NextAction::ExecuteExperiment
        );
        assert_eq!(
            action(WorkflowState::Analyzing, snapshot(1, 1, 0, 0)),
            NextAction::RefineHypothesis
        );
        assert_eq!(
            action(WorkflowState::Analyzing, snapshot(1, 0, 0, 0)),
            NextAction::Converge
        );
    }

    #[test]
    fn test_generating_and_initializing() {
        assert_eq!(
            action(WorkflowState::Initializing, snapshot(3, 3, 1, 1)),
            NextAction::GenerateHypothesis
        );
        assert_eq!(
            action(WorkflowState::GeneratingHypotheses, snapshot(0, 0, 0, 0)),
            NextAction::GenerateHypothesis
        );
        assert_eq!(
            action(WorkflowState::GeneratingHypotheses, snapshot(2, 2, 0, 0)),
            NextAction::DesignExperiment
        );
    }

    #[test]
    fn test_converged_is_idempotent() {
        let done = decide(
            WorkflowState::Converged,
            &snapshot(1, 0, 0, 0),
            0,
            &SafetyLimits::default(),
        );
        assert_eq!(done.action, NextAction::Converge);
        assert_eq!(
            done.convergence_reason,
            Some(ConvergenceReason::NoWorkRemaining)
        );

        let with_work = decide(
            WorkflowState::Converged,
            &snapshot(1, 1, 0, 0),
            0,
            &SafetyLimits::default(),
        );
        assert_eq!(with_work.action, NextAction::Converge);
        assert_eq!(with_work.convergence_reason, None);
    }

    #[test]
    fn test_action_limit_forces_convergence_in_every_state() {
        let limits = SafetyLimits::default();
        for state in WorkflowState::ALL {
            let decision = decide(
                state,
                &snapshot(2, 2, 2, 2),
                MAX_ACTIONS_PER_ITERATION + 1,
                &limits,
            );
            assert_eq!(decision.action, NextAction::Converge, "state {state}");
            assert_eq!(
                decision.convergence_reason,
                Some(ConvergenceReason::ActionLimitExceeded)
            );
            assert!(decision.forced);
        }
        // The limit itself already trips.
        let at_limit = decide(
            WorkflowState::Executing,
            &snapshot(1, 1, 1, 0),
            MAX_ACTIONS_PER_ITERATION,
            &limits,
        );
        assert_eq!(at_limit.action, NextAction::Converge);
    }

    #[test]
    fn test_iteration_limit_forces_convergence() {
        let mut plan = snapshot(2, 2, 2, 2);
        plan.iteration_count = 10;
        plan.max_iterations = 10;
        for state in WorkflowState::ALL {
            let decision = decide(state, &plan, 0, &SafetyLimits::default());
            assert_eq!(decision.action, NextAction::Converge);
            assert_eq!(
                decision.convergence_reason,
                Some(ConvergenceReason::IterationLimitExceeded)
            );
        }
    }

    #[test]
    fn test_action_limit_checked_before_iteration_limit() {
        let mut plan = snapshot(0, 0, 0, 0);
        plan.iteration_count = 10;
        let decision = decide(WorkflowState::Analyzing, &plan, 50, &SafetyLimits::default());
        assert_eq!(
            decision.convergence_reason,
            Some(ConvergenceReason::ActionLimitExceeded)
        );
    }

    #[test]
    fn test_no_false_convergence() {
        let non_terminal = [
            WorkflowState::Initializing,
            WorkflowState::GeneratingHypotheses,
            WorkflowState::DesigningExperiments,
            WorkflowState::Executing,
            WorkflowState::Analyzing,
        ];
        for state in non_terminal {
            for hypotheses in 0..3 {
                for untested in 0..=hypotheses {
                    for queued in 0..3 {
                        for results in 0..3 {
                            let plan = snapshot(hypotheses, untested, queued, results);
                            if !plan.has_remaining_work() {
                                continue;
                            }
                            assert_ne!(
                                action(state, plan),
                                NextAction::Converge,
                                "premature convergence in {state} with {plan:?}"
                            );
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn test_counter_increments_from_clean_baseline() {
        let mut controller = ResearchLoopController::default();
        let plan = ResearchPlan::new("q", 10).unwrap();

        controller.decide_next_action(WorkflowState::GeneratingHypotheses, &plan);
        assert_eq!(controller.actions_this_iteration(), 1);

        controller.decide_next_action(WorkflowState::GeneratingHypotheses, &plan);
        assert_eq!(controller.actions_this_iteration(), 2);
    }

    #[test]
    fn test_counter_increments_on_forced_convergence() {
        let mut controller =
            ResearchLoopController::default().with_actions_this_iteration(MAX_ACTIONS_PER_ITERATION + 1);
        let plan = ResearchPlan::new("q", 10).unwrap();

        let first = controller.decide_next_action(WorkflowState::GeneratingHypotheses, &plan);
        assert_eq!(first, NextAction::Converge);
        assert_eq!(controller.actions_this_iteration(), MAX_ACTIONS_PER_ITERATION + 2);

        let second = controller.decide_next_action(WorkflowState::GeneratingHypotheses, &plan);
        assert_eq!(second, NextAction::Converge);
        assert_eq!(controller.actions_this_iteration(), MAX_ACTIONS_PER_ITERATION + 3);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_only_forced_convergence_warns() {
        let mut controller = ResearchLoopController::default();
        let plan = ResearchPlan::new("q", 10).unwrap();
        controller.decide_next_action(WorkflowState::Converged, &plan);
        assert!(!logs_contain("forcing convergence"));

        let mut controller =
            ResearchLoopController::default().with_actions_this_iteration(MAX_ACTIONS_PER_ITERATION);
        controller.decide_next_action(WorkflowState::Analyzing, &plan);
        assert!(logs_contain("forcing convergence"));
    }

    #[test]
    fn test_begin_iteration_resets_counter() {
        let mut controller = ResearchLoopController::new(SafetyLimits::new(2).unwrap()).unwrap();
        let mut plan = ResearchPlan::new("q", 10).unwrap();
        plan.add_hypothesis(Hypothesis::new("h1", "s", "biology", "q"))
            .unwrap();
        plan.enqueue_experiment(Experiment {
            id: "e1".into(),
            hypothesis_id: "h1".into(),
            protocol_name: "p".into(),
            code: String::new(),
        })
        .unwrap();

        assert_eq!(
            controller.decide_next_action(WorkflowState::Executing, &plan),
            NextAction::ExecuteExperiment
        );
        assert_eq!(
            controller.decide_next_action(WorkflowState::Executing, &plan),
            NextAction::ExecuteExperiment
        );
        assert_eq!(
            controller.decide_next_action(WorkflowState::Executing, &plan),
            NextAction::Converge
        );
        assert_eq!(controller.total_actions(), 3);

        controller.begin_iteration();
        assert_eq!(controller.actions_this_iteration(), 0);
        assert_eq!(
            controller.decide_next_action(WorkflowState::Executing, &plan),
            NextAction::ExecuteExperiment
        );
        assert_eq!(
            controller.last_decision().map(|d| d.action),
            Some(NextAction::ExecuteExperiment)
        );
    }

    #[test]
    fn test_zero_limit_is_a_config_error() {
        let limits = SafetyLimits {
            max_actions_per_iteration: 0,
        };
        assert_eq!(
            ResearchLoopController::new(limits).unwrap_err(),
            ConfigError::ZeroActionLimit
        );
    }
}
