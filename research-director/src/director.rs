//! The driving loop of a research run.
//!
//! Every step asks the controller for one action, carries it out through the
//! injected collaborators, feeds whatever came back into the plan and then
//! moves the workflow. Collaborator failures never escape a step: they are
//! logged and turned into a step that produced nothing, which the decision
//! table already knows how to recover from.

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use research_notebook::NotebookGenerator;
use research_notebook::NotebookRequest;
use research_runtime::ConvergenceReason;
use research_runtime::Decision;
use research_runtime::ExecutionFailurePolicy;
use research_runtime::ExecutionOutcome;
use research_runtime::Experiment;
use research_runtime::ExperimentResult;
use research_runtime::Hypothesis;
use research_runtime::NextAction;
use research_runtime::ResearchConfig;
use research_runtime::ResearchLoopController;
use research_runtime::ResearchPlan;
use research_runtime::Workflow;
use research_runtime::WorkflowState;

use crate::collaborators::Collaborators;
use crate::collaborators::ResearchContext;
use crate::error::DirectorError;
use crate::error::Result;
use crate::report::Finding;
use crate::report::RunReport;

pub struct ResearchDirector {
    config: ResearchConfig,
    collaborators: Collaborators,
    plan: ResearchPlan,
    workflow: Workflow,
    controller: ResearchLoopController,
    notebooks: Option<NotebookGenerator>,
    findings: Vec<Finding>,
    convergence_reason: Option<ConvergenceReason>,
    experiments_designed: usize,
    experiments_executed: usize,
    experiments_failed: usize,
    /// Hypothesis whose evidence was handled most recently; refinement starts here.
    focus: Option<String>,
    /// Loaded on first use and reused for the rest of the run.
    skills: Option<String>,
    started_at: Option<DateTime<Utc>>,
}

impl ResearchDirector {
    /// Validate `config` and set up an empty plan. Configuration errors
    /// surface here, before any step runs.
    pub fn new(config: ResearchConfig, collaborators: Collaborators) -> Result<Self> {
        config.validate()?;
        let controller = ResearchLoopController::new(config.safety_limits()?)?;
        let plan = ResearchPlan::new(&config.research_question, config.max_iterations)?;
        let notebooks = config.artifacts_dir.clone().map(NotebookGenerator::new);
        tracing::info!(
            question = %config.research_question,
            domain = %config.domain,
            max_iterations = config.max_iterations,
            "research director ready"
        );
        Ok(Self {
            config,
            collaborators,
            plan,
            workflow: Workflow::new(),
            controller,
            notebooks,
            findings: Vec::new(),
            convergence_reason: None,
            experiments_designed: 0,
            experiments_executed: 0,
            experiments_failed: 0,
            focus: None,
            skills: None,
            started_at: None,
        })
    }

    pub fn plan(&self) -> &ResearchPlan {
        &self.plan
    }

    pub fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    pub fn controller(&self) -> &ResearchLoopController {
        &self.controller
    }

    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    pub fn convergence_reason(&self) -> Option<ConvergenceReason> {
        self.convergence_reason
    }

    /// Domain guidance shared with every collaborator. A failing provider
    /// yields an empty context rather than failing the run.
    pub async fn skills_context(&mut self) -> &str {
        if self.skills.is_none() {
            let provider = Arc::clone(&self.collaborators.skills);
            let loaded = match provider.load_skills("research", &self.config.domain).await {
                Ok(skills) => skills,
                Err(err) => {
                    log_failure("skill loading", &err);
                    String::new()
                }
            };
            tracing::debug!(domain = %self.config.domain, bytes = loaded.len(), "loaded skills");
            self.skills = Some(loaded);
        }
        self.skills.as_deref().unwrap_or_default()
    }

    /// Step until the controller converges, then report.
    pub async fn run(&mut self) -> RunReport {
        let started_at = *self.started_at.get_or_insert_with(Utc::now);
        loop {
            let decision = self.step().await;
            if decision.action == NextAction::Converge {
                break;
            }
        }
        self.report(started_at)
    }

    /// Decide one action, carry it out, and advance the workflow.
    pub async fn step(&mut self) -> Decision {
        self.started_at.get_or_insert_with(Utc::now);
        self.skills_context().await;
        let state = self.workflow.current_state();
        let decision = self
            .controller
            .decide_from_snapshot(state, &self.plan.snapshot());

        match decision.action {
            NextAction::GenerateHypothesis => self.generate_hypotheses().await,
            NextAction::DesignExperiment => self.design_experiment().await,
            NextAction::ExecuteExperiment => self.execute_experiment().await,
            NextAction::AnalyzeResult => self.analyze_result().await,
            NextAction::RefineHypothesis => self.refine_hypothesis().await,
            NextAction::Converge => self.converge(decision),
        }

        self.workflow.apply(decision.action);
        if decision.action.completes_iteration() {
            let iteration = self.plan.complete_iteration();
            self.controller.begin_iteration();
            tracing::info!(iteration, "research cycle complete");
        }
        decision
    }

    fn context(&self) -> ResearchContext {
        ResearchContext {
            research_question: self.config.research_question.clone(),
            domain: self.config.domain.clone(),
            iteration: self.plan.iteration_count(),
            max_iterations: self.plan.max_iterations(),
            skills: self.skills.clone().unwrap_or_default(),
        }
    }

    fn converge(&mut self, decision: Decision) {
        if self.convergence_reason.is_none() {
            self.convergence_reason = decision.convergence_reason;
            tracing::info!(
                reason = ?decision.convergence_reason,
                iterations = self.plan.iteration_count(),
                "research converged"
            );
        }
    }

    fn add_hypotheses(&mut self, hypotheses: Vec<Hypothesis>) -> usize {
        let mut added = 0;
        for hypothesis in hypotheses {
            let id = hypothesis.id.clone();
            match self.plan.add_hypothesis(hypothesis) {
                Ok(()) => added += 1,
                Err(err) => tracing::warn!(hypothesis = %id, error = %err, "hypothesis rejected"),
            }
        }
        added
    }

    async fn generate_hypotheses(&mut self) {
        let generator = Arc::clone(&self.collaborators.generator);
        match generator.generate(&self.context()).await {
            Ok(hypotheses) => {
                let added = self.add_hypotheses(hypotheses);
                tracing::info!(added, pool = self.plan.hypothesis_count(), "generated hypotheses");
            }
            Err(err) => log_failure("hypothesis generation", &err),
        }
    }

    /// First untested hypothesis with nothing queued for it, else the first
    /// untested one.
    fn design_target(&self) -> Option<Hypothesis> {
        let untested = self.plan.get_untested_hypotheses();
        untested
            .iter()
            .find(|h| !self.plan.has_queued_experiment_for(&h.id))
            .or_else(|| untested.first())
            .map(|h| (*h).clone())
    }

    async fn design_experiment(&mut self) {
        let Some(hypothesis) = self.design_target() else {
            tracing::warn!("no untested hypothesis to design for");
            return;
        };
        let designer = Arc::clone(&self.collaborators.designer);
        let design = match designer.design(&hypothesis, &self.context()).await {
            Ok(design) => design,
            Err(err) => return log_failure("experiment design", &err),
        };
        self.experiments_designed += 1;
        let experiment = Experiment {
            id: format!("{}-exp-{}", hypothesis.id, self.experiments_designed),
            hypothesis_id: hypothesis.id,
            protocol_name: design.protocol_name,
            code: design.code,
        };
        let id = experiment.id.clone();
        match self.plan.enqueue_experiment(experiment) {
            Ok(()) => tracing::info!(experiment = %id, "experiment queued"),
            Err(err) => tracing::warn!(experiment = %id, error = %err, "experiment rejected"),
        }
    }

    async fn execute_experiment(&mut self) {
        let Some(experiment) = self.plan.start_next_experiment() else {
            return;
        };
        self.experiments_executed += 1;
        self.focus = Some(experiment.hypothesis_id.clone());

        let executor = Arc::clone(&self.collaborators.executor);
        let call = executor.execute(&experiment);
        let outcome = match self.config.execution_timeout() {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(DirectorError::Timeout(limit))),
            None => call.await,
        };
        let outcome = outcome.unwrap_or_else(|err| {
            log_failure("execution", &err);
            ExecutionOutcome::failure(err.to_string())
        });

        if !outcome.success {
            self.experiments_failed += 1;
        }
        self.write_notebook(&experiment, &outcome).await;

        if !outcome.success && self.config.failure_policy == ExecutionFailurePolicy::Drop {
            tracing::warn!(experiment = %experiment.id, "dropping failed experiment");
            return;
        }
        self.plan
            .record_result(ExperimentResult::new(&experiment, outcome));
    }

    /// Notebook files are written on the blocking pool. The generator moves
    /// there and back; it is lost only if the write panics.
    async fn write_notebook(&mut self, experiment: &Experiment, outcome: &ExecutionOutcome) {
        let Some(mut generator) = self.notebooks.take() else {
            return;
        };
        let cycle = self.plan.iteration_count() + 1;
        let task_id = u32::try_from(self.experiments_executed).unwrap_or(u32::MAX);
        let mut request = NotebookRequest::new(
            experiment.code.clone(),
            cycle,
            task_id,
            &experiment.protocol_name,
        )
        .with_title(format!("Experiment {}", experiment.id))
        .with_outcome(outcome.clone());
        if let Some(hypothesis) = self.plan.hypothesis(&experiment.hypothesis_id) {
            request = request.with_hypothesis(hypothesis.statement.clone());
        }
        let written = tokio::task::spawn_blocking(move || {
            let written = generator.create_notebook(request);
            (generator, written)
        })
        .await;
        match written {
            Ok((generator, written)) => {
                self.notebooks = Some(generator);
                if let Err(err) = written {
                    tracing::warn!(experiment = %experiment.id, error = %err, "notebook generation failed");
                }
            }
            Err(err) => {
                tracing::error!(experiment = %experiment.id, error = %err, "notebook writer panicked; notebooks disabled");
            }
        }
    }

    async fn analyze_result(&mut self) {
        // The result is consumed whether or not analysis succeeds.
        let Some(result) = self.plan.take_next_result() else {
            return;
        };
        self.focus = Some(result.hypothesis_id.clone());
        let Some(hypothesis) = self.plan.hypothesis(&result.hypothesis_id).cloned() else {
            tracing::warn!(hypothesis = %result.hypothesis_id, "result for unknown hypothesis");
            return;
        };

        let analyzer = Arc::clone(&self.collaborators.analyzer);
        let analysis = match analyzer.analyze(&result, &hypothesis, &self.context()).await {
            Ok(analysis) => analysis,
            Err(err) => return log_failure("analysis", &err),
        };
        let Some(verdict) = analysis.verdict else {
            tracing::info!(hypothesis = %hypothesis.id, "analysis inconclusive");
            return;
        };
        if let Err(err) = self.plan.mark_tested(&hypothesis.id) {
            tracing::warn!(hypothesis = %hypothesis.id, error = %err, "could not mark tested");
            return;
        }
        tracing::info!(hypothesis = %hypothesis.id, verdict = %verdict, "hypothesis tested");
        self.findings.push(Finding {
            hypothesis_id: hypothesis.id,
            verdict,
            summary: analysis.summary,
            iteration: self.plan.iteration_count() + 1,
        });
    }

    fn refine_target(&self) -> Option<Hypothesis> {
        self.focus
            .as_deref()
            .and_then(|id| self.plan.hypothesis(id))
            .or_else(|| self.plan.get_untested_hypotheses().into_iter().next())
            .cloned()
    }

    async fn refine_hypothesis(&mut self) {
        let Some(hypothesis) = self.refine_target() else {
            return;
        };
        let generator = Arc::clone(&self.collaborators.generator);
        match generator.refine(&hypothesis, &self.context()).await {
            Ok(refined) => {
                let refined = refined
                    .into_iter()
                    .map(|h| {
                        if h.parent_id.is_some() {
                            h
                        } else {
                            h.refined_from(hypothesis.id.clone())
                        }
                    })
                    .collect();
                let added = self.add_hypotheses(refined);
                tracing::info!(parent = %hypothesis.id, added, "refined hypothesis");
            }
            Err(err) => log_failure("hypothesis refinement", &err),
        }
    }

    /// Snapshot of the run so far.
    pub fn report(&self, started_at: DateTime<Utc>) -> RunReport {
        RunReport {
            research_question: self.config.research_question.clone(),
            domain: self.config.domain.clone(),
            convergence_reason: self.convergence_reason,
            final_state: self.workflow.current_state(),
            iterations_completed: self.plan.iteration_count(),
            total_decisions: self.controller.total_actions(),
            hypotheses: self.plan.hypothesis_count(),
            tested_hypotheses: self.plan.tested_hypotheses().len(),
            experiments_executed: self.experiments_executed,
            experiments_failed: self.experiments_failed,
            findings: self.findings.clone(),
            notebook_paths: self
                .notebooks
                .as_ref()
                .map(NotebookGenerator::notebook_paths)
                .unwrap_or_default(),
            started_at,
            finished_at: Utc::now(),
        }
    }

    pub fn is_converged(&self) -> bool {
        self.workflow.current_state() == WorkflowState::Converged
    }
}

fn log_failure(step: &str, err: &DirectorError) {
    tracing::warn!(step, error = %err, "collaborator failed; continuing with no output");
}
