//! `research decide`: run the decision table once against a plan on disk.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use research_runtime::Decision;
use research_runtime::MAX_ACTIONS_PER_ITERATION;
use research_runtime::PlanSnapshot;
use research_runtime::SafetyLimits;
use research_runtime::WorkflowState;
use research_runtime::decide;
use serde::Deserialize;

#[derive(Args, Debug)]
pub struct DecideArgs {
    /// Plan file (JSON) listing hypothesis ids, queued experiments and results
    #[arg(long)]
    pub plan: PathBuf,

    /// Current workflow state, e.g. `designing_experiments`
    #[arg(long)]
    pub state: WorkflowState,

    /// Decisions already taken this iteration
    #[arg(long, default_value_t = 0)]
    pub actions: u32,

    /// Per-iteration action limit
    #[arg(long, env = "RESEARCH_MAX_ACTIONS_PER_ITERATION")]
    pub max_actions: Option<u32>,
}

/// On-disk shape of a plan. Ids are enough; the table only reads counts.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanFile {
    #[serde(default)]
    pub hypothesis_pool: Vec<String>,
    #[serde(default)]
    pub tested_hypotheses: Vec<String>,
    #[serde(default)]
    pub experiment_queue: Vec<String>,
    #[serde(default)]
    pub results: Vec<String>,
    #[serde(default)]
    pub iteration_count: u32,
    #[serde(default = "default_max_iterations")]
    pub max_iterations: u32,
}

fn default_max_iterations() -> u32 {
    10
}

impl PlanFile {
    pub fn snapshot(&self) -> PlanSnapshot {
        let tested: BTreeSet<&str> = self.tested_hypotheses.iter().map(String::as_str).collect();
        let pool: BTreeSet<&str> = self.hypothesis_pool.iter().map(String::as_str).collect();
        PlanSnapshot {
            hypotheses: pool.len(),
            untested_hypotheses: pool.difference(&tested).count(),
            queued_experiments: self.experiment_queue.len(),
            pending_results: self.results.len(),
            iteration_count: self.iteration_count,
            max_iterations: self.max_iterations,
        }
    }
}

pub fn evaluate(plan_json: &str, args: &DecideArgs) -> Result<Decision> {
    let plan: PlanFile = serde_json::from_str(plan_json).context("plan file is not valid JSON")?;
    let limits = SafetyLimits::new(args.max_actions.unwrap_or(MAX_ACTIONS_PER_ITERATION))?;
    let snapshot = plan.snapshot();
    tracing::debug!(?snapshot, state = %args.state, "evaluating decision");
    Ok(decide(args.state, &snapshot, args.actions, &limits))
}

pub async fn execute(args: DecideArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.plan)
        .await
        .with_context(|| format!("failed to read plan {}", args.plan.display()))?;
    let decision = evaluate(&raw, &args)?;
    println!("{}", serde_json::to_string_pretty(&decision)?);
    Ok(())
}
