use std::path::Path;
use std::path::PathBuf;

use chrono::DateTime;
use chrono::Utc;
use research_runtime::ConvergenceReason;
use research_runtime::WorkflowState;
use serde::Deserialize;
use serde::Serialize;

use crate::collaborators::Verdict;
use crate::error::Result;

/// A concluded analysis of one hypothesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub hypothesis_id: String,
    pub verdict: Verdict,
    pub summary: String,
    /// Research cycle the finding closed.
    pub iteration: u32,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub research_question: String,
    pub domain: String,
    pub convergence_reason: Option<ConvergenceReason>,
    pub final_state: WorkflowState,
    pub iterations_completed: u32,
    pub total_decisions: u64,
    pub hypotheses: usize,
    pub tested_hypotheses: usize,
    pub experiments_executed: usize,
    pub experiments_failed: usize,
    pub findings: Vec<Finding>,
    #[serde(default)]
    pub notebook_paths: Vec<PathBuf>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFormat {
    Json,
    Markdown,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}

impl RunReport {
    /// True when the run stopped because a safety limit fired.
    pub fn forced(&self) -> bool {
        self.convergence_reason.is_some_and(ConvergenceReason::is_forced)
    }

    pub fn export(&self, format: ReportFormat) -> Result<String> {
        match format {
            ReportFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            ReportFormat::Markdown => Ok(self.to_markdown()),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub async fn save(&self, path: &Path, format: ReportFormat) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.export(format)?).await?;
        Ok(())
    }

    fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str(&format!("# Research Run: {}\n\n", self.research_question));
        md.push_str(&format!("**Domain**: {}\n", self.domain));
        let reason = self
            .convergence_reason
            .map_or("none", ConvergenceReason::as_str);
        md.push_str(&format!("**Convergence**: {reason}\n"));
        md.push_str(&format!("**Final state**: {}\n", self.final_state));
        md.push_str(&format!("**Iterations**: {}\n", self.iterations_completed));
        md.push_str(&format!("**Decisions**: {}\n", self.total_decisions));
        md.push_str(&format!(
            "**Hypotheses**: {} ({} tested)\n",
            self.hypotheses, self.tested_hypotheses
        ));
        md.push_str(&format!(
            "**Experiments**: {} executed, {} failed\n",
            self.experiments_executed, self.experiments_failed
        ));
        let elapsed = self.finished_at - self.started_at;
        md.push_str(&format!(
            "**Duration**: {:.1}s\n\n",
            elapsed.num_milliseconds() as f64 / 1000.0
        ));

        md.push_str("## Findings\n\n");
        if self.findings.is_empty() {
            md.push_str("_No conclusive findings._\n");
        }
        for finding in &self.findings {
            md.push_str(&format!(
                "- **{}** ({}, cycle {}): {}\n",
                finding.hypothesis_id, finding.verdict, finding.iteration, finding.summary
            ));
        }

        if !self.notebook_paths.is_empty() {
            md.push_str("\n## Notebooks\n\n");
            for path in &self.notebook_paths {
                md.push_str(&format!("- `{}`\n", path.display()));
            }
        }
        md
    }
}
