use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use research_director::ReportFormat;
use research_director::RunReport;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Report saved as JSON by a finished run
    #[arg(long)]
    pub input: PathBuf,

    /// `json` or `markdown`
    #[arg(long, default_value = "markdown")]
    pub format: ReportFormat,

    /// Write here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,
}

pub async fn execute(args: ReportArgs) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.input)
        .await
        .with_context(|| format!("failed to read report {}", args.input.display()))?;
    let report = RunReport::from_json(&raw).context("report file is not a valid run report")?;
    if report.forced() {
        tracing::warn!(
            reason = ?report.convergence_reason,
            "run was stopped by a safety limit"
        );
    }

    match &args.output {
        Some(path) => {
            report
                .save(path, args.format)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), "wrote report");
        }
        None => println!("{}", report.export(args.format)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAVED: &str = r#"{
        "research_question": "Does light drive growth?",
        "domain": "biology",
        "convergence_reason": "iteration_limit_exceeded",
        "final_state": "converged",
        "iterations_completed": 3,
        "total_decisions": 11,
        "hypotheses": 2,
        "tested_hypotheses": 1,
        "experiments_executed": 2,
        "experiments_failed": 0,
        "findings": [],
        "started_at": "2026-01-05T10:00:00Z",
        "finished_at": "2026-01-05T10:00:04Z"
    }"#;

    #[tokio::test]
    async fn test_renders_saved_report_to_markdown() {
        let tmp = tempfile::tempdir().unwrap();
        let input = tmp.path().join("run.json");
        let output = tmp.path().join("out/run.md");
        std::fs::write(&input, SAVED).unwrap();

        execute(ReportArgs {
            input,
            format: ReportFormat::Markdown,
            output: Some(output.clone()),
        })
        .await
        .unwrap();

        let md = std::fs::read_to_string(output).unwrap();
        assert!(md.contains("**Convergence**: iteration_limit_exceeded"));
        assert!(md.contains("**Duration**: 4.0s"));
    }

    #[tokio::test]
    async fn test_missing_input() {
        let tmp = tempfile::tempdir().unwrap();
        let err = execute(ReportArgs {
            input: tmp.path().join("nope.json"),
            format: ReportFormat::Json,
            output: None,
        })
        .await
        .unwrap_err();
        assert!(err.to_string().contains("failed to read report"));
    }
}
