use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Args;
use research_notebook::Kernel;
use research_notebook::NotebookGenerator;
use research_notebook::NotebookMetadata;
use research_notebook::NotebookRequest;
use research_runtime::ExecutionOutcome;

#[derive(Args, Debug)]
pub struct NotebookArgs {
    /// Analysis source file
    #[arg(long)]
    pub code: PathBuf,

    /// Artifacts directory; the notebook lands in `cycle_<n>/notebooks/`
    #[arg(long)]
    pub out: PathBuf,

    #[arg(long)]
    pub title: Option<String>,

    /// Hypothesis statement shown in the header cell
    #[arg(long)]
    pub hypothesis: Option<String>,

    /// `python3` or `ir`
    #[arg(long, default_value_t = Kernel::Python3)]
    pub kernel: Kernel,

    #[arg(long, default_value_t = 1)]
    pub cycle: u32,

    #[arg(long, default_value_t = 1)]
    pub task: u32,

    #[arg(long, default_value = "analysis")]
    pub analysis_type: String,

    /// Execution outcome (JSON) whose outputs attach to the first code cell
    #[arg(long)]
    pub outcome: Option<PathBuf>,

    /// Figure to embed; repeatable
    #[arg(long = "figure")]
    pub figures: Vec<String>,
}

pub fn render(
    code: String,
    outcome: Option<ExecutionOutcome>,
    args: &NotebookArgs,
) -> Result<NotebookMetadata> {
    let mut request = NotebookRequest::new(code, args.cycle, args.task, &args.analysis_type)
        .with_kernel(args.kernel);
    if let Some(title) = &args.title {
        request = request.with_title(title);
    }
    if let Some(hypothesis) = &args.hypothesis {
        request = request.with_hypothesis(hypothesis);
    }
    if let Some(outcome) = outcome {
        request = request.with_outcome(outcome);
    }
    for figure in &args.figures {
        request = request.with_figure(figure);
    }

    let mut generator = NotebookGenerator::new(&args.out);
    Ok(generator.create_notebook(request)?)
}

pub async fn execute(args: NotebookArgs) -> Result<()> {
    let code = tokio::fs::read_to_string(&args.code)
        .await
        .with_context(|| format!("failed to read {}", args.code.display()))?;
    let outcome = match &args.outcome {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            Some(serde_json::from_str(&raw).context("outcome file is not a valid execution outcome")?)
        }
        None => None,
    };

    let metadata = render(code, outcome, &args)?;
    println!("{}", serde_json::to_string_pretty(&metadata)?);
    Ok(())
}
