use std::path::Path;
use std::path::PathBuf;
use std::sync::LazyLock;

use chrono::DateTime;
use chrono::Utc;
use regex::Regex;
use research_runtime::ExecutionOutcome;
use serde::Deserialize;
use serde::Serialize;

use crate::cells::split_code_into_cells;
use crate::error::NotebookError;
use crate::error::Result;
use crate::format::Cell;
use crate::format::Notebook;
use crate::format::outputs_from_execution;
use crate::kernel::Kernel;

// Constant pattern; compiling it cannot fail.
#[allow(clippy::expect_used)]
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w]").expect("non-word pattern"));

/// Provenance record for one generated notebook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookMetadata {
    pub path: PathBuf,
    pub title: String,
    pub cycle: u32,
    pub task_id: u32,
    pub analysis_type: String,
    pub kernel: Kernel,
    pub code_cell_count: usize,
    pub markdown_cell_count: usize,
    pub total_line_count: usize,
    pub execution_time_secs: Option<f64>,
    pub has_figures: bool,
    pub has_outputs: bool,
    pub hypothesis: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to build one notebook.
#[derive(Debug, Clone, Default)]
pub struct NotebookRequest {
    pub code: String,
    pub cycle: u32,
    pub task_id: u32,
    pub analysis_type: String,
    pub outcome: Option<ExecutionOutcome>,
    pub title: Option<String>,
    pub hypothesis: Option<String>,
    pub figure_paths: Vec<String>,
    pub kernel: Option<Kernel>,
}

impl NotebookRequest {
    pub fn new(code: impl Into<String>, cycle: u32, task_id: u32, analysis_type: &str) -> Self {
        Self {
            code: code.into(),
            cycle,
            task_id,
            analysis_type: analysis_type.to_string(),
            ..Self::default()
        }
    }

    pub fn with_outcome(mut self, outcome: ExecutionOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_hypothesis(mut self, hypothesis: impl Into<String>) -> Self {
        self.hypothesis = Some(hypothesis.into());
        self
    }

    pub fn with_figure(mut self, path: impl Into<String>) -> Self {
        self.figure_paths.push(path.into());
        self
    }

    pub fn with_kernel(mut self, kernel: Kernel) -> Self {
        self.kernel = Some(kernel);
        self
    }
}

/// Serializable view of everything a generator has produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotebookSummary {
    pub artifacts_dir: PathBuf,
    pub default_kernel: Kernel,
    pub notebook_count: usize,
    pub total_line_count: usize,
    pub notebooks: Vec<NotebookMetadata>,
}

/// Writes notebooks under `<artifacts>/cycle_N/notebooks/` and keeps a
/// running record of them.
#[derive(Debug, Clone)]
pub struct NotebookGenerator {
    artifacts_dir: PathBuf,
    default_kernel: Kernel,
    generated: Vec<NotebookMetadata>,
    total_line_count: usize,
}

impl NotebookGenerator {
    pub fn new(artifacts_dir: impl Into<PathBuf>) -> Self {
        Self::with_kernel(artifacts_dir, Kernel::default())
    }

    pub fn with_kernel(artifacts_dir: impl Into<PathBuf>, default_kernel: Kernel) -> Self {
        let artifacts_dir = artifacts_dir.into();
        tracing::info!(artifacts_dir = %artifacts_dir.display(), "notebook generator ready");
        Self {
            artifacts_dir,
            default_kernel,
            generated: Vec::new(),
            total_line_count: 0,
        }
    }

    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    pub fn notebooks_dir(&self, cycle: u32) -> PathBuf {
        self.artifacts_dir
            .join(format!("cycle_{cycle}"))
            .join("notebooks")
    }

    pub fn notebook_path(&self, cycle: u32, task_id: u32, analysis_type: &str) -> PathBuf {
        let lowered = analysis_type.to_lowercase();
        let safe_type = NON_WORD.replace_all(&lowered, "_");
        self.notebooks_dir(cycle)
            .join(format!("task_{task_id}_{safe_type}.ipynb"))
    }

    /// Build a notebook from `request` and write it to disk.
    pub fn create_notebook(&mut self, request: NotebookRequest) -> Result<NotebookMetadata> {
        if request.code.trim().is_empty() {
            tracing::warn!("refusing to create a notebook from empty code");
            return Err(NotebookError::EmptyCode);
        }

        let kernel = request.kernel.unwrap_or(self.default_kernel);
        let title = request
            .title
            .unwrap_or_else(|| format!("Analysis {}", request.task_id));

        let mut notebook = Notebook::new(kernel);
        notebook.cells.push(Cell::markdown(render_header(
            &title,
            request.hypothesis.as_deref(),
            &request.analysis_type,
            request.cycle,
            request.task_id,
            Utc::now(),
        )));
        let mut markdown_cell_count = 1;
        let mut code_cell_count = 0;
        let mut line_count = 0;

        let mut pending_outputs = request.outcome.as_ref().map(outputs_from_execution);
        for source in split_code_into_cells(&request.code) {
            if source.trim().is_empty() {
                continue;
            }
            line_count += source.lines().count();
            let mut cell = Cell::code(source);
            if let (Cell::Code { outputs, .. }, Some(first)) = (&mut cell, pending_outputs.take())
            {
                *outputs = first;
            }
            notebook.cells.push(cell);
            code_cell_count += 1;
        }

        for figure in &request.figure_paths {
            notebook.cells.push(Cell::markdown(format!(
                "## Generated Figure\n\n![Figure]({})",
                relative_figure_path(figure)
            )));
            markdown_cell_count += 1;
        }

        let path = self.notebook_path(request.cycle, request.task_id, &request.analysis_type);
        write_notebook(&path, &notebook)?;
        self.total_line_count += line_count;

        let metadata = NotebookMetadata {
            path,
            title,
            cycle: request.cycle,
            task_id: request.task_id,
            analysis_type: request.analysis_type,
            kernel,
            code_cell_count,
            markdown_cell_count,
            total_line_count: line_count,
            execution_time_secs: request.outcome.as_ref().and_then(|o| o.execution_time_secs),
            has_figures: !request.figure_paths.is_empty(),
            has_outputs: request.outcome.is_some(),
            hypothesis: request.hypothesis,
            created_at: Utc::now(),
        };
        tracing::info!(
            path = %metadata.path.display(),
            lines = line_count,
            code_cells = code_cell_count,
            "generated notebook"
        );
        self.generated.push(metadata.clone());
        Ok(metadata)
    }

    pub fn notebook_count(&self) -> usize {
        self.generated.len()
    }

    pub fn notebooks(&self) -> &[NotebookMetadata] {
        &self.generated
    }

    pub fn notebooks_for_cycle(&self, cycle: u32) -> Vec<&NotebookMetadata> {
        self.generated.iter().filter(|n| n.cycle == cycle).collect()
    }

    pub fn notebook_paths(&self) -> Vec<PathBuf> {
        self.generated.iter().map(|n| n.path.clone()).collect()
    }

    /// Lines of code across every notebook written so far.
    pub fn total_line_count(&self) -> usize {
        self.total_line_count
    }

    pub fn summary(&self) -> NotebookSummary {
        NotebookSummary {
            artifacts_dir: self.artifacts_dir.clone(),
            default_kernel: self.default_kernel,
            notebook_count: self.generated.len(),
            total_line_count: self.total_line_count,
            notebooks: self.generated.clone(),
        }
    }
}

fn write_notebook(path: &Path, notebook: &Notebook) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| NotebookError::Io(e.to_string()))?;
    }
    let json = serde_json::to_string_pretty(notebook)
        .map_err(|e| NotebookError::Serialization(e.to_string()))?;
    std::fs::write(path, json).map_err(|e| NotebookError::Io(e.to_string()))
}

/// Load a notebook previously written by [`NotebookGenerator`].
pub fn read_notebook(path: &Path) -> Result<Notebook> {
    let data = std::fs::read_to_string(path).map_err(|e| NotebookError::Io(e.to_string()))?;
    serde_json::from_str(&data).map_err(|e| NotebookError::Serialization(e.to_string()))
}

pub fn render_header(
    title: &str,
    hypothesis: Option<&str>,
    analysis_type: &str,
    cycle: u32,
    task_id: u32,
    generated_at: DateTime<Utc>,
) -> String {
    let mut lines = vec![format!("# {title}"), String::new()];
    if let Some(hypothesis) = hypothesis {
        lines.push(format!("**Hypothesis**: {hypothesis}"));
        lines.push(String::new());
    }
    lines.push(format!("**Analysis Type**: {}", title_case(analysis_type)));
    lines.push(format!("**Cycle**: {cycle}"));
    lines.push(format!("**Task ID**: {task_id}"));
    lines.push(format!(
        "**Generated**: {}",
        generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    lines.push(String::new());
    lines.push("---".to_string());
    lines.push(String::new());
    lines.join("\n")
}

fn title_case(raw: &str) -> String {
    raw.replace('_', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Figures under a `figures` directory are referenced relative to the
/// notebooks directory; anything else is kept verbatim.
pub fn relative_figure_path(figure_path: &str) -> String {
    let path = Path::new(figure_path);
    let under_figures = path.components().any(|c| c.as_os_str() == "figures");
    match path.file_name() {
        Some(name) if under_figures => format!("../figures/{}", name.to_string_lossy()),
        _ => figure_path.to_string(),
    }
}
