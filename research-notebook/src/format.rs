//! Minimal nbformat v4 document model.

use std::collections::BTreeMap;

use research_runtime::CellOutput;
use research_runtime::ExecutionOutcome;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Map;
use serde_json::Value;

use crate::kernel::Kernel;
use crate::kernel::KernelSpec;

pub const NBFORMAT: u32 = 4;
pub const NBFORMAT_MINOR: u32 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum Output {
    Stream {
        name: String,
        text: String,
    },
    ExecuteResult {
        data: BTreeMap<String, String>,
        metadata: Map<String, Value>,
        execution_count: Option<u32>,
    },
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
    DisplayData {
        data: BTreeMap<String, String>,
        metadata: Map<String, Value>,
    },
}

impl Output {
    fn stream(name: &str, text: &str) -> Self {
        Output::Stream {
            name: name.to_string(),
            text: text.to_string(),
        }
    }

    fn plain_result(text: &str, execution_count: u32) -> Self {
        Output::ExecuteResult {
            data: BTreeMap::from([("text/plain".to_string(), text.to_string())]),
            metadata: Map::new(),
            execution_count: Some(execution_count),
        }
    }
}

impl From<&CellOutput> for Output {
    fn from(output: &CellOutput) -> Self {
        match output {
            CellOutput::Stream { name, text } => Output::stream(name, text),
            CellOutput::ExecuteResult {
                data,
                execution_count,
            } => Output::plain_result(data, *execution_count),
            CellOutput::Error {
                ename,
                evalue,
                traceback,
            } => Output::Error {
                ename: ename.clone(),
                evalue: evalue.clone(),
                traceback: traceback.clone(),
            },
            CellOutput::DisplayData { mime_type, content } => Output::DisplayData {
                data: BTreeMap::from([(mime_type.clone(), content.clone())]),
                metadata: Map::new(),
            },
        }
    }
}

/// Convert everything an execution reported into cell outputs.
pub fn outputs_from_execution(outcome: &ExecutionOutcome) -> Vec<Output> {
    let mut outputs = Vec::new();
    if !outcome.stdout.is_empty() {
        outputs.push(Output::stream("stdout", &outcome.stdout));
    }
    if !outcome.stderr.is_empty() {
        outputs.push(Output::stream("stderr", &outcome.stderr));
    }
    if let Some(value) = &outcome.return_value {
        outputs.push(Output::plain_result(value, 1));
    }
    if let Some(message) = outcome.error_message.as_deref().filter(|m| !m.is_empty()) {
        outputs.push(Output::Error {
            ename: "ExecutionError".to_string(),
            evalue: message.to_string(),
            traceback: vec![outcome.error_traceback.clone().unwrap_or_default()],
        });
    }
    outputs.extend(outcome.outputs.iter().map(Output::from));
    outputs
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cell_type", rename_all = "snake_case")]
pub enum Cell {
    Markdown {
        metadata: Map<String, Value>,
        source: String,
    },
    Code {
        execution_count: Option<u32>,
        metadata: Map<String, Value>,
        outputs: Vec<Output>,
        source: String,
    },
}

impl Cell {
    pub fn markdown(source: impl Into<String>) -> Self {
        Cell::Markdown {
            metadata: Map::new(),
            source: source.into(),
        }
    }

    pub fn code(source: impl Into<String>) -> Self {
        Cell::Code {
            execution_count: None,
            metadata: Map::new(),
            outputs: Vec::new(),
            source: source.into(),
        }
    }

    pub fn source(&self) -> &str {
        match self {
            Cell::Markdown { source, .. } | Cell::Code { source, .. } => source,
        }
    }

    pub fn outputs(&self) -> &[Output] {
        match self {
            Cell::Markdown { .. } => &[],
            Cell::Code { outputs, .. } => outputs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub kernelspec: KernelSpec,
    pub language_info: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notebook {
    pub cells: Vec<Cell>,
    pub metadata: DocumentMetadata,
    pub nbformat: u32,
    pub nbformat_minor: u32,
}

impl Notebook {
    pub fn new(kernel: Kernel) -> Self {
        Self {
            cells: Vec::new(),
            metadata: DocumentMetadata {
                kernelspec: kernel.kernelspec(),
                language_info: kernel.language_info(),
            },
            nbformat: NBFORMAT,
            nbformat_minor: NBFORMAT_MINOR,
        }
    }

    pub fn code_cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.iter().filter(|c| matches!(c, Cell::Code { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outputs_from_execution_order() {
        let outcome = ExecutionOutcome {
            success: false,
            stdout: "hello".into(),
            stderr: "careful".into(),
            return_value: Some("42".into()),
            error_message: Some("boom".into()),
            error_traceback: None,
            outputs: vec![CellOutput::DisplayData {
                mime_type: "image/png".into(),
                content: "aGk=".into(),
            }],
            execution_time_secs: Some(0.1),
        };
        let outputs = outputs_from_execution(&outcome);
        assert_eq!(outputs.len(), 5);
        assert_eq!(outputs[0], Output::stream("stdout", "hello"));
        assert_eq!(outputs[1], Output::stream("stderr", "careful"));
        assert_eq!(outputs[2], Output::plain_result("42", 1));
        assert_eq!(
            outputs[3],
            Output::Error {
                ename: "ExecutionError".into(),
                evalue: "boom".into(),
                traceback: vec![String::new()],
            }
        );
        match &outputs[4] {
            Output::DisplayData { data, .. } => assert_eq!(data["image/png"], "aGk="),
            other => panic!("unexpected output {other:?}"),
        }
    }

    #[test]
    fn test_empty_outcome_has_no_outputs() {
        assert!(outputs_from_execution(&ExecutionOutcome::default()).is_empty());
    }

    #[test]
    fn test_cell_output_conversion_keeps_details() {
        let stderr = CellOutput::Stream {
            name: "stderr".into(),
            text: "warn".into(),
        };
        assert_eq!(Output::from(&stderr), Output::stream("stderr", "warn"));

        let err = CellOutput::Error {
            ename: "ValueError".into(),
            evalue: "bad".into(),
            traceback: vec!["line 1".into()],
        };
        let json = serde_json::to_value(Output::from(&err)).unwrap();
        assert_eq!(json["output_type"], "error");
        assert_eq!(json["ename"], "ValueError");
        assert_eq!(json["traceback"][0], "line 1");

        let result = CellOutput::ExecuteResult {
            data: "7".into(),
            execution_count: 3,
        };
        let json = serde_json::to_value(Output::from(&result)).unwrap();
        assert_eq!(json["data"]["text/plain"], "7");
        assert_eq!(json["execution_count"], 3);
    }

    #[test]
    fn test_notebook_json_shape() {
        let mut nb = Notebook::new(Kernel::Python3);
        nb.cells.push(Cell::markdown("# Title"));
        nb.cells.push(Cell::code("print(1)"));
        let json = serde_json::to_value(&nb).unwrap();
        assert_eq!(json["nbformat"], 4);
        assert_eq!(json["metadata"]["kernelspec"]["name"], "python3");
        assert_eq!(json["cells"][0]["cell_type"], "markdown");
        assert_eq!(json["cells"][1]["cell_type"], "code");
        assert_eq!(json["cells"][1]["execution_count"], Value::Null);
        assert_eq!(nb.code_cells().count(), 1);
    }
}
