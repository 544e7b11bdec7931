use serde::Deserialize;
use serde::Serialize;

/// A single output captured while running experiment code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "output_type", rename_all = "snake_case")]
pub enum CellOutput {
    Stream {
        /// `stdout` or `stderr`.
        name: String,
        text: String,
    },
    ExecuteResult {
        data: String,
        execution_count: u32,
    },
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
    },
    DisplayData {
        mime_type: String,
        content: String,
    },
}

impl CellOutput {
    pub fn stdout(text: impl Into<String>) -> Self {
        Self::Stream {
            name: "stdout".to_string(),
            text: text.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, CellOutput::Error { .. })
    }
}

/// What the executor reports after running an experiment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub success: bool,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub return_value: Option<String>,
    pub error_message: Option<String>,
    pub error_traceback: Option<String>,
    #[serde(default)]
    pub outputs: Vec<CellOutput>,
    pub execution_time_secs: Option<f64>,
}

impl ExecutionOutcome {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            ..Self::default()
        }
    }

    /// Normalized form of an execution that raised, timed out, or was cancelled.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn has_outputs(&self) -> bool {
        !self.stdout.is_empty()
            || !self.stderr.is_empty()
            || self.return_value.is_some()
            || self.error_message.is_some()
            || !self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_marker() {
        let outcome = ExecutionOutcome::failure("timed out after 30s");
        assert!(!outcome.success);
        assert_eq!(outcome.error_message.as_deref(), Some("timed out after 30s"));
        assert!(outcome.has_outputs());
    }

    #[test]
    fn test_empty_outcome_has_no_outputs() {
        assert!(!ExecutionOutcome::default().has_outputs());
    }

    #[test]
    fn test_cell_output_is_tagged() {
        let json = serde_json::to_value(CellOutput::DisplayData {
            mime_type: "image/png".into(),
            content: "iVBOR".into(),
        })
        .unwrap();
        assert_eq!(json["output_type"], "display_data");
        assert_eq!(json["mime_type"], "image/png");

        let parsed: CellOutput = serde_json::from_str(
            r#"{"output_type":"error","ename":"ValueError","evalue":"bad","traceback":[]}"#,
        )
        .unwrap();
        assert!(parsed.is_error());
    }
}
