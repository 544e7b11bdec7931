use std::collections::BTreeMap;

use research_runtime::ExperimentType;
use research_runtime::Hypothesis;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::TemplateError;

/// Descriptive metadata every template carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateMetadata {
    pub name: String,
    pub version: String,
    pub experiment_type: ExperimentType,
    /// None means general-purpose.
    pub domain: Option<String>,
    pub title: String,
    pub description: String,
    pub suitable_for: Vec<String>,
    pub requirements: Vec<String>,
    /// 0 = simple, 1 = advanced.
    pub complexity_score: f64,
    pub rigor_score: f64,
    pub author: String,
}

impl TemplateMetadata {
    pub fn new(name: &str, experiment_type: ExperimentType, title: &str) -> Self {
        Self {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            experiment_type,
            domain: None,
            title: title.to_string(),
            description: format!("Template for {title}"),
            suitable_for: Vec::new(),
            requirements: Vec::new(),
            complexity_score: 0.5,
            rigor_score: 0.7,
            author: "research-lab".to_string(),
        }
    }
}

/// Estimated cost of running a protocol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirements {
    pub compute_hours: Option<f64>,
    pub memory_gb: Option<f64>,
    pub estimated_duration_days: Option<f64>,
    pub estimated_cost_usd: Option<f64>,
    pub api_calls_estimated: Option<u32>,
    pub gpu_required: bool,
    pub required_libraries: Vec<String>,
    pub can_parallelize: bool,
}

impl ResourceRequirements {
    /// Per-type baseline estimate.
    pub fn baseline(experiment_type: ExperimentType, required_libraries: Vec<String>) -> Self {
        let (compute, memory, days, cost, api_calls) = match experiment_type {
            ExperimentType::Computational => (24.0, 8.0, 2.0, 10.0, None),
            ExperimentType::DataAnalysis => (4.0, 4.0, 1.0, 2.0, None),
            // Mostly model API spend.
            ExperimentType::LiteratureSynthesis => (1.0, 2.0, 0.5, 5.0, Some(50)),
        };
        Self {
            compute_hours: Some(compute),
            memory_gb: Some(memory),
            estimated_duration_days: Some(days),
            estimated_cost_usd: Some(cost),
            api_calls_estimated: api_calls,
            gpu_required: false,
            required_libraries,
            can_parallelize: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Independent,
    Dependent,
    Control,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    pub kind: VariableKind,
    pub description: String,
    pub unit: Option<String>,
}

impl Variable {
    pub fn new(name: &str, kind: VariableKind, description: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            description: description.to_string(),
            unit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlGroup {
    pub name: String,
    pub description: String,
    pub variables: BTreeMap<String, String>,
    pub rationale: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolStep {
    pub number: u32,
    pub title: String,
    pub description: String,
    /// Analysis code for this step, if the template supplies any.
    pub code: Option<String>,
}

/// A complete experiment protocol produced from a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentProtocol {
    pub template_name: String,
    pub hypothesis_id: String,
    pub experiment_type: ExperimentType,
    pub title: String,
    pub steps: Vec<ProtocolStep>,
    pub variables: Vec<Variable>,
    pub control_groups: Vec<ControlGroup>,
    pub statistical_tests: Vec<String>,
    pub sample_size: Option<u32>,
    pub resources: ResourceRequirements,
}

impl ExperimentProtocol {
    /// Render the protocol as a script with one `# %%` cell per step.
    pub fn render_script(&self) -> String {
        let mut script = String::new();
        script.push_str(&format!("# Protocol: {}\n", self.title));
        script.push_str(&format!("# Hypothesis: {}\n", self.hypothesis_id));
        if let Some(n) = self.sample_size {
            script.push_str(&format!("SAMPLE_SIZE = {n}\n"));
        }
        for step in &self.steps {
            script.push_str(&format!("\n# %% Step {}: {}\n", step.number, step.title));
            for line in step.description.lines() {
                script.push_str(&format!("# {line}\n"));
            }
            match &step.code {
                Some(code) => {
                    script.push_str(code.trim_end());
                    script.push('\n');
                }
                None => script.push_str("pass\n"),
            }
        }
        script
    }
}

/// Inputs for tailoring a template to one hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationParams {
    pub hypothesis: Hypothesis,
    pub sample_size: Option<u32>,
    pub statistical_tests: Option<Vec<String>>,
    pub max_cost_usd: Option<f64>,
    pub max_duration_days: Option<f64>,
    pub max_compute_hours: Option<f64>,
}

impl CustomizationParams {
    pub fn for_hypothesis(hypothesis: Hypothesis) -> Self {
        Self {
            hypothesis,
            sample_size: None,
            statistical_tests: None,
            max_cost_usd: None,
            max_duration_days: None,
            max_compute_hours: None,
        }
    }

    /// Reject an estimate that breaks any configured cap.
    pub fn check_resources(&self, resources: &ResourceRequirements) -> Result<()> {
        let caps = [
            ("cost_usd", resources.estimated_cost_usd, self.max_cost_usd),
            (
                "duration_days",
                resources.estimated_duration_days,
                self.max_duration_days,
            ),
            (
                "compute_hours",
                resources.compute_hours,
                self.max_compute_hours,
            ),
        ];
        for (resource, estimated, limit) in caps {
            if let (Some(estimated), Some(limit)) = (estimated, limit)
                && estimated > limit
            {
                return Err(TemplateError::ResourceLimitExceeded {
                    resource,
                    estimated,
                    limit,
                });
            }
        }
        Ok(())
    }
}

/// Outcome of checking a template's own structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Capability interface implemented by every experiment template.
pub trait ExperimentTemplate: Send + Sync {
    fn metadata(&self) -> &TemplateMetadata;

    fn generate_protocol(&self, params: &CustomizationParams) -> Result<ExperimentProtocol>;

    fn is_applicable(&self, hypothesis: &Hypothesis) -> bool;

    fn estimate_resources(&self, _params: &CustomizationParams) -> ResourceRequirements {
        ResourceRequirements::baseline(self.metadata().experiment_type, self.required_libraries())
    }

    fn required_libraries(&self) -> Vec<String> {
        let mut libs = vec!["numpy", "pandas"];
        match self.metadata().experiment_type {
            ExperimentType::DataAnalysis => libs.extend(["scipy", "scikit-learn", "statsmodels"]),
            ExperimentType::Computational => libs.push("scipy"),
            ExperimentType::LiteratureSynthesis => libs.push("anthropic"),
        }
        libs.into_iter().map(String::from).collect()
    }

    fn default_control_groups(&self, _hypothesis: &Hypothesis) -> Vec<ControlGroup> {
        vec![ControlGroup {
            name: "baseline_control".to_string(),
            description: "Baseline control group for comparison".to_string(),
            variables: BTreeMap::new(),
            rationale: "Standard baseline comparison to test hypothesis".to_string(),
        }]
    }

    /// 0.0 when not applicable, otherwise 0.5 to 0.9 by how well it matches.
    fn applicability_score(&self, hypothesis: &Hypothesis) -> f64 {
        if !self.is_applicable(hypothesis) {
            return 0.0;
        }
        let meta = self.metadata();
        if hypothesis
            .suggested_experiment_types
            .contains(&meta.experiment_type)
        {
            return 0.9;
        }
        if meta
            .domain
            .as_deref()
            .is_some_and(|d| d.eq_ignore_ascii_case(&hypothesis.domain))
        {
            return 0.7;
        }
        0.5
    }

    fn validate(&self) -> ValidationReport {
        let meta = self.metadata();
        let mut report = ValidationReport::default();
        if meta.name.trim().is_empty() {
            report.errors.push("Template must have a name".to_string());
        }
        if meta.title.trim().is_empty() {
            report.errors.push("Template must have a title".to_string());
        }
        if meta.description.len() < 20 {
            report
                .warnings
                .push("Template description should be more detailed (20+ chars)".to_string());
        }
        if !(0.0..=1.0).contains(&meta.complexity_score) || !(0.0..=1.0).contains(&meta.rigor_score)
        {
            report
                .errors
                .push("Template scores must lie in [0, 1]".to_string());
        }
        report
    }
}
