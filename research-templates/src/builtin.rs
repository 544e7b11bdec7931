//! Templates that ship with the crate.

use research_runtime::ExperimentType;
use research_runtime::Hypothesis;

use crate::error::Result;
use crate::error::TemplateError;
use crate::registry::TemplateRegistry;
use crate::template::CustomizationParams;
use crate::template::ExperimentProtocol;
use crate::template::ExperimentTemplate;
use crate::template::ProtocolStep;
use crate::template::TemplateMetadata;
use crate::template::Variable;
use crate::template::VariableKind;

fn mentions_any(hypothesis: &Hypothesis, keywords: &[&str]) -> bool {
    let statement = hypothesis.statement.to_ascii_lowercase();
    keywords.iter().any(|k| statement.contains(k))
}

fn step(number: u32, title: &str, description: &str, code: &str) -> ProtocolStep {
    ProtocolStep {
        number,
        title: title.to_string(),
        description: description.to_string(),
        code: Some(code.to_string()),
    }
}

fn ensure_applicable(template: &dyn ExperimentTemplate, hypothesis: &Hypothesis) -> Result<()> {
    if template.is_applicable(hypothesis) {
        Ok(())
    } else {
        Err(TemplateError::NotApplicable {
            template: template.metadata().name.clone(),
            hypothesis_id: hypothesis.id.clone(),
        })
    }
}

// ---------------------------------------------------------------------------
// Two-group comparison
// ---------------------------------------------------------------------------

const COMPARISON_KEYWORDS: &[&str] = &[
    "compare", "differ", "higher", "lower", "increase", "decrease", "versus", " vs ",
];

/// Two-sample comparison with normality and variance checks.
#[derive(Debug, Clone)]
pub struct TTestComparisonTemplate {
    meta: TemplateMetadata,
}

impl TTestComparisonTemplate {
    pub const NAME: &'static str = "t_test_comparison";
    const DEFAULT_SAMPLE_SIZE: u32 = 30;

    pub fn new() -> Self {
        let mut meta = TemplateMetadata::new(
            Self::NAME,
            ExperimentType::DataAnalysis,
            "Two-group comparison (t-test)",
        );
        meta.description =
            "Compares a measured outcome between a treatment and a control group".to_string();
        meta.suitable_for = vec!["group differences".to_string(), "treatment effects".to_string()];
        meta.complexity_score = 0.3;
        meta.rigor_score = 0.75;
        Self { meta }
    }
}

impl Default for TTestComparisonTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentTemplate for TTestComparisonTemplate {
    fn metadata(&self) -> &TemplateMetadata {
        &self.meta
    }

    fn is_applicable(&self, hypothesis: &Hypothesis) -> bool {
        mentions_any(hypothesis, COMPARISON_KEYWORDS)
    }

    fn generate_protocol(&self, params: &CustomizationParams) -> Result<ExperimentProtocol> {
        let hypothesis = &params.hypothesis;
        ensure_applicable(self, hypothesis)?;
        let resources = self.estimate_resources(params);
        params.check_resources(&resources)?;

        let sample_size = params.sample_size.unwrap_or(Self::DEFAULT_SAMPLE_SIZE);
        let statistical_tests = params.statistical_tests.clone().unwrap_or_else(|| {
            ["two_sample_t_test", "shapiro_wilk", "levene"]
                .into_iter()
                .map(String::from)
                .collect()
        });

        Ok(ExperimentProtocol {
            template_name: self.meta.name.clone(),
            hypothesis_id: hypothesis.id.clone(),
            experiment_type: self.meta.experiment_type,
            title: format!("Comparison test: {}", hypothesis.statement),
            steps: vec![
                step(
                    1,
                    "Generate groups",
                    "Draw treatment and control samples",
                    "import numpy as np\nrng = np.random.default_rng(42)\ncontrol = rng.normal(0.0, 1.0, SAMPLE_SIZE)\ntreatment = rng.normal(0.5, 1.0, SAMPLE_SIZE)",
                ),
                step(
                    2,
                    "Check assumptions",
                    "Normality per group and equality of variances",
                    "from scipy import stats\nprint('shapiro', stats.shapiro(control).pvalue, stats.shapiro(treatment).pvalue)\nprint('levene', stats.levene(control, treatment).pvalue)",
                ),
                step(
                    3,
                    "Run test",
                    "Two-sample t-test between the groups",
                    "t_stat, p_value = stats.ttest_ind(treatment, control)\nprint(f't={t_stat:.3f} p={p_value:.4f}')",
                ),
            ],
            variables: vec![
                Variable::new("group", VariableKind::Independent, "Treatment or control"),
                Variable::new("outcome", VariableKind::Dependent, "Measured response"),
            ],
            control_groups: self.default_control_groups(hypothesis),
            statistical_tests,
            sample_size: Some(sample_size),
            resources,
        })
    }
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

const CORRELATION_KEYWORDS: &[&str] = &[
    "correlat", "associat", "relationship", "predict", "linked",
];

/// Linear and rank correlation between two measured variables.
#[derive(Debug, Clone)]
pub struct CorrelationTemplate {
    meta: TemplateMetadata,
}

impl CorrelationTemplate {
    pub const NAME: &'static str = "correlation_analysis";
    const DEFAULT_SAMPLE_SIZE: u32 = 50;

    pub fn new() -> Self {
        let mut meta = TemplateMetadata::new(
            Self::NAME,
            ExperimentType::DataAnalysis,
            "Correlation analysis",
        );
        meta.description =
            "Measures the strength of association between two continuous variables".to_string();
        meta.suitable_for = vec!["associations".to_string()];
        meta.complexity_score = 0.25;
        Self { meta }
    }
}

impl Default for CorrelationTemplate {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentTemplate for CorrelationTemplate {
    fn metadata(&self) -> &TemplateMetadata {
        &self.meta
    }

    fn is_applicable(&self, hypothesis: &Hypothesis) -> bool {
        mentions_any(hypothesis, CORRELATION_KEYWORDS)
    }

    fn generate_protocol(&self, params: &CustomizationParams) -> Result<ExperimentProtocol> {
        let hypothesis = &params.hypothesis;
        ensure_applicable(self, hypothesis)?;
        let resources = self.estimate_resources(params);
        params.check_resources(&resources)?;

        let statistical_tests = params.statistical_tests.clone().unwrap_or_else(|| {
            vec!["pearson".to_string(), "spearman".to_string()]
        });

        Ok(ExperimentProtocol {
            template_name: self.meta.name.clone(),
            hypothesis_id: hypothesis.id.clone(),
            experiment_type: self.meta.experiment_type,
            title: format!("Correlation: {}", hypothesis.statement),
            steps: vec![
                step(
                    1,
                    "Collect paired observations",
                    "Build paired samples of both variables",
                    "import numpy as np\nrng = np.random.default_rng(7)\nx = rng.normal(size=SAMPLE_SIZE)\ny = 0.6 * x + rng.normal(scale=0.8, size=SAMPLE_SIZE)",
                ),
                step(
                    2,
                    "Estimate correlation",
                    "Pearson for linear, Spearman for monotonic association",
                    "from scipy import stats\nprint('pearson', stats.pearsonr(x, y))\nprint('spearman', stats.spearmanr(x, y))",
                ),
            ],
            variables: vec![
                Variable::new("x", VariableKind::Independent, "Predictor"),
                Variable::new("y", VariableKind::Dependent, "Response"),
            ],
            control_groups: Vec::new(),
            statistical_tests,
            sample_size: Some(params.sample_size.unwrap_or(Self::DEFAULT_SAMPLE_SIZE)),
            resources,
        })
    }
}

/// A registry holding every built-in template.
pub fn default_registry() -> Result<TemplateRegistry> {
    let mut registry = TemplateRegistry::new();
    registry.register(Box::new(TTestComparisonTemplate::new()))?;
    registry.register(Box::new(CorrelationTemplate::new()))?;
    Ok(registry)
}
