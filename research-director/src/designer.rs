use async_trait::async_trait;
use research_runtime::Hypothesis;
use research_templates::CustomizationParams;
use research_templates::TemplateRegistry;

use crate::collaborators::ExperimentDesign;
use crate::collaborators::ExperimentDesigner;
use crate::collaborators::ResearchContext;
use crate::error::DirectorError;
use crate::error::Result;

/// Resource caps applied to every protocol a [`TemplateDesigner`] produces.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DesignLimits {
    pub max_cost_usd: Option<f64>,
    pub max_duration_days: Option<f64>,
    pub max_compute_hours: Option<f64>,
}

/// Designs experiments by picking the best-scoring template for a hypothesis
/// and rendering its protocol as a script.
#[derive(Debug)]
pub struct TemplateDesigner {
    registry: TemplateRegistry,
    limits: DesignLimits,
}

impl TemplateDesigner {
    pub fn new(registry: TemplateRegistry) -> Self {
        Self {
            registry,
            limits: DesignLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: DesignLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.registry
    }
}

#[async_trait]
impl ExperimentDesigner for TemplateDesigner {
    async fn design(
        &self,
        hypothesis: &Hypothesis,
        _ctx: &ResearchContext,
    ) -> Result<ExperimentDesign> {
        let template = self.registry.find_best(hypothesis, None).ok_or_else(|| {
            DirectorError::collaborator(
                "designer",
                format!("no applicable template for hypothesis {}", hypothesis.id),
            )
        })?;

        let mut params = CustomizationParams::for_hypothesis(hypothesis.clone());
        params.max_cost_usd = self.limits.max_cost_usd;
        params.max_duration_days = self.limits.max_duration_days;
        params.max_compute_hours = self.limits.max_compute_hours;

        let protocol = template.generate_protocol(&params)?;
        tracing::debug!(
            hypothesis = %hypothesis.id,
            template = %protocol.template_name,
            steps = protocol.steps.len(),
            "designed experiment"
        );
        Ok(ExperimentDesign {
            protocol_name: protocol.template_name.clone(),
            code: protocol.render_script(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_templates::TemplateError;
    use research_templates::default_registry;

    fn ctx() -> ResearchContext {
        ResearchContext {
            research_question: "q".into(),
            domain: "biology".into(),
            iteration: 0,
            max_iterations: 5,
            skills: String::new(),
        }
    }

    #[tokio::test]
    async fn designs_with_best_template() {
        let designer = TemplateDesigner::new(default_registry().unwrap());
        let h = Hypothesis::new("h1", "Mutant strains grow higher than wild type", "biology", "q");
        let design = designer.design(&h, &ctx()).await.unwrap();
        assert_eq!(design.protocol_name, "t_test_comparison");
        assert!(design.code.contains("# %% Step 1"));
    }

    #[tokio::test]
    async fn no_template_is_a_collaborator_error() {
        let designer = TemplateDesigner::new(default_registry().unwrap());
        let h = Hypothesis::new("h1", "Cells exist", "biology", "q");
        let err = designer.design(&h, &ctx()).await.unwrap_err();
        assert!(matches!(err, DirectorError::Collaborator { role: "designer", .. }));
    }

    #[tokio::test]
    async fn limits_are_enforced() {
        let designer = TemplateDesigner::new(default_registry().unwrap()).with_limits(DesignLimits {
            max_cost_usd: Some(0.5),
            ..DesignLimits::default()
        });
        let h = Hypothesis::new("h1", "Temperature is correlated with yield", "biology", "q");
        let err = designer.design(&h, &ctx()).await.unwrap_err();
        assert!(matches!(
            err,
            DirectorError::Template(TemplateError::ResourceLimitExceeded { .. })
        ));
    }
}
