use std::collections::BTreeMap;

use indexmap::IndexMap;
use research_runtime::ExperimentType;
use research_runtime::Hypothesis;
use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::error::TemplateError;
use crate::template::ExperimentTemplate;
use crate::template::TemplateMetadata;

/// Counts over the registered templates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStatistics {
    pub total_templates: usize,
    pub by_type: BTreeMap<String, usize>,
    pub by_domain: BTreeMap<String, usize>,
    pub domains_covered: Vec<String>,
}

/// Owned registry of experiment templates. Construct one per run and pass it
/// to whoever designs experiments.
#[derive(Default)]
pub struct TemplateRegistry {
    templates: IndexMap<String, Box<dyn ExperimentTemplate>>,
    by_type: BTreeMap<&'static str, Vec<String>>,
    by_domain: BTreeMap<String, Vec<String>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, template: Box<dyn ExperimentTemplate>) -> Result<()> {
        let report = template.validate();
        if !report.is_valid() {
            return Err(TemplateError::Invalid(report.errors));
        }
        let meta = template.metadata();
        let name = meta.name.clone();
        if self.templates.contains_key(&name) {
            return Err(TemplateError::Duplicate(name));
        }
        self.by_type
            .entry(meta.experiment_type.as_str())
            .or_default()
            .push(name.clone());
        if let Some(domain) = &meta.domain {
            self.by_domain
                .entry(domain.to_ascii_lowercase())
                .or_default()
                .push(name.clone());
        }
        tracing::debug!(template = %name, "registered experiment template");
        self.templates.insert(name, template);
        Ok(())
    }

    /// Remove a template. Unknown names are ignored.
    pub fn unregister(&mut self, name: &str) -> Option<Box<dyn ExperimentTemplate>> {
        let template = self.templates.shift_remove(name)?;
        let meta = template.metadata();
        if let Some(names) = self.by_type.get_mut(meta.experiment_type.as_str()) {
            names.retain(|n| n != name);
        }
        if let Some(domain) = &meta.domain {
            let key = domain.to_ascii_lowercase();
            if let Some(names) = self.by_domain.get_mut(&key) {
                names.retain(|n| n != name);
                if names.is_empty() {
                    self.by_domain.remove(&key);
                }
            }
        }
        Some(template)
    }

    pub fn get(&self, name: &str) -> Option<&dyn ExperimentTemplate> {
        self.templates.get(name).map(Box::as_ref)
    }

    pub fn by_type(&self, experiment_type: ExperimentType) -> Vec<&dyn ExperimentTemplate> {
        self.lookup(self.by_type.get(experiment_type.as_str()))
    }

    pub fn by_domain(&self, domain: &str) -> Vec<&dyn ExperimentTemplate> {
        self.lookup(self.by_domain.get(&domain.to_ascii_lowercase()))
    }

    fn lookup(&self, names: Option<&Vec<String>>) -> Vec<&dyn ExperimentTemplate> {
        names
            .into_iter()
            .flatten()
            .filter_map(|n| self.get(n))
            .collect()
    }

    /// Applicable templates, best first. Ties keep registration order.
    pub fn find_applicable(
        &self,
        hypothesis: &Hypothesis,
        experiment_type: Option<ExperimentType>,
    ) -> Vec<&dyn ExperimentTemplate> {
        let candidates: Vec<&dyn ExperimentTemplate> = match experiment_type {
            Some(t) => self.by_type(t),
            None => self.templates.values().map(Box::as_ref).collect(),
        };
        let mut scored: Vec<(f64, &dyn ExperimentTemplate)> = candidates
            .into_iter()
            .filter(|t| t.is_applicable(hypothesis))
            .map(|t| (t.applicability_score(hypothesis), t))
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.into_iter().map(|(_, t)| t).collect()
    }

    pub fn find_best(
        &self,
        hypothesis: &Hypothesis,
        experiment_type: Option<ExperimentType>,
    ) -> Option<&dyn ExperimentTemplate> {
        self.find_applicable(hypothesis, experiment_type)
            .into_iter()
            .next()
    }

    pub fn list_metadata(&self) -> Vec<&TemplateMetadata> {
        self.templates.values().map(|t| t.metadata()).collect()
    }

    pub fn statistics(&self) -> RegistryStatistics {
        RegistryStatistics {
            total_templates: self.templates.len(),
            by_type: ExperimentType::ALL
                .iter()
                .map(|t| {
                    let count = self.by_type.get(t.as_str()).map_or(0, Vec::len);
                    (t.as_str().to_string(), count)
                })
                .collect(),
            by_domain: self
                .by_domain
                .iter()
                .map(|(d, names)| (d.clone(), names.len()))
                .collect(),
            domains_covered: self.by_domain.keys().cloned().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.contains_key(name)
    }
}

impl std::fmt::Debug for TemplateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRegistry")
            .field("templates", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}
