use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;
use crate::guardrails::MAX_ACTIONS_PER_ITERATION;
use crate::guardrails::SafetyLimits;

pub const ENV_MAX_ITERATIONS: &str = "RESEARCH_MAX_ITERATIONS";
pub const ENV_MAX_ACTIONS: &str = "RESEARCH_MAX_ACTIONS_PER_ITERATION";
pub const ENV_DOMAIN: &str = "RESEARCH_DOMAIN";
pub const ENV_ENABLED_DOMAINS: &str = "RESEARCH_ENABLED_DOMAINS";

/// What the orchestrator does with an experiment whose execution failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionFailurePolicy {
    /// Record a result carrying the failure marker so analysis sees it.
    #[default]
    RecordAsResult,
    /// Discard it, as if execution produced nothing.
    Drop,
}

/// Domains recognized out of the box.
pub fn default_enabled_domains() -> Vec<String> {
    ["biology", "chemistry", "materials", "neuroscience", "physics", "general"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Result of the advisory domain check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainCheck {
    Recognized,
    Unrecognized,
}

/// Reject domains that cannot be a domain tag at all.
pub fn normalize_domain(domain: &str) -> Result<String, ConfigError> {
    let normalized = domain.trim().to_ascii_lowercase();
    let well_formed = !normalized.is_empty()
        && normalized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if well_formed {
        Ok(normalized)
    } else {
        Err(ConfigError::MalformedDomain(domain.to_string()))
    }
}

/// Check `domain` against the allow-list. Unknown domains are logged, never blocked.
pub fn validate_domain(domain: &str, enabled: &[String]) -> DomainCheck {
    let normalized = domain.trim().to_ascii_lowercase();
    if enabled.iter().any(|d| d.eq_ignore_ascii_case(&normalized)) {
        DomainCheck::Recognized
    } else {
        tracing::warn!(
            domain = %domain,
            enabled = ?enabled,
            "domain is not in the enabled list; continuing anyway"
        );
        DomainCheck::Unrecognized
    }
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Configuration of a single research run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResearchConfig {
    pub research_question: String,
    pub domain: String,
    /// Ceiling on outer research cycles.
    pub max_iterations: u32,
    /// Ceiling on decisions within one cycle before forced convergence.
    pub max_actions_per_iteration: u32,
    pub enabled_domains: Vec<String>,
    pub execution_timeout_secs: Option<u64>,
    pub failure_policy: ExecutionFailurePolicy,
    /// Where notebooks are written. None disables notebook generation.
    pub artifacts_dir: Option<PathBuf>,
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            research_question: String::new(),
            domain: "general".to_string(),
            max_iterations: 10,
            max_actions_per_iteration: MAX_ACTIONS_PER_ITERATION,
            enabled_domains: default_enabled_domains(),
            execution_timeout_secs: None,
            failure_policy: ExecutionFailurePolicy::default(),
            artifacts_dir: None,
        }
    }
}

impl ResearchConfig {
    pub fn new(research_question: &str, domain: &str) -> Self {
        Self {
            research_question: research_question.to_string(),
            domain: domain.to_string(),
            ..Self::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `RESEARCH_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_ITERATIONS) {
            self.max_iterations = parse_u32(ENV_MAX_ITERATIONS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_MAX_ACTIONS) {
            self.max_actions_per_iteration = parse_u32(ENV_MAX_ACTIONS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_DOMAIN) {
            self.domain = raw.trim().to_string();
        }
        if let Some(raw) = lookup(ENV_ENABLED_DOMAINS) {
            self.enabled_domains = parse_domain_list(&raw);
        }
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides(|key| std::env::var(key).ok())
    }

    /// Fail fast on anything that would make the run ill-defined.
    pub fn validate(&self) -> Result<DomainCheck, ConfigError> {
        if self.research_question.trim().is_empty() {
            return Err(ConfigError::EmptyResearchQuestion);
        }
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroMaxIterations);
        }
        if self.max_actions_per_iteration == 0 {
            return Err(ConfigError::ZeroActionLimit);
        }
        if self.execution_timeout_secs == Some(0) {
            return Err(ConfigError::ZeroExecutionTimeout);
        }
        let domain = normalize_domain(&self.domain)?;
        Ok(validate_domain(&domain, &self.enabled_domains))
    }

    pub fn safety_limits(&self) -> Result<SafetyLimits, ConfigError> {
        SafetyLimits::new(self.max_actions_per_iteration)
    }

    pub fn execution_timeout(&self) -> Option<std::time::Duration> {
        self.execution_timeout_secs
            .map(std::time::Duration::from_secs)
    }
}

fn parse_u32(key: &str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| ConfigError::InvalidOverride {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
