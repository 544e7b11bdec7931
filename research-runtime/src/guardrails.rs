use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigError;

/// Default ceiling on decisions within a single iteration before the
/// controller forces convergence.
pub const MAX_ACTIONS_PER_ITERATION: u32 = 50;

// ---------------------------------------------------------------------------
// SafetyLimits — Limits on decisions
// ---------------------------------------------------------------------------

/// Limits that guarantee a research run terminates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Maximum decisions allowed in a single iteration.
    pub max_actions_per_iteration: u32,
}

impl SafetyLimits {
    pub fn new(max_actions_per_iteration: u32) -> Result<Self, ConfigError> {
        if max_actions_per_iteration == 0 {
            return Err(ConfigError::ZeroActionLimit);
        }
        Ok(Self {
            max_actions_per_iteration,
        })
    }
}

impl Default for SafetyLimits {
    fn default() -> Self {
        Self {
            max_actions_per_iteration: MAX_ACTIONS_PER_ITERATION,
        }
    }
}

// ---------------------------------------------------------------------------
// ConvergenceReason — Why a run ended
// ---------------------------------------------------------------------------

/// Why a run converged. Reported, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergenceReason {
    NoWorkRemaining,
    ActionLimitExceeded,
    IterationLimitExceeded,
}

impl ConvergenceReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ConvergenceReason::NoWorkRemaining => "no_work_remaining",
            ConvergenceReason::ActionLimitExceeded => "action_limit_exceeded",
            ConvergenceReason::IterationLimitExceeded => "iteration_limit_exceeded",
        }
    }

    /// Whether a safety limit, rather than exhausted work, ended the run.
    pub fn is_forced(self) -> bool {
        !matches!(self, ConvergenceReason::NoWorkRemaining)
    }
}

impl std::fmt::Display for ConvergenceReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ActionCounter — Tracks decisions against the per-iteration limit
// ---------------------------------------------------------------------------

/// Per-iteration decision count, plus a running total for reporting.
#[derive(Debug, Clone, Default)]
pub struct ActionCounter {
    this_iteration: u32,
    total: u64,
}

impl ActionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an arbitrary per-iteration value.
    pub fn starting_at(this_iteration: u32) -> Self {
        Self {
            this_iteration,
            total: 0,
        }
    }

    /// Record one decision. Never fails; saturates instead of wrapping.
    pub fn record(&mut self) -> u32 {
        self.this_iteration = self.this_iteration.saturating_add(1);
        self.total = self.total.saturating_add(1);
        self.this_iteration
    }

    /// Reset the per-iteration counter (call at the start of each iteration).
    pub fn reset_iteration(&mut self) {
        self.this_iteration = 0;
    }

    pub fn this_iteration(&self) -> u32 {
        self.this_iteration
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn limit_reached(&self, limits: &SafetyLimits) -> bool {
        self.this_iteration >= limits.max_actions_per_iteration
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
