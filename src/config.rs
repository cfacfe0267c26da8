//! Scheduler configuration.

use serde::{Deserialize, Serialize};

/// Smallest duration used for window arithmetic: 1/60 day (24 minutes).
pub const MIN_DURATION_DAYS: f64 = 1.0 / 60.0;

/// Tuning knobs for [`Stabilizer`](crate::scheduler::Stabilizer).
///
/// Deserializes with defaults for every missing field, so a host can embed
/// it in its own configuration file.
///
/// # Example
/// ```
/// use project_scheduler::config::SchedulerConfig;
///
/// let config = SchedulerConfig::default().with_pass_factor(3);
/// assert_eq!(config.pass_budget(4), 12);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Pass budget multiplier: at most `pass_factor × task_count` passes.
    pub pass_factor: usize,
    /// Floor applied to task durations (days).
    pub min_duration_days: f64,
    /// Pull windows back to the project outcome deadline.
    pub clamp_to_outcome_deadline: bool,
    /// Fail recalculation when an edge or parent cannot be evaluated.
    pub strict_references: bool,
}

impl SchedulerConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self {
            pass_factor: 2,
            min_duration_days: MIN_DURATION_DAYS,
            clamp_to_outcome_deadline: true,
            strict_references: false,
        }
    }

    /// Sets the pass budget multiplier.
    pub fn with_pass_factor(mut self, factor: usize) -> Self {
        self.pass_factor = factor;
        self
    }

    /// Sets the duration floor in days.
    pub fn with_min_duration_days(mut self, days: f64) -> Self {
        self.min_duration_days = days;
        self
    }

    /// Enables or disables the outcome deadline clamp.
    pub fn with_deadline_clamp(mut self, enabled: bool) -> Self {
        self.clamp_to_outcome_deadline = enabled;
        self
    }

    /// Enables or disables strict reference checking.
    pub fn with_strict_references(mut self, strict: bool) -> Self {
        self.strict_references = strict;
        self
    }

    /// Maximum number of passes for a working set of `task_count` tasks.
    ///
    /// Never zero for a non-empty set, so every task is visited at least once.
    pub fn pass_budget(&self, task_count: usize) -> usize {
        if task_count == 0 {
            return 0;
        }
        self.pass_factor.saturating_mul(task_count).max(1)
    }

    /// Duration floor, guarded against non-positive or non-finite settings.
    pub(crate) fn duration_floor_days(&self) -> f64 {
        if self.min_duration_days.is_finite() && self.min_duration_days > 0.0 {
            self.min_duration_days
        } else {
            MIN_DURATION_DAYS
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::new()
    }
}
