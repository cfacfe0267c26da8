//! Recalculation report and post-hoc schedule audit.
//!
//! The stabilizer never fails on malformed data. Instead it reports what it
//! could not evaluate and which constraints remain violated after the last
//! pass, so the caller can decide what to surface.
//!
//! # Violations
//!
//! | Type | Condition |
//! |------|-----------|
//! | `DeadlineOverrun` | task ends after the project outcome deadline |
//! | `TaskDeadlineMiss` | task ends after its own deadline |
//! | `PrecedenceViolation` | an edge bound is not met |
//! | `ContainmentViolation` | child window not inside parent window |

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::resolver::{edge_bound, EdgeAnchor};
use crate::error::{ReferenceKind, ScheduleError};
use crate::models::{Endpoint, ProjectSnapshot, Task};

/// A parent or predecessor reference the stabilizer had to skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedReference {
    /// Task holding the reference.
    pub task_id: Uuid,
    /// Referenced task id.
    pub referenced_id: Uuid,
    /// Parent or predecessor.
    pub kind: ReferenceKind,
    /// Why it could not be evaluated.
    pub reason: String,
}

impl UnresolvedReference {
    pub(crate) fn new(
        task_id: Uuid,
        referenced_id: Uuid,
        kind: ReferenceKind,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            task_id,
            referenced_id,
            kind,
            reason: reason.into(),
        }
    }

    /// Converts to the caller-facing error.
    pub fn to_error(&self) -> ScheduleError {
        ScheduleError::InvalidReference {
            task_id: self.task_id,
            referenced: self.referenced_id,
            kind: self.kind,
            reason: self.reason.clone(),
        }
    }
}

/// Classification of remaining constraint violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ViolationType {
    /// Task ends after the project outcome deadline.
    DeadlineOverrun,
    /// Task ends after its own deadline.
    TaskDeadlineMiss,
    /// A dependency bound is not met.
    PrecedenceViolation,
    /// A child window sticks out of its parent window.
    ContainmentViolation,
}

/// A constraint still violated after recalculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Type of violation.
    pub violation_type: ViolationType,
    /// Offending task.
    pub task_id: Uuid,
    /// Predecessor or parent involved, if any.
    pub related_id: Option<Uuid>,
    /// How far the bound is missed (ms).
    pub excess_ms: i64,
    /// Human-readable description.
    pub message: String,
}

impl Violation {
    /// Task ends after the outcome deadline.
    pub fn deadline_overrun(task_id: Uuid, end: DateTime<Utc>, deadline: DateTime<Utc>) -> Self {
        Self {
            violation_type: ViolationType::DeadlineOverrun,
            task_id,
            related_id: None,
            excess_ms: (end - deadline).num_milliseconds(),
            message: format!("Task {task_id} ends at {end}, after outcome deadline {deadline}"),
        }
    }

    /// Task ends after its own deadline.
    pub fn task_deadline_miss(task_id: Uuid, end: DateTime<Utc>, deadline: DateTime<Utc>) -> Self {
        Self {
            violation_type: ViolationType::TaskDeadlineMiss,
            task_id,
            related_id: None,
            excess_ms: (end - deadline).num_milliseconds(),
            message: format!("Task {task_id} ends at {end}, after its deadline {deadline}"),
        }
    }

    /// An edge bound is not met.
    pub fn precedence(
        task_id: Uuid,
        predecessor_id: Uuid,
        actual: DateTime<Utc>,
        bound: DateTime<Utc>,
    ) -> Self {
        Self {
            violation_type: ViolationType::PrecedenceViolation,
            task_id,
            related_id: Some(predecessor_id),
            excess_ms: (bound - actual).num_milliseconds(),
            message: format!(
                "Task {task_id} must not be earlier than {bound} (predecessor {predecessor_id})"
            ),
        }
    }

    /// Child window outside its parent.
    pub fn containment(task_id: Uuid, parent_id: Uuid, excess_ms: i64) -> Self {
        Self {
            violation_type: ViolationType::ContainmentViolation,
            task_id,
            related_id: Some(parent_id),
            excess_ms,
            message: format!("Task {task_id} lies outside parent {parent_id}"),
        }
    }
}

/// Outcome of one project recalculation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecalculationReport {
    /// Project recalculated.
    pub project_id: Uuid,
    /// Non-terminal tasks processed.
    pub processed: usize,
    /// Passes run.
    pub passes: usize,
    /// Pass budget for this project.
    pub pass_budget: usize,
    /// Whether a pass finished without any change.
    pub converged: bool,
    /// Whether the dependency graph contained a cycle.
    pub cycle_detected: bool,
    /// Tasks whose planned window changed.
    pub changed: Vec<Uuid>,
    /// References that could not be evaluated.
    pub unresolved: Vec<UnresolvedReference>,
    /// Constraints still violated after the last pass.
    pub violations: Vec<Violation>,
}

impl RecalculationReport {
    /// Whether nothing changed.
    pub fn is_noop(&self) -> bool {
        self.changed.is_empty()
    }

    /// Fails with the first unresolved reference, if any.
    pub fn check_references(&self) -> Result<(), ScheduleError> {
        match self.unresolved.first() {
            Some(unresolved) => Err(unresolved.to_error()),
            None => Ok(()),
        }
    }

    /// Violations of a given type.
    pub fn violations_of(&self, violation_type: ViolationType) -> impl Iterator<Item = &Violation> {
        self.violations
            .iter()
            .filter(move |v| v.violation_type == violation_type)
    }
}

fn anchor_of(task: &Task) -> EdgeAnchor {
    EdgeAnchor {
        start: task.planned_start,
        end: task.effective_end(),
    }
}

/// Lists every constraint the snapshot's planned windows currently violate.
///
/// Only non-terminal tasks with a complete window are audited.
pub fn audit(project: &ProjectSnapshot) -> Vec<Violation> {
    let tasks: HashMap<Uuid, &Task> = project
        .tasks
        .iter()
        .filter(|t| t.project_id == project.id)
        .map(|t| (t.id, t))
        .collect();
    let mut violations = Vec::new();

    for task in project.tasks.iter().filter(|t| t.project_id == project.id) {
        if task.status.is_terminal() {
            continue;
        }
        let Some(window) = task.planned_window() else {
            continue;
        };

        if let Some(deadline) = project.outcome_deadline {
            if window.end > deadline {
                violations.push(Violation::deadline_overrun(task.id, window.end, deadline));
            }
        }
        if let Some(deadline) = task.deadline {
            if window.end > deadline {
                violations.push(Violation::task_deadline_miss(task.id, window.end, deadline));
            }
        }
        let parent_window = task
            .parent_id
            .and_then(|pid| tasks.get(&pid))
            .and_then(|p| p.planned_window().map(|w| (p.id, w)));
        if let Some((parent_id, parent)) = parent_window {
            if !parent.contains(&window) {
                let early = (parent.start - window.start).num_milliseconds().max(0);
                let late = (window.end - parent.end).num_milliseconds().max(0);
                violations.push(Violation::containment(task.id, parent_id, early + late));
            }
        }
    }

    for dependency in &project.dependencies {
        let (Some(successor), Some(predecessor)) = (
            tasks.get(&dependency.successor_id),
            tasks.get(&dependency.predecessor_id),
        ) else {
            continue;
        };
        if successor.status.is_terminal() || dependency.is_self_link() {
            continue;
        }
        let Some(window) = successor.planned_window() else {
            continue;
        };
        let Some((endpoint, bound)) = edge_bound(dependency, &anchor_of(predecessor)) else {
            continue;
        };
        let actual = match endpoint {
            Endpoint::Start => window.start,
            Endpoint::End => window.end,
        };
        if actual < bound {
            violations.push(Violation::precedence(
                successor.id,
                predecessor.id,
                actual,
                bound,
            ));
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Dependency, DependencyType, TaskStatus};
    use chrono::{TimeDelta, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(n)
    }

    #[test]
    fn test_audit_clean_project() {
        let pid = Uuid::new_v4();
        let a = Task::new(pid).with_window(day(0), day(2));
        let b = Task::new(pid).with_window(day(2), day(4));
        let project = ProjectSnapshot::new(pid)
            .with_outcome_deadline(day(10))
            .with_dependency(Dependency::finish_to_start(a.id, b.id))
            .with_task(a)
            .with_task(b);
        assert!(audit(&project).is_empty());
    }

    #[test]
    fn test_audit_finds_each_violation() {
        let pid = Uuid::new_v4();
        let parent = Task::new(pid).with_window(day(0), day(3));
        let child = Task::new(pid)
            .with_parent(parent.id)
            .with_window(day(2), day(6))
            .with_deadline(day(5));
        let pred = Task::new(pid).with_window(day(0), day(4));
        let project = ProjectSnapshot::new(pid)
            .with_outcome_deadline(day(5))
            .with_dependency(
                Dependency::new(pred.id, child.id, DependencyType::SS).with_lag_hours(72),
            )
            .with_task(parent)
            .with_task(child.clone())
            .with_task(pred);

        let violations = audit(&project);
        let kinds: Vec<ViolationType> = violations.iter().map(|v| v.violation_type).collect();
        assert!(kinds.contains(&ViolationType::DeadlineOverrun));
        assert!(kinds.contains(&ViolationType::TaskDeadlineMiss));
        assert!(kinds.contains(&ViolationType::ContainmentViolation));
        assert!(kinds.contains(&ViolationType::PrecedenceViolation));
        assert!(violations.iter().all(|v| v.task_id == child.id));

        let containment = violations
            .iter()
            .find(|v| v.violation_type == ViolationType::ContainmentViolation)
            .unwrap();
        assert_eq!(containment.excess_ms, TimeDelta::days(3).num_milliseconds());
    }

    #[test]
    fn test_audit_skips_done_tasks() {
        let pid = Uuid::new_v4();
        let done = Task::new(pid)
            .with_window(day(0), day(9))
            .with_status(TaskStatus::Done);
        let project = ProjectSnapshot::new(pid)
            .with_outcome_deadline(day(1))
            .with_task(done);
        assert!(audit(&project).is_empty());
    }

    #[test]
    fn test_check_references() {
        let mut report = RecalculationReport::default();
        assert!(report.check_references().is_ok());

        let (task, missing) = (Uuid::new_v4(), Uuid::new_v4());
        report.unresolved.push(UnresolvedReference::new(
            task,
            missing,
            ReferenceKind::Predecessor,
            "predecessor not in project",
        ));
        let err = report.check_references().unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidReference { referenced, kind: ReferenceKind::Predecessor, .. }
                if referenced == missing
        ));
    }
}
