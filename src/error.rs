//! Error types for admission-time and completion operations.
//!
//! Only operations that admit caller input (task creation, task update,
//! assignment, completion) fail hard. Window derivation and project
//! recalculation always produce a result; their problems are reported on
//! [`RecalculationReport`](crate::scheduler::RecalculationReport) instead.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Result alias used throughout the crate.
pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;

/// What kind of entity an invalid reference pointed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceKind {
    /// A parent task id.
    Parent,
    /// A dependency predecessor id.
    Predecessor,
}

impl std::fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parent => f.write_str("parent"),
            Self::Predecessor => f.write_str("predecessor"),
        }
    }
}

/// Errors surfaced to the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScheduleError {
    /// A parent or predecessor does not exist in the project, or it would
    /// link a task to itself or to one of its own descendants.
    #[error("invalid {kind} reference {referenced} on task {task_id}: {reason}")]
    InvalidReference {
        task_id: Uuid,
        referenced: Uuid,
        kind: ReferenceKind,
        reason: String,
    },

    /// A proposed child window falls outside its parent's window.
    #[error(
        "task window [{start}, {end}] is outside parent {parent_id} window [{parent_start}, {parent_end}]"
    )]
    ContainmentViolation {
        parent_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        parent_start: DateTime<Utc>,
        parent_end: DateTime<Utc>,
    },

    /// A planned end before the planned start.
    #[error("plannedEnd {end} must be >= plannedStart {start}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// A negative or non-finite duration.
    #[error("duration {0} days must be a non-negative number")]
    InvalidDuration(f64),

    /// A second edge for an ordered (predecessor, successor) pair.
    #[error("duplicate dependency {predecessor_id} -> {successor_id}")]
    DuplicateDependency {
        predecessor_id: Uuid,
        successor_id: Uuid,
    },

    /// A user outside the assignee list tried to complete the task.
    #[error("user {user_id} is not assigned to task {task_id}")]
    UnauthorizedCompletion { task_id: Uuid, user_id: Uuid },

    /// An assignee identifier did not resolve to a member of the project team.
    #[error("cannot resolve assignee {identifier}: {reason}")]
    AssigneeResolutionFailure { identifier: Uuid, reason: String },

    /// No task with this id in the project.
    #[error("task {0} not found")]
    TaskNotFound(Uuid),

    /// Completion attempted on a cancelled task.
    #[error("task {0} is cancelled")]
    TaskCancelled(Uuid),
}

impl ScheduleError {
    pub(crate) fn invalid_parent(
        task_id: Uuid,
        parent_id: Uuid,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidReference {
            task_id,
            referenced: parent_id,
            kind: ReferenceKind::Parent,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_predecessor(
        task_id: Uuid,
        predecessor_id: Uuid,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidReference {
            task_id,
            referenced: predecessor_id,
            kind: ReferenceKind::Predecessor,
            reason: reason.into(),
        }
    }

    pub(crate) fn unresolved_assignee(identifier: Uuid, reason: impl Into<String>) -> Self {
        Self::AssigneeResolutionFailure {
            identifier,
            reason: reason.into(),
        }
    }

    /// Whether the error is caused by malformed caller input (400-equivalent)
    /// rather than a missing entity or a permission problem.
    pub fn is_bad_request(&self) -> bool {
        matches!(
            self,
            Self::InvalidReference { .. }
                | Self::ContainmentViolation { .. }
                | Self::InvalidWindow { .. }
                | Self::InvalidDuration(_)
                | Self::DuplicateDependency { .. }
                | Self::AssigneeResolutionFailure { .. }
        )
    }
}
