//! Task model.
//!
//! A task is a unit of work inside one project. It may have a parent task
//! (forming a tree), a planned execution window, an optional hard deadline,
//! and a set of assignees governed by a completion rule.
//!
//! Title and description are opaque to the scheduler.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::window::{duration_from_days, Window};

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    #[default]
    Planned,
    /// At least one assignee has completed their part.
    InProgress,
    /// Terminal. Frozen for scheduling purposes.
    Done,
    /// Set externally.
    Blocked,
    /// Set externally.
    Cancelled,
}

impl TaskStatus {
    /// Whether the task is frozen (excluded from recalculation).
    #[inline]
    pub fn is_terminal(self) -> bool {
        self == Self::Done
    }
}

/// How many assignees must complete a task before it is done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompletionRule {
    /// The first completion finishes the task.
    AnyOne,
    /// Every assignee must complete.
    #[default]
    AllAssignees,
}

/// A materialized (task, user) assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskAssignee {
    /// Assigned user.
    pub user_id: Uuid,
    /// Team membership the assignment was resolved through.
    pub membership_id: Option<Uuid>,
    /// Whether this user has completed their part.
    pub is_completed: bool,
    /// When the user completed.
    pub completed_at: Option<DateTime<Utc>>,
}

impl TaskAssignee {
    /// Creates an open assignment for a user.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            membership_id: None,
            is_completed: false,
            completed_at: None,
        }
    }

    /// Records the membership this assignment came from.
    pub fn with_membership(mut self, membership_id: Uuid) -> Self {
        self.membership_id = Some(membership_id);
        self
    }

    /// Marks the assignment complete. Returns `false` if it already was.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) -> bool {
        if self.is_completed {
            return false;
        }
        self.is_completed = true;
        self.completed_at = Some(at);
        true
    }
}

/// A task to be scheduled.
///
/// # Time Representation
/// `duration_days` is a day count. Windows are UTC instants. The effective
/// end used by dependency edges is `deadline` when set, else `planned_end`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Optional parent task in the same project.
    pub parent_id: Option<Uuid>,
    /// Human-readable title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Expected duration (days, non-negative).
    pub duration_days: f64,
    /// Planned start.
    pub planned_start: Option<DateTime<Utc>>,
    /// Planned end.
    pub planned_end: Option<DateTime<Utc>>,
    /// Hard upper bound, distinct from `planned_end`.
    pub deadline: Option<DateTime<Utc>>,
    /// Stamped when work is first recorded.
    pub actual_start: Option<DateTime<Utc>>,
    /// Stamped on completion.
    pub actual_end: Option<DateTime<Utc>>,
    /// Completion policy.
    pub completion_rule: CompletionRule,
    /// Set when the scheduler has moved this task's window.
    pub auto_scheduled: bool,
    /// Assignment records owned by this task.
    pub assignees: Vec<TaskAssignee>,
}

impl Task {
    /// Creates a planned task with a random id.
    pub fn new(project_id: Uuid) -> Self {
        Self::with_id(Uuid::new_v4(), project_id)
    }

    /// Creates a planned task with the given id.
    pub fn with_id(id: Uuid, project_id: Uuid) -> Self {
        Self {
            id,
            project_id,
            parent_id: None,
            title: String::new(),
            description: String::new(),
            status: TaskStatus::Planned,
            duration_days: 0.0,
            planned_start: None,
            planned_end: None,
            deadline: None,
            actual_start: None,
            actual_end: None,
            completion_rule: CompletionRule::default(),
            auto_scheduled: false,
            assignees: Vec::new(),
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the duration (days).
    pub fn with_duration_days(mut self, days: f64) -> Self {
        self.duration_days = days;
        self
    }

    /// Sets both planned endpoints.
    pub fn with_window(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self.planned_end = Some(end);
        self
    }

    /// Sets the planned start only.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self
    }

    /// Sets the planned end only.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.planned_end = Some(end);
        self
    }

    /// Sets the hard deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the parent task.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the completion rule.
    pub fn with_completion_rule(mut self, rule: CompletionRule) -> Self {
        self.completion_rule = rule;
        self
    }

    /// Adds an open assignment for a user.
    pub fn with_assignee(mut self, user_id: Uuid) -> Self {
        self.assignees.push(TaskAssignee::new(user_id));
        self
    }

    /// Duration with the analysis floor applied.
    pub fn duration(&self, floor_days: f64) -> TimeDelta {
        duration_from_days(self.duration_days, floor_days)
    }

    /// Planned window, when both endpoints are known.
    pub fn planned_window(&self) -> Option<Window> {
        match (self.planned_start, self.planned_end) {
            (Some(start), Some(end)) => Some(Window::new(start, end)),
            _ => None,
        }
    }

    /// End used by dependency edges: `deadline` if present, else `planned_end`.
    pub fn effective_end(&self) -> Option<DateTime<Utc>> {
        self.deadline.or(self.planned_end)
    }

    /// Assignment record for a user.
    pub fn assignee(&self, user_id: Uuid) -> Option<&TaskAssignee> {
        self.assignees.iter().find(|a| a.user_id == user_id)
    }

    /// Whether the user is on the assignee list.
    pub fn is_assigned(&self, user_id: Uuid) -> bool {
        self.assignee(user_id).is_some()
    }

    /// Number of assignees who have completed.
    pub fn completed_assignee_count(&self) -> usize {
        self.assignees.iter().filter(|a| a.is_completed).count()
    }

    /// Applies a scheduled window. Returns `true` if anything changed.
    pub(crate) fn apply_window(&mut self, window: Window) -> bool {
        let changed =
            self.planned_start != Some(window.start) || self.planned_end != Some(window.end);
        if changed {
            self.planned_start = Some(window.start);
            self.planned_end = Some(window.end);
            self.auto_scheduled = true;
        }
        changed
    }
}
