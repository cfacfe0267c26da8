//! Completion-rule state machine.
//!
//! ```text
//! Planned ──first completion (AllAssignees)──▶ InProgress
//!    │                                             │
//!    └──rule satisfied──────────▶ Done ◀──last completion
//! ```
//!
//! `Blocked` and `Cancelled` are set externally. A blocked task still
//! records completions and becomes `Done` once its rule is satisfied;
//! a cancelled task rejects them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::models::{CompletionRule, Task, TaskStatus};

/// What a completion action did to the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionTransition {
    /// The task reached `Done`.
    Completed,
    /// The task moved `Planned → InProgress`.
    Progressed,
    /// The assignee's record changed (or was already set); status did not.
    Recorded,
    /// The task was already `Done`; only the assignee's record may change.
    AlreadyDone,
}

/// Result of a completion action, as returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReceipt {
    /// Task acted on.
    pub task_id: Uuid,
    /// Status after the action.
    pub status: TaskStatus,
    /// What happened.
    pub transition: CompletionTransition,
}

/// Applies a completion action by `user_id` to `task`.
///
/// # Rules
/// - No assignees: any participant finishes the task.
/// - `AnyOne`: the first assignee completion finishes the task.
/// - `AllAssignees`: each completion marks one record; the first moves the
///   task to `InProgress`, the last one finishes it.
///
/// # Errors
/// - [`ScheduleError::UnauthorizedCompletion`] when the task has assignees
///   and `user_id` is not one of them.
/// - [`ScheduleError::TaskCancelled`] for a cancelled task.
pub fn complete(
    task: &mut Task,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CompletionTransition> {
    if !task.assignees.is_empty() && !task.is_assigned(user_id) {
        return Err(ScheduleError::UnauthorizedCompletion {
            task_id: task.id,
            user_id,
        });
    }
    if task.status == TaskStatus::Done {
        if let Some(record) = task.assignees.iter_mut().find(|a| a.user_id == user_id) {
            record.mark_completed(now);
        }
        return Ok(CompletionTransition::AlreadyDone);
    }
    if task.status == TaskStatus::Cancelled {
        return Err(ScheduleError::TaskCancelled(task.id));
    }

    if task.assignees.is_empty() {
        finish(task, now);
        info!(task_id = %task.id, user_id = %user_id, "unassigned task completed");
        return Ok(CompletionTransition::Completed);
    }

    if let Some(record) = task.assignees.iter_mut().find(|a| a.user_id == user_id) {
        record.mark_completed(now);
    }

    let transition = match task.completion_rule {
        CompletionRule::AnyOne => {
            finish(task, now);
            CompletionTransition::Completed
        }
        CompletionRule::AllAssignees => {
            if task.completed_assignee_count() == task.assignees.len() {
                finish(task, now);
                CompletionTransition::Completed
            } else if task.status == TaskStatus::Planned {
                task.status = TaskStatus::InProgress;
                task.actual_start.get_or_insert(now);
                CompletionTransition::Progressed
            } else {
                CompletionTransition::Recorded
            }
        }
    };

    info!(
        task_id = %task.id,
        user_id = %user_id,
        completed = task.completed_assignee_count(),
        total = task.assignees.len(),
        status = ?task.status,
        "completion recorded"
    );
    Ok(transition)
}

fn finish(task: &mut Task, now: DateTime<Utc>) {
    task.status = TaskStatus::Done;
    task.actual_start.get_or_insert(now);
    task.actual_end = Some(now);
}
