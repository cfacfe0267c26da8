//! Project snapshot: the unit the scheduler works on.
//!
//! A snapshot holds every task and dependency of one project, as loaded by
//! the caller from storage, plus the project's team and outcome deadline.
//! The project owns its tasks and edges: removing a task cascades to its
//! descendants and to every edge touching them.
//!
//! All mutating entry points validate first and only then write, so an
//! `Err` always leaves the snapshot untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use tracing::info;
use uuid::Uuid;

use super::{Dependency, Task};
use crate::assignees::MembershipDirectory;
use crate::completion::{self, CompletionReceipt};
use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::validation::{self, NewTask, TaskUpdate};

/// Tasks and dependencies of a single project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    /// Project identifier.
    pub id: Uuid,
    /// Team whose members may be assigned.
    pub team_id: Option<Uuid>,
    /// Deadline of the project outcome; upper bound for every window.
    pub outcome_deadline: Option<DateTime<Utc>>,
    /// All tasks of the project, including completed ones.
    pub tasks: Vec<Task>,
    /// All dependency edges among the project's tasks.
    pub dependencies: Vec<Dependency>,
}

impl ProjectSnapshot {
    /// Creates an empty snapshot.
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            ..Default::default()
        }
    }

    /// Sets the project team.
    pub fn with_team(mut self, team_id: Uuid) -> Self {
        self.team_id = Some(team_id);
        self
    }

    /// Sets the outcome deadline.
    pub fn with_outcome_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.outcome_deadline = Some(deadline);
        self
    }

    /// Adds a task as loaded from storage (no validation).
    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Adds an edge as loaded from storage (no validation).
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Task by id, restricted to this project.
    pub fn task(&self, task_id: Uuid) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|t| t.id == task_id && t.project_id == self.id)
    }

    /// Mutable task by id, restricted to this project.
    pub fn task_mut(&mut self, task_id: Uuid) -> Option<&mut Task> {
        let project_id = self.id;
        self.tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.project_id == project_id)
    }

    /// Whether the task exists in this project.
    pub fn contains_task(&self, task_id: Uuid) -> bool {
        self.task(task_id).is_some()
    }

    /// Edges whose successor is `task_id`.
    pub fn incoming(&self, task_id: Uuid) -> impl Iterator<Item = &Dependency> {
        self.dependencies
            .iter()
            .filter(move |d| d.successor_id == task_id)
    }

    /// Direct children of a task.
    pub fn children(&self, task_id: Uuid) -> impl Iterator<Item = &Task> {
        self.tasks
            .iter()
            .filter(move |t| t.parent_id == Some(task_id))
    }

    /// All descendants of a task, breadth-first. Tolerates parent cycles.
    pub fn descendants(&self, task_id: Uuid) -> Vec<Uuid> {
        let mut seen = HashSet::from([task_id]);
        let mut queue = VecDeque::from([task_id]);
        let mut out = Vec::new();

        while let Some(current) = queue.pop_front() {
            for child in self.children(current) {
                if seen.insert(child.id) {
                    out.push(child.id);
                    queue.push_back(child.id);
                }
            }
        }
        out
    }

    /// Whether `candidate` sits below `ancestor` in the parent tree.
    pub fn is_descendant(&self, ancestor: Uuid, candidate: Uuid) -> bool {
        let mut current = self.task(candidate).and_then(|t| t.parent_id);
        // a parent chain can never be longer than the task list
        for _ in 0..self.tasks.len() {
            match current {
                Some(id) if id == ancestor => return true,
                Some(id) => current = self.task(id).and_then(|t| t.parent_id),
                None => return false,
            }
        }
        false
    }

    /// Validates and inserts a new task with its edges and assignees.
    ///
    /// Parent containment is enforced strictly. On success the caller is
    /// expected to recalculate the project.
    pub fn admit<D: MembershipDirectory + ?Sized>(
        &mut self,
        new_task: NewTask,
        directory: &D,
        config: &SchedulerConfig,
        now: DateTime<Utc>,
    ) -> Result<Uuid> {
        let admission = validation::prepare_admission(self, new_task, directory, config, now)?;
        let task_id = admission.task.id;
        info!(
            project_id = %self.id,
            task_id = %task_id,
            dependencies = admission.dependencies.len(),
            assignees = admission.task.assignees.len(),
            "task admitted"
        );
        self.tasks.push(admission.task);
        self.dependencies.extend(admission.dependencies);
        Ok(task_id)
    }

    /// Validates and applies a partial update to an existing task.
    pub fn update_task<D: MembershipDirectory + ?Sized>(
        &mut self,
        task_id: Uuid,
        update: TaskUpdate,
        directory: &D,
    ) -> Result<()> {
        let prepared = validation::prepare_update(self, task_id, update, directory)?;
        let index = self
            .tasks
            .iter()
            .position(|t| t.id == task_id && t.project_id == self.id)
            .ok_or(ScheduleError::TaskNotFound(task_id))?;

        if let Some(dependencies) = prepared.dependencies {
            self.dependencies.retain(|d| d.successor_id != task_id);
            self.dependencies.extend(dependencies);
        }
        self.tasks[index] = prepared.task;
        Ok(())
    }

    /// Records a completion by `user_id` on a task.
    pub fn complete_task(
        &mut self,
        task_id: Uuid,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<CompletionReceipt> {
        let task = self
            .task_mut(task_id)
            .ok_or(ScheduleError::TaskNotFound(task_id))?;
        let transition = completion::complete(task, user_id, now)?;
        Ok(CompletionReceipt {
            task_id,
            status: task.status,
            transition,
        })
    }

    /// Removes a task, its descendants, and every edge touching them.
    ///
    /// Returns the removed task ids, the requested task first.
    pub fn remove_task(&mut self, task_id: Uuid) -> Result<Vec<Uuid>> {
        if !self.contains_task(task_id) {
            return Err(ScheduleError::TaskNotFound(task_id));
        }
        let mut removed = vec![task_id];
        removed.extend(self.descendants(task_id));

        let doomed: HashSet<Uuid> = removed.iter().copied().collect();
        self.tasks.retain(|t| !doomed.contains(&t.id));
        self.dependencies
            .retain(|d| !doomed.contains(&d.predecessor_id) && !doomed.contains(&d.successor_id));
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DependencyType;

    fn chain() -> (ProjectSnapshot, Uuid, Uuid, Uuid, Uuid) {
        let pid = Uuid::new_v4();
        let root = Task::new(pid);
        let child = Task::new(pid).with_parent(root.id);
        let grandchild = Task::new(pid).with_parent(child.id);
        let other = Task::new(pid);
        let ids = (root.id, child.id, grandchild.id, other.id);
        let project = ProjectSnapshot::new(pid)
            .with_task(root)
            .with_task(child)
            .with_task(grandchild)
            .with_task(other)
            .with_dependency(Dependency::finish_to_start(ids.3, ids.2))
            .with_dependency(Dependency::new(ids.0, ids.3, DependencyType::SS));
        (project, ids.0, ids.1, ids.2, ids.3)
    }

    #[test]
    fn test_descendants() {
        let (project, root, child, grandchild, other) = chain();
        assert_eq!(project.descendants(root), vec![child, grandchild]);
        assert!(project.descendants(other).is_empty());
        assert!(project.is_descendant(root, grandchild));
        assert!(!project.is_descendant(grandchild, root));
        assert!(!project.is_descendant(other, child));
    }

    #[test]
    fn test_remove_task_cascades() {
        let (mut project, root, child, grandchild, other) = chain();
        let removed = project.remove_task(root).unwrap();
        assert_eq!(removed, vec![root, child, grandchild]);
        assert_eq!(project.tasks.len(), 1);
        assert_eq!(project.tasks[0].id, other);
        assert!(project.dependencies.is_empty());
    }

    #[test]
    fn test_remove_unknown_task() {
        let (mut project, ..) = chain();
        let missing = Uuid::new_v4();
        assert_eq!(
            project.remove_task(missing),
            Err(ScheduleError::TaskNotFound(missing))
        );
        assert_eq!(project.tasks.len(), 4);
    }

    #[test]
    fn test_task_lookup_ignores_foreign_project() {
        let (mut project, ..) = chain();
        let foreign = Task::new(Uuid::new_v4());
        let foreign_id = foreign.id;
        project.tasks.push(foreign);
        assert!(!project.contains_task(foreign_id));
    }

    #[test]
    fn test_parent_cycle_does_not_hang() {
        let pid = Uuid::new_v4();
        let a_id = Uuid::new_v4();
        let b_id = Uuid::new_v4();
        let project = ProjectSnapshot::new(pid)
            .with_task(Task::with_id(a_id, pid).with_parent(b_id))
            .with_task(Task::with_id(b_id, pid).with_parent(a_id));
        assert!(project.is_descendant(a_id, b_id));
        assert_eq!(project.descendants(a_id), vec![b_id]);
        let stray = Uuid::new_v4();
        assert!(!project.is_descendant(stray, a_id));
    }

    #[test]
    fn test_complete_task_receipt() {
        use crate::completion::CompletionTransition;
        use crate::models::TaskStatus;
        use chrono::TimeZone;

        let now = Utc.with_ymd_and_hms(2025, 2, 3, 10, 0, 0).unwrap();
        let user = Uuid::new_v4();
        let pid = Uuid::new_v4();
        let task = Task::new(pid).with_assignee(user);
        let id = task.id;
        let mut project = ProjectSnapshot::new(pid).with_task(task);

        let receipt = project.complete_task(id, user, now).unwrap();
        assert_eq!(receipt.task_id, id);
        assert_eq!(receipt.status, TaskStatus::Done);
        assert_eq!(receipt.transition, CompletionTransition::Completed);
        assert_eq!(project.task(id).and_then(|t| t.actual_end), Some(now));

        let missing = Uuid::new_v4();
        assert_eq!(
            project.complete_task(missing, user, now),
            Err(ScheduleError::TaskNotFound(missing))
        );
    }

    #[test]
    fn test_snapshot_json_shape() {
        let (project, ..) = chain();
        let value = serde_json::to_value(&project).unwrap();
        assert_eq!(value["tasks"].as_array().map(Vec::len), Some(4));
        assert_eq!(value["dependencies"][0]["dep_type"], "FS");
        assert!(value["outcome_deadline"].is_null());

        let loaded: ProjectSnapshot = serde_json::from_value(value).unwrap();
        assert_eq!(loaded, project);
    }
}
