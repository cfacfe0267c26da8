//! Input validation for task admission, task updates and whole snapshots.
//!
//! Admission and update checks fail fast with a [`ScheduleError`] and never
//! touch the snapshot; the caller applies the prepared result only on
//! success. Snapshot validation instead collects every issue it finds.
//!
//! Detects:
//! - Inverted windows and invalid durations
//! - Parents and predecessors outside the project
//! - Parent cycles and self links
//! - Duplicate (predecessor, successor) pairs
//! - Circular precedence dependencies (DAG validation)
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::assignees::{replace_assignees, resolve_assignees, MembershipDirectory};
use crate::config::SchedulerConfig;
use crate::error::{Result, ScheduleError};
use crate::models::window::MAX_DURATION_DAYS;
use crate::models::{CompletionRule, Dependency, DependencyType, ProjectSnapshot, Task, Window};
use crate::scheduler::check_containment;

/// A requested incoming edge, predecessor side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDependency {
    /// Predecessor task.
    pub predecessor_id: Uuid,
    /// Edge type.
    pub dep_type: DependencyType,
    /// Lag (hours).
    #[serde(default)]
    pub lag_hours: i64,
}

impl NewDependency {
    /// Creates an edge without lag.
    pub fn new(predecessor_id: Uuid, dep_type: DependencyType) -> Self {
        Self {
            predecessor_id,
            dep_type,
            lag_hours: 0,
        }
    }

    /// Finish-to-start edge without lag.
    pub fn finish_to_start(predecessor_id: Uuid) -> Self {
        Self::new(predecessor_id, DependencyType::FS)
    }

    /// Sets the lag (hours).
    pub fn with_lag_hours(mut self, hours: i64) -> Self {
        self.lag_hours = hours;
        self
    }
}

/// A task creation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewTask {
    /// Title.
    pub title: String,
    /// Description.
    pub description: String,
    /// Duration (days).
    pub duration_days: f64,
    /// Requested start.
    pub planned_start: Option<DateTime<Utc>>,
    /// Requested end.
    pub planned_end: Option<DateTime<Utc>>,
    /// Hard deadline.
    pub deadline: Option<DateTime<Utc>>,
    /// Completion policy.
    pub completion_rule: CompletionRule,
    /// Parent task.
    pub parent_id: Option<Uuid>,
    /// Incoming edges.
    pub dependencies: Vec<NewDependency>,
    /// User, membership or team ids.
    pub assignee_ids: Vec<Uuid>,
}

impl NewTask {
    /// Creates a request with a title.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the duration (days).
    pub fn with_duration_days(mut self, days: f64) -> Self {
        self.duration_days = days;
        self
    }

    /// Sets the requested start.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self
    }

    /// Sets the requested end.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.planned_end = Some(end);
        self
    }

    /// Sets both requested endpoints.
    pub fn with_window(self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.with_start(start).with_end(end)
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the completion rule.
    pub fn with_completion_rule(mut self, rule: CompletionRule) -> Self {
        self.completion_rule = rule;
        self
    }

    /// Sets the parent.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Adds an incoming edge.
    pub fn with_dependency(mut self, dependency: NewDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Sets the assignee identifiers.
    pub fn with_assignees(mut self, ids: Vec<Uuid>) -> Self {
        self.assignee_ids = ids;
        self
    }
}

/// A validated task with its edges, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// The new task, window derived and assignees resolved.
    pub task: Task,
    /// Its incoming edges.
    pub dependencies: Vec<Dependency>,
}

fn check_duration(days: f64) -> Result<()> {
    if days.is_finite() && (0.0..=MAX_DURATION_DAYS).contains(&days) {
        Ok(())
    } else {
        Err(ScheduleError::InvalidDuration(days))
    }
}

fn check_window(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Result<()> {
    match (start, end) {
        (Some(start), Some(end)) if end < start => Err(ScheduleError::InvalidWindow { start, end }),
        _ => Ok(()),
    }
}

/// Builds the incoming edges of `successor_id`.
fn build_dependencies(
    project: &ProjectSnapshot,
    successor_id: Uuid,
    requested: &[NewDependency],
) -> Result<Vec<Dependency>> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(requested.len());
    for dep in requested {
        if dep.predecessor_id == successor_id {
            return Err(ScheduleError::invalid_predecessor(
                successor_id,
                dep.predecessor_id,
                "task cannot depend on itself",
            ));
        }
        if !project.contains_task(dep.predecessor_id) {
            return Err(ScheduleError::invalid_predecessor(
                successor_id,
                dep.predecessor_id,
                "predecessor not in project",
            ));
        }
        if !seen.insert(dep.predecessor_id) {
            return Err(ScheduleError::DuplicateDependency {
                predecessor_id: dep.predecessor_id,
                successor_id,
            });
        }
        out.push(
            Dependency::new(dep.predecessor_id, successor_id, dep.dep_type)
                .with_lag_hours(dep.lag_hours),
        );
    }
    Ok(out)
}

/// Validates a creation request against the snapshot.
///
/// # Checks
/// 1. Duration is a finite, non-negative day count
/// 2. `planned_end >= planned_start` when both are given
/// 3. Parent exists in the project
/// 4. Derived window lies inside the parent's planned window (strict)
/// 5. Predecessors exist in the project, one edge per predecessor
/// 6. Assignees resolve against the project team
pub fn prepare_admission<D: MembershipDirectory + ?Sized>(
    project: &ProjectSnapshot,
    request: NewTask,
    directory: &D,
    config: &SchedulerConfig,
    now: DateTime<Utc>,
) -> Result<Admission> {
    check_duration(request.duration_days)?;
    check_window(request.planned_start, request.planned_end)?;

    let mut task = Task::with_id(Uuid::new_v4(), project.id)
        .with_title(request.title)
        .with_duration_days(request.duration_days)
        .with_completion_rule(request.completion_rule);
    task.description = request.description;
    task.deadline = request.deadline;

    let window = Window::derive(
        request.planned_start,
        request.planned_end,
        task.duration(config.duration_floor_days()),
        now,
    );
    task.planned_start = Some(window.start);
    task.planned_end = Some(window.end);

    if let Some(parent_id) = request.parent_id {
        let parent = project.task(parent_id).ok_or_else(|| {
            ScheduleError::invalid_parent(task.id, parent_id, "parent not in project")
        })?;
        if let Some(parent_window) = parent.planned_window() {
            check_containment(parent_id, &window, &parent_window)?;
        }
        task.parent_id = Some(parent_id);
    }

    let dependencies = build_dependencies(project, task.id, &request.dependencies)?;

    let resolved = resolve_assignees(&request.assignee_ids, project.team_id, directory)?;
    task.assignees = replace_assignees(&[], &resolved);

    Ok(Admission { task, dependencies })
}

/// Reads a present field, `null` included, as `Some`.
///
/// Paired with `#[serde(default)]`, an absent field stays `None`, so a
/// double option can tell "leave unchanged" from "clear".
fn deserialize_present<'de, T, D>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// A partial task update. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskUpdate {
    /// New title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// New duration (days).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_days: Option<f64>,
    /// New planned start.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_start: Option<DateTime<Utc>>,
    /// New planned end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub planned_end: Option<DateTime<Utc>>,
    /// `Some(None)` (JSON `null`) clears the deadline.
    #[serde(
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline: Option<Option<DateTime<Utc>>>,
    /// New completion policy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_rule: Option<CompletionRule>,
    /// `Some(None)` (JSON `null`) detaches the task from its parent.
    #[serde(
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub parent_id: Option<Option<Uuid>>,
    /// Replaces every incoming edge.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<NewDependency>>,
    /// Replaces the assignee list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_ids: Option<Vec<Uuid>>,
}

impl TaskUpdate {
    /// Creates an update that changes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the duration (days).
    pub fn with_duration_days(mut self, days: f64) -> Self {
        self.duration_days = Some(days);
        self
    }

    /// Moves the planned start.
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.planned_start = Some(start);
        self
    }

    /// Moves the planned end.
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.planned_end = Some(end);
        self
    }

    /// Sets the deadline.
    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(Some(deadline));
        self
    }

    /// Removes the deadline.
    pub fn clear_deadline(mut self) -> Self {
        self.deadline = Some(None);
        self
    }

    /// Sets the completion rule.
    pub fn with_completion_rule(mut self, rule: CompletionRule) -> Self {
        self.completion_rule = Some(rule);
        self
    }

    /// Moves the task under `parent_id`.
    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(Some(parent_id));
        self
    }

    /// Detaches the task from its parent.
    pub fn clear_parent(mut self) -> Self {
        self.parent_id = Some(None);
        self
    }

    /// Replaces the incoming edges.
    pub fn with_dependencies(mut self, dependencies: Vec<NewDependency>) -> Self {
        self.dependencies = Some(dependencies);
        self
    }

    /// Replaces the assignee identifiers.
    pub fn with_assignees(mut self, ids: Vec<Uuid>) -> Self {
        self.assignee_ids = Some(ids);
        self
    }
}

/// A validated update, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedUpdate {
    /// The task after the update.
    pub task: Task,
    /// Replacement incoming edges, when the update carries them.
    pub dependencies: Option<Vec<Dependency>>,
}

/// Validates a partial update against the snapshot.
///
/// The window check runs on the merged values, so moving only the end
/// before the stored start is rejected too.
pub fn prepare_update<D: MembershipDirectory + ?Sized>(
    project: &ProjectSnapshot,
    task_id: Uuid,
    update: TaskUpdate,
    directory: &D,
) -> Result<PreparedUpdate> {
    let mut task = project
        .task(task_id)
        .cloned()
        .ok_or(ScheduleError::TaskNotFound(task_id))?;

    if let Some(days) = update.duration_days {
        check_duration(days)?;
        task.duration_days = days;
    }

    let start = update.planned_start.or(task.planned_start);
    let end = update.planned_end.or(task.planned_end);
    check_window(start, end)?;
    task.planned_start = start;
    task.planned_end = end;

    if let Some(parent) = update.parent_id {
        if let Some(parent_id) = parent {
            if parent_id == task_id {
                return Err(ScheduleError::invalid_parent(
                    task_id,
                    parent_id,
                    "task cannot be its own parent",
                ));
            }
            if !project.contains_task(parent_id) {
                return Err(ScheduleError::invalid_parent(
                    task_id,
                    parent_id,
                    "parent not in project",
                ));
            }
            if project.is_descendant(task_id, parent_id) {
                return Err(ScheduleError::invalid_parent(
                    task_id,
                    parent_id,
                    "parent is a descendant of the task",
                ));
            }
        }
        task.parent_id = parent;
    }

    let dependencies = update
        .dependencies
        .map(|requested| build_dependencies(project, task_id, &requested))
        .transpose()?;

    if let Some(ids) = update.assignee_ids {
        let resolved = resolve_assignees(&ids, project.team_id, directory)?;
        task.assignees = replace_assignees(&task.assignees, &resolved);
    }

    if let Some(title) = update.title {
        task.title = title;
    }
    if let Some(description) = update.description {
        task.description = description;
    }
    if let Some(deadline) = update.deadline {
        task.deadline = deadline;
    }
    if let Some(rule) = update.completion_rule {
        task.completion_rule = rule;
    }

    Ok(PreparedUpdate { task, dependencies })
}

/// Validation result.
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two tasks share the same ID.
    DuplicateId,
    /// A task belongs to another project.
    ForeignTask,
    /// A parent is missing, foreign or the task itself.
    InvalidParent,
    /// The parent relation contains a cycle.
    ParentCycle,
    /// An edge links a task to itself.
    SelfDependency,
    /// Two edges for the same ordered pair.
    DuplicateDependency,
    /// An edge endpoint is not a task of the project.
    InvalidPredecessor,
    /// Precedence graph contains a cycle.
    CyclicDependency,
    /// `planned_end < planned_start`.
    InvertedWindow,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates the structure of a whole snapshot.
///
/// Checks:
/// 1. No duplicate task IDs, no tasks of other projects
/// 2. Every window is ordered
/// 3. Every parent exists and is not the task itself
/// 4. No parent cycles
/// 5. Every edge links two distinct tasks of the project, once per pair
/// 6. No circular precedence dependencies
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_snapshot(project: &ProjectSnapshot) -> ValidationResult {
    let mut errors = Vec::new();

    let mut task_ids = HashSet::new();
    for task in &project.tasks {
        if task.project_id != project.id {
            errors.push(ValidationError::new(
                ValidationErrorKind::ForeignTask,
                format!("Task {} belongs to project {}", task.id, task.project_id),
            ));
            continue;
        }
        if !task_ids.insert(task.id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate task ID: {}", task.id),
            ));
        }
        if let Some(w) = task.planned_window() {
            if !w.is_ordered() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvertedWindow,
                    format!("Task {} ends at {} before it starts at {}", task.id, w.end, w.start),
                ));
            }
        }
    }

    let nodes: Vec<Uuid> = project
        .tasks
        .iter()
        .filter(|t| t.project_id == project.id)
        .map(|t| t.id)
        .collect();

    // Parent references: child → parent
    let mut parent_adj: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for task in project.tasks.iter().filter(|t| t.project_id == project.id) {
        let Some(parent_id) = task.parent_id else {
            continue;
        };
        if parent_id == task.id || !task_ids.contains(&parent_id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidParent,
                format!("Task {} references invalid parent {}", task.id, parent_id),
            ));
            continue;
        }
        parent_adj.entry(task.id).or_default().push(parent_id);
    }
    if let Some(node) = detect_cycles(&nodes, &parent_adj) {
        errors.push(ValidationError::new(
            ValidationErrorKind::ParentCycle,
            format!("Circular parent chain involving task {node}"),
        ));
    }

    // Precedence edges: predecessor → successor
    let mut pairs = HashSet::new();
    let mut adj: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for dep in &project.dependencies {
        if dep.is_self_link() {
            errors.push(ValidationError::new(
                ValidationErrorKind::SelfDependency,
                format!("Task {} depends on itself", dep.successor_id),
            ));
            continue;
        }
        let mut dangling = false;
        for endpoint in [dep.predecessor_id, dep.successor_id] {
            if !task_ids.contains(&endpoint) {
                dangling = true;
                errors.push(ValidationError::new(
                    ValidationErrorKind::InvalidPredecessor,
                    format!("Dependency {} references unknown task {}", dep.id, endpoint),
                ));
            }
        }
        if dangling {
            continue;
        }
        if !pairs.insert((dep.predecessor_id, dep.successor_id)) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateDependency,
                format!(
                    "Duplicate dependency {} -> {}",
                    dep.predecessor_id, dep.successor_id
                ),
            ));
            continue;
        }
        adj.entry(dep.predecessor_id)
            .or_default()
            .push(dep.successor_id);
    }
    if let Some(node) = detect_cycles(&nodes, &adj) {
        errors.push(ValidationError::new(
            ValidationErrorKind::CyclicDependency,
            format!("Circular dependency detected involving task {node}"),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects a cycle in a directed graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
///
/// # Returns
/// The DFS root from which the cycle was found.
///
/// # Reference
/// Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4
fn detect_cycles(nodes: &[Uuid], adj: &HashMap<Uuid, Vec<Uuid>>) -> Option<Uuid> {
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    nodes.iter().copied().find(|&node| {
        !visited.contains(&node) && has_cycle_dfs(node, adj, &mut visited, &mut in_stack)
    })
}

fn has_cycle_dfs(
    node: Uuid,
    adj: &HashMap<Uuid, Vec<Uuid>>,
    visited: &mut HashSet<Uuid>,
    in_stack: &mut HashSet<Uuid>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(&node) {
        for &next in neighbors {
            if in_stack.contains(&next) {
                return true; // Back edge → cycle
            }
            if !visited.contains(&next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(&node);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReferenceKind;
    use crate::models::{TaskAssignee, Team};
    use chrono::{TimeDelta, TimeZone};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(n)
    }

    fn team() -> Team {
        Team::new(Uuid::new_v4(), "Core")
            .with_member(Uuid::new_v4())
            .with_member(Uuid::new_v4())
    }

    fn project_with_parent(team: &Team) -> (ProjectSnapshot, Uuid) {
        let pid = Uuid::new_v4();
        let parent = Task::new(pid)
            .with_duration_days(5.0)
            .with_window(day(0), day(5));
        let parent_id = parent.id;
        (ProjectSnapshot::new(pid).with_team(team.id).with_task(parent), parent_id)
    }

    fn admit(project: &ProjectSnapshot, team: &Team, request: NewTask) -> Result<Admission> {
        prepare_admission(project, request, team, &SchedulerConfig::default(), day(0))
    }

    #[test]
    fn test_admission_derives_window() {
        let team = team();
        let (project, _) = project_with_parent(&team);
        let admission = admit(
            &project,
            &team,
            NewTask::new("Write report").with_duration_days(2.0).with_start(day(1)),
        )
        .unwrap();
        assert_eq!(admission.task.planned_start, Some(day(1)));
        assert_eq!(admission.task.planned_end, Some(day(3)));
        assert_eq!(admission.task.project_id, project.id);
        assert!(admission.dependencies.is_empty());
    }

    #[test]
    fn test_child_outside_parent_rejected() {
        let team = team();
        let (project, parent_id) = project_with_parent(&team);
        let request = NewTask::new("Too early")
            .with_parent(parent_id)
            .with_duration_days(3.0)
            .with_window(day(-1), day(2));

        let err = admit(&project, &team, request).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::ContainmentViolation { parent_id: p, .. } if p == parent_id
        ));
        assert!(err.is_bad_request());
    }

    #[test]
    fn test_child_inside_parent_admitted() {
        let team = team();
        let (project, parent_id) = project_with_parent(&team);
        let request = NewTask::new("Inside")
            .with_parent(parent_id)
            .with_window(day(1), day(4));
        let admission = admit(&project, &team, request).unwrap();
        assert_eq!(admission.task.parent_id, Some(parent_id));
    }

    #[test]
    fn test_team_id_expands_assignees() {
        let team = team();
        let (project, _) = project_with_parent(&team);
        let request = NewTask::new("Everyone").with_assignees(vec![team.id, team.id]);
        let admission = admit(&project, &team, request).unwrap();
        assert_eq!(admission.task.assignees.len(), 2);
        assert!(admission
            .task
            .assignees
            .iter()
            .all(|a| !a.is_completed && a.membership_id.is_some()));
    }

    #[test]
    fn test_invalid_requests() {
        let team = team();
        let (project, parent_id) = project_with_parent(&team);

        let inverted = NewTask::new("x").with_window(day(3), day(1));
        let err = admit(&project, &team, inverted).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidWindow { .. }));

        let err = admit(&project, &team, NewTask::new("x").with_duration_days(-1.0)).unwrap_err();
        assert_eq!(err, ScheduleError::InvalidDuration(-1.0));

        let ghost = Uuid::new_v4();
        let err = admit(&project, &team, NewTask::new("x").with_parent(ghost)).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidReference { kind: ReferenceKind::Parent, referenced, .. }
                if referenced == ghost
        ));

        let request = NewTask::new("x").with_dependency(NewDependency::finish_to_start(ghost));
        let err = admit(&project, &team, request).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::InvalidReference { kind: ReferenceKind::Predecessor, .. }
        ));

        let request = NewTask::new("x")
            .with_dependency(NewDependency::finish_to_start(parent_id))
            .with_dependency(NewDependency::new(parent_id, DependencyType::SS));
        let err = admit(&project, &team, request).unwrap_err();
        assert!(matches!(err, ScheduleError::DuplicateDependency { .. }));
    }

    #[test]
    fn test_foreign_predecessor_rejected() {
        let team = team();
        let (mut project, _) = project_with_parent(&team);
        let foreign = Task::new(Uuid::new_v4());
        let foreign_id = foreign.id;
        project.tasks.push(foreign);

        let request = NewTask::new("x").with_dependency(NewDependency::finish_to_start(foreign_id));
        assert!(admit(&project, &team, request).is_err());
    }

    #[test]
    fn test_admit_inserts_task_and_edges() {
        let team = team();
        let (mut project, parent_id) = project_with_parent(&team);
        let request = NewTask::new("Follow-up")
            .with_duration_days(1.0)
            .with_dependency(NewDependency::finish_to_start(parent_id).with_lag_hours(4));

        let id = project
            .admit(request, &team, &SchedulerConfig::default(), day(0))
            .unwrap();
        assert!(project.contains_task(id));
        assert_eq!(project.incoming(id).count(), 1);
        assert_eq!(project.incoming(id).next().map(|d| d.lag_hours), Some(4));
    }

    #[test]
    fn test_new_task_from_json() {
        let json = r#"{
            "title": "Plan",
            "duration_days": 1.5,
            "dependencies": [
                {"predecessor_id": "6f9619ff-8b86-d011-b42d-00cf4fc964ff", "dep_type": "SS"}
            ]
        }"#;
        let request: NewTask = serde_json::from_str(json).unwrap();
        assert_eq!(request.title, "Plan");
        assert_eq!(request.dependencies[0].dep_type, DependencyType::SS);
        assert_eq!(request.dependencies[0].lag_hours, 0);
        assert_eq!(request.completion_rule, CompletionRule::AllAssignees);
    }

    #[test]
    fn test_update_json_null_clears() {
        let update: TaskUpdate =
            serde_json::from_str(r#"{"deadline": null, "parent_id": null}"#).unwrap();
        assert_eq!(update.deadline, Some(None));
        assert_eq!(update.parent_id, Some(None));
        assert_eq!(update.title, None);

        let untouched: TaskUpdate = serde_json::from_str(r#"{"title": "Plan"}"#).unwrap();
        assert_eq!(untouched.deadline, None);
        assert_eq!(untouched.parent_id, None);

        let cleared = TaskUpdate::new().clear_deadline().clear_parent();
        let json = serde_json::to_value(&cleared).unwrap();
        assert_eq!(json, serde_json::json!({"deadline": null, "parent_id": null}));
        let back: TaskUpdate = serde_json::from_value(json).unwrap();
        assert_eq!(back, cleared);
    }

    #[test]
    fn test_update_applies_fields() {
        let team = team();
        let (mut project, parent_id) = project_with_parent(&team);
        let task = Task::new(project.id).with_window(day(1), day(2));
        let id = task.id;
        project.tasks.push(task);

        let update = TaskUpdate::new()
            .with_title("Renamed")
            .with_end(day(4))
            .with_deadline(day(6))
            .with_parent(parent_id)
            .with_dependencies(vec![NewDependency::new(parent_id, DependencyType::SS)]);
        project.update_task(id, update, &team).unwrap();

        let task = project.task(id).unwrap();
        assert_eq!(task.title, "Renamed");
        assert_eq!(task.planned_window(), Some(Window::new(day(1), day(4))));
        assert_eq!(task.deadline, Some(day(6)));
        assert_eq!(task.parent_id, Some(parent_id));
        assert_eq!(project.incoming(id).count(), 1);

        project
            .update_task(id, TaskUpdate::new().clear_parent().clear_deadline(), &team)
            .unwrap();
        let task = project.task(id).unwrap();
        assert_eq!(task.parent_id, None);
        assert_eq!(task.deadline, None);
    }

    #[test]
    fn test_update_rejects_merged_inverted_window() {
        let team = team();
        let (mut project, parent_id) = project_with_parent(&team);
        let before = project.clone();

        let err = project
            .update_task(parent_id, TaskUpdate::new().with_end(day(-1)), &team)
            .unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidWindow { .. }));
        assert_eq!(project, before);
    }

    #[test]
    fn test_update_rejects_descendant_parent() {
        let team = team();
        let (mut project, root) = project_with_parent(&team);
        let child = Task::new(project.id).with_parent(root);
        let child_id = child.id;
        project.tasks.push(child);
        let before = project.clone();

        for (target, parent) in [(root, child_id), (root, root), (root, Uuid::new_v4())] {
            let err = project
                .update_task(target, TaskUpdate::new().with_parent(parent), &team)
                .unwrap_err();
            assert!(matches!(
                err,
                ScheduleError::InvalidReference { kind: ReferenceKind::Parent, .. }
            ));
        }
        assert_eq!(project, before);
    }

    #[test]
    fn test_update_self_dependency_rejected() {
        let team = team();
        let (mut project, id) = project_with_parent(&team);
        let update = TaskUpdate::new().with_dependencies(vec![NewDependency::finish_to_start(id)]);
        assert!(project.update_task(id, update, &team).is_err());
    }

    #[test]
    fn test_update_assignees_keeps_completion() {
        let team = team();
        let users: Vec<Uuid> = team.memberships.iter().map(|m| m.user_id).collect();
        let (mut project, id) = project_with_parent(&team);
        let mut done = TaskAssignee::new(users[0]);
        done.mark_completed(day(1));
        project.task_mut(id).unwrap().assignees = vec![done.clone()];

        project
            .update_task(id, TaskUpdate::new().with_assignees(vec![team.id]), &team)
            .unwrap();
        let assignees = &project.task(id).unwrap().assignees;
        assert_eq!(assignees.len(), 2);
        assert_eq!(assignees[0], done);
        assert_eq!(assignees[1].user_id, users[1]);
    }

    #[test]
    fn test_update_unknown_task() {
        let team = team();
        let (mut project, _) = project_with_parent(&team);
        let ghost = Uuid::new_v4();
        assert_eq!(
            project.update_task(ghost, TaskUpdate::new(), &team),
            Err(ScheduleError::TaskNotFound(ghost))
        );
    }

    fn snapshot_errors(project: &ProjectSnapshot) -> Vec<ValidationErrorKind> {
        validate_snapshot(project)
            .err()
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_valid_snapshot() {
        let pid = Uuid::new_v4();
        let a = Task::new(pid).with_window(day(0), day(1));
        let b = Task::new(pid).with_parent(a.id);
        let project = ProjectSnapshot::new(pid)
            .with_dependency(Dependency::finish_to_start(a.id, b.id))
            .with_task(a)
            .with_task(b);
        assert!(validate_snapshot(&project).is_ok());
    }

    #[test]
    fn test_cyclic_dependency() {
        // A → B → C → A
        let pid = Uuid::new_v4();
        let tasks: Vec<Task> = (0..3).map(|_| Task::new(pid)).collect();
        let mut project = ProjectSnapshot::new(pid);
        for i in 0..3 {
            project
                .dependencies
                .push(Dependency::finish_to_start(tasks[i].id, tasks[(i + 1) % 3].id));
        }
        project.tasks = tasks;
        assert_eq!(snapshot_errors(&project), vec![ValidationErrorKind::CyclicDependency]);
    }

    #[test]
    fn test_parent_cycle() {
        let pid = Uuid::new_v4();
        let (a_id, b_id) = (Uuid::new_v4(), Uuid::new_v4());
        let project = ProjectSnapshot::new(pid)
            .with_task(Task::with_id(a_id, pid).with_parent(b_id))
            .with_task(Task::with_id(b_id, pid).with_parent(a_id));
        assert_eq!(snapshot_errors(&project), vec![ValidationErrorKind::ParentCycle]);
    }

    #[test]
    fn test_multiple_errors() {
        let pid = Uuid::new_v4();
        let a = Task::new(pid).with_window(day(2), day(1));
        let dup = a.clone();
        let foreign = Task::new(Uuid::new_v4());
        let orphan = Task::new(pid).with_parent(Uuid::new_v4());
        let project = ProjectSnapshot::new(pid)
            .with_dependency(Dependency::finish_to_start(a.id, a.id))
            .with_dependency(Dependency::finish_to_start(foreign.id, orphan.id))
            .with_dependency(Dependency::finish_to_start(a.id, orphan.id))
            .with_dependency(Dependency::new(a.id, orphan.id, DependencyType::FF))
            .with_task(a)
            .with_task(dup)
            .with_task(foreign)
            .with_task(orphan);

        let kinds = snapshot_errors(&project);
        for expected in [
            ValidationErrorKind::DuplicateId,
            ValidationErrorKind::ForeignTask,
            ValidationErrorKind::InvertedWindow,
            ValidationErrorKind::InvalidParent,
            ValidationErrorKind::SelfDependency,
            ValidationErrorKind::InvalidPredecessor,
            ValidationErrorKind::DuplicateDependency,
        ] {
            assert!(kinds.contains(&expected), "missing {expected:?}");
        }
        assert!(!kinds.contains(&ValidationErrorKind::CyclicDependency));
    }
}
