//! Project-wide fixed-point recalculation.
//!
//! Repeatedly reschedules every non-terminal task of a project until a full
//! pass changes nothing, or the pass budget runs out.
//!
//! # Algorithm
//! 1. Build a working set: one slot per non-`Done` task, with its duration,
//!    an initial window derived from its planned endpoints, and its parent
//!    and incoming edges resolved to either another slot or a frozen anchor
//!    (a `Done` task, read but never moved).
//! 2. Order slots topologically over working-set edges (Kahn). On a cycle,
//!    fall back to the snapshot order; the pass loop still terminates.
//! 3. Each pass visits slots in that order and, for each:
//!    ordering repair, parent clamp, dependency resolution, outcome deadline
//!    clamp, ordering repair. Updates are visible to later slots in the same
//!    pass.
//! 4. Stop after the first pass without changes, or after
//!    `pass_factor × n` passes.
//! 5. Write changed windows back and audit what is still violated.
//!
//! # Complexity
//! O(P · (n + e)) for P passes, n tasks and e edges.
//!
//! # Reference
//! Kahn (1962), "Topological sorting of large networks"

use chrono::{DateTime, TimeDelta, Utc};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::containment::clamp_to_parent;
use super::report::{audit, RecalculationReport, UnresolvedReference};
use super::resolver::{collect_bounds, edge_bound, resolve, Bounds, EdgeAnchor};
use crate::config::SchedulerConfig;
use crate::error::{ReferenceKind, Result};
use crate::models::{Dependency, ProjectSnapshot, Task, Window};

/// Where a parent window or predecessor anchor comes from.
#[derive(Debug, Clone, Copy)]
enum Source<T> {
    /// Another slot of the working set; read from the current windows.
    Working(usize),
    /// A terminal task; fixed for the whole recalculation.
    Frozen(T),
}

#[derive(Debug, Clone)]
struct IncomingEdge {
    dependency: Dependency,
    source: Source<EdgeAnchor>,
}

fn skip(
    out: &mut Vec<UnresolvedReference>,
    task_id: Uuid,
    referenced: Uuid,
    kind: ReferenceKind,
    reason: &str,
) {
    warn!(task_id = %task_id, referenced = %referenced, kind = %kind, reason, "reference skipped");
    out.push(UnresolvedReference::new(task_id, referenced, kind, reason));
}

/// Per-call arena of the tasks being rescheduled.
#[derive(Debug, Default)]
struct WorkingSet {
    /// Index into `project.tasks` per slot.
    members: Vec<usize>,
    ids: Vec<Uuid>,
    durations: Vec<TimeDelta>,
    deadlines: Vec<Option<DateTime<Utc>>>,
    initial: Vec<Window>,
    parents: Vec<Option<Source<Window>>>,
    incoming: Vec<Vec<IncomingEdge>>,
    unresolved: Vec<UnresolvedReference>,
}

impl WorkingSet {
    fn build(project: &ProjectSnapshot, config: &SchedulerConfig, now: DateTime<Utc>) -> Self {
        let floor = config.duration_floor_days();
        let mut set = Self::default();
        let mut slot_of: HashMap<Uuid, usize> = HashMap::new();
        let mut frozen: HashMap<Uuid, &Task> = HashMap::new();

        for (index, task) in project.tasks.iter().enumerate() {
            if task.project_id != project.id {
                continue;
            }
            if task.status.is_terminal() {
                frozen.entry(task.id).or_insert(task);
                continue;
            }
            if slot_of.contains_key(&task.id) {
                warn!(task_id = %task.id, "duplicate task id skipped");
                continue;
            }
            let duration = task.duration(floor);
            slot_of.insert(task.id, set.members.len());
            set.members.push(index);
            set.ids.push(task.id);
            set.durations.push(duration);
            set.deadlines.push(task.deadline);
            set.initial.push(Window::derive(
                task.planned_start,
                task.planned_end,
                duration,
                now,
            ));
        }

        for &index in &set.members {
            let task = &project.tasks[index];
            let parent = match task.parent_id {
                None => None,
                Some(pid) if pid == task.id => {
                    skip(
                        &mut set.unresolved,
                        task.id,
                        pid,
                        ReferenceKind::Parent,
                        "task is its own parent",
                    );
                    None
                }
                Some(pid) => match (slot_of.get(&pid), frozen.get(&pid)) {
                    (Some(&slot), _) => Some(Source::Working(slot)),
                    // Containment needs a parent window; admission skips it the same way.
                    (None, Some(done)) => done.planned_window().map(Source::Frozen),
                    (None, None) => {
                        skip(
                            &mut set.unresolved,
                            task.id,
                            pid,
                            ReferenceKind::Parent,
                            "parent not in project",
                        );
                        None
                    }
                },
            };
            set.parents.push(parent);
        }

        set.incoming = vec![Vec::new(); set.members.len()];
        for dependency in &project.dependencies {
            let Some(&successor) = slot_of.get(&dependency.successor_id) else {
                continue;
            };
            let (succ_id, pred_id) = (dependency.successor_id, dependency.predecessor_id);
            if dependency.is_self_link() {
                skip(
                    &mut set.unresolved,
                    succ_id,
                    pred_id,
                    ReferenceKind::Predecessor,
                    "task depends on itself",
                );
                continue;
            }
            let source = match (slot_of.get(&pred_id), frozen.get(&pred_id)) {
                (Some(&slot), _) => Source::Working(slot),
                (None, Some(done)) => {
                    let anchor = EdgeAnchor {
                        start: done.planned_start,
                        end: done.effective_end(),
                    };
                    if edge_bound(dependency, &anchor).is_none() {
                        skip(
                            &mut set.unresolved,
                            succ_id,
                            pred_id,
                            ReferenceKind::Predecessor,
                            "predecessor window unknown",
                        );
                        continue;
                    }
                    Source::Frozen(anchor)
                }
                (None, None) => {
                    skip(
                        &mut set.unresolved,
                        succ_id,
                        pred_id,
                        ReferenceKind::Predecessor,
                        "predecessor not in project",
                    );
                    continue;
                }
            };
            set.incoming[successor].push(IncomingEdge {
                dependency: dependency.clone(),
                source,
            });
        }

        set
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    /// Kahn's algorithm over working-set edges. `None` on a cycle.
    fn topological_order(&self) -> Option<Vec<usize>> {
        let n = self.len();
        let mut in_degree = vec![0usize; n];
        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (slot, edges) in self.incoming.iter().enumerate() {
            for edge in edges {
                if let Source::Working(pred) = edge.source {
                    in_degree[slot] += 1;
                    successors[pred].push(slot);
                }
            }
        }

        let mut queue: VecDeque<usize> = (0..n).filter(|&s| in_degree[s] == 0).collect();
        let mut order = Vec::with_capacity(n);
        while let Some(slot) = queue.pop_front() {
            order.push(slot);
            for &next in &successors[slot] {
                in_degree[next] -= 1;
                if in_degree[next] == 0 {
                    queue.push_back(next);
                }
            }
        }

        (order.len() == n).then_some(order)
    }

    fn anchor(&self, source: &Source<EdgeAnchor>, windows: &[Window]) -> EdgeAnchor {
        match *source {
            Source::Working(slot) => {
                let w = windows[slot];
                EdgeAnchor::new(w.start, self.deadlines[slot].unwrap_or(w.end))
            }
            Source::Frozen(anchor) => anchor,
        }
    }

    fn bounds(&self, slot: usize, windows: &[Window]) -> Bounds {
        let anchored: Vec<(&Dependency, Option<EdgeAnchor>)> = self.incoming[slot]
            .iter()
            .map(|e| (&e.dependency, Some(self.anchor(&e.source, windows))))
            .collect();
        collect_bounds(anchored).bounds
    }

    fn parent_window(&self, slot: usize, windows: &[Window]) -> Option<Window> {
        self.parents[slot].map(|parent| match parent {
            Source::Working(p) => windows[p],
            Source::Frozen(w) => w,
        })
    }

    /// One rescheduling step for one slot.
    fn step(&self, slot: usize, windows: &[Window], deadline: Option<DateTime<Utc>>) -> Window {
        let duration = self.durations[slot];
        let mut w = windows[slot].repair_ordering();

        if let Some(parent) = self.parent_window(slot, windows) {
            w = clamp_to_parent(w, duration, &parent);
        }

        let bounds = self.bounds(slot, windows);
        w = resolve(w, duration, &bounds);

        if let Some(deadline) = deadline {
            if w.end > deadline {
                // Dependencies win over the deadline.
                w = resolve(Window::ending_at(deadline, duration), duration, &bounds);
            }
        }

        w.repair_ordering()
    }
}

/// Fixed-point project recalculation.
///
/// # Example
/// ```
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use project_scheduler::models::{Dependency, ProjectSnapshot, Task};
/// use project_scheduler::scheduler::Stabilizer;
/// use uuid::Uuid;
///
/// let day0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
/// let pid = Uuid::new_v4();
/// let a = Task::new(pid).with_duration_days(2.0).with_start(day0);
/// let b = Task::new(pid).with_duration_days(1.0).with_start(day0);
/// let (a_id, b_id) = (a.id, b.id);
/// let mut project = ProjectSnapshot::new(pid)
///     .with_task(a)
///     .with_task(b)
///     .with_dependency(Dependency::finish_to_start(a_id, b_id));
///
/// let report = Stabilizer::new().recalculate(&mut project, day0).unwrap();
/// assert!(report.converged);
/// let b = project.task(b_id).unwrap();
/// assert_eq!(b.planned_start, Some(day0 + TimeDelta::days(2)));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Stabilizer {
    config: SchedulerConfig,
}

impl Stabilizer {
    /// Creates a stabilizer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stabilizer with the given settings.
    pub fn with_config(config: SchedulerConfig) -> Self {
        Self { config }
    }

    /// Current settings.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Recalculates every non-terminal task of `project` in place.
    ///
    /// Never fails on inconsistent data unless strict references are
    /// enabled, in which case the first unresolved reference is returned
    /// before anything is written.
    pub fn recalculate(
        &self,
        project: &mut ProjectSnapshot,
        now: DateTime<Utc>,
    ) -> Result<RecalculationReport> {
        let set = WorkingSet::build(project, &self.config, now);
        if self.config.strict_references {
            if let Some(first) = set.unresolved.first() {
                return Err(first.to_error());
            }
        }

        let n = set.len();
        let budget = self.config.pass_budget(n);
        let (order, cycle_detected) = match set.topological_order() {
            Some(order) => (order, false),
            None => {
                warn!(project_id = %project.id, tasks = n, "dependency cycle, using listing order");
                ((0..n).collect(), true)
            }
        };
        let deadline = project
            .outcome_deadline
            .filter(|_| self.config.clamp_to_outcome_deadline);

        let mut windows = set.initial.clone();
        let mut passes = 0;
        let mut converged = n == 0;
        while !converged && passes < budget {
            passes += 1;
            let mut moved = 0;
            for &slot in &order {
                let next = set.step(slot, &windows, deadline);
                if next != windows[slot] {
                    windows[slot] = next;
                    moved += 1;
                }
            }
            debug!(project_id = %project.id, pass = passes, moved, "pass finished");
            converged = moved == 0;
        }
        if converged {
            debug!(project_id = %project.id, passes, "schedule converged");
        } else {
            warn!(
                project_id = %project.id,
                passes,
                budget,
                "pass budget exhausted before convergence"
            );
        }

        let mut changed = Vec::new();
        for (slot, &index) in set.members.iter().enumerate() {
            if project.tasks[index].apply_window(windows[slot]) {
                changed.push(set.ids[slot]);
            }
        }

        let violations = audit(project);
        info!(
            project_id = %project.id,
            processed = n,
            changed = changed.len(),
            violations = violations.len(),
            "project recalculated"
        );

        Ok(RecalculationReport {
            project_id: project.id,
            processed: n,
            passes,
            pass_budget: budget,
            converged,
            cycle_detected,
            changed,
            unresolved: set.unresolved,
            violations,
        })
    }
}
