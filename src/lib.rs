//! Task scheduling and dependency-constraint engine for project planning.
//!
//! Computes each task's planned window from its duration, its parent's
//! window, its FS/SS/FF/SF predecessors (with lag) and the project's outcome
//! deadline, and keeps a whole project consistent after every change.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Task`, `Dependency`, `ProjectSnapshot`,
//!   `Team`, `Window`
//! - **`scheduler`**: Constraint resolver, containment clamp, fixed-point
//!   `Stabilizer` and its `RecalculationReport`
//! - **`completion`**: Completion-rule state machine
//! - **`assignees`**: Assignee resolution against the project team
//! - **`validation`**: Admission/update checks and snapshot integrity
//!   (duplicate IDs, parent and DAG cycles, dangling references)
//! - **`config`**: `SchedulerConfig`
//! - **`error`**: `ScheduleError`
//!
//! # Architecture
//!
//! The engine is pure and synchronous. It works on an in-memory snapshot of
//! one project supplied by the caller, never reads the clock (`now` is passed
//! in) and performs no I/O. Persisting the result atomically is the caller's
//! job. Logging goes through `tracing`; the host installs the subscriber.
//!
//! # Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use project_scheduler::config::SchedulerConfig;
//! use project_scheduler::models::{ProjectSnapshot, Team};
//! use project_scheduler::scheduler::Stabilizer;
//! use project_scheduler::validation::{NewDependency, NewTask};
//! use uuid::Uuid;
//!
//! let now = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
//! let team = Team::new(Uuid::new_v4(), "Platform").with_member(Uuid::new_v4());
//! let config = SchedulerConfig::default();
//! let mut project = ProjectSnapshot::new(Uuid::new_v4()).with_team(team.id);
//!
//! let design = project
//!     .admit(NewTask::new("Design").with_duration_days(3.0).with_start(now), &team, &config, now)
//!     .unwrap();
//! let build = project
//!     .admit(
//!         NewTask::new("Build")
//!             .with_duration_days(5.0)
//!             .with_start(now)
//!             .with_dependency(NewDependency::finish_to_start(design))
//!             .with_assignees(vec![team.id]),
//!         &team,
//!         &config,
//!         now,
//!     )
//!     .unwrap();
//!
//! let report = Stabilizer::with_config(config).recalculate(&mut project, now).unwrap();
//! assert!(report.converged);
//! assert_eq!(report.changed, vec![build]);
//! ```
//!
//! # References
//!
//! - Kahn (1962), "Topological sorting of large networks"
//! - Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4

pub mod assignees;
pub mod completion;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod validation;
