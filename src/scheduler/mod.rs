//! Schedule computation: dependency resolution, containment, stabilization.
//!
//! Provides the per-task constraint resolver and parent clamp, and the
//! project-wide stabilizer that drives them to a fixed point.
//!
//! # Algorithm
//!
//! `Stabilizer` orders the non-terminal tasks of a project topologically
//! (Kahn), then sweeps them repeatedly: each task is clamped into its parent,
//! pushed forward past its predecessors' bounds, and pulled back under the
//! project's outcome deadline, until a sweep changes nothing or the pass
//! budget is spent.
//!
//! # Report
//!
//! `RecalculationReport` records convergence, cycles, changed tasks,
//! skipped references and the constraints still violated afterwards.
//!
//! # References
//!
//! - Kahn (1962), "Topological sorting of large networks"
//! - PMI (2017), "PMBOK Guide", 6th ed., §6.3 (Precedence Diagramming Method)

mod containment;
mod report;
mod resolver;
mod stabilizer;

pub use containment::{check_containment, clamp_to_parent};
pub use report::{audit, RecalculationReport, UnresolvedReference, Violation, ViolationType};
pub use resolver::{collect_bounds, edge_bound, resolve, Bounds, CollectedBounds, EdgeAnchor};
pub use stabilizer::Stabilizer;
