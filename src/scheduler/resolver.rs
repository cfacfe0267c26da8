//! Dependency constraint resolution.
//!
//! Folds a task's incoming edges into two lower bounds, one on start
//! (FS, SS) and one on end (FF, SF), then moves the task's window forward
//! just enough to satisfy both.
//!
//! # Algorithm
//! 1. Start bound: if it exceeds the current start, `start = bound`,
//!    `end = start + duration`.
//! 2. End bound: if it exceeds the current end, `end = bound`,
//!    `start = end - duration`.
//! 3. If step 2 dragged start below the start bound (possible when the
//!    incoming window was compressed), start goes back to the bound and the
//!    end stays at the later of its current value and `start + duration`.
//!    Neither bound is ever left violated.
//! 4. Ordering repair.

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::models::window::shift;
use crate::models::{Dependency, Endpoint, Window};

/// Predecessor endpoints as read by edges.
///
/// `end` is the predecessor's effective end (its deadline when set).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeAnchor {
    /// Predecessor start.
    pub start: Option<DateTime<Utc>>,
    /// Predecessor effective end.
    pub end: Option<DateTime<Utc>>,
}

impl EdgeAnchor {
    /// Anchor with both endpoints known.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    fn at(&self, endpoint: Endpoint) -> Option<DateTime<Utc>> {
        match endpoint {
            Endpoint::Start => self.start,
            Endpoint::End => self.end,
        }
    }
}

/// Lower bounds on a successor's start and end.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    /// Earliest allowed start.
    pub start: Option<DateTime<Utc>>,
    /// Earliest allowed end.
    pub end: Option<DateTime<Utc>>,
}

impl Bounds {
    /// No bounds.
    pub fn none() -> Self {
        Self::default()
    }

    /// Raises the bound on `endpoint` to at least `at`.
    pub fn tighten(&mut self, endpoint: Endpoint, at: DateTime<Utc>) {
        let slot = match endpoint {
            Endpoint::Start => &mut self.start,
            Endpoint::End => &mut self.end,
        };
        *slot = Some(slot.map_or(at, |current| current.max(at)));
    }

    /// Whether neither bound is set.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether `window` satisfies both bounds.
    pub fn satisfied_by(&self, window: &Window) -> bool {
        self.start.map_or(true, |b| window.start >= b) && self.end.map_or(true, |b| window.end >= b)
    }
}

/// The bound a single edge imposes, or `None` if the predecessor endpoint
/// it reads is unknown.
pub fn edge_bound(
    dependency: &Dependency,
    anchor: &EdgeAnchor,
) -> Option<(Endpoint, DateTime<Utc>)> {
    let reference = anchor.at(dependency.dep_type.reads())?;
    Some((dependency.dep_type.bounds(), shift(reference, dependency.lag())))
}

/// Folded bounds plus the edges that could not be evaluated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectedBounds {
    /// Tightest bounds over all evaluable edges.
    pub bounds: Bounds,
    /// Ids of edges skipped because the predecessor endpoint was unknown.
    pub skipped: Vec<Uuid>,
}

/// Folds incoming edges into bounds.
///
/// Each item pairs an edge with its predecessor's anchor; `None` means the
/// predecessor is not part of the working set. Such edges are skipped, never
/// guessed.
pub fn collect_bounds<'a, I>(edges: I) -> CollectedBounds
where
    I: IntoIterator<Item = (&'a Dependency, Option<EdgeAnchor>)>,
{
    let mut out = CollectedBounds::default();
    for (dependency, anchor) in edges {
        match anchor.as_ref().and_then(|a| edge_bound(dependency, a)) {
            Some((endpoint, at)) => out.bounds.tighten(endpoint, at),
            None => out.skipped.push(dependency.id),
        }
    }
    out
}

/// Moves `window` forward to satisfy `bounds`, preserving `duration` where
/// both bounds allow it.
pub fn resolve(window: Window, duration: TimeDelta, bounds: &Bounds) -> Window {
    let mut w = window;

    if let Some(start_bound) = bounds.start {
        if start_bound > w.start {
            w = Window::starting_at(start_bound, duration);
        }
    }
    if let Some(end_bound) = bounds.end {
        if end_bound > w.end {
            w = Window::ending_at(end_bound, duration);
        }
    }
    if let Some(start_bound) = bounds.start {
        if w.start < start_bound {
            let end = w.end.max(shift(start_bound, duration));
            w = Window::new(start_bound, end);
        }
    }

    w.repair_ordering()
}
