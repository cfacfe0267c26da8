//! Precedence dependencies between tasks.
//!
//! A dependency is a directed edge from a predecessor to a successor,
//! typed by which endpoints it relates, plus a lag in hours.
//!
//! | Type | Reads (predecessor) | Bounds (successor) |
//! |------|---------------------|--------------------|
//! | FS | end | start |
//! | SS | start | start |
//! | FF | end | end |
//! | SF | start | end |
//!
//! # Reference
//! Project Management Institute, "PMBOK Guide", Precedence Diagramming Method

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::window::lag_from_hours;

/// Which endpoint of a window an edge reads or bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// Window start.
    Start,
    /// Window end.
    End,
}

/// Dependency type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyType {
    /// Finish-to-start: successor start ≥ predecessor end + lag.
    FS,
    /// Start-to-start: successor start ≥ predecessor start + lag.
    SS,
    /// Finish-to-finish: successor end ≥ predecessor end + lag.
    FF,
    /// Start-to-finish: successor end ≥ predecessor start + lag.
    SF,
}

impl DependencyType {
    /// Predecessor endpoint this type reads.
    pub fn reads(self) -> Endpoint {
        match self {
            Self::FS | Self::FF => Endpoint::End,
            Self::SS | Self::SF => Endpoint::Start,
        }
    }

    /// Successor endpoint this type bounds from below.
    pub fn bounds(self) -> Endpoint {
        match self {
            Self::FS | Self::SS => Endpoint::Start,
            Self::FF | Self::SF => Endpoint::End,
        }
    }
}

/// A precedence edge `predecessor → successor`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Edge identifier.
    pub id: Uuid,
    /// Task that constrains.
    pub predecessor_id: Uuid,
    /// Task that is constrained.
    pub successor_id: Uuid,
    /// Edge type.
    pub dep_type: DependencyType,
    /// Hours added to the predecessor endpoint.
    pub lag_hours: i64,
}

impl Dependency {
    /// Creates an edge with zero lag.
    pub fn new(predecessor_id: Uuid, successor_id: Uuid, dep_type: DependencyType) -> Self {
        Self {
            id: Uuid::new_v4(),
            predecessor_id,
            successor_id,
            dep_type,
            lag_hours: 0,
        }
    }

    /// Creates a zero-lag finish-to-start edge.
    pub fn finish_to_start(predecessor_id: Uuid, successor_id: Uuid) -> Self {
        Self::new(predecessor_id, successor_id, DependencyType::FS)
    }

    /// Sets the lag (hours).
    pub fn with_lag_hours(mut self, hours: i64) -> Self {
        self.lag_hours = hours;
        self
    }

    /// Lag as a duration.
    pub fn lag(&self) -> TimeDelta {
        lag_from_hours(self.lag_hours)
    }

    /// Whether both ends name the same task.
    pub fn is_self_link(&self) -> bool {
        self.predecessor_id == self.successor_id
    }

    /// Whether this edge links the same ordered pair as `other`.
    pub fn same_pair(&self, other: &Dependency) -> bool {
        self.predecessor_id == other.predecessor_id && self.successor_id == other.successor_id
    }

    /// Whether this edge touches the task at either end.
    pub fn touches(&self, task_id: Uuid) -> bool {
        self.predecessor_id == task_id || self.successor_id == task_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_table() {
        use DependencyType::*;
        assert_eq!((FS.reads(), FS.bounds()), (Endpoint::End, Endpoint::Start));
        assert_eq!((SS.reads(), SS.bounds()), (Endpoint::Start, Endpoint::Start));
        assert_eq!((FF.reads(), FF.bounds()), (Endpoint::End, Endpoint::End));
        assert_eq!((SF.reads(), SF.bounds()), (Endpoint::Start, Endpoint::End));
    }

    #[test]
    fn test_dependency_builder() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let dep = Dependency::finish_to_start(a, b).with_lag_hours(6);
        assert_eq!(dep.dep_type, DependencyType::FS);
        assert_eq!(dep.lag(), TimeDelta::hours(6));
        assert!(!dep.is_self_link());
        assert!(dep.touches(a) && dep.touches(b));
        assert!(dep.same_pair(&Dependency::new(a, b, DependencyType::SS)));
        assert!(!dep.same_pair(&Dependency::new(b, a, DependencyType::FS)));
    }

    #[test]
    fn test_type_serializes_as_code() {
        let json = serde_json::to_string(&DependencyType::SF).unwrap();
        assert_eq!(json, "\"SF\"");
    }
}
