//! Hierarchical containment: a child's window must lie inside its parent's.
//!
//! Two modes over the same geometry:
//! - [`check_containment`] rejects a violating window (task admission).
//! - [`clamp_to_parent`] silently narrows it (recalculation), so a project
//!   always converges to some valid state.

use chrono::TimeDelta;
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::models::Window;

/// Narrows `window` into `parent`, preserving `duration` where possible.
///
/// # Algorithm
/// 1. Starts too early: `start = parent.start`, `end = start + duration`.
/// 2. Ends too late: `end = parent.end`, `start = end - duration`.
/// 3. Still starts too early (child longer than parent): `start =
///    parent.start`, end stays at `parent.end`. The child is compressed.
pub fn clamp_to_parent(window: Window, duration: TimeDelta, parent: &Window) -> Window {
    let parent = parent.repair_ordering();
    let mut w = window;

    if w.start < parent.start {
        w = Window::starting_at(parent.start, duration);
    }
    if w.end > parent.end {
        w = Window::ending_at(parent.end, duration);
    }
    if w.start < parent.start {
        w = Window::new(parent.start, w.end);
    }

    w.repair_ordering()
}

/// Rejects a child window that is not inside its parent's window.
pub fn check_containment(parent_id: Uuid, window: &Window, parent: &Window) -> Result<()> {
    if parent.contains(window) {
        return Ok(());
    }
    Err(ScheduleError::ContainmentViolation {
        parent_id,
        start: window.start,
        end: window.end,
        parent_start: parent.start,
        parent_end: parent.end,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap() + TimeDelta::days(n)
    }

    fn parent() -> Window {
        Window::new(day(0), day(5))
    }

    #[test]
    fn test_inside_untouched() {
        let w = Window::new(day(1), day(3));
        assert_eq!(clamp_to_parent(w, TimeDelta::days(2), &parent()), w);
    }

    #[test]
    fn test_starts_early_shifted_right() {
        let w = Window::new(day(-1), day(1));
        assert_eq!(
            clamp_to_parent(w, TimeDelta::days(2), &parent()),
            Window::new(day(0), day(2))
        );
    }

    #[test]
    fn test_ends_late_shifted_left() {
        let w = Window::new(day(4), day(7));
        assert_eq!(
            clamp_to_parent(w, TimeDelta::days(3), &parent()),
            Window::new(day(2), day(5))
        );
    }

    #[test]
    fn test_longer_than_parent_compressed() {
        let w = Window::new(day(-2), day(8));
        let clamped = clamp_to_parent(w, TimeDelta::days(10), &parent());
        assert_eq!(clamped, parent());
    }

    #[test]
    fn test_entirely_after_parent() {
        let w = Window::new(day(9), day(10));
        assert_eq!(
            clamp_to_parent(w, TimeDelta::days(1), &parent()),
            Window::new(day(4), day(5))
        );
    }

    #[test]
    fn test_strict_check() {
        let pid = Uuid::new_v4();
        assert!(check_containment(pid, &Window::new(day(0), day(5)), &parent()).is_ok());

        let err = check_containment(pid, &Window::new(day(-1), day(2)), &parent()).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::ContainmentViolation { parent_id, .. } if parent_id == pid
        ));
    }
}
