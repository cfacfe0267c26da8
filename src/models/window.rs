//! Planned execution windows and duration arithmetic.
//!
//! A [`Window`] is a closed interval `[start, end]` of UTC instants. Every
//! scheduling component works on windows; this module holds the shared
//! arithmetic so that the rounding of day-based durations is identical
//! everywhere (a prerequisite for the stabilizer's fixed-point check).
//!
//! # Time Model
//! Task durations are day counts (`f64`). They are converted to whole
//! milliseconds once, then added to or subtracted from instants with
//! saturating arithmetic, so no input can overflow the calendar.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_DAY: f64 = 86_400_000.0;

/// Upper bound on a single duration (days). Keeps arithmetic in range.
pub const MAX_DURATION_DAYS: f64 = 1_000_000.0;

/// Converts a day count to a duration, flooring at `floor_days`.
///
/// Zero, negative and non-finite inputs collapse to the floor.
pub fn duration_from_days(days: f64, floor_days: f64) -> TimeDelta {
    let days = if days.is_finite() { days } else { 0.0 };
    let days = days.max(floor_days).min(MAX_DURATION_DAYS);
    TimeDelta::milliseconds((days * MS_PER_DAY).round() as i64)
}

/// Converts a lag in hours to a duration, saturating on overflow.
pub fn lag_from_hours(hours: i64) -> TimeDelta {
    TimeDelta::try_hours(hours).unwrap_or(if hours < 0 {
        TimeDelta::MIN
    } else {
        TimeDelta::MAX
    })
}

/// Adds `delta` to `at`, saturating at the calendar limits.
pub fn shift(at: DateTime<Utc>, delta: TimeDelta) -> DateTime<Utc> {
    at.checked_add_signed(delta).unwrap_or(if delta < TimeDelta::zero() {
        DateTime::<Utc>::MIN_UTC
    } else {
        DateTime::<Utc>::MAX_UTC
    })
}

/// A closed execution window `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    /// Window start (inclusive).
    pub start: DateTime<Utc>,
    /// Window end (inclusive).
    pub end: DateTime<Utc>,
}

impl Window {
    /// Creates a window without reordering.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Window of length `duration` starting at `start`.
    pub fn starting_at(start: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self::new(start, shift(start, duration))
    }

    /// Window of length `duration` ending at `end`.
    pub fn ending_at(end: DateTime<Utc>, duration: TimeDelta) -> Self {
        Self::new(shift(end, -duration), end)
    }

    /// Builds a window from possibly missing endpoints.
    ///
    /// - only `start`: `end = start + duration`
    /// - only `end`: `start = end - duration`
    /// - neither: anchored at `now`, i.e. `[now - duration, now]`
    /// - both: kept as given, then ordering is repaired
    pub fn derive(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        duration: TimeDelta,
        now: DateTime<Utc>,
    ) -> Self {
        let window = match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            (Some(start), None) => Self::starting_at(start, duration),
            (None, Some(end)) => Self::ending_at(end, duration),
            (None, None) => Self::ending_at(now, duration),
        };
        window.repair_ordering()
    }

    /// Sets `end = start` when the window is inverted. Start never moves.
    pub fn repair_ordering(self) -> Self {
        if self.end < self.start {
            Self::new(self.start, self.start)
        } else {
            self
        }
    }

    /// Whether `end >= start`.
    #[inline]
    pub fn is_ordered(&self) -> bool {
        self.end >= self.start
    }

    /// Length of the window (`end - start`).
    #[inline]
    pub fn span(&self) -> TimeDelta {
        self.end - self.start
    }

    /// Whether `other` lies entirely inside this window.
    pub fn contains(&self, other: &Window) -> bool {
        other.start >= self.start && other.end <= self.end
    }

    /// Whether two windows overlap (shared endpoints count).
    pub fn overlaps(&self, other: &Window) -> bool {
        self.start <= other.end && other.start <= self.end
    }
}
