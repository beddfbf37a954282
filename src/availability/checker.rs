//! Overlap-based availability against busy intervals.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

/// Half-open `[start, end)` span during which an apartment is occupied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BusyInterval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl BusyInterval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whole-day interval from midnight UTC of `start` to midnight UTC of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: midnight_utc(start),
            end: midnight_utc(end),
        }
    }

    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        start < self.end && end > self.start
    }
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// First busy interval overlapping `[start, end)`, if any.
pub fn first_conflict(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    busy: &[BusyInterval],
) -> Option<&BusyInterval> {
    busy.iter().find(|interval| interval.overlaps(start, end))
}

/// True when no busy interval overlaps `[start, end)`. Touching endpoints
/// (a check-out on the day of the next check-in) do not count as overlap.
pub fn is_available(start: DateTime<Utc>, end: DateTime<Utc>, busy: &[BusyInterval]) -> bool {
    first_conflict(start, end, busy).is_none()
}
