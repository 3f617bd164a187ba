use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::account::AccountId;
use crate::models::task::TaskId;

pub type TimeEntryId = i64;

/// Recorded interval of work on a task. An open entry has no end yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    pub id: TimeEntryId,
    pub task_id: TaskId,
    pub assignee_id: AccountId,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    pub task_id: TaskId,
    pub assignee_id: AccountId,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Partial update of a time entry. `end: Some(None)` reopens the entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntryChanges {
    pub assignee_id: Option<AccountId>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<Option<DateTime<Utc>>>,
}

impl TimeEntryChanges {
    pub fn is_empty(&self) -> bool {
        self.assignee_id.is_none() && self.start.is_none() && self.end.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("start must not be later than end")]
pub struct InvalidInterval;

/// `start <= end` whenever an end is present
pub fn check_interval(
    start: DateTime<Utc>,
    end: Option<DateTime<Utc>>,
) -> Result<(), InvalidInterval> {
    match end {
        Some(end) if start > end => Err(InvalidInterval),
        _ => Ok(()),
    }
}

impl NewTimeEntry {
    pub fn check_interval(&self) -> Result<(), InvalidInterval> {
        check_interval(self.start, self.end)
    }
}

impl TimeEntry {
    /// Apply `changes` over the stored entry, rejecting an inverted interval.
    ///
    /// Only the merged result is checked, so a change to one bound is
    /// validated against the stored value of the other.
    pub fn merged(&self, changes: &TimeEntryChanges) -> Result<TimeEntry, InvalidInterval> {
        let mut merged = self.clone();
        if let Some(assignee_id) = changes.assignee_id {
            merged.assignee_id = assignee_id;
        }
        if let Some(start) = changes.start {
            merged.start = start;
        }
        if let Some(end) = changes.end {
            merged.end = end;
        }
        check_interval(merged.start, merged.end)?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn entry() -> TimeEntry {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        TimeEntry {
            id: 1,
            task_id: 7,
            assignee_id: 3,
            start,
            end: Some(start + Duration::hours(2)),
        }
    }

    #[test]
    fn equal_bounds_are_allowed() {
        let e = entry();
        assert!(check_interval(e.start, Some(e.start)).is_ok());
        assert!(check_interval(e.start, None).is_ok());
    }

    #[test]
    fn moving_start_past_stored_end_is_rejected() {
        let e = entry();
        let changes = TimeEntryChanges {
            start: Some(e.start + Duration::hours(3)),
            ..Default::default()
        };
        assert_eq!(e.merged(&changes), Err(InvalidInterval));
    }

    #[test]
    fn reopening_clears_end() {
        let e = entry();
        let changes = TimeEntryChanges {
            end: Some(None),
            start: Some(e.start + Duration::hours(5)),
            ..Default::default()
        };
        let merged = e.merged(&changes).unwrap();
        assert_eq!(merged.end, None);
        assert_eq!(merged.start, e.start + Duration::hours(5));
    }
}
