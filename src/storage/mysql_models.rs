// Row types for the MySQL tables and their conversion into domain models.
// Timestamps are stored as BIGINT unix seconds.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::models::{Account, Task, TaskStatus, TeamMembership, TeamRole, TimeEntry};
use crate::storage::{Result, StorageError};

pub fn datetime_from_seconds(seconds: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| StorageError::InvalidData(format!("Timestamp out of range: {}", seconds)))
}

fn optional_datetime(seconds: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    seconds.map(datetime_from_seconds).transpose()
}

pub const ACCOUNT_COLUMNS: &str = "a.id, a.username, a.email, a.password_hash, a.first_name, \
     a.last_name, a.is_active, a.created_at, a.updated_at";

#[derive(Debug, FromRow)]
pub struct AccountRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl AccountRow {
    pub fn into_account(self) -> Result<Account> {
        Ok(Account {
            id: self.id,
            username: self.username,
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            is_active: self.is_active,
            created_at: datetime_from_seconds(self.created_at)?,
            updated_at: datetime_from_seconds(self.updated_at)?,
        })
    }
}

pub const TASK_COLUMNS: &str = "t.id, t.project_id, t.team_id, t.name, t.description, \
     t.estimation_secs, t.status, t.created_at, t.created_by, t.assignee_id, t.due_date";

#[derive(Debug, FromRow)]
pub struct TaskRow {
    pub id: i64,
    pub project_id: Option<i64>,
    pub team_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub estimation_secs: Option<i64>,
    pub status: String,
    pub created_at: i64,
    pub created_by: i64,
    pub assignee_id: Option<i64>,
    pub due_date: Option<i64>,
}

impl TaskRow {
    pub fn into_task(self) -> Result<Task> {
        let status = self
            .status
            .parse::<TaskStatus>()
            .map_err(StorageError::InvalidData)?;
        Ok(Task {
            id: self.id,
            project_id: self.project_id,
            team_id: self.team_id,
            name: self.name,
            description: self.description,
            estimation_secs: self.estimation_secs,
            status,
            created_at: datetime_from_seconds(self.created_at)?,
            created_by: self.created_by,
            assignee_id: self.assignee_id,
            due_date: optional_datetime(self.due_date)?,
        })
    }
}

pub const TIME_ENTRY_COLUMNS: &str = "e.id, e.task_id, e.assignee_id, e.start_at, e.end_at";

#[derive(Debug, FromRow)]
pub struct TimeEntryRow {
    pub id: i64,
    pub task_id: i64,
    pub assignee_id: i64,
    pub start_at: i64,
    pub end_at: Option<i64>,
}

impl TimeEntryRow {
    pub fn into_time_entry(self) -> Result<TimeEntry> {
        Ok(TimeEntry {
            id: self.id,
            task_id: self.task_id,
            assignee_id: self.assignee_id,
            start: datetime_from_seconds(self.start_at)?,
            end: optional_datetime(self.end_at)?,
        })
    }
}

#[derive(Debug, FromRow)]
pub struct MembershipRow {
    pub account_id: i64,
    pub team_id: i64,
    pub role: String,
}

impl MembershipRow {
    pub fn into_membership(self) -> Result<TeamMembership> {
        let role = self
            .role
            .parse::<TeamRole>()
            .map_err(StorageError::InvalidData)?;
        Ok(TeamMembership {
            account_id: self.account_id,
            team_id: self.team_id,
            role,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_status_is_invalid_data() {
        let row = TaskRow {
            id: 1,
            project_id: None,
            team_id: None,
            name: "Plan sprint".into(),
            description: String::new(),
            estimation_secs: None,
            status: "blocked".into(),
            created_at: 1_700_000_000,
            created_by: 1,
            assignee_id: None,
            due_date: None,
        };
        assert!(matches!(row.into_task(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn seconds_convert_to_utc() {
        let dt = datetime_from_seconds(1_700_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
    }
}
