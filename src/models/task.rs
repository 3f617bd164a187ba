use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::account::AccountId;
use crate::models::team::TeamId;
use crate::models::time_entry::TimeEntry;

pub type TaskId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Cancelled,
    Completed,
    Archived,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Completed => "completed",
            TaskStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(TaskStatus::Todo),
            "in_progress" => Ok(TaskStatus::InProgress),
            "cancelled" => Ok(TaskStatus::Cancelled),
            "completed" => Ok(TaskStatus::Completed),
            "archived" => Ok(TaskStatus::Archived),
            _ => Err(format!("Invalid task status: {}", s)),
        }
    }
}

/// Unit of work owned by its creator and optionally shared with a team
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: Option<i64>,
    pub team_id: Option<TeamId>,
    pub name: String,
    pub description: String,
    /// Estimated effort in seconds
    pub estimation_secs: Option<i64>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub created_by: AccountId,
    pub assignee_id: Option<AccountId>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Task fields supplied on creation. The creator is always the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTask {
    pub project_id: Option<i64>,
    pub team_id: Option<TeamId>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub estimation_secs: Option<i64>,
    #[serde(default)]
    pub status: TaskStatus,
    pub assignee_id: Option<AccountId>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial task update.
///
/// For nullable columns the outer `Option` says whether the field changes
/// and the inner one carries the new value, so `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskChanges {
    pub project_id: Option<Option<i64>>,
    pub team_id: Option<Option<TeamId>>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub estimation_secs: Option<Option<i64>>,
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Option<AccountId>>,
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.project_id.is_none()
            && self.team_id.is_none()
            && self.name.is_none()
            && self.description.is_none()
            && self.estimation_secs.is_none()
            && self.status.is_none()
            && self.assignee_id.is_none()
            && self.due_date.is_none()
    }

    pub fn apply_to(&self, task: &mut Task) {
        if let Some(project_id) = self.project_id {
            task.project_id = project_id;
        }
        if let Some(team_id) = self.team_id {
            task.team_id = team_id;
        }
        if let Some(name) = &self.name {
            task.name = name.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(estimation_secs) = self.estimation_secs {
            task.estimation_secs = estimation_secs;
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(assignee_id) = self.assignee_id {
            task.assignee_id = assignee_id;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }
}

/// Task with its time entries, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskWithEntries {
    #[serde(flatten)]
    pub task: Task,
    pub time_entries: Vec<TimeEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListMeta {
    /// Number of entities on this page
    pub count: usize,
    pub offset: u32,
    pub limit: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskList {
    pub entities: Vec<TaskWithEntries>,
    pub meta: ListMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_column_text() {
        for status in [
            TaskStatus::Todo,
            TaskStatus::InProgress,
            TaskStatus::Cancelled,
            TaskStatus::Completed,
            TaskStatus::Archived,
        ] {
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
        assert!("done".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn clearing_team_uses_inner_none() {
        let mut task = Task {
            id: 1,
            project_id: None,
            team_id: Some(4),
            name: "Write report".into(),
            description: String::new(),
            estimation_secs: None,
            status: TaskStatus::Todo,
            created_at: Utc::now(),
            created_by: 1,
            assignee_id: None,
            due_date: None,
        };
        let changes = TaskChanges {
            team_id: Some(None),
            status: Some(TaskStatus::InProgress),
            ..Default::default()
        };
        assert!(!changes.is_empty());
        changes.apply_to(&mut task);
        assert_eq!(task.team_id, None);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.name, "Write report");
    }
}
