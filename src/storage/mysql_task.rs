use chrono::Utc;
use sqlx::{MySql, QueryBuilder};
use std::collections::HashMap;
use tracing::debug;

use crate::auth::scope;
use crate::models::{
    AccountId, NewTask, Task, TaskChanges, TaskId, TaskWithEntries, TimeEntry,
};
use crate::storage::mysql::{push_id_list, MySqlStorage};
use crate::storage::mysql_models::{TaskRow, TimeEntryRow, TASK_COLUMNS, TIME_ENTRY_COLUMNS};
use crate::storage::{DeleteOutcome, Result, StorageError};

/// MySQL task operations, scoped to the acting account
pub trait MySqlTaskExt {
    async fn create_task(&self, created_by: AccountId, task: &NewTask) -> Result<Task>;

    async fn fetch_task(&self, actor: AccountId, task_id: TaskId) -> Result<Option<Task>>;

    async fn list_tasks(
        &self,
        actor: AccountId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TaskWithEntries>>;

    async fn update_task(
        &self,
        actor: AccountId,
        task_id: TaskId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>>;

    async fn delete_tasks(
        &self,
        actor: AccountId,
        ids: &[TaskId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome>;
}

/// `SELECT <cols> FROM tasks AS t LEFT JOIN <membership> WHERE t.id = ? AND <visible>`
fn visible_task_query(actor: AccountId, task_id: TaskId, columns: &str) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new(format!("SELECT {} FROM tasks AS t", columns));
    scope::push_task_membership_join(&mut builder, actor);
    builder.push(" WHERE t.id = ").push_bind(task_id).push(" AND");
    scope::push_task_access_predicate(&mut builder, actor);
    builder
}

/// `UPDATE tasks SET ...` for the fields present in `changes`
fn update_task_query(task_id: TaskId, changes: &TaskChanges) -> QueryBuilder<'static, MySql> {
    let mut builder = QueryBuilder::new("UPDATE tasks SET ");
    {
        let mut set = builder.separated(", ");
        if let Some(project_id) = changes.project_id {
            set.push("project_id = ").push_bind_unseparated(project_id);
        }
        if let Some(team_id) = changes.team_id {
            set.push("team_id = ").push_bind_unseparated(team_id);
        }
        if let Some(name) = &changes.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(description) = &changes.description {
            set.push("description = ").push_bind_unseparated(description.clone());
        }
        if let Some(estimation_secs) = changes.estimation_secs {
            set.push("estimation_secs = ").push_bind_unseparated(estimation_secs);
        }
        if let Some(status) = changes.status {
            set.push("status = ").push_bind_unseparated(status.as_str());
        }
        if let Some(assignee_id) = changes.assignee_id {
            set.push("assignee_id = ").push_bind_unseparated(assignee_id);
        }
        if let Some(due_date) = changes.due_date {
            set.push("due_date = ")
                .push_bind_unseparated(due_date.map(|d| d.timestamp()));
        }
    }
    builder.push(" WHERE id = ").push_bind(task_id);
    builder
}

impl MySqlTaskExt for MySqlStorage {
    async fn create_task(&self, created_by: AccountId, task: &NewTask) -> Result<Task> {
        let created_at = Utc::now().timestamp();
        let result = sqlx::query(
            r#"INSERT INTO tasks (
                project_id, team_id, name, description, estimation_secs,
                status, created_at, created_by, assignee_id, due_date
              ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(task.project_id)
        .bind(task.team_id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.estimation_secs)
        .bind(task.status.as_str())
        .bind(created_at)
        .bind(created_by)
        .bind(task.assignee_id)
        .bind(task.due_date.map(|d| d.timestamp()))
        .execute(self.get_sqlx_pool())
        .await?;

        let id = result.last_insert_id() as TaskId;
        debug!("task {} created by {}", id, created_by);

        let row: TaskRow = sqlx::query_as(&format!(
            "SELECT {} FROM tasks AS t WHERE t.id = ?",
            TASK_COLUMNS
        ))
        .bind(id)
        .fetch_one(self.get_sqlx_pool())
        .await?;
        row.into_task()
    }

    async fn fetch_task(&self, actor: AccountId, task_id: TaskId) -> Result<Option<Task>> {
        let mut query = visible_task_query(actor, task_id, TASK_COLUMNS);
        let row: Option<TaskRow> = query
            .build_query_as()
            .fetch_optional(self.get_sqlx_pool())
            .await?;
        row.map(TaskRow::into_task).transpose()
    }

    async fn list_tasks(
        &self,
        actor: AccountId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TaskWithEntries>> {
        let sql = format!(
            "SELECT {} FROM tasks AS t WHERE t.created_by = ? \
             ORDER BY t.created_at DESC, t.id DESC LIMIT ? OFFSET ?",
            TASK_COLUMNS
        );
        let rows: Vec<TaskRow> = sqlx::query_as(&sql)
            .bind(actor)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(self.get_sqlx_pool())
            .await?;
        let tasks = rows
            .into_iter()
            .map(TaskRow::into_task)
            .collect::<Result<Vec<Task>>>()?;
        if tasks.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<TaskId> = tasks.iter().map(|t| t.id).collect();
        let mut query = QueryBuilder::<MySql>::new(format!(
            "SELECT {} FROM time_entries AS e WHERE e.task_id IN",
            TIME_ENTRY_COLUMNS
        ));
        push_id_list(&mut query, &ids);
        query.push(" ORDER BY e.start_at DESC, e.id DESC");
        let entry_rows: Vec<TimeEntryRow> = query
            .build_query_as()
            .fetch_all(self.get_sqlx_pool())
            .await?;

        let mut grouped: HashMap<TaskId, Vec<TimeEntry>> = HashMap::new();
        for row in entry_rows {
            let entry = row.into_time_entry()?;
            grouped.entry(entry.task_id).or_default().push(entry);
        }

        Ok(tasks
            .into_iter()
            .map(|task| TaskWithEntries {
                time_entries: grouped.remove(&task.id).unwrap_or_default(),
                task,
            })
            .collect())
    }

    async fn update_task(
        &self,
        actor: AccountId,
        task_id: TaskId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>> {
        let mut tx = self.get_sqlx_pool().begin().await?;

        let mut lookup = visible_task_query(actor, task_id, "t.id");
        lookup.push(" FOR UPDATE");
        let visible: Option<i64> = lookup
            .build_query_scalar()
            .fetch_optional(&mut *tx)
            .await?;
        if visible.is_none() {
            return Ok(None);
        }

        if !changes.is_empty() {
            update_task_query(task_id, changes)
                .build()
                .execute(&mut *tx)
                .await?;
        }

        let row: TaskRow = sqlx::query_as(&format!(
            "SELECT {} FROM tasks AS t WHERE t.id = ?",
            TASK_COLUMNS
        ))
        .bind(task_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(format!("Failed to commit task update: {}", e)))?;
        row.into_task().map(Some)
    }

    async fn delete_tasks(
        &self,
        actor: AccountId,
        ids: &[TaskId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome> {
        // time entries go with their task through ON DELETE CASCADE
        self.delete_within_scope("tasks", ids, all_or_nothing, |requested| {
            let mut builder = QueryBuilder::new("SELECT t.id FROM tasks AS t");
            scope::push_task_membership_join(&mut builder, actor);
            builder.push(" WHERE t.id IN");
            push_id_list(&mut builder, requested);
            builder.push(" AND");
            scope::push_task_access_predicate(&mut builder, actor);
            builder.push(" FOR UPDATE");
            builder
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    #[test]
    fn update_only_touches_present_fields() {
        let changes = TaskChanges {
            status: Some(TaskStatus::Completed),
            team_id: Some(None),
            ..Default::default()
        };
        let query = update_task_query(11, &changes);
        assert_eq!(
            query.sql(),
            "UPDATE tasks SET team_id = ?, status = ? WHERE id = ?"
        );
    }

    #[test]
    fn visible_task_query_binds_actor_twice() {
        let query = visible_task_query(3, 8, "t.id");
        let sql = query.sql();
        assert!(sql.starts_with("SELECT t.id FROM tasks AS t LEFT JOIN team_memberships"));
        assert_eq!(sql.matches('?').count(), 3);
    }
}
