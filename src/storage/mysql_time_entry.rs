use sqlx::{MySql, QueryBuilder};
use tracing::debug;

use crate::auth::scope;
use crate::models::{AccountId, NewTimeEntry, TimeEntry, TimeEntryChanges, TimeEntryId};
use crate::storage::mysql::{push_id_list, MySqlStorage};
use crate::storage::mysql_models::{TimeEntryRow, TIME_ENTRY_COLUMNS};
use crate::storage::{DeleteOutcome, Result, StorageError};

/// MySQL time entry operations. Only the parent task's creator may mutate.
pub trait MySqlTimeEntryExt {
    async fn create_time_entry(
        &self,
        actor: AccountId,
        entry: &NewTimeEntry,
    ) -> Result<Option<TimeEntry>>;

    async fn update_time_entry(
        &self,
        actor: AccountId,
        entry_id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>>;

    async fn delete_time_entries(
        &self,
        actor: AccountId,
        ids: &[TimeEntryId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome>;
}

impl MySqlTimeEntryExt for MySqlStorage {
    async fn create_time_entry(
        &self,
        actor: AccountId,
        entry: &NewTimeEntry,
    ) -> Result<Option<TimeEntry>> {
        let mut tx = self.get_sqlx_pool().begin().await?;

        // parent task must be visible to the actor; lock it against a concurrent delete
        let mut lookup = QueryBuilder::<MySql>::new("SELECT t.id FROM tasks AS t");
        scope::push_task_membership_join(&mut lookup, actor);
        lookup
            .push(" WHERE t.id = ")
            .push_bind(entry.task_id)
            .push(" AND");
        scope::push_task_access_predicate(&mut lookup, actor);
        lookup.push(" LOCK IN SHARE MODE");
        let parent: Option<i64> = lookup
            .build_query_scalar()
            .fetch_optional(&mut *tx)
            .await?;
        if parent.is_none() {
            return Ok(None);
        }

        let result = sqlx::query(
            "INSERT INTO time_entries (task_id, assignee_id, start_at, end_at) VALUES (?, ?, ?, ?)",
        )
        .bind(entry.task_id)
        .bind(entry.assignee_id)
        .bind(entry.start.timestamp())
        .bind(entry.end.map(|end| end.timestamp()))
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            StorageError::Transaction(format!("Failed to commit time entry insert: {}", e))
        })?;

        let id = result.last_insert_id() as TimeEntryId;
        debug!("time entry {} created on task {}", id, entry.task_id);
        Ok(Some(TimeEntry {
            id,
            task_id: entry.task_id,
            assignee_id: entry.assignee_id,
            start: entry.start,
            end: entry.end,
        }))
    }

    async fn update_time_entry(
        &self,
        actor: AccountId,
        entry_id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>> {
        let mut tx = self.get_sqlx_pool().begin().await?;

        let mut lookup = QueryBuilder::<MySql>::new(format!(
            "SELECT {} FROM time_entries AS e",
            TIME_ENTRY_COLUMNS
        ));
        scope::push_time_entry_owner_join(&mut lookup, actor);
        lookup
            .push(" WHERE e.id = ")
            .push_bind(entry_id)
            .push(" FOR UPDATE");
        let row: Option<TimeEntryRow> = lookup
            .build_query_as()
            .fetch_optional(&mut *tx)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        // merged interval is checked before anything is written
        let merged = row
            .into_time_entry()?
            .merged(changes)
            .map_err(|e| StorageError::ValidationError(e.to_string()))?;

        sqlx::query(
            "UPDATE time_entries SET assignee_id = ?, start_at = ?, end_at = ? WHERE id = ?",
        )
        .bind(merged.assignee_id)
        .bind(merged.start.timestamp())
        .bind(merged.end.map(|end| end.timestamp()))
        .bind(entry_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await.map_err(|e| {
            StorageError::Transaction(format!("Failed to commit time entry update: {}", e))
        })?;
        Ok(Some(merged))
    }

    async fn delete_time_entries(
        &self,
        actor: AccountId,
        ids: &[TimeEntryId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome> {
        self.delete_within_scope("time_entries", ids, all_or_nothing, |requested| {
            let mut builder = QueryBuilder::new("SELECT e.id FROM time_entries AS e");
            scope::push_time_entry_owner_join(&mut builder, actor);
            builder.push(" WHERE e.id IN");
            push_id_list(&mut builder, requested);
            builder.push(" FOR UPDATE");
            builder
        })
        .await
    }
}
