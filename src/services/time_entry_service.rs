use chrono::{DateTime, SubsecRound, Utc};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{DeleteError, DeletionError, TimeEntryError};
use crate::models::{
    AccountId, NewTimeEntry, TaskId, TimeEntry, TimeEntryChanges, TimeEntryId,
};
use crate::storage::{dedup_ids, Storage, StorageError};

/// Time entries. Creating one needs access to the parent task; changing or
/// deleting one is reserved to the parent task's creator.
#[derive(Clone)]
pub struct TimeEntryService {
    storage: Arc<dyn Storage>,
}

impl TimeEntryService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[instrument(skip(self))]
    pub async fn create(
        &self,
        actor: AccountId,
        task_id: TaskId,
        assignee_id: AccountId,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
    ) -> Result<TimeEntry, TimeEntryError> {
        // storage keeps whole seconds
        let entry = NewTimeEntry {
            task_id,
            assignee_id,
            start: start.trunc_subsecs(0),
            end: end.map(|end| end.trunc_subsecs(0)),
        };
        entry
            .check_interval()
            .map_err(|e| TimeEntryError::InvalidValue(e.to_string()))?;

        let created = self
            .storage
            .create_time_entry(actor, &entry)
            .await?
            .ok_or(TimeEntryError::EntityNotFound)?;
        info!("time entry {} created", created.id);
        Ok(created)
    }

    /// Merge `changes` into the stored entry. An inverted result is refused
    /// and nothing is written.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        actor: AccountId,
        entry_id: TimeEntryId,
        mut changes: TimeEntryChanges,
    ) -> Result<TimeEntry, TimeEntryError> {
        changes.start = changes.start.map(|start| start.trunc_subsecs(0));
        changes.end = changes.end.map(|end| end.map(|end| end.trunc_subsecs(0)));
        match self.storage.update_time_entry(actor, entry_id, &changes).await {
            Ok(Some(entry)) => Ok(entry),
            Ok(None) => Err(TimeEntryError::EntityNotFound),
            Err(StorageError::ValidationError(reason)) => Err(TimeEntryError::InvalidValue(reason)),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete(
        &self,
        actor: AccountId,
        ids: &[TimeEntryId],
        all_or_nothing: bool,
    ) -> Result<Vec<TimeEntryId>, DeleteError> {
        let ids = dedup_ids(ids);
        let outcome = self
            .storage
            .delete_time_entries(actor, &ids, all_or_nothing)
            .await?;
        if all_or_nothing && !outcome.rejected.is_empty() {
            return Err(DeletionError {
                ids: outcome.rejected,
            }
            .into());
        }
        info!("{} time entries deleted", outcome.deleted.len());
        Ok(outcome.deleted)
    }
}
