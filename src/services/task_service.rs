use chrono::SubsecRound;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::config::constants::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::error::{DeleteError, DeletionError, TaskError};
use crate::models::{AccountId, ListMeta, NewTask, Task, TaskChanges, TaskId, TaskList};
use crate::storage::{dedup_ids, Storage};
use crate::validation::{validate_new_task, validate_task_changes};

/// Task operations on behalf of an acting account.
///
/// Read, update and delete only reach tasks the actor created or that belong
/// to one of the actor's teams. Anything else is reported as not found.
#[derive(Clone)]
pub struct TaskService {
    storage: Arc<dyn Storage>,
}

impl TaskService {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    #[instrument(skip(self, task))]
    pub async fn create(&self, actor: AccountId, mut task: NewTask) -> Result<Task, TaskError> {
        // stored as both backends keep it
        task.name = task.name.trim().to_string();
        task.due_date = task.due_date.map(|d| d.trunc_subsecs(0));
        validate_new_task(&task)
            .into_result()
            .map_err(TaskError::Validation)?;
        let task = self.storage.create_task(actor, &task).await?;
        info!("task {} created", task.id);
        Ok(task)
    }

    pub async fn fetch(&self, actor: AccountId, task_id: TaskId) -> Result<Task, TaskError> {
        self.storage
            .fetch_task(actor, task_id)
            .await?
            .ok_or(TaskError::EntityNotFound)
    }

    /// Tasks the actor created, newest first, with their time entries.
    /// `limit` defaults to 20 and is clamped to 1..=100.
    pub async fn list(
        &self,
        actor: AccountId,
        offset: Option<u32>,
        limit: Option<u32>,
    ) -> Result<TaskList, TaskError> {
        let offset = offset.unwrap_or(0);
        let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
        let entities = self.storage.list_tasks(actor, offset, limit).await?;
        debug!("listed {} tasks for account {}", entities.len(), actor);
        Ok(TaskList {
            meta: ListMeta {
                count: entities.len(),
                offset,
                limit,
            },
            entities,
        })
    }

    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        actor: AccountId,
        task_id: TaskId,
        mut changes: TaskChanges,
    ) -> Result<Task, TaskError> {
        changes.name = changes.name.map(|name| name.trim().to_string());
        changes.due_date = changes.due_date.map(|d| d.map(|d| d.trunc_subsecs(0)));
        validate_task_changes(&changes)
            .into_result()
            .map_err(TaskError::Validation)?;
        self.storage
            .update_task(actor, task_id, &changes)
            .await?
            .ok_or(TaskError::EntityNotFound)
    }

    /// Delete the given tasks and their time entries.
    ///
    /// With `all_or_nothing` a single missing or foreign id aborts the whole
    /// delete and is reported in [`DeletionError`]. Otherwise whatever is in
    /// scope is deleted and only those ids are returned.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn delete(
        &self,
        actor: AccountId,
        ids: &[TaskId],
        all_or_nothing: bool,
    ) -> Result<Vec<TaskId>, DeleteError> {
        let ids = dedup_ids(ids);
        let outcome = self
            .storage
            .delete_tasks(actor, &ids, all_or_nothing)
            .await?;
        if all_or_nothing && !outcome.rejected.is_empty() {
            return Err(DeletionError {
                ids: outcome.rejected,
            }
            .into());
        }
        info!("{} tasks deleted", outcome.deleted.len());
        Ok(outcome.deleted)
    }
}
