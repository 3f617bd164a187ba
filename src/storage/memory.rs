use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex as TokioMutex;
use tracing::debug;

use crate::auth::scope;
use crate::models::{
    Account, AccountId, NewAccount, NewTask, NewTimeEntry, SessionToken, Task, TaskChanges,
    TaskId, TaskWithEntries, TeamId, TeamMembership, TeamRole, TimeEntry, TimeEntryChanges,
    TimeEntryId, UniqueField,
};
use crate::storage::{dedup_ids, DeleteOutcome, Result, Storage, StorageError};

// In-memory storage data. Every operation runs under one lock, which gives
// the same all-or-nothing behavior as a database transaction.
#[derive(Default)]
struct StorageData {
    accounts: HashMap<AccountId, Account>,
    session_tokens: HashMap<String, SessionToken>,
    memberships: HashMap<(AccountId, TeamId), TeamRole>,
    tasks: HashMap<TaskId, Task>,
    time_entries: HashMap<TimeEntryId, TimeEntry>,
    next_account_id: AccountId,
    next_task_id: TaskId,
    next_time_entry_id: TimeEntryId,
}

impl StorageData {
    fn is_member(&self, account_id: AccountId, team_id: TeamId) -> bool {
        self.memberships.contains_key(&(account_id, team_id))
    }

    fn visible_task(&self, actor: AccountId, task_id: TaskId) -> Option<&Task> {
        self.tasks
            .get(&task_id)
            .filter(|task| scope::can_access_task(actor, task, |team| self.is_member(actor, team)))
    }

    /// Entry whose parent task was created by `actor`
    fn owned_time_entry(&self, actor: AccountId, entry_id: TimeEntryId) -> Option<&TimeEntry> {
        let entry = self.time_entries.get(&entry_id)?;
        let parent = self.tasks.get(&entry.task_id)?;
        scope::can_mutate_time_entry(actor, parent).then_some(entry)
    }

    fn find_account(&self, predicate: impl Fn(&Account) -> bool) -> Option<&Account> {
        self.accounts.values().find(|account| predicate(account))
    }
}

/// In-memory storage implementation (useful for testing)
#[derive(Default)]
pub struct MemoryStorage {
    data: TokioMutex<StorageData>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        let mut data = self.data.lock().await;

        if data
            .find_account(|a| a.username.eq_ignore_ascii_case(&account.username))
            .is_some()
        {
            return Err(StorageError::Duplicate(UniqueField::Username));
        }
        if data
            .find_account(|a| a.email.eq_ignore_ascii_case(&account.email))
            .is_some()
        {
            return Err(StorageError::Duplicate(UniqueField::Email));
        }

        data.next_account_id += 1;
        let now = Utc::now();
        let created = Account {
            id: data.next_account_id,
            username: account.username.clone(),
            email: account.email.clone(),
            password_hash: account.password_hash.clone(),
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
            is_active: account.is_active,
            created_at: now,
            updated_at: now,
        };
        data.accounts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_account_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data.accounts.get(&id).cloned())
    }

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data
            .find_account(|a| a.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        Ok(data.find_account(|a| a.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn activate_account(&self, id: AccountId) -> Result<()> {
        let mut data = self.data.lock().await;
        if let Some(account) = data.accounts.get_mut(&id) {
            account.is_active = true;
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_password_by_email(&self, email: &str, password_hash: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        if let Some(account) = data
            .accounts
            .values_mut()
            .find(|a| a.email.eq_ignore_ascii_case(email))
        {
            account.password_hash = password_hash.to_string();
            account.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn deactivate_account(&self, id: AccountId) -> Result<Option<u64>> {
        let mut data = self.data.lock().await;
        let Some(account) = data.accounts.get_mut(&id) else {
            return Ok(None);
        };
        account.is_active = false;
        account.updated_at = Utc::now();

        let before = data.session_tokens.len();
        data.session_tokens.retain(|_, token| token.account_id != id);
        Ok(Some((before - data.session_tokens.len()) as u64))
    }

    async fn create_session_token(&self, token: &SessionToken) -> Result<()> {
        let mut data = self.data.lock().await;
        if !data.accounts.contains_key(&token.account_id) {
            return Err(StorageError::InvalidData(format!(
                "Unknown account {}",
                token.account_id
            )));
        }
        data.session_tokens.insert(token.token.clone(), token.clone());
        Ok(())
    }

    async fn resolve_session_token(
        &self,
        token: &str,
        valid_after: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let data = self.data.lock().await;
        let account = data
            .session_tokens
            .get(token)
            .filter(|session| session.is_valid_after(valid_after))
            .and_then(|session| data.accounts.get(&session.account_id))
            .filter(|account| account.is_active)
            .cloned();
        Ok(account)
    }

    async fn delete_session_token(&self, token: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        data.session_tokens.remove(token);
        Ok(())
    }

    async fn delete_session_tokens_for_account(&self, account_id: AccountId) -> Result<u64> {
        let mut data = self.data.lock().await;
        let before = data.session_tokens.len();
        data.session_tokens.retain(|_, token| token.account_id != account_id);
        Ok((before - data.session_tokens.len()) as u64)
    }

    async fn add_team_member(&self, membership: &TeamMembership) -> Result<()> {
        let mut data = self.data.lock().await;
        data.memberships
            .insert((membership.account_id, membership.team_id), membership.role);
        Ok(())
    }

    async fn list_teams(&self, account_id: AccountId) -> Result<Vec<TeamMembership>> {
        let data = self.data.lock().await;
        let mut teams: Vec<TeamMembership> = data
            .memberships
            .iter()
            .filter(|((member, _), _)| *member == account_id)
            .map(|(&(account_id, team_id), &role)| TeamMembership {
                account_id,
                team_id,
                role,
            })
            .collect();
        teams.sort_by_key(|m| m.team_id);
        Ok(teams)
    }

    async fn get_team_role(
        &self,
        account_id: AccountId,
        team_id: TeamId,
    ) -> Result<Option<TeamRole>> {
        let data = self.data.lock().await;
        Ok(data.memberships.get(&(account_id, team_id)).copied())
    }

    async fn create_task(&self, created_by: AccountId, task: &NewTask) -> Result<Task> {
        let mut data = self.data.lock().await;
        data.next_task_id += 1;
        let created = Task {
            id: data.next_task_id,
            project_id: task.project_id,
            team_id: task.team_id,
            name: task.name.clone(),
            description: task.description.clone(),
            estimation_secs: task.estimation_secs,
            status: task.status,
            created_at: Utc::now().trunc_subsecs(0),
            created_by,
            assignee_id: task.assignee_id,
            due_date: task.due_date,
        };
        data.tasks.insert(created.id, created.clone());
        Ok(created)
    }

    async fn fetch_task(&self, actor: AccountId, task_id: TaskId) -> Result<Option<Task>> {
        let data = self.data.lock().await;
        Ok(data.visible_task(actor, task_id).cloned())
    }

    async fn list_tasks(
        &self,
        actor: AccountId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TaskWithEntries>> {
        let data = self.data.lock().await;

        let mut tasks: Vec<&Task> = data
            .tasks
            .values()
            .filter(|task| task.created_by == actor)
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let page = tasks
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|task| {
                let mut time_entries: Vec<TimeEntry> = data
                    .time_entries
                    .values()
                    .filter(|entry| entry.task_id == task.id)
                    .cloned()
                    .collect();
                time_entries.sort_by(|a, b| b.start.cmp(&a.start).then(b.id.cmp(&a.id)));
                TaskWithEntries {
                    task: task.clone(),
                    time_entries,
                }
            })
            .collect();
        Ok(page)
    }

    async fn update_task(
        &self,
        actor: AccountId,
        task_id: TaskId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>> {
        let mut data = self.data.lock().await;
        if data.visible_task(actor, task_id).is_none() {
            return Ok(None);
        }
        let Some(task) = data.tasks.get_mut(&task_id) else {
            return Ok(None);
        };
        changes.apply_to(task);
        Ok(Some(task.clone()))
    }

    async fn delete_tasks(
        &self,
        actor: AccountId,
        ids: &[TaskId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome> {
        let mut data = self.data.lock().await;
        let requested = dedup_ids(ids);
        let outcome =
            DeleteOutcome::partition(&requested, |id| data.visible_task(actor, id).is_some());

        if all_or_nothing && !outcome.rejected.is_empty() {
            debug!("task delete rolled back, rejected {:?}", outcome.rejected);
            return Ok(DeleteOutcome {
                deleted: Vec::new(),
                rejected: outcome.rejected,
            });
        }

        for id in &outcome.deleted {
            data.tasks.remove(id);
        }
        data.time_entries
            .retain(|_, entry| !outcome.deleted.contains(&entry.task_id));
        Ok(outcome)
    }

    async fn create_time_entry(
        &self,
        actor: AccountId,
        entry: &NewTimeEntry,
    ) -> Result<Option<TimeEntry>> {
        let mut data = self.data.lock().await;
        if data.visible_task(actor, entry.task_id).is_none() {
            return Ok(None);
        }
        data.next_time_entry_id += 1;
        let created = TimeEntry {
            id: data.next_time_entry_id,
            task_id: entry.task_id,
            assignee_id: entry.assignee_id,
            start: entry.start,
            end: entry.end,
        };
        data.time_entries.insert(created.id, created.clone());
        Ok(Some(created))
    }

    async fn update_time_entry(
        &self,
        actor: AccountId,
        entry_id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>> {
        let mut data = self.data.lock().await;
        let Some(current) = data.owned_time_entry(actor, entry_id) else {
            return Ok(None);
        };
        let merged = current
            .merged(changes)
            .map_err(|e| StorageError::ValidationError(e.to_string()))?;
        data.time_entries.insert(entry_id, merged.clone());
        Ok(Some(merged))
    }

    async fn delete_time_entries(
        &self,
        actor: AccountId,
        ids: &[TimeEntryId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome> {
        let mut data = self.data.lock().await;
        let requested = dedup_ids(ids);
        let outcome =
            DeleteOutcome::partition(&requested, |id| data.owned_time_entry(actor, id).is_some());

        if all_or_nothing && !outcome.rejected.is_empty() {
            return Ok(DeleteOutcome {
                deleted: Vec::new(),
                rejected: outcome.rejected,
            });
        }

        for id in &outcome.deleted {
            data.time_entries.remove(id);
        }
        Ok(outcome)
    }
}
