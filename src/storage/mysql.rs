use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySql, MySqlPool, QueryBuilder};
use std::collections::HashSet;
use tracing::{debug, info};

use crate::config::settings::DatabaseConfig;
use crate::models::{
    Account, AccountId, NewAccount, NewTask, NewTimeEntry, SessionToken, Task, TaskChanges,
    TaskId, TaskWithEntries, TeamId, TeamMembership, TeamRole, TimeEntry, TimeEntryChanges,
    TimeEntryId,
};
use crate::storage::mysql_account::MySqlAccountExt;
use crate::storage::mysql_auth::MySqlAuthExt;
use crate::storage::mysql_task::MySqlTaskExt;
use crate::storage::mysql_team::MySqlTeamExt;
use crate::storage::mysql_time_entry::MySqlTimeEntryExt;
use crate::storage::pool::PoolConfig;
use crate::storage::{dedup_ids, DeleteOutcome, Result, Storage, StorageError};

// Timestamps are BIGINT unix seconds. Unique key names are matched when
// classifying duplicate-entry errors, see `UniqueField::constraint_name`.
const SCHEMA: &[(&str, &str)] = &[
    (
        "accounts",
        r"CREATE TABLE IF NOT EXISTS accounts (
            id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
            username VARCHAR(64) NOT NULL,
            email VARCHAR(255) NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            first_name VARCHAR(255) NULL,
            last_name VARCHAR(255) NULL,
            is_active BOOLEAN NOT NULL DEFAULT FALSE,
            created_at BIGINT NOT NULL,
            updated_at BIGINT NOT NULL,
            UNIQUE KEY uq_accounts_username (username),
            UNIQUE KEY uq_accounts_email (email)
        )",
    ),
    (
        "session_tokens",
        r"CREATE TABLE IF NOT EXISTS session_tokens (
            token VARCHAR(64) NOT NULL PRIMARY KEY,
            account_id BIGINT NOT NULL,
            created_at BIGINT NOT NULL,
            expires_at BIGINT NOT NULL,
            INDEX idx_session_tokens_account (account_id),
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
        )",
    ),
    (
        "team_memberships",
        r"CREATE TABLE IF NOT EXISTS team_memberships (
            account_id BIGINT NOT NULL,
            team_id BIGINT NOT NULL,
            role VARCHAR(32) NOT NULL,
            PRIMARY KEY (account_id, team_id),
            INDEX idx_team_memberships_team (team_id),
            FOREIGN KEY (account_id) REFERENCES accounts(id) ON DELETE CASCADE
        )",
    ),
    (
        "tasks",
        r"CREATE TABLE IF NOT EXISTS tasks (
            id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
            project_id BIGINT NULL,
            team_id BIGINT NULL,
            name VARCHAR(255) NOT NULL,
            description TEXT NOT NULL,
            estimation_secs BIGINT NULL,
            status VARCHAR(32) NOT NULL,
            created_at BIGINT NOT NULL,
            created_by BIGINT NOT NULL,
            assignee_id BIGINT NULL,
            due_date BIGINT NULL,
            INDEX idx_tasks_creator (created_by, created_at),
            INDEX idx_tasks_team (team_id),
            FOREIGN KEY (created_by) REFERENCES accounts(id),
            FOREIGN KEY (assignee_id) REFERENCES accounts(id) ON DELETE SET NULL
        )",
    ),
    (
        "time_entries",
        r"CREATE TABLE IF NOT EXISTS time_entries (
            id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
            task_id BIGINT NOT NULL,
            assignee_id BIGINT NOT NULL,
            start_at BIGINT NOT NULL,
            end_at BIGINT NULL,
            INDEX idx_time_entries_task (task_id, start_at),
            FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
            FOREIGN KEY (assignee_id) REFERENCES accounts(id)
        )",
    ),
];

/// Append ` (?, ?, ...)` binding every id
pub(crate) fn push_id_list(builder: &mut QueryBuilder<'_, MySql>, ids: &[i64]) {
    builder.push(" (");
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");
}

/// MySQL storage backed by a sqlx pool
pub struct MySqlStorage {
    pool: MySqlPool,
}

impl MySqlStorage {
    pub fn new_with_pool(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig, pool_config: PoolConfig) -> Result<Self> {
        debug!(
            "connecting to mysql://{}@{}:{}/{}",
            config.user, config.host, config.port, config.name
        );
        let pool = pool_config
            .connect(&config.url())
            .await
            .map_err(|e| StorageError::Connection(format!("Failed to connect via sqlx: {}", e)))?;
        Ok(Self { pool })
    }

    pub fn get_sqlx_pool(&self) -> &MySqlPool {
        &self.pool
    }

    /// Check database connection
    pub async fn check_connection(&self) -> Result<()> {
        let result: Option<String> = sqlx::query_scalar("SELECT 'Connection OK'")
            .fetch_optional(self.get_sqlx_pool())
            .await?;
        if result.as_deref() != Some("Connection OK") {
            return Err(StorageError::Connection(
                "Database connection check failed".to_string(),
            ));
        }
        Ok(())
    }

    /// Bulk delete from `table` limited to the ids `select_permitted` returns.
    ///
    /// The permitted set is read with `FOR UPDATE` and the delete runs in the
    /// same transaction. Under `all_or_nothing` any rejected id rolls back.
    pub(crate) async fn delete_within_scope<F>(
        &self,
        table: &'static str,
        ids: &[i64],
        all_or_nothing: bool,
        select_permitted: F,
    ) -> Result<DeleteOutcome>
    where
        F: FnOnce(&[i64]) -> QueryBuilder<'static, MySql>,
    {
        let requested = dedup_ids(ids);
        if requested.is_empty() {
            return Ok(DeleteOutcome::default());
        }

        let mut select = select_permitted(&requested);
        let mut tx = self.get_sqlx_pool().begin().await?;

        let permitted: HashSet<i64> = select
            .build_query_scalar::<i64>()
            .fetch_all(&mut *tx)
            .await?
            .into_iter()
            .collect();
        let outcome = DeleteOutcome::partition(&requested, |id| permitted.contains(&id));

        if all_or_nothing && !outcome.rejected.is_empty() {
            tx.rollback().await?;
            debug!("{} delete rolled back, rejected {:?}", table, outcome.rejected);
            return Ok(DeleteOutcome {
                deleted: Vec::new(),
                rejected: outcome.rejected,
            });
        }

        if !outcome.deleted.is_empty() {
            let mut delete = QueryBuilder::<MySql>::new(format!("DELETE FROM {} WHERE id IN", table));
            push_id_list(&mut delete, &outcome.deleted);
            delete.build().execute(&mut *tx).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(format!("Failed to commit {} delete: {}", table, e)))?;
        Ok(outcome)
    }

    /// Create missing tables
    pub async fn init_schema(&self) -> Result<()> {
        info!("Initializing database schema");
        for (table, ddl) in SCHEMA {
            sqlx::query(ddl)
                .execute(self.get_sqlx_pool())
                .await
                .map_err(|e| {
                    StorageError::Database(format!("Failed to create {} table: {}", table, e))
                })?;
            debug!("table {} ready", table);
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for MySqlStorage {
    async fn health_check(&self) -> Result<bool> {
        Ok(self.check_connection().await.is_ok())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        Ok(())
    }

    async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        MySqlAccountExt::create_account(self, account).await
    }

    async fn get_account_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        MySqlAccountExt::get_account_by_id(self, id).await
    }

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        MySqlAccountExt::get_account_by_username(self, username).await
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        MySqlAccountExt::get_account_by_email(self, email).await
    }

    async fn activate_account(&self, id: AccountId) -> Result<()> {
        MySqlAccountExt::activate_account(self, id).await
    }

    async fn update_password_by_email(&self, email: &str, password_hash: &str) -> Result<()> {
        MySqlAccountExt::update_password_by_email(self, email, password_hash).await
    }

    async fn deactivate_account(&self, id: AccountId) -> Result<Option<u64>> {
        MySqlAccountExt::deactivate_account(self, id).await
    }

    async fn create_session_token(&self, token: &SessionToken) -> Result<()> {
        MySqlAuthExt::create_session_token(self, token).await
    }

    async fn resolve_session_token(
        &self,
        token: &str,
        valid_after: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        MySqlAuthExt::resolve_session_token(self, token, valid_after).await
    }

    async fn delete_session_token(&self, token: &str) -> Result<()> {
        MySqlAuthExt::delete_session_token(self, token).await
    }

    async fn delete_session_tokens_for_account(&self, account_id: AccountId) -> Result<u64> {
        MySqlAuthExt::delete_session_tokens_for_account(self, account_id).await
    }

    async fn add_team_member(&self, membership: &TeamMembership) -> Result<()> {
        MySqlTeamExt::add_team_member(self, membership).await
    }

    async fn list_teams(&self, account_id: AccountId) -> Result<Vec<TeamMembership>> {
        MySqlTeamExt::list_teams(self, account_id).await
    }

    async fn get_team_role(
        &self,
        account_id: AccountId,
        team_id: TeamId,
    ) -> Result<Option<TeamRole>> {
        MySqlTeamExt::get_team_role(self, account_id, team_id).await
    }

    async fn create_task(&self, created_by: AccountId, task: &NewTask) -> Result<Task> {
        MySqlTaskExt::create_task(self, created_by, task).await
    }

    async fn fetch_task(&self, actor: AccountId, task_id: TaskId) -> Result<Option<Task>> {
        MySqlTaskExt::fetch_task(self, actor, task_id).await
    }

    async fn list_tasks(
        &self,
        actor: AccountId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<TaskWithEntries>> {
        MySqlTaskExt::list_tasks(self, actor, offset, limit).await
    }

    async fn update_task(
        &self,
        actor: AccountId,
        task_id: TaskId,
        changes: &TaskChanges,
    ) -> Result<Option<Task>> {
        MySqlTaskExt::update_task(self, actor, task_id, changes).await
    }

    async fn delete_tasks(
        &self,
        actor: AccountId,
        ids: &[TaskId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome> {
        MySqlTaskExt::delete_tasks(self, actor, ids, all_or_nothing).await
    }

    async fn create_time_entry(
        &self,
        actor: AccountId,
        entry: &NewTimeEntry,
    ) -> Result<Option<TimeEntry>> {
        MySqlTimeEntryExt::create_time_entry(self, actor, entry).await
    }

    async fn update_time_entry(
        &self,
        actor: AccountId,
        entry_id: TimeEntryId,
        changes: &TimeEntryChanges,
    ) -> Result<Option<TimeEntry>> {
        MySqlTimeEntryExt::update_time_entry(self, actor, entry_id, changes).await
    }

    async fn delete_time_entries(
        &self,
        actor: AccountId,
        ids: &[TimeEntryId],
        all_or_nothing: bool,
    ) -> Result<DeleteOutcome> {
        MySqlTimeEntryExt::delete_time_entries(self, actor, ids, all_or_nothing).await
    }
}
