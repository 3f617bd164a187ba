pub mod memory;
pub mod mysql;
pub mod mysql_models;
pub mod pool;

// MySQL table-specific implementations
mod mysql_account;
mod mysql_auth;
mod mysql_task;
mod mysql_team;
mod mysql_time_entry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::config::settings::DatabaseConfig;
use crate::models::{
    Account, AccountId, NewAccount, NewTask, NewTimeEntry, SessionToken, Task, TaskChanges,
    TaskId, TaskWithEntries, TeamId, TeamMembership, TeamRole, TimeEntry, TimeEntryChanges,
    TimeEntryId, UniqueField,
};

pub use self::memory::MemoryStorage;
pub use self::mysql::MySqlStorage;
pub use self::pool::PoolConfig;

pub type Result<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Error, Clone)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Connection pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("Query timeout: {0}")]
    QueryTimeout(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate value for {0}")]
    Duplicate(UniqueField),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl StorageError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::Connection(_) | StorageError::PoolExhausted(_) | StorageError::QueryTimeout(_)
        )
    }

    /// Error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            StorageError::Database(_) => "database",
            StorageError::Connection(_) => "connection",
            StorageError::PoolExhausted(_) => "pool",
            StorageError::QueryTimeout(_) => "timeout",
            StorageError::Transaction(_) => "transaction",
            StorageError::NotFound(_) => "not_found",
            StorageError::Duplicate(_) => "duplicate",
            StorageError::InvalidData(_) => "invalid_data",
            StorageError::ValidationError(_) => "validation",
            StorageError::ConfigurationError(_) => "config",
            StorageError::Internal(_) => "internal",
        }
    }
}

impl From<sqlx::Error> for StorageError {
    fn from(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::RowNotFound => Self::NotFound("Record not found".to_string()),
            sqlx::Error::Database(db_err) => {
                if db_err.is_unique_violation() {
                    let field = db_err
                        .constraint()
                        .and_then(UniqueField::from_constraint)
                        .or_else(|| UniqueField::from_constraint(db_err.message()));
                    if let Some(field) = field {
                        return Self::Duplicate(field);
                    }
                }
                Self::Database(db_err.to_string())
            }
            sqlx::Error::Io(io_err) => Self::Connection(io_err.to_string()),
            sqlx::Error::PoolTimedOut => Self::PoolExhausted("Connection pool timeout".to_string()),
            sqlx::Error::PoolClosed => Self::Connection("Connection pool closed".to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::InvalidData(error.to_string())
            }
            _ => Self::Database(error.to_string()),
        }
    }
}

/// Result of a bulk delete.
///
/// `rejected` holds requested ids that are missing or outside the caller's
/// scope. Under all-or-nothing a non-empty `rejected` means nothing was
/// deleted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub deleted: Vec<i64>,
    pub rejected: Vec<i64>,
}

impl DeleteOutcome {
    /// Split `requested` into permitted and rejected ids, keeping request order
    pub fn partition(requested: &[i64], permitted: impl Fn(i64) -> bool) -> Self {
        let (deleted, rejected) = requested.iter().copied().partition(|id| permitted(*id));
        Self { deleted, rejected }
    }
}

/// Drop repeated ids while keeping first-seen order
pub fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut seen = std::collections::HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

/// Persistence boundary.
///
/// Every task and time entry method takes the acting account and applies the
/// ownership predicate inside the query itself, so an entity outside the
/// caller's scope is indistinguishable from one that does not exist.
#[async_trait]
pub trait Storage: Sync + Send {
    /// Health check with connection validation
    async fn health_check(&self) -> Result<bool>;

    /// Close all connections gracefully
    async fn close(&self) -> Result<()>;

    // Accounts
    async fn create_account(&self, account: &NewAccount) -> Result<Account>;
    async fn get_account_by_id(&self, id: AccountId) -> Result<Option<Account>>;
    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>>;
    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn activate_account(&self, id: AccountId) -> Result<()>;
    async fn update_password_by_email(&self, email: &str, password_hash: &str) -> Result<()>;
    /// Clear the active flag and drop every session of the account in one
    /// step. Returns the number of revoked sessions, `None` if no such account.
    async fn deactivate_account(&self, id: AccountId) -> Result<Option<u64>>;

    // Session tokens
    async fn create_session_token(&self, token: &SessionToken) -> Result<()>;
    /// Owner of `token` when it expires after `valid_after` and the owner is active
    async fn resolve_session_token(
        &self,
        token: &str,
        valid_after: DateTime<Utc>,
    ) -> Result<Option<Account>>;
    async fn delete_session_token(&self, token: &str) -> Result<()>;
    async fn delete_session_tokens_for_account(&self, account_id: AccountId) -> Result<u64>;

    // Team membership
    async fn add_team_member(&self, membership: &TeamMembership) -> Result<()>;
    async fn list_teams(&self, account_id: AccountId) -> Result<Vec<TeamMembership>>;
    async fn get_team_role(&self, account_id: AccountId, team_id: TeamId)
        -> Result<Option<TeamRole>>;

    // Tasks
    async fn create_task(&self, created_by: AccountId, task: &NewTask) -> Result<Task>;
    async fn fetch_task(&self, actor: AccountId, task_id: TaskId) -> Result<Option<Task>>;
    /// Tasks created by `actor`, newest first, each with its time entries
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

    // Time entries
    /// `None` when the parent task is outside the caller's scope
    async fn create_time_entry(
        &self,
        actor: AccountId,
        entry: &NewTimeEntry,
    ) -> Result<Option<TimeEntry>>;
    /// Fails with `ValidationError` when the merged interval is inverted
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

/// Connect to MySQL, bootstrap the schema and verify the connection
#[instrument(skip(config), fields(host = %config.host, db = %config.name))]
pub async fn init_storage(config: &DatabaseConfig) -> Result<Arc<dyn Storage>> {
    info!("Initializing storage layer");

    let storage = MySqlStorage::connect(config, PoolConfig::from_database_config(config)).await?;
    storage.init_schema().await?;

    if !storage.health_check().await? {
        return Err(StorageError::Connection(
            "Storage health check failed".to_string(),
        ));
    }

    info!("Storage layer initialized");
    Ok(Arc::new(storage))
}
