use chrono::Utc;
use tracing::{debug, info};

use crate::models::{Account, AccountId, NewAccount};
use crate::storage::mysql::MySqlStorage;
use crate::storage::mysql_models::{AccountRow, ACCOUNT_COLUMNS};
use crate::storage::{Result, StorageError};

/// MySQL account operations
pub trait MySqlAccountExt {
    async fn create_account(&self, account: &NewAccount) -> Result<Account>;

    async fn get_account_by_id(&self, id: AccountId) -> Result<Option<Account>>;

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>>;

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>>;

    async fn activate_account(&self, id: AccountId) -> Result<()>;

    async fn update_password_by_email(&self, email: &str, password_hash: &str) -> Result<()>;

    /// Flag update and session purge share one transaction
    async fn deactivate_account(&self, id: AccountId) -> Result<Option<u64>>;
}

impl MySqlStorage {
    async fn fetch_account_where(&self, clause: &str, value: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts AS a WHERE {} = ?", ACCOUNT_COLUMNS, clause);
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(value)
            .fetch_optional(self.get_sqlx_pool())
            .await?;
        row.map(AccountRow::into_account).transpose()
    }
}

impl MySqlAccountExt for MySqlStorage {
    async fn create_account(&self, account: &NewAccount) -> Result<Account> {
        let now = Utc::now().timestamp();

        // A duplicate key surfaces as StorageError::Duplicate via From<sqlx::Error>
        let result = sqlx::query(
            r#"INSERT INTO accounts (
                username, email, password_hash, first_name, last_name,
                is_active, created_at, updated_at
              ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.is_active)
        .bind(now)
        .bind(now)
        .execute(self.get_sqlx_pool())
        .await?;

        let id = result.last_insert_id() as AccountId;
        debug!("account {} inserted", id);

        self.get_account_by_id(id)
            .await?
            .ok_or_else(|| StorageError::Internal(format!("Account {} vanished after insert", id)))
    }

    async fn get_account_by_id(&self, id: AccountId) -> Result<Option<Account>> {
        let sql = format!("SELECT {} FROM accounts AS a WHERE a.id = ?", ACCOUNT_COLUMNS);
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(self.get_sqlx_pool())
            .await?;
        row.map(AccountRow::into_account).transpose()
    }

    async fn get_account_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.fetch_account_where("a.username", username).await
    }

    async fn get_account_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.fetch_account_where("a.email", email).await
    }

    async fn activate_account(&self, id: AccountId) -> Result<()> {
        sqlx::query("UPDATE accounts SET is_active = TRUE, updated_at = ? WHERE id = ?")
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(self.get_sqlx_pool())
            .await?;
        Ok(())
    }

    async fn update_password_by_email(&self, email: &str, password_hash: &str) -> Result<()> {
        sqlx::query("UPDATE accounts SET password_hash = ?, updated_at = ? WHERE email = ?")
            .bind(password_hash)
            .bind(Utc::now().timestamp())
            .bind(email)
            .execute(self.get_sqlx_pool())
            .await?;
        Ok(())
    }

    async fn deactivate_account(&self, id: AccountId) -> Result<Option<u64>> {
        let mut tx = self.get_sqlx_pool().begin().await?;

        let exists: Option<i64> =
            sqlx::query_scalar("SELECT id FROM accounts WHERE id = ? FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(None);
        }

        sqlx::query("UPDATE accounts SET is_active = FALSE, updated_at = ? WHERE id = ?")
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let revoked = sqlx::query("DELETE FROM session_tokens WHERE account_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit()
            .await
            .map_err(|e| StorageError::Transaction(format!("Failed to commit deactivation: {}", e)))?;

        info!("account {} deactivated, {} sessions revoked", id, revoked);
        Ok(Some(revoked))
    }
}
