use chrono::{DateTime, Utc};
use tracing::debug;

use crate::auth::token::mask_token;
use crate::models::{Account, AccountId, SessionToken};
use crate::storage::mysql::MySqlStorage;
use crate::storage::mysql_models::{AccountRow, ACCOUNT_COLUMNS};
use crate::storage::Result;

/// MySQL session token operations
pub trait MySqlAuthExt {
    async fn create_session_token(&self, token: &SessionToken) -> Result<()>;

    async fn resolve_session_token(
        &self,
        token: &str,
        valid_after: DateTime<Utc>,
    ) -> Result<Option<Account>>;

    async fn delete_session_token(&self, token: &str) -> Result<()>;

    async fn delete_session_tokens_for_account(&self, account_id: AccountId) -> Result<u64>;
}

impl MySqlAuthExt for MySqlStorage {
    async fn create_session_token(&self, token: &SessionToken) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO session_tokens (token, account_id, created_at, expires_at)
              VALUES (?, ?, ?, ?)"#,
        )
        .bind(&token.token)
        .bind(token.account_id)
        .bind(token.created_at.timestamp())
        .bind(token.expires_at.timestamp())
        .execute(self.get_sqlx_pool())
        .await?;
        Ok(())
    }

    async fn resolve_session_token(
        &self,
        token: &str,
        valid_after: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let sql = format!(
            "SELECT {} FROM session_tokens AS s \
             INNER JOIN accounts AS a ON a.id = s.account_id AND a.is_active = TRUE \
             WHERE s.token = ? AND s.expires_at > ?",
            ACCOUNT_COLUMNS
        );
        let row: Option<AccountRow> = sqlx::query_as(&sql)
            .bind(token)
            .bind(valid_after.timestamp())
            .fetch_optional(self.get_sqlx_pool())
            .await?;

        if row.is_none() {
            debug!("session token {} did not resolve", mask_token(token));
        }
        row.map(AccountRow::into_account).transpose()
    }

    async fn delete_session_token(&self, token: &str) -> Result<()> {
        sqlx::query("DELETE FROM session_tokens WHERE token = ?")
            .bind(token)
            .execute(self.get_sqlx_pool())
            .await?;
        Ok(())
    }

    async fn delete_session_tokens_for_account(&self, account_id: AccountId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM session_tokens WHERE account_id = ?")
            .bind(account_id)
            .execute(self.get_sqlx_pool())
            .await?;
        Ok(result.rows_affected())
    }
}
