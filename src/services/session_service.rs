use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::auth::token::{generate_session_token, mask_token};
use crate::config::settings::AuthConfig;
use crate::models::{Account, AccountId, Identity, SessionToken};
use crate::storage::{Storage, StorageError};

/// Opaque bearer sessions: issue, resolve and revoke
#[derive(Clone)]
pub struct SessionService {
    storage: Arc<dyn Storage>,
    ttl: Duration,
    expiry_skew: Duration,
}

impl SessionService {
    pub fn new(storage: Arc<dyn Storage>, ttl: Duration, expiry_skew: Duration) -> Self {
        Self {
            storage,
            ttl,
            expiry_skew,
        }
    }

    pub fn from_config(storage: Arc<dyn Storage>, config: &AuthConfig) -> Self {
        Self::new(
            storage,
            Duration::seconds(config.session_ttl_secs),
            Duration::seconds(config.session_expiry_skew_secs),
        )
    }

    /// Mint and persist a fresh token for `account`
    #[instrument(skip(self, account), fields(account_id = account.id))]
    pub async fn issue(&self, account: &Account) -> Result<SessionToken, StorageError> {
        let now = Utc::now();
        let session = SessionToken {
            token: generate_session_token(),
            account_id: account.id,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.storage.create_session_token(&session).await?;
        debug!("session {} issued", mask_token(&session.token));
        Ok(session)
    }

    /// Identity behind `token`, if it is live and its owner is active.
    ///
    /// A token within the expiry skew of its deadline no longer resolves.
    pub async fn resolve(&self, token: &str) -> Result<Option<Identity>, StorageError> {
        if token.is_empty() {
            return Ok(None);
        }
        let valid_after = Utc::now() + self.expiry_skew;
        let account = self.storage.resolve_session_token(token, valid_after).await?;
        Ok(account.map(|account| Identity::new(account, token)))
    }

    /// Idempotent: revoking an unknown token succeeds
    pub async fn revoke(&self, token: &str) -> Result<(), StorageError> {
        self.storage.delete_session_token(token).await?;
        debug!("session {} revoked", mask_token(token));
        Ok(())
    }

    pub async fn revoke_all_for_account(&self, account_id: AccountId) -> Result<u64, StorageError> {
        self.storage.delete_session_tokens_for_account(account_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewAccount;
    use crate::storage::MemoryStorage;

    async fn setup(ttl: Duration, skew: Duration) -> (SessionService, Account) {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let account = storage
            .create_account(&NewAccount {
                username: "luna".into(),
                email: "luna@example.com".into(),
                password_hash: "$argon2id$stub".into(),
                first_name: None,
                last_name: None,
                is_active: true,
            })
            .await
            .unwrap();
        (SessionService::new(storage, ttl, skew), account)
    }

    #[tokio::test]
    async fn issued_token_resolves_to_owner() {
        let (sessions, account) = setup(Duration::hours(1), Duration::minutes(1)).await;
        let session = sessions.issue(&account).await.unwrap();
        let identity = sessions.resolve(&session.token).await.unwrap().unwrap();
        assert_eq!(identity.account_id(), account.id);
        assert_eq!(identity.token, session.token);
    }

    #[tokio::test]
    async fn token_inside_skew_window_does_not_resolve() {
        let (sessions, account) = setup(Duration::seconds(30), Duration::seconds(60)).await;
        let session = sessions.issue(&account).await.unwrap();
        assert!(sessions.resolve(&session.token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoke_is_idempotent() {
        let (sessions, account) = setup(Duration::hours(1), Duration::minutes(1)).await;
        let session = sessions.issue(&account).await.unwrap();
        sessions.revoke(&session.token).await.unwrap();
        sessions.revoke(&session.token).await.unwrap();
        assert!(sessions.resolve(&session.token).await.unwrap().is_none());
        assert!(sessions.resolve("").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn revoke_all_only_touches_one_account() {
        let (sessions, account) = setup(Duration::hours(1), Duration::minutes(1)).await;
        sessions.issue(&account).await.unwrap();
        sessions.issue(&account).await.unwrap();
        assert_eq!(sessions.revoke_all_for_account(account.id).await.unwrap(), 2);
        assert_eq!(sessions.revoke_all_for_account(account.id).await.unwrap(), 0);
    }
}
