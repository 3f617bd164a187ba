use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::auth::token::mask_token;
use crate::models::Account;

#[derive(Debug, Error)]
#[error("Token dispatch failed: {0}")]
pub struct DispatchError(pub String);

/// Out-of-band delivery of activation and password reset tokens
#[async_trait]
pub trait TokenDispatcher: Send + Sync {
    async fn send_activation(&self, account: &Account, token: &str) -> Result<(), DispatchError>;

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), DispatchError>;
}

/// Records dispatches as log events. Delivery is left to whatever consumes the logs.
#[derive(Debug, Default, Clone)]
pub struct LoggingDispatcher;

#[async_trait]
impl TokenDispatcher for LoggingDispatcher {
    async fn send_activation(&self, account: &Account, token: &str) -> Result<(), DispatchError> {
        info!(
            account_id = account.id,
            email = %account.email,
            token = %mask_token(token),
            "activation token issued"
        );
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), DispatchError> {
        info!(email = %email, token = %mask_token(token), "password reset token issued");
        Ok(())
    }
}
