use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::account::{Account, AccountId};

/// Opaque bearer token bound to one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Token value handed to the client
    pub token: String,

    /// Owning account
    pub account_id: AccountId,

    /// When the token was issued
    pub created_at: DateTime<Utc>,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    /// A token resolves only while its expiry lies after `instant`
    pub fn is_valid_after(&self, instant: DateTime<Utc>) -> bool {
        self.expires_at > instant
    }
}

/// Intended use of a purpose-scoped token.
///
/// A token minted for one action is never honored for the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenAction {
    #[serde(rename = "user_activation")]
    Activate,
    #[serde(rename = "password_reset")]
    ResetPassword,
}

/// Claim set carried by a signed purpose token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurposeClaims {
    /// Issuing environment
    pub iss: String,

    /// Account id, present on activation tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Account email, present on password reset tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Expiry as unix seconds
    pub exp: i64,

    pub action: TokenAction,
}

/// Authenticated caller, resolved from a live session token
#[derive(Debug, Clone)]
pub struct Identity {
    pub account: Account,
    pub token: String,
}

impl Identity {
    pub fn new(account: Account, token: impl Into<String>) -> Self {
        Self {
            account,
            token: token.into(),
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account.id
    }
}
