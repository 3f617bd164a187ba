use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account primary key
pub type AccountId = i64;

/// user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// unique ID
    pub id: AccountId,
    /// user name (always lower-cased)
    pub username: String,
    /// email address
    pub email: String,
    /// password hash (PHC string)
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// active status
    pub is_active: bool,
    /// account creation time
    pub created_at: DateTime<Utc>,
    /// update time
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Public projection of the account, safe to embed in other records
    pub fn summary(&self) -> AccountSummary {
        AccountSummary {
            id: self.id,
            username: self.username.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Public account fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub username: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

/// Sign-up request, password still in plaintext
#[derive(Clone, Default, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Account row to be inserted
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
}

/// Account columns guarded by a unique constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueField {
    Username,
    Email,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Username => "username",
            UniqueField::Email => "email",
        }
    }

    /// Name of the database constraint backing this field
    pub fn constraint_name(&self) -> &'static str {
        match self {
            UniqueField::Username => "uq_accounts_username",
            UniqueField::Email => "uq_accounts_email",
        }
    }

    /// Resolve the field from a constraint name or a driver message mentioning it
    pub fn from_constraint(text: &str) -> Option<Self> {
        [UniqueField::Username, UniqueField::Email]
            .into_iter()
            .find(|field| text.contains(field.constraint_name()))
    }
}

impl fmt::Display for UniqueField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Usernames are stored and compared lower-cased
pub fn normalize_username(username: &str) -> String {
    username.trim().to_lowercase()
}
