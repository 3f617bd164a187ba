use std::fmt;
use thiserror::Error;
use tracing::error;

use crate::auth::password::PasswordError;
use crate::models::UniqueField;
use crate::services::notifier::DispatchError;
use crate::storage::StorageError;
use crate::validation::ValidationResult;

/// Infrastructure failure underneath an operation. Never shown to callers.
#[derive(Debug, Error)]
pub enum ServiceFault {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Token signing failed: {0}")]
    Signing(String),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<jsonwebtoken::errors::Error> for ServiceFault {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        ServiceFault::Signing(err.to_string())
    }
}

// Lets `?` lift infrastructure errors straight into an operation's error type
macro_rules! lift_faults {
    ($($target:ident),* $(,)?) => {
        $(
            impl From<ServiceFault> for $target {
                fn from(err: ServiceFault) -> Self {
                    $target::Fault(err)
                }
            }

            impl From<StorageError> for $target {
                fn from(err: StorageError) -> Self {
                    $target::Fault(ServiceFault::Storage(err))
                }
            }

            impl From<PasswordError> for $target {
                fn from(err: PasswordError) -> Self {
                    $target::Fault(ServiceFault::Password(err))
                }
            }

            impl From<jsonwebtoken::errors::Error> for $target {
                fn from(err: jsonwebtoken::errors::Error) -> Self {
                    $target::Fault(ServiceFault::from(err))
                }
            }
        )*
    };
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Validation failed")]
    Validation(ValidationResult),

    #[error("Username already exists")]
    DuplicateUsername,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error(transparent)]
    Fault(ServiceFault),
}

#[derive(Debug, Error)]
pub enum LoginError {
    #[error("Wrong username or password")]
    BadCredentials,

    #[error("User is not active")]
    UserIsNotActive,

    #[error(transparent)]
    Fault(ServiceFault),
}

/// Why an activation token was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationFailure {
    Expired,
    Invalid,
    /// Signed and current, but the subject is missing or unusable
    Malformed,
}

impl fmt::Display for ActivationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActivationFailure::Expired => "Expired",
            ActivationFailure::Invalid => "Invalid token",
            ActivationFailure::Malformed => "Bad token",
        })
    }
}

#[derive(Debug, Error)]
pub enum ActivationError {
    #[error("User activation failed: {0}")]
    UserActivationFailed(ActivationFailure),

    #[error(transparent)]
    Fault(ServiceFault),
}

#[derive(Debug, Error)]
pub enum PasswordResetRequestError {
    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Fault(ServiceFault),
}

#[derive(Debug, Error)]
pub enum PasswordResetError {
    #[error("Bad credentials")]
    BadCredentials,

    #[error("Validation failed")]
    Validation(ValidationResult),

    #[error(transparent)]
    Fault(ServiceFault),
}

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User not found")]
    UserNotFound,

    #[error("Access to another account is forbidden")]
    Forbidden,

    #[error(transparent)]
    Fault(ServiceFault),
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Entity not found")]
    EntityNotFound,

    #[error("Validation failed")]
    Validation(ValidationResult),

    #[error(transparent)]
    Fault(ServiceFault),
}

#[derive(Debug, Error)]
pub enum TimeEntryError {
    #[error("Entity not found")]
    EntityNotFound,

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error(transparent)]
    Fault(ServiceFault),
}

/// Ids a bulk delete could not remove (missing or out of scope)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Entities {ids:?} can not be deleted")]
pub struct DeletionError {
    pub ids: Vec<i64>,
}

#[derive(Debug, Error)]
pub enum DeleteError {
    #[error(transparent)]
    Deletion(#[from] DeletionError),

    #[error(transparent)]
    Fault(ServiceFault),
}

lift_faults!(
    RegistrationError,
    LoginError,
    ActivationError,
    PasswordResetRequestError,
    PasswordResetError,
    AccountError,
    TaskError,
    TimeEntryError,
    DeleteError,
);

/// Boundary error: what a caller is allowed to see
#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("Validation failed")]
    Validation(ValidationResult),

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Wrong username, email or password")]
    BadCredentials,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found")]
    NotFound,

    #[error("{field} already exists")]
    Conflict { field: UniqueField },

    #[error("{0}")]
    DomainInvariant(String),

    #[error("Entities {ids:?} can not be deleted")]
    PartialFailure { ids: Vec<i64> },

    #[error("Configuration error: {0}")]
    Config(String),

    /// Detail is kept for logs only
    #[error("Internal server error")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Unauthenticated | AppError::BadCredentials => "auth",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound => "not_found",
            AppError::Conflict { .. } => "conflict",
            AppError::DomainInvariant(_) => "invalid_value",
            AppError::PartialFailure { .. } => "partial_failure",
            AppError::Config(_) => "config",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn http_status_code(&self) -> u16 {
        match self {
            AppError::Validation(_) => 422,
            AppError::Unauthenticated | AppError::BadCredentials => 401,
            AppError::Forbidden(_) => 403,
            AppError::NotFound => 404,
            AppError::Conflict { .. } => 409,
            AppError::DomainInvariant(_) => 422,
            AppError::PartialFailure { .. } => 404,
            AppError::Config(_) | AppError::Internal(_) => 500,
        }
    }

    /// Response body. Carries no storage or driver detail.
    pub fn to_json(&self) -> serde_json::Value {
        let status = self.http_status_code();
        match self {
            AppError::Unauthenticated => serde_json::json!({}),
            AppError::Validation(result) => serde_json::json!({
                "status": status,
                "detail": self.to_string(),
                "fields": result.field_map(),
            }),
            AppError::Conflict { field } => serde_json::json!({
                "status": status,
                "detail": self.to_string(),
                "fields": { field.as_str(): ["Already exists"] },
            }),
            AppError::PartialFailure { ids } => serde_json::json!({
                "status": status,
                "detail": self.to_string(),
                "ids": ids,
            }),
            AppError::Config(_) | AppError::Internal(_) => serde_json::json!({
                "status": status,
                "detail": "Internal server error",
            }),
            _ => serde_json::json!({
                "status": status,
                "detail": self.to_string(),
            }),
        }
    }

    fn from_fault(fault: ServiceFault) -> Self {
        error!(category = "internal", "operation failed: {}", fault);
        AppError::Internal(fault.to_string())
    }
}

impl From<ServiceFault> for AppError {
    fn from(fault: ServiceFault) -> Self {
        AppError::from_fault(fault)
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::from_fault(ServiceFault::Storage(err))
    }
}

impl From<RegistrationError> for AppError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Validation(result) => AppError::Validation(result),
            RegistrationError::DuplicateUsername => AppError::Conflict {
                field: UniqueField::Username,
            },
            RegistrationError::DuplicateEmail => AppError::Conflict {
                field: UniqueField::Email,
            },
            RegistrationError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::BadCredentials => AppError::BadCredentials,
            LoginError::UserIsNotActive => AppError::Forbidden("User is not active".to_string()),
            LoginError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<ActivationError> for AppError {
    fn from(err: ActivationError) -> Self {
        match err {
            ActivationError::UserActivationFailed(reason) => {
                AppError::DomainInvariant(reason.to_string())
            }
            ActivationError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<PasswordResetRequestError> for AppError {
    fn from(err: PasswordResetRequestError) -> Self {
        match err {
            PasswordResetRequestError::UserNotFound => AppError::NotFound,
            PasswordResetRequestError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<PasswordResetError> for AppError {
    fn from(err: PasswordResetError) -> Self {
        match err {
            PasswordResetError::BadCredentials => AppError::BadCredentials,
            PasswordResetError::Validation(result) => AppError::Validation(result),
            PasswordResetError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound => AppError::NotFound,
            AccountError::Forbidden => {
                AppError::Forbidden("Access to another account is forbidden".to_string())
            }
            AccountError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<TaskError> for AppError {
    fn from(err: TaskError) -> Self {
        match err {
            TaskError::EntityNotFound => AppError::NotFound,
            TaskError::Validation(result) => AppError::Validation(result),
            TaskError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<TimeEntryError> for AppError {
    fn from(err: TimeEntryError) -> Self {
        match err {
            TimeEntryError::EntityNotFound => AppError::NotFound,
            TimeEntryError::InvalidValue(reason) => AppError::DomainInvariant(reason),
            TimeEntryError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

impl From<DeleteError> for AppError {
    fn from(err: DeleteError) -> Self {
        match err {
            DeleteError::Deletion(DeletionError { ids }) => AppError::PartialFailure { ids },
            DeleteError::Fault(fault) => AppError::from_fault(fault),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_detail_never_reaches_the_body() {
        let err: AppError = TaskError::from(StorageError::Database(
            "Table 'tasks' doesn't exist: SELECT t.id FROM tasks".into(),
        ))
        .into();
        assert_eq!(err.http_status_code(), 500);
        let body = err.to_json().to_string();
        assert!(!body.contains("SELECT"));
        assert!(!body.contains("tasks"));
    }

    #[test]
    fn unauthenticated_body_is_empty() {
        assert_eq!(AppError::Unauthenticated.to_json(), serde_json::json!({}));
        assert_eq!(AppError::Unauthenticated.http_status_code(), 401);
    }

    #[test]
    fn duplicates_map_to_conflict_on_the_field() {
        let err: AppError = RegistrationError::DuplicateEmail.into();
        assert_eq!(err.http_status_code(), 409);
        assert_eq!(err.to_json()["fields"]["email"][0], "Already exists");
    }

    #[test]
    fn inactive_login_is_forbidden_not_unauthenticated() {
        let err: AppError = LoginError::UserIsNotActive.into();
        assert_eq!(err.http_status_code(), 403);
        let err: AppError = LoginError::BadCredentials.into();
        assert_eq!(err.http_status_code(), 401);
    }

    #[test]
    fn activation_reasons_surface_as_invalid_value() {
        let err: AppError =
            ActivationError::UserActivationFailed(ActivationFailure::Expired).into();
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.to_json()["detail"], "Expired");
    }

    #[test]
    fn partial_failure_lists_rejected_ids() {
        let err: AppError = DeleteError::from(DeletionError { ids: vec![4, 9] }).into();
        assert_eq!(err.category(), "partial_failure");
        assert_eq!(err.to_json()["ids"], serde_json::json!([4, 9]));
    }

    #[test]
    fn not_found_body_is_constant() {
        let a: AppError = TaskError::EntityNotFound.into();
        let b: AppError = TimeEntryError::EntityNotFound.into();
        assert_eq!(a.to_json(), b.to_json());
    }
}
