use chrono::Duration;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::auth::{CredentialStore, PasswordError, PurposeTokenService};
use crate::config::settings::AuthConfig;
use crate::error::{
    AccountError, ActivationError, ActivationFailure, LoginError, PasswordResetError,
    PasswordResetRequestError, RegistrationError, ServiceFault,
};
use crate::models::account::normalize_username;
use crate::models::{
    Account, AccountId, AccountSummary, Identity, NewAccount, Registration, SessionToken,
    TokenAction, UniqueField,
};
use crate::services::notifier::TokenDispatcher;
use crate::services::session_service::SessionService;
use crate::storage::{Storage, StorageError};
use crate::validation::{validate_password, validate_registration, ValidationResult};

// verified against when the username is unknown, so both paths pay for a hash
const TIMING_DUMMY_PASSWORD: &str = "timing-dummy-password";

/// Identity and account lifecycle
#[derive(Clone)]
pub struct AuthService {
    storage: Arc<dyn Storage>,
    sessions: SessionService,
    purpose: PurposeTokenService,
    credentials: CredentialStore,
    dispatcher: Arc<dyn TokenDispatcher>,
    activation_ttl: Duration,
    reset_ttl: Duration,
    require_activation: bool,
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    pub fn new(
        storage: Arc<dyn Storage>,
        sessions: SessionService,
        dispatcher: Arc<dyn TokenDispatcher>,
        config: &AuthConfig,
    ) -> Self {
        Self {
            storage,
            sessions,
            purpose: PurposeTokenService::from_config(config),
            credentials: CredentialStore::new(config.password_hash),
            dispatcher,
            activation_ttl: Duration::seconds(config.activation_token_ttl_secs),
            reset_ttl: Duration::seconds(config.password_reset_token_ttl_secs),
            require_activation: config.require_activation,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Register with the configured activation policy
    pub async fn register(&self, registration: Registration) -> Result<Account, RegistrationError> {
        self.register_with_activation(registration, self.require_activation)
            .await
    }

    /// Create an account. Uniqueness is left to the store: a duplicate is
    /// reported from the insert itself, never from a lookup beforehand.
    ///
    /// With `require_activation` the account starts inactive and an
    /// activation token is handed to the dispatcher.
    #[instrument(skip(self, registration), fields(username = %registration.username))]
    pub async fn register_with_activation(
        &self,
        registration: Registration,
        require_activation: bool,
    ) -> Result<Account, RegistrationError> {
        validate_registration(&registration)
            .into_result()
            .map_err(RegistrationError::Validation)?;

        let password_hash = self
            .credentials
            .hash_blocking(registration.password)
            .await?;

        let new_account = NewAccount {
            username: normalize_username(&registration.username),
            email: registration.email.trim().to_string(),
            password_hash,
            first_name: registration.first_name,
            last_name: registration.last_name,
            is_active: !require_activation,
        };

        let account = match self.storage.create_account(&new_account).await {
            Ok(account) => account,
            Err(StorageError::Duplicate(UniqueField::Username)) => {
                return Err(RegistrationError::DuplicateUsername)
            }
            Err(StorageError::Duplicate(UniqueField::Email)) => {
                return Err(RegistrationError::DuplicateEmail)
            }
            Err(e) => return Err(e.into()),
        };
        info!("account {} registered", account.id);

        if require_activation {
            let token = self
                .purpose
                .issue_activation(account.id, self.activation_ttl)?;
            // the account is already stored; a failed dispatch does not undo it
            if let Err(e) = self.dispatcher.send_activation(&account, &token).await {
                warn!("activation token for account {} not dispatched: {}", account.id, e);
            }
        }

        Ok(account)
    }

    /// Exchange username and password for a session token.
    ///
    /// An inactive account is reported as such, before its password is checked.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<SessionToken, LoginError> {
        let username = normalize_username(username);
        let Some(account) = self.storage.get_account_by_username(&username).await? else {
            let dummy = self.dummy_hash().await?;
            self.credentials
                .verify_blocking(password.to_string(), dummy)
                .await;
            debug!("login for unknown username");
            return Err(LoginError::BadCredentials);
        };

        if !account.is_active {
            return Err(LoginError::UserIsNotActive);
        }

        let verified = self
            .credentials
            .verify_blocking(password.to_string(), account.password_hash.clone())
            .await;
        if !verified {
            debug!("wrong password for account {}", account.id);
            return Err(LoginError::BadCredentials);
        }

        let session = self.sessions.issue(&account).await?;
        info!("account {} logged in", account.id);
        Ok(session)
    }

    #[instrument(skip(self, token))]
    pub async fn activate(&self, token: &str) -> Result<(), ActivationError> {
        let claims = self
            .purpose
            .verify(token, TokenAction::Activate)
            .map_err(|e| {
                ActivationError::UserActivationFailed(if e.is_expired() {
                    ActivationFailure::Expired
                } else {
                    ActivationFailure::Invalid
                })
            })?;

        let account_id: AccountId = claims
            .sub
            .as_deref()
            .and_then(|sub| sub.parse().ok())
            .ok_or(ActivationError::UserActivationFailed(
                ActivationFailure::Malformed,
            ))?;

        self.storage.activate_account(account_id).await?;
        info!("account {} activated", account_id);
        Ok(())
    }

    #[instrument(skip(self, email))]
    pub async fn request_password_reset(&self, email: &str) -> Result<(), PasswordResetRequestError> {
        let email = email.trim();
        let Some(account) = self.storage.get_account_by_email(email).await? else {
            return Err(PasswordResetRequestError::UserNotFound);
        };

        let token = self
            .purpose
            .issue_password_reset(&account.email, self.reset_ttl)?;
        self.dispatcher
            .send_password_reset(&account.email, &token)
            .await
            .map_err(ServiceFault::from)?;
        debug!("password reset requested for account {}", account.id);
        Ok(())
    }

    /// Set a new password for the email named in a reset token.
    /// The token stays usable until it expires.
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(
        &self,
        token: &str,
        new_password: &str,
    ) -> Result<(), PasswordResetError> {
        let mut result = ValidationResult::new();
        validate_password("password", new_password, &mut result);
        result
            .into_result()
            .map_err(PasswordResetError::Validation)?;

        let claims = self
            .purpose
            .verify(token, TokenAction::ResetPassword)
            .map_err(|_| PasswordResetError::BadCredentials)?;
        let email = claims.email.ok_or(PasswordResetError::BadCredentials)?;

        let password_hash = self
            .credentials
            .hash_blocking(new_password.to_string())
            .await?;
        self.storage
            .update_password_by_email(&email, &password_hash)
            .await?;
        info!("password reset completed");
        Ok(())
    }

    pub async fn logout(&self, identity: &Identity) -> Result<(), StorageError> {
        self.sessions.revoke(&identity.token).await
    }

    /// Flag the account inactive and revoke all of its sessions in one step
    #[instrument(skip(self))]
    pub async fn deactivate_account(&self, account_id: AccountId) -> Result<u64, AccountError> {
        let revoked = self
            .storage
            .deactivate_account(account_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        info!(
            "account {} deactivated, {} sessions revoked",
            account_id, revoked
        );
        Ok(revoked)
    }

    pub fn current_account(&self, identity: &Identity) -> AccountSummary {
        identity.account.summary()
    }

    /// Only the caller's own account can be looked up
    pub async fn get_account(
        &self,
        identity: &Identity,
        account_id: AccountId,
    ) -> Result<AccountSummary, AccountError> {
        if identity.account_id() != account_id {
            return Err(AccountError::Forbidden);
        }
        let account = self
            .storage
            .get_account_by_id(account_id)
            .await?
            .ok_or(AccountError::UserNotFound)?;
        Ok(account.summary())
    }

    async fn dummy_hash(&self) -> Result<String, PasswordError> {
        self.dummy_hash
            .get_or_try_init(|| {
                self.credentials
                    .hash_blocking(TIMING_DUMMY_PASSWORD.to_string())
            })
            .await
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Argon2Params;
    use crate::services::notifier::LoggingDispatcher;
    use crate::storage::MemoryStorage;

    fn service() -> AuthService {
        let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
        let config = AuthConfig {
            secret_key: "unit-test-secret".into(),
            environment: "test".into(),
            password_hash: Argon2Params::minimal(),
            ..Default::default()
        };
        let sessions = SessionService::from_config(storage.clone(), &config);
        AuthService::new(storage, sessions, Arc::new(LoggingDispatcher), &config)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.into(),
            email: email.into(),
            password: "password1".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn username_is_stored_lower_cased() {
        let auth = service();
        let account = auth
            .register_with_activation(registration("Luna", "luna@example.com"), false)
            .await
            .unwrap();
        assert_eq!(account.username, "luna");
        assert!(auth.login("LUNA", "password1").await.is_ok());
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let auth = service();
        auth.register_with_activation(registration("luna", "luna@example.com"), false)
            .await
            .unwrap();
        assert!(matches!(
            auth.login("nobody", "password1").await,
            Err(LoginError::BadCredentials)
        ));
        assert!(matches!(
            auth.login("luna", "password2").await,
            Err(LoginError::BadCredentials)
        ));
    }

    #[tokio::test]
    async fn invalid_registration_reports_fields() {
        let auth = service();
        let err = auth
            .register(Registration {
                username: "bad name".into(),
                email: "nope".into(),
                password: "short".into(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        let RegistrationError::Validation(result) = err else {
            panic!("expected validation failure");
        };
        let fields = result.field_map();
        assert!(fields.contains_key("username"));
        assert!(fields.contains_key("email"));
        assert!(fields.contains_key("password"));
    }

    #[tokio::test]
    async fn other_accounts_are_forbidden() {
        let auth = service();
        auth.register_with_activation(registration("luna", "luna@example.com"), false)
            .await
            .unwrap();
        let session = auth.login("luna", "password1").await.unwrap();
        let identity = auth.sessions().resolve(&session.token).await.unwrap().unwrap();

        let me = auth.get_account(&identity, identity.account_id()).await.unwrap();
        assert_eq!(me, auth.current_account(&identity));
        assert!(matches!(
            auth.get_account(&identity, identity.account_id() + 1).await,
            Err(AccountError::Forbidden)
        ));
    }

    #[tokio::test]
    async fn deactivating_unknown_account_is_not_found() {
        assert!(matches!(
            service().deactivate_account(404).await,
            Err(AccountError::UserNotFound)
        ));
    }
}
