use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;

use crate::config::settings::AuthConfig;
use crate::models::{AccountId, PurposeClaims, TokenAction};

/// Rejected purpose token.
///
/// Displays the same for every cause. Only [`is_expired`](Self::is_expired)
/// tells an expired token apart, and only for a token that was otherwise
/// valid for the requested action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid token")]
pub struct InvalidToken {
    expired: bool,
}

impl InvalidToken {
    fn rejected() -> Self {
        Self { expired: false }
    }

    fn expired() -> Self {
        Self { expired: true }
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

/// Signs and verifies short-lived HS256 tokens bound to one action
#[derive(Clone)]
pub struct PurposeTokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
}

impl PurposeTokenService {
    pub fn new(secret: &[u8], issuer: impl Into<String>) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.secret_key.as_bytes(), config.environment.clone())
    }

    pub fn issue_activation(
        &self,
        account_id: AccountId,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(PurposeClaims {
            iss: self.issuer.clone(),
            sub: Some(account_id.to_string()),
            email: None,
            exp: (Utc::now() + ttl).timestamp(),
            action: TokenAction::Activate,
        })
    }

    pub fn issue_password_reset(
        &self,
        email: &str,
        ttl: Duration,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue(PurposeClaims {
            iss: self.issuer.clone(),
            sub: None,
            email: Some(email.to_string()),
            exp: (Utc::now() + ttl).timestamp(),
            action: TokenAction::ResetPassword,
        })
    }

    fn issue(&self, claims: PurposeClaims) -> Result<String, jsonwebtoken::errors::Error> {
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Check signature, issuer and action, then expiry.
    pub fn verify(&self, token: &str, expected: TokenAction) -> Result<PurposeClaims, InvalidToken> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // expiry is checked below, after the action
        validation.validate_exp = false;
        validation.leeway = 0;

        let claims = decode::<PurposeClaims>(token, &self.decoding, &validation)
            .map_err(|e| {
                debug!("purpose token rejected: {}", e);
                InvalidToken::rejected()
            })?
            .claims;

        if claims.action != expected {
            debug!("purpose token used for {:?}, minted for {:?}", expected, claims.action);
            return Err(InvalidToken::rejected());
        }
        if claims.exp <= Utc::now().timestamp() {
            return Err(InvalidToken::expired());
        }
        Ok(claims)
    }
}
