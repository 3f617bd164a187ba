// Common test helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use std::sync::{Arc, Mutex};

use taskafarian::auth::Argon2Params;
use taskafarian::config::settings::{AuthConfig, Config};
use taskafarian::models::{Account, Identity, PurposeClaims, Registration};
use taskafarian::services::{DispatchError, TokenDispatcher};
use taskafarian::storage::memory::MemoryStorage;
use taskafarian::AppState;

pub const PASSWORD: &str = "password1";
pub const SECRET_KEY: &str = "integration-test-secret";
pub const ENVIRONMENT: &str = "test";

/// Keeps every token it is asked to deliver
#[derive(Default)]
pub struct RecordingDispatcher {
    pub activations: Mutex<Vec<(i64, String)>>,
    pub resets: Mutex<Vec<(String, String)>>,
}

impl RecordingDispatcher {
    pub fn last_activation(&self) -> Option<String> {
        self.activations.lock().unwrap().last().map(|(_, t)| t.clone())
    }

    pub fn last_reset(&self) -> Option<String> {
        self.resets.lock().unwrap().last().map(|(_, t)| t.clone())
    }
}

#[async_trait]
impl TokenDispatcher for RecordingDispatcher {
    async fn send_activation(&self, account: &Account, token: &str) -> Result<(), DispatchError> {
        self.activations
            .lock()
            .unwrap()
            .push((account.id, token.to_string()));
        Ok(())
    }

    async fn send_password_reset(&self, email: &str, token: &str) -> Result<(), DispatchError> {
        self.resets
            .lock()
            .unwrap()
            .push((email.to_string(), token.to_string()));
        Ok(())
    }
}

pub fn test_config() -> Config {
    Config {
        auth: AuthConfig {
            secret_key: SECRET_KEY.to_string(),
            environment: ENVIRONMENT.to_string(),
            password_hash: Argon2Params::minimal(),
            ..Default::default()
        },
        ..Default::default()
    }
}

pub fn app_with_memory() -> (AppState, Arc<RecordingDispatcher>) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let state = AppState::new(
        test_config(),
        Arc::new(MemoryStorage::new()),
        dispatcher.clone(),
    );
    (state, dispatcher)
}

pub fn registration(username: &str) -> Registration {
    Registration {
        username: username.to_string(),
        email: format!("{}@example.com", username.to_lowercase()),
        password: PASSWORD.to_string(),
        ..Default::default()
    }
}

/// Register an already active account and log it in
pub async fn signed_in(state: &AppState, username: &str) -> Identity {
    state
        .auth
        .register_with_activation(registration(username), false)
        .await
        .expect("register");
    let session = state.auth.login(username, PASSWORD).await.expect("login");
    state
        .sessions
        .resolve(&session.token)
        .await
        .expect("resolve")
        .expect("live session")
}

/// Sign arbitrary purpose claims with the test key, bypassing the issuer
pub fn sign_purpose_token(claims: &PurposeClaims) -> String {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(SECRET_KEY.as_bytes()),
    )
    .unwrap()
}
