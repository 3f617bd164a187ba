use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::constants::{
    DEFAULT_HASH_ITERATIONS, DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_PARALLELISM,
};

const SALT_BYTES: usize = 16;

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for Argon2Params {
    fn default() -> Self {
        Self {
            memory_kib: DEFAULT_HASH_MEMORY_KIB,
            iterations: DEFAULT_HASH_ITERATIONS,
            parallelism: DEFAULT_HASH_PARALLELISM,
        }
    }
}

impl Argon2Params {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
        }
    }

    /// Smallest cost argon2 accepts. For tests only.
    pub fn minimal() -> Self {
        Self::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST)
    }
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Invalid hashing parameters: {0}")]
    Params(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Hashing task failed: {0}")]
    Join(String),
}

/// Slow salted password hashing with self-describing PHC output.
///
/// Verification reads the parameters back from the stored hash, so raising
/// the cost only affects newly written hashes.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    params: Argon2Params,
}

impl CredentialStore {
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    fn hasher(&self) -> Result<Argon2<'static>, PasswordError> {
        let params = Params::new(
            self.params.memory_kib,
            self.params.iterations,
            self.params.parallelism,
            None,
        )
        .map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    /// Hash `plaintext` with a fresh random salt
    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let mut salt_bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut salt_bytes);
        let salt =
            SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordError::Hash(e.to_string()))?;

        let hash = self
            .hasher()?
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordError::Hash(e.to_string()))?;
        Ok(hash.to_string())
    }

    /// Constant-time check of `plaintext` against a stored hash.
    /// A malformed stored hash never verifies.
    pub fn verify(&self, plaintext: &str, stored_hash: &str) -> bool {
        match PasswordHash::new(stored_hash) {
            Ok(parsed) => Argon2::default()
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }

    /// [`hash`](Self::hash) on the blocking pool
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, PasswordError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.hash(&plaintext))
            .await
            .map_err(|e| PasswordError::Join(e.to_string()))?
    }

    /// [`verify`](Self::verify) on the blocking pool
    pub async fn verify_blocking(&self, plaintext: String, stored_hash: String) -> bool {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.verify(&plaintext, &stored_hash))
            .await
            .unwrap_or(false)
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new(Argon2Params::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> CredentialStore {
        CredentialStore::new(Argon2Params::minimal())
    }

    #[test]
    fn hash_then_verify() {
        let store = store();
        let hash = store.hash("correct horse").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(store.verify("correct horse", &hash));
        assert!(!store.verify("wrong horse", &hash));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let store = store();
        let a = store.hash("same password").unwrap();
        let b = store.hash("same password").unwrap();
        assert_ne!(a, b);
        assert!(store.verify("same password", &a));
        assert!(store.verify("same password", &b));
    }

    #[test]
    fn malformed_hash_does_not_verify() {
        assert!(!store().verify("anything", "not-a-phc-string"));
        assert!(!store().verify("anything", ""));
    }

    #[test]
    fn bad_params_are_reported() {
        let store = CredentialStore::new(Argon2Params::new(1, 0, 0));
        assert!(matches!(store.hash("password"), Err(PasswordError::Params(_))));
    }

    #[tokio::test]
    async fn blocking_variants_agree() {
        let store = store();
        let hash = store.hash_blocking("pass-phrase".into()).await.unwrap();
        assert!(store.verify_blocking("pass-phrase".into(), hash.clone()).await);
        assert!(!store.verify_blocking("other".into(), hash).await);
    }
}
