//! Salted one-way password hashing backed by Argon2id.

use argon2::password_hash::{PasswordHash, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher as _, Version};
use rand::rngs::OsRng;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::errors::CampusError;

/// Failures surfaced by [`PasswordHasher`].
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
    #[error("stored password hash is malformed")]
    MalformedHash,
}

impl From<PasswordHashError> for CampusError {
    fn from(err: PasswordHashError) -> Self {
        CampusError::internal(err.to_string())
    }
}

/// Argon2id hasher with tunable cost. The salt and parameters are embedded in
/// the PHC-formatted output, so verification needs nothing but the stored string.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> Result<Self, PasswordHashError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|err| PasswordHashError::HashingFailed(err.to_string()))?;
        Ok(Self { argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params) })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, PasswordHashError> {
        Self::new(config.hash_memory_kib, config.hash_iterations, config.hash_parallelism)
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, PasswordHashError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|err| PasswordHashError::HashingFailed(err.to_string()))
    }

    /// Returns `Ok(false)` on mismatch; only an unparseable hash is an error.
    pub fn verify(&self, plaintext: &str, hash: &str) -> Result<bool, PasswordHashError> {
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordHashError::MalformedHash)?;
        match self.argon2.verify_password(plaintext.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(_) => Err(PasswordHashError::MalformedHash),
        }
    }

    /// Hash on the blocking pool so request workers are not stalled.
    pub async fn hash_blocking(&self, plaintext: String) -> Result<String, PasswordHashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&plaintext))
            .await
            .map_err(|err| PasswordHashError::HashingFailed(err.to_string()))?
    }

    pub async fn verify_blocking(
        &self,
        plaintext: String,
        hash: String,
    ) -> Result<bool, PasswordHashError> {
        let hasher = self.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&plaintext, &hash))
            .await
            .map_err(|err| PasswordHashError::HashingFailed(err.to_string()))?
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> PasswordHasher {
    PasswordHasher::new(8, 1, 1).expect("valid test parameters")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash("Passw0rd!").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("Passw0rd!", &hash).unwrap());
        assert!(!hasher.verify("passw0rd!", &hash).unwrap());
    }

    #[test]
    fn same_password_gets_distinct_salts() {
        let hasher = test_hasher();
        let first = hasher.hash("Passw0rd!").unwrap();
        let second = hasher.hash("Passw0rd!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_hash_is_an_error() {
        let hasher = test_hasher();
        assert!(matches!(
            hasher.verify("Passw0rd!", "not-a-phc-string"),
            Err(PasswordHashError::MalformedHash)
        ));
    }

    #[test]
    fn hash_from_other_cost_still_verifies() {
        let strong = PasswordHasher::new(64, 2, 1).unwrap();
        let hash = strong.hash("Passw0rd!").unwrap();
        assert!(test_hasher().verify("Passw0rd!", &hash).unwrap());
    }

    #[test]
    fn invalid_params_rejected() {
        assert!(PasswordHasher::new(8, 0, 1).is_err());
    }

    #[tokio::test]
    async fn blocking_variants_match() {
        let hasher = test_hasher();
        let hash = hasher.hash_blocking("Passw0rd!".into()).await.unwrap();
        assert!(hasher.verify_blocking("Passw0rd!".into(), hash).await.unwrap());
    }
}
