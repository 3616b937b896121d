//! Password hashing and verification using Argon2id

use argon2::{
    password_hash::{
        rand_core::OsRng, Error as PhcError, PasswordHash, PasswordHasher as _, PasswordVerifier,
        SaltString,
    },
    Algorithm, Argon2, Params, Version,
};

use crate::config::SecurityConfig;

#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    #[error("invalid work factor: {0}")]
    InvalidParams(String),

    #[error("malformed password hash: {0}")]
    MalformedHash(String),

    #[error("hashing failed: {0}")]
    Failed(String),
}

/// Argon2id hasher with a fixed work factor.
/// Each hash embeds its own random salt and parameters (PHC string format).
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, HashingError> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| HashingError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    pub fn from_config(config: &SecurityConfig) -> Result<Self, HashingError> {
        Self::new(
            config.hash_memory_kib,
            config.hash_iterations,
            config.hash_parallelism,
        )
    }

    pub fn hash(&self, password: &str) -> Result<String, HashingError> {
        let salt = SaltString::generate(&mut OsRng);

        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| HashingError::Failed(e.to_string()))?
            .to_string();

        Ok(hash)
    }

    /// `Ok(false)` on mismatch, `Err` only when the stored hash cannot be used at all
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, HashingError> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| HashingError::MalformedHash(e.to_string()))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PhcError::Password) => Ok(false),
            Err(e) => Err(HashingError::MalformedHash(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(1024, 1, 1).unwrap()
    }

    #[test]
    fn test_hash_and_verify() {
        let hasher = fast_hasher();
        let hash = hasher.hash("longenough1").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hasher.verify("longenough1", &hash).unwrap());
        assert!(!hasher.verify("longenough2", &hash).unwrap());
    }

    #[test]
    fn test_invalid_params_rejected() {
        assert!(matches!(
            PasswordHasher::new(1024, 0, 1),
            Err(HashingError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_malformed_hash_is_an_error() {
        let err = fast_hasher().verify("anything", "not-a-valid-hash").unwrap_err();
        assert!(matches!(err, HashingError::MalformedHash(_)));
    }
}
