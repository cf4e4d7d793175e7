use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::models::{ServiceError, ServiceResult};

/// Turns a clear-text credential into something safe to store
pub trait CredentialHasher: Send + Sync {
    fn hash(&self, credential: &str) -> ServiceResult<String>;

    /// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable
    fn verify(&self, credential: &str, hash: &str) -> ServiceResult<bool>;
}

/// Argon2id with the crate's default parameters, PHC string output
#[derive(Debug, Default, Clone)]
pub struct Argon2CredentialHasher;

impl CredentialHasher for Argon2CredentialHasher {
    fn hash(&self, credential: &str) -> ServiceResult<String> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
            .hash_password(credential.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| ServiceError::Credential {
                message: e.to_string(),
            })
    }

    fn verify(&self, credential: &str, hash: &str) -> ServiceResult<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| ServiceError::Credential {
            message: e.to_string(),
        })?;

        Ok(Argon2::default()
            .verify_password(credential.as_bytes(), &parsed)
            .is_ok())
    }
}
