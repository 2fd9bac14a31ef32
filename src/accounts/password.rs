use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use thiserror::Error;
use tracing::error;

lazy_static! {
    /// Argon2id hash of a random throwaway secret, with the same parameters as real hashes.
    static ref DUMMY_HASH: Option<String> =
        hash_password(SaltString::generate(&mut OsRng).as_str()).ok();
}

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    /// The stored hash could not be parsed or uses unsupported parameters.
    #[error("stored credential is corrupt: {0}")]
    Corrupt(String),
}

/// Hash with Argon2id and a fresh random salt. The result is a PHC string.
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            PasswordError::Hash(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

/// Check `plain` against a stored PHC hash. A mismatch is `Ok(false)`.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        PasswordError::Corrupt(e.to_string())
    })?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => {
            error!(error = %e, "argon2 verify error");
            Err(PasswordError::Corrupt(e.to_string()))
        }
    }
}

/// Run a full verification against a placeholder hash and discard the outcome.
/// Used when no stored hash exists, so the caller still pays the Argon2 cost.
pub fn verify_against_dummy(plain: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(plain, hash);
    }
}
