use argon2::password_hash::{rand_core::OsRng, PasswordHash, SaltString};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::domain::error::DomainError;

/// Hash a plain-text password into a PHC string (Argon2id, default params).
pub fn hash(password: &str) -> Result<String, DomainError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| DomainError::credentials(format!("failed to hash password: {e}")))
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unusable.
pub fn verify(password: &str, stored: &str) -> Result<bool, DomainError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| DomainError::credentials(format!("could not parse password hash: {e}")))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DomainError::credentials(format!(
            "failed to verify password: {e}"
        ))),
    }
}
