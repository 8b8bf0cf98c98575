//! Password hashing and verification
//!
//! Hashes are Argon2id PHC strings with a random per-password salt. The
//! presented secret is never logged, stored or returned.

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use std::sync::OnceLock;
use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Hash a password for storage
pub fn hash_password(secret: &str) -> AuthResult<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(secret.as_bytes(), &salt)
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?
        .to_string();

    Ok(password_hash)
}

/// Verify a presented password against a stored hash.
///
/// A stored hash that cannot be parsed never verifies.
pub fn verify_password(secret: &str, stored_hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(stored_hash) {
        Ok(hash) => hash,
        Err(e) => {
            warn!("Stored password hash could not be parsed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Burn one verification against a fixed hash.
///
/// Used when the phone number is unknown so that the failure costs the same
/// as a wrong password.
pub fn verify_against_dummy(secret: &str) {
    static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

    let dummy = DUMMY_HASH.get_or_init(|| hash_password("not-a-real-password").ok());
    if let Some(hash) = dummy {
        let _ = verify_password(secret, hash);
    }
}
