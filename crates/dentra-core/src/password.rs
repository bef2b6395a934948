//! Password hashing and verification.
//!
//! Passwords are hashed with bcrypt at [`DEFAULT_COST`]. Each hash embeds its
//! own random salt, so hashing the same password twice yields different
//! strings. Plaintext never leaves these functions and is never logged.

use std::sync::LazyLock;

use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::AppError;

static DUMMY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash("dentra-dummy-password", DEFAULT_COST).ok());

/// Hashes a password for storage.
///
/// # Errors
///
/// Returns an internal error if bcrypt fails; callers treat this as fatal to
/// the request.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal_error(format!("Failed to hash password: {}", e)))
}

/// Compares a plaintext password against a stored bcrypt hash.
///
/// Returns `Ok(false)` on mismatch and an error only when the stored hash is
/// malformed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::internal_error(format!("Failed to verify password: {}", e)))
}

/// Runs a full bcrypt verification against a fixed hash and discards the
/// outcome.
///
/// Login calls this when no account matches the email, so that path costs
/// the same as a wrong password for an existing account.
pub fn verify_dummy_password(password: &str) {
    if let Some(dummy) = DUMMY_HASH.as_deref() {
        let _ = verify(password, dummy);
    }
}
