//! Password hashing and verification
//!
//! Uses bcrypt for secure password hashing. The salt and cost travel inside
//! the stored hash; comparison is constant time.

use crate::error::AppError;
use bcrypt::{hash, verify};
use tracing::warn;

/// Hash a password using bcrypt
pub fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

/// Verify a presented password against a stored hash.
///
/// A stored value that is not a bcrypt hash never matches.
pub fn verify_password(stored_hash: &str, presented: &str) -> bool {
    match verify(presented, stored_hash) {
        Ok(matched) => matched,
        Err(e) => {
            warn!(error = %e, "Stored credential is not a valid bcrypt hash");
            false
        }
    }
}
