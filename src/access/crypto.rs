//! Credential verification: Argon2id with a fresh salt per hash.
//!
//! The two functions below are the whole surface: plaintext and hashes are
//! never logged and never leave this module in any other form.

use anyhow::{Result, anyhow};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Hash a plaintext password into a PHC string.
///
/// Every call salts freshly, so hashing the same input twice yields
/// different strings while both verify.
pub fn hash_password(plaintext: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Verify a plaintext password against a stored PHC string.
///
/// A malformed stored hash verifies as `false` rather than erroring; the
/// caller cannot distinguish it from a wrong password.
#[must_use]
pub fn verify_password(stored_hash: &str, plaintext: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(stored_hash) {
        Argon2::default()
            .verify_password(plaintext.as_bytes(), &parsed)
            .is_ok()
    } else {
        false
    }
}
