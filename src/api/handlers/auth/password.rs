//! Password hashing behind a small hash/verify seam (Argon2id, PHC strings).

use anyhow::{anyhow, Context, Result};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

/// Hash a plaintext password into a PHC string for storage.
pub(super) fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow!("failed to hash password: {err}"))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC string.
///
/// A malformed stored hash is a server-side defect, not a caller error.
pub(super) fn verify_password(password: &str, password_hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|err| anyhow!("{err}"))
        .context("invalid stored password hash")?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_match() -> Result<()> {
        let hash = hash_password("hunter2hunter2")?;
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("hunter2hunter2", &hash)?);
        Ok(())
    }

    #[test]
    fn verify_rejects_mismatch() -> Result<()> {
        let hash = hash_password("correct horse")?;
        assert!(!verify_password("battery staple", &hash)?);
        Ok(())
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }

    #[test]
    fn salts_differ_between_hashes() -> Result<()> {
        let first = hash_password("same password")?;
        let second = hash_password("same password")?;
        assert_ne!(first, second);
        Ok(())
    }
}
