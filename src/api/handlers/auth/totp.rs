//! TOTP secrets and code verification (SHA-1, 6 digits, 30 s step, ±1 step).

use anyhow::{anyhow, Result};
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const SKEW: u8 = 1;
const STEP_SECONDS: u64 = 30;

/// Generate a fresh base32-encoded shared secret.
pub(super) fn generate_secret() -> String {
    Secret::generate_secret().to_encoded().to_string()
}

fn build(secret_base32: &str, issuer: &str, account: &str) -> Result<TOTP> {
    let secret = Secret::Encoded(secret_base32.to_string())
        .to_bytes()
        .map_err(|err| anyhow!("invalid TOTP secret: {err:?}"))?;
    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW,
        STEP_SECONDS,
        secret,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|err| anyhow!("failed to build TOTP: {err}"))
}

/// Build the otpauth provisioning URL for authenticator apps.
pub(super) fn provisioning_url(secret_base32: &str, issuer: &str, account: &str) -> Result<String> {
    Ok(build(secret_base32, issuer, account)?.get_url())
}

/// Check a 6-digit code against the current time, tolerating ±1 step of
/// clock drift. Any secret or clock error counts as an invalid code.
pub(super) fn verify_code(secret_base32: &str, code: &str) -> bool {
    let Ok(totp) = build(secret_base32, "sesamo", "sesamo") else {
        return false;
    };
    totp.check_current(code).unwrap_or(false)
}

/// Check a code at an explicit unix timestamp; used by tests to pin the
/// drift window without sleeping.
#[cfg(test)]
pub(super) fn verify_code_at(secret_base32: &str, code: &str, unix_seconds: u64) -> bool {
    let Ok(totp) = build(secret_base32, "sesamo", "sesamo") else {
        return false;
    };
    totp.check(code, unix_seconds)
}
