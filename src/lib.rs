//! # Sesamo (Authentication & Session Trust Core)
//!
//! `sesamo` is the authentication core of a multi-tenant SaaS product. It
//! verifies credentials, enforces TOTP two-factor authentication as a second
//! phase, issues signed bearer tokens, and tracks per-device sessions with
//! logical revocation.
//!
//! ## Tokens
//!
//! Three token kinds are minted, all HS256 JWTs sharing one secret:
//!
//! - **Temporary 2FA token**: issued after a correct password when 2FA is
//!   enabled; accepted only by the 2FA verification endpoint.
//! - **Full session token**: carries a `sessionId` claim and is always paired
//!   with a session row; rejected once that session is revoked or the user's
//!   `token_invalid_before` watermark passes its `iat`.
//! - **Impersonation token**: admin-issued, tied to no session, and
//!   hard-restricted to safe HTTP methods on every route.
//!
//! ## Authorization
//!
//! Every authenticated request flows through a fixed pipeline: token
//! verification, session/invalidation checks, then the capability guard.
//! Admin routes declare a required capability (`read`, `support_action`,
//! `ops_action`) at registration; the `management_ceo` role is additionally
//! limited to safe methods on all admin routes.

pub mod api;
pub mod cli;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
