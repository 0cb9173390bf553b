//! Auth configuration and process-wide auth state.

use std::time::Duration;

use super::throttle::HeartbeatThrottle;
use super::token::TokenSigner;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 12 * 60 * 60;
const DEFAULT_TWO_FACTOR_TTL_SECONDS: i64 = 10 * 60;
const DEFAULT_IMPERSONATION_TTL_SECONDS: i64 = 60 * 60;
const DEFAULT_HEARTBEAT_INTERVAL_SECONDS: u64 = 5 * 60;
const DEFAULT_TOTP_ISSUER: &str = "sesamo.dev";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    token_secret: String,
    frontend_base_url: String,
    session_ttl_seconds: i64,
    two_factor_ttl_seconds: i64,
    impersonation_ttl_seconds: i64,
    heartbeat_interval_seconds: u64,
    totp_issuer: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(token_secret: String, frontend_base_url: String) -> Self {
        Self {
            token_secret,
            frontend_base_url,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            two_factor_ttl_seconds: DEFAULT_TWO_FACTOR_TTL_SECONDS,
            impersonation_ttl_seconds: DEFAULT_IMPERSONATION_TTL_SECONDS,
            heartbeat_interval_seconds: DEFAULT_HEARTBEAT_INTERVAL_SECONDS,
            totp_issuer: DEFAULT_TOTP_ISSUER.to_string(),
        }
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_two_factor_ttl_seconds(mut self, seconds: i64) -> Self {
        self.two_factor_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_impersonation_ttl_seconds(mut self, seconds: i64) -> Self {
        self.impersonation_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_heartbeat_interval_seconds(mut self, seconds: u64) -> Self {
        self.heartbeat_interval_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_totp_issuer(mut self, issuer: String) -> Self {
        self.totp_issuer = issuer;
        self
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) fn two_factor_ttl_seconds(&self) -> i64 {
        self.two_factor_ttl_seconds
    }

    pub(super) fn impersonation_ttl_seconds(&self) -> i64 {
        self.impersonation_ttl_seconds
    }

    pub(super) fn heartbeat_interval_seconds(&self) -> u64 {
        self.heartbeat_interval_seconds
    }

    pub(super) fn totp_issuer(&self) -> &str {
        &self.totp_issuer
    }
}

/// Process-wide auth state shared across requests via an axum `Extension`.
///
/// Owns the token signer and the heartbeat throttle so neither lives as a
/// bare global; the lifecycle is tied to the server process.
pub struct AuthState {
    config: AuthConfig,
    signer: TokenSigner,
    heartbeat: HeartbeatThrottle,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let signer = TokenSigner::new(&config.token_secret);
        let heartbeat =
            HeartbeatThrottle::new(Duration::from_secs(config.heartbeat_interval_seconds));
        Self {
            config,
            signer,
            heartbeat,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    pub(super) fn heartbeat(&self) -> &HeartbeatThrottle {
        &self.heartbeat
    }
}
