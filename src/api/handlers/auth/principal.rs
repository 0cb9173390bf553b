//! Authenticated principal extraction: the request-time token validator.
//!
//! Flow Overview: verify the bearer token, reject temp 2FA tokens, resolve
//! the subject user, then run the session and invalidation checks. Tokens
//! carrying an impersonation claim skip those checks but keep the payload on
//! the principal for the guard to enforce.

use axum::http::HeaderMap;
use sqlx::PgPool;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use super::error::{
    AuthError, MSG_INVALID_TOKEN, MSG_SESSION_REVOKED, MSG_TOKEN_INVALIDATED,
    MSG_TWO_FACTOR_REQUIRED,
};
use super::roles::{AdminRole, Role};
use super::state::AuthState;
use super::storage::{lookup_user_by_id, session_is_valid, touch_session};
use super::token::ImpersonationClaims;
use super::utils::extract_bearer_token;

/// Authenticated user context derived from a verified bearer token.
#[derive(Clone, Debug)]
pub(crate) struct Principal {
    pub(crate) user_id: Uuid,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) role: Role,
    pub(crate) admin_role: Option<AdminRole>,
    pub(crate) two_factor_enabled: bool,
    pub(crate) impersonation: Option<ImpersonationClaims>,
}

/// Resolve the `Authorization` header into a principal, running every
/// validator step in order. Any failure is terminal for the request.
pub(crate) async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
) -> Result<Principal, AuthError> {
    let token =
        extract_bearer_token(headers).ok_or(AuthError::Unauthorized(MSG_INVALID_TOKEN))?;
    let claims = auth_state.signer().decode(&token)?;

    // Temp 2FA tokens are consumed only by the unauthenticated 2FA endpoint,
    // which never reaches this validator.
    if claims.two_factor == Some(true) {
        return Err(AuthError::Unauthorized(MSG_TWO_FACTOR_REQUIRED));
    }

    let user = lookup_user_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::Unauthorized(MSG_INVALID_TOKEN))?;

    if claims.impersonation.is_none() {
        if token_invalidated(claims.iat, user.token_invalid_before) {
            return Err(AuthError::Unauthorized(MSG_TOKEN_INVALIDATED));
        }

        if let Some(session_id) = claims.session_id {
            if !session_is_valid(pool, session_id).await? {
                return Err(AuthError::Unauthorized(MSG_SESSION_REVOKED));
            }
            // Fire-and-forget heartbeat; failures never touch the request.
            if auth_state.heartbeat().should_touch(session_id).await {
                let pool = pool.clone();
                tokio::spawn(async move {
                    if let Err(err) = touch_session(&pool, session_id).await {
                        debug!("Session heartbeat failed: {err:#}");
                    }
                });
            }
        }
    }

    Ok(Principal {
        user_id: user.id,
        email: user.email,
        name: user.name,
        role: user.role,
        admin_role: user.admin_role,
        two_factor_enabled: user.two_factor_enabled,
        impersonation: claims.impersonation,
    })
}

/// A token is invalidated when its `iat` (seconds) predates the user's
/// sign-out-all watermark; the comparison happens in milliseconds.
pub(super) fn token_invalidated(iat_seconds: i64, invalid_before: Option<OffsetDateTime>) -> bool {
    let Some(invalid_before) = invalid_before else {
        return false;
    };
    let watermark_millis = invalid_before.unix_timestamp_nanos() / 1_000_000;
    i128::from(iat_seconds) * 1000 < watermark_millis
}
