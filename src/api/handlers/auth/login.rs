//! Login endpoint: first authentication phase.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use anyhow::anyhow;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::debug;

use super::error::{AuthError, MSG_INVALID_CREDENTIALS};
use super::password::verify_password;
use super::state::AuthState;
use super::storage::{create_session, lookup_user_by_email, touch_last_login, UserRecord};
use super::types::{
    AccessTokenResponse, LoginRequest, TwoFactorPendingResponse, UserPreview, UserResponse,
};
use super::utils::{extract_client_ip, extract_user_agent, normalize_email};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Full session token, or a 2FA challenge when enabled", body = AccessTokenResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> impl IntoResponse {
    let request: LoginRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match login_response(&headers, &pool, &auth_state, &request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

pub(super) async fn login_response(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    request: &LoginRequest,
) -> Result<Response, AuthError> {
    let email = normalize_email(&request.email);
    // Unknown email and wrong password collapse into one generic failure.
    let user = lookup_user_by_email(pool, &email)
        .await?
        .ok_or(AuthError::Unauthorized(MSG_INVALID_CREDENTIALS))?;

    if !verify_password(&request.password, &user.password_hash)? {
        return Err(AuthError::Unauthorized(MSG_INVALID_CREDENTIALS));
    }

    // Second phase required: hand out only a temp token, never an access token.
    if user.two_factor_enabled {
        // An enabled flag without a stored secret is a data defect; fail
        // closed rather than downgrade to a full login.
        if user.two_factor_secret.is_none() {
            return Err(AuthError::Internal(anyhow!(
                "two-factor enabled without a stored secret for user {}",
                user.id
            )));
        }
        let temp_token = auth_state
            .signer()
            .issue_two_factor(&user, auth_state.config().two_factor_ttl_seconds())?;
        let response = TwoFactorPendingResponse {
            requires_2fa: true,
            temp_token,
            user: UserPreview {
                id: user.id.to_string(),
                email: user.email,
            },
        };
        return Ok((StatusCode::OK, Json(response)).into_response());
    }

    let response = issue_full_session(headers, pool, auth_state, &user).await?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

/// Create a session row and mint its paired token; shared with 2FA verify.
/// A full token is never minted without a backing session.
pub(super) async fn issue_full_session(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    user: &UserRecord,
) -> Result<AccessTokenResponse, AuthError> {
    let ip = extract_client_ip(headers);
    let user_agent = extract_user_agent(headers);
    let session_id = create_session(pool, user.id, ip.as_deref(), user_agent.as_deref()).await?;

    let access_token = auth_state.signer().issue_session(
        user,
        session_id,
        auth_state.config().session_ttl_seconds(),
    )?;

    // Best-effort bookkeeping; a failed timestamp write never blocks login.
    if let Err(err) = touch_last_login(pool, user.id).await {
        debug!("Failed to update last login: {err:#}");
    }

    Ok(AccessTokenResponse {
        access_token,
        user: UserResponse::from_record(user),
    })
}
