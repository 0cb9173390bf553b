//! Two-factor endpoints: verification (second login phase), enrollment,
//! and confirmation.

use axum::{
    extract::Extension,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::error::{AuthError, MSG_INVALID_CODE};
use super::guard::{authorize, RouteAccess};
use super::login::issue_full_session;
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::{enable_two_factor, lookup_user_by_id, store_two_factor_secret};
use super::totp;
use super::types::{
    AccessTokenResponse, TwoFactorConfirmRequest, TwoFactorEnrollResponse, TwoFactorVerifyRequest,
};

#[utoipa::path(
    post,
    path = "/v1/auth/2fa/verify",
    request_body = TwoFactorVerifyRequest,
    responses(
        (status = 200, description = "Full session token", body = AccessTokenResponse),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "auth"
)]
pub async fn verify(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TwoFactorVerifyRequest>>,
) -> impl IntoResponse {
    let request: TwoFactorVerifyRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match verify_response(&headers, &pool, &auth_state, &request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Unauthenticated second phase: consumes the temp token directly, bypassing
/// the bearer validator. Every failure collapses into one generic message so
/// wrong codes and expired tokens are indistinguishable.
async fn verify_response(
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &AuthState,
    request: &TwoFactorVerifyRequest,
) -> Result<Response, AuthError> {
    let claims = auth_state
        .signer()
        .decode(&request.temp_token)
        .map_err(|_| AuthError::BadRequest(MSG_INVALID_CODE))?;

    // Only a temp token is accepted here; full and impersonation tokens are not.
    if claims.two_factor != Some(true) {
        return Err(AuthError::BadRequest(MSG_INVALID_CODE));
    }

    let user = lookup_user_by_id(pool, claims.sub)
        .await?
        .ok_or(AuthError::BadRequest(MSG_INVALID_CODE))?;

    let secret = match (&user.two_factor_secret, user.two_factor_enabled) {
        (Some(secret), true) => secret.clone(),
        _ => return Err(AuthError::BadRequest(MSG_INVALID_CODE)),
    };

    if !totp::verify_code(&secret, request.code.trim()) {
        return Err(AuthError::BadRequest(MSG_INVALID_CODE));
    }

    let response = issue_full_session(headers, pool, auth_state, &user).await?;
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/auth/2fa/enroll",
    responses(
        (status = 200, description = "New secret and provisioning URL", body = TwoFactorEnrollResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn enroll(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match enroll_response(&method, &headers, &pool, &auth_state).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn enroll_response(
    method: &Method,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
) -> Result<Response, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    authorize(&principal, method, RouteAccess::Authenticated)?;

    // 2FA stays disabled until the first code is confirmed; re-enrollment
    // replaces any previous secret.
    let secret = totp::generate_secret();
    let otpauth_url = totp::provisioning_url(
        &secret,
        auth_state.config().totp_issuer(),
        &principal.email,
    )?;
    store_two_factor_secret(pool, principal.user_id, &secret).await?;

    let response = TwoFactorEnrollResponse {
        secret,
        otpauth_url,
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/auth/2fa/confirm",
    request_body = TwoFactorConfirmRequest,
    responses(
        (status = 204, description = "Two-factor enabled"),
        (status = 400, description = "Invalid or expired code"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn confirm(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<TwoFactorConfirmRequest>>,
) -> impl IntoResponse {
    let request: TwoFactorConfirmRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match confirm_response(&method, &headers, &pool, &auth_state, &request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn confirm_response(
    method: &Method,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
    request: &TwoFactorConfirmRequest,
) -> Result<Response, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    authorize(&principal, method, RouteAccess::Authenticated)?;

    let user = lookup_user_by_id(pool, principal.user_id)
        .await?
        .ok_or(AuthError::BadRequest(MSG_INVALID_CODE))?;
    let secret = user
        .two_factor_secret
        .ok_or(AuthError::BadRequest(MSG_INVALID_CODE))?;

    if !totp::verify_code(&secret, request.code.trim()) {
        return Err(AuthError::BadRequest(MSG_INVALID_CODE));
    }

    enable_two_factor(pool, principal.user_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
