//! Session listing and self-service sign-out-all.

use axum::{
    extract::Extension,
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::info;

use super::error::AuthError;
use super::guard::{authorize, RouteAccess};
use super::principal::require_auth;
use super::state::AuthState;
use super::storage::{list_sessions, sign_out_all};
use super::types::{SessionInfo, SessionsResponse, SignOutAllResponse};
use super::utils::rfc3339;

#[utoipa::path(
    get,
    path = "/v1/auth/sessions",
    responses(
        (status = 200, description = "Active sessions for the caller", body = SessionsResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn sessions(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match sessions_response(&method, &headers, &pool, &auth_state).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn sessions_response(
    method: &Method,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
) -> Result<Response, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    authorize(&principal, method, RouteAccess::Authenticated)?;
    let rows = list_sessions(pool, principal.user_id).await?;

    let response = SessionsResponse {
        sessions: rows
            .into_iter()
            .map(|row| SessionInfo {
                id: row.id.to_string(),
                ip: row.ip,
                user_agent: row.user_agent,
                created_at: rfc3339(row.created_at),
                last_seen_at: rfc3339(row.last_seen_at),
            })
            .collect(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/auth/signout-all",
    responses(
        (status = 200, description = "All sessions revoked and prior tokens invalidated", body = SignOutAllResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn signout_all(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match signout_all_response(&method, &headers, &pool, &auth_state).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn signout_all_response(
    method: &Method,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
) -> Result<Response, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    authorize(&principal, method, RouteAccess::Authenticated)?;
    let revoked = sign_out_all(pool, principal.user_id).await?;
    info!(
        user_id = %principal.user_id,
        revoked, "User signed out of all sessions"
    );
    Ok((StatusCode::OK, Json(SignOutAllResponse { revoked })).into_response())
}
