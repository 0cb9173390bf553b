//! Admin routes: user directory, impersonation, and per-user sign-out-all.
//!
//! Each route declares its capability at the guard call site: the directory
//! is `read`, impersonation is `support_action`, and forced sign-out is
//! `ops_action`.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use sqlx::PgPool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use super::error::AuthError;
use super::guard::{authorize, RouteAccess};
use super::principal::require_auth;
use super::roles::Capability;
use super::state::AuthState;
use super::storage::{list_users, lookup_user_by_id, sign_out_all};
use super::types::{
    ImpersonateRequest, ImpersonateResponse, SignOutAllResponse, UserDirectoryEntry, UsersResponse,
};
use super::utils::rfc3339;

#[utoipa::path(
    get,
    path = "/v1/admin/users",
    responses(
        (status = 200, description = "User directory", body = UsersResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing admin role or capability")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn users(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    match users_response(&method, &headers, &pool, &auth_state).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn users_response(
    method: &Method,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
) -> Result<Response, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    authorize(&principal, method, RouteAccess::Admin(Capability::Read))?;

    let rows = list_users(pool).await?;
    let response = UsersResponse {
        users: rows
            .into_iter()
            .map(|row| UserDirectoryEntry {
                id: row.id.to_string(),
                email: row.email,
                name: row.name,
                role: row.role,
                admin_role: row.admin_role,
                two_factor_enabled: row.two_factor_enabled,
                last_login_at: row.last_login_at.map(rfc3339),
                created_at: rfc3339(row.created_at),
            })
            .collect(),
    };
    Ok((StatusCode::OK, Json(response)).into_response())
}

#[utoipa::path(
    post,
    path = "/v1/admin/impersonate",
    request_body = ImpersonateRequest,
    responses(
        (status = 200, description = "Read-only impersonation token", body = ImpersonateResponse),
        (status = 400, description = "Unknown target user", body = String),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing admin role or capability")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn impersonate(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<ImpersonateRequest>>,
) -> impl IntoResponse {
    let request: ImpersonateRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    match impersonate_response(&method, &headers, &pool, &auth_state, request).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn impersonate_response(
    method: &Method,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
    request: ImpersonateRequest,
) -> Result<Response, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    authorize(&principal, method, RouteAccess::Admin(Capability::SupportAction))?;

    // The guard already guaranteed an admin role is present.
    let actor_admin_role = principal
        .admin_role
        .ok_or(AuthError::Forbidden(super::error::MSG_ADMIN_ROLE_REQUIRED))?;

    let target_id = Uuid::from_str(request.user_id.trim())
        .map_err(|_| AuthError::BadRequest("Invalid user id"))?;
    let target = lookup_user_by_id(pool, target_id)
        .await?
        .ok_or(AuthError::BadRequest("Unknown user"))?;

    let ttl_seconds = auth_state.config().impersonation_ttl_seconds();
    let token = auth_state.signer().issue_impersonation(
        &target,
        principal.user_id,
        actor_admin_role,
        request.reason,
        ttl_seconds,
    )?;

    info!(
        actor = %principal.user_id,
        target = %target.id,
        "Issued read-only impersonation token"
    );
    Ok((
        StatusCode::OK,
        Json(ImpersonateResponse {
            token,
            expires_in_seconds: ttl_seconds,
        }),
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/v1/admin/users/{id}/signout-all",
    params(
        ("id" = String, Path, description = "Target user id")
    ),
    responses(
        (status = 200, description = "Sessions revoked for the target user", body = SignOutAllResponse),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Missing admin role or capability")
    ),
    security(("bearer" = [])),
    tag = "admin"
)]
pub async fn signout_all_user(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    Path(user_id): Path<Uuid>,
) -> impl IntoResponse {
    match signout_all_user_response(&method, &headers, &pool, &auth_state, user_id).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn signout_all_user_response(
    method: &Method,
    headers: &HeaderMap,
    pool: &PgPool,
    auth_state: &Arc<AuthState>,
    user_id: Uuid,
) -> Result<Response, AuthError> {
    let principal = require_auth(headers, pool, auth_state).await?;
    authorize(&principal, method, RouteAccess::Admin(Capability::OpsAction))?;

    let revoked = sign_out_all(pool, user_id).await?;
    info!(
        actor = %principal.user_id,
        target = %user_id,
        revoked, "Forced sign-out of all sessions"
    );
    Ok((StatusCode::OK, Json(SignOutAllResponse { revoked })).into_response())
}
