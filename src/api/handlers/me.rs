//! Authenticated self endpoint.

use axum::{
    extract::Extension,
    http::{HeaderMap, Method},
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use std::sync::Arc;

use super::auth::guard::{authorize, RouteAccess};
use super::auth::principal::require_auth;
use super::auth::types::{ImpersonationInfo, MeResponse};
use super::auth::AuthState;

#[utoipa::path(
    get,
    path = "/v1/me",
    responses(
        (status = 200, description = "The authenticated principal", body = MeResponse),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer" = [])),
    tag = "sesamo"
)]
pub async fn me(
    method: Method,
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, &auth_state).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = authorize(&principal, &method, RouteAccess::Authenticated) {
        return err.into_response();
    }

    let impersonation = principal
        .impersonation
        .as_ref()
        .map(|impersonation| ImpersonationInfo {
            actor_user_id: impersonation.actor_user_id.to_string(),
            actor_admin_role: impersonation.actor_admin_role,
            mode: "readOnly".to_string(),
            reason: impersonation.reason.clone(),
        });

    let response = MeResponse {
        id: principal.user_id.to_string(),
        email: principal.email,
        name: principal.name,
        role: principal.role,
        admin_role: principal.admin_role,
        two_factor_enabled: principal.two_factor_enabled,
        impersonation,
    };
    Json(response).into_response()
}
