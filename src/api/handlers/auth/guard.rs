//! Capability guard: a fixed-order pipeline of authorization checks.
//!
//! Checks run strictly after the token validator succeeds:
//! 1. impersonation read-only gate (global, every route),
//! 2. admin role gate,
//! 3. capability matrix,
//! 4. management CEO safe-method gate.
//!
//! Capability is explicit per-route configuration passed at the call site.

use axum::http::Method;

use super::error::{
    AuthError, MSG_ADMIN_ROLE_REQUIRED, MSG_INSUFFICIENT_CAPABILITY, MSG_READ_ONLY_WRITE,
};
use super::principal::Principal;
use super::roles::{AdminRole, Capability, Role};
use super::token::ImpersonationMode;

/// Access requirement a route declares at registration.
#[derive(Clone, Copy, Debug)]
pub(crate) enum RouteAccess {
    /// Any authenticated principal.
    Authenticated,
    /// Admin role plus the named capability.
    Admin(Capability),
}

/// Run the full guard pipeline for one request.
pub(crate) fn authorize(
    principal: &Principal,
    method: &Method,
    access: RouteAccess,
) -> Result<(), AuthError> {
    // Impersonation is hard-limited to safe methods on every route,
    // regardless of what the underlying role could otherwise do.
    if let Some(impersonation) = &principal.impersonation {
        if impersonation.mode == ImpersonationMode::ReadOnly && !is_safe_method(method) {
            return Err(AuthError::Forbidden(MSG_READ_ONLY_WRITE));
        }
    }

    let capability = match access {
        RouteAccess::Authenticated => return Ok(()),
        RouteAccess::Admin(capability) => capability,
    };

    let admin_role = match (principal.role, principal.admin_role) {
        (Role::Admin, Some(admin_role)) => admin_role,
        _ => return Err(AuthError::Forbidden(MSG_ADMIN_ROLE_REQUIRED)),
    };

    if !admin_role.allows(capability) {
        return Err(AuthError::Forbidden(MSG_INSUFFICIENT_CAPABILITY));
    }

    // Second, independent read-only rule layered on top of the matrix.
    if admin_role == AdminRole::ManagementCeo && !is_safe_method(method) {
        return Err(AuthError::Forbidden(MSG_READ_ONLY_WRITE));
    }

    Ok(())
}

pub(super) fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
