//! Error taxonomy for the auth pipeline.
//!
//! Unauthorized and bad-request messages stay generic so responses never
//! reveal whether an account, session, or code exists. Forbidden messages may
//! name the missing requirement. Database failures map to 500 and are logged;
//! the response body never carries their details.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

pub(crate) const MSG_INVALID_CREDENTIALS: &str = "Invalid credentials";
pub(crate) const MSG_INVALID_TOKEN: &str = "Invalid or expired token";
pub(crate) const MSG_TWO_FACTOR_REQUIRED: &str = "2FA verification required";
pub(crate) const MSG_TOKEN_INVALIDATED: &str = "Token has been invalidated";
pub(crate) const MSG_SESSION_REVOKED: &str = "Session has been revoked";
pub(crate) const MSG_INVALID_CODE: &str = "Invalid or expired code";
pub(crate) const MSG_ADMIN_ROLE_REQUIRED: &str = "Internal admin role required";
pub(crate) const MSG_INSUFFICIENT_CAPABILITY: &str = "Insufficient capability";
pub(crate) const MSG_READ_ONLY_WRITE: &str = "Read-only access: write methods are not allowed";

/// Terminal request errors produced by the validator, guard, and handlers.
#[derive(Debug)]
pub(crate) enum AuthError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(&'static str),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthorized(message) => (StatusCode::UNAUTHORIZED, message),
            Self::Forbidden(message) => (StatusCode::FORBIDDEN, message),
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Internal(err) => {
                error!("Internal error: {err:#}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn unauthorized_maps_to_401() {
        let response = AuthError::Unauthorized(MSG_INVALID_CREDENTIALS).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn forbidden_maps_to_403() {
        let response = AuthError::Forbidden(MSG_INSUFFICIENT_CAPABILITY).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn bad_request_maps_to_400() {
        let response = AuthError::BadRequest(MSG_INVALID_CODE).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_maps_to_500() {
        let response = AuthError::Internal(anyhow::anyhow!("boom")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
