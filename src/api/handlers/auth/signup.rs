//! Signup endpoint.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use sqlx::PgPool;
use tracing::error;

use super::password::hash_password;
use super::storage::{insert_user, SignupOutcome};
use super::types::{SignupRequest, UserResponse};
use super::utils::{normalize_email, rfc3339, valid_email};

#[utoipa::path(
    post,
    path = "/v1/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = UserResponse),
        (status = 400, description = "Validation error", body = String),
        (status = 409, description = "Email already registered", body = String)
    ),
    tag = "auth"
)]
pub async fn signup(
    pool: Extension<PgPool>,
    payload: Option<Json<SignupRequest>>,
) -> impl IntoResponse {
    let request: SignupRequest = match payload {
        Some(Json(payload)) => payload,
        None => return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response(),
    };

    let email = normalize_email(&request.email);
    if !valid_email(&email) {
        return (StatusCode::BAD_REQUEST, "Invalid email".to_string()).into_response();
    }
    if request.password.is_empty() {
        return (StatusCode::BAD_REQUEST, "Missing password".to_string()).into_response();
    }
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let password_hash = match hash_password(&request.password) {
        Ok(hash) => hash,
        Err(err) => {
            error!("Failed to hash password: {err:#}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match insert_user(&pool, &email, name, &password_hash).await {
        Ok(SignupOutcome::Created(created)) => {
            let response = UserResponse {
                id: created.id.to_string(),
                email,
                name: name.map(str::to_string),
                role: super::roles::Role::User,
                two_factor_enabled: false,
                created_at: rfc3339(created.created_at),
            };
            (StatusCode::CREATED, Json(response)).into_response()
        }
        Ok(SignupOutcome::Conflict) => (
            StatusCode::CONFLICT,
            "Email already registered".to_string(),
        )
            .into_response(),
        Err(err) => {
            error!("Signup failed: {err:#}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
