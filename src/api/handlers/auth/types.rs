//! Request/response types for auth endpoints. Wire format is camelCase.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::{AdminRole, Role};
use super::storage::UserRecord;
use super::utils::rfc3339;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

/// User as returned to its owner; never includes the password hash.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub two_factor_enabled: bool,
    pub created_at: String,
}

impl UserResponse {
    pub(super) fn from_record(user: &UserRecord) -> Self {
        Self {
            id: user.id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            two_factor_enabled: user.two_factor_enabled,
            created_at: rfc3339(user.created_at),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Successful full authentication: a session token plus its owner.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenResponse {
    pub access_token: String,
    pub user: UserResponse,
}

/// Login outcome when 2FA is enabled: no access token yet.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorPendingResponse {
    #[serde(rename = "requires2FA")]
    pub requires_2fa: bool,
    pub temp_token: String,
    pub user: UserPreview,
}

/// Minimal identity exposed before 2FA completes.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserPreview {
    pub id: String,
    pub email: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorVerifyRequest {
    pub temp_token: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorEnrollResponse {
    pub secret: String,
    pub otpauth_url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorConfirmRequest {
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
    pub last_seen_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SessionsResponse {
    pub sessions: Vec<SessionInfo>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignOutAllResponse {
    pub revoked: u64,
}

/// The authenticated principal, as reported by `/v1/me`.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub admin_role: Option<AdminRole>,
    pub two_factor_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub impersonation: Option<ImpersonationInfo>,
}

/// Impersonation context surfaced to the client for banner display.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonationInfo {
    pub actor_user_id: String,
    pub actor_admin_role: AdminRole,
    pub mode: String,
    pub reason: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserDirectoryEntry {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub admin_role: Option<AdminRole>,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<String>,
    pub created_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UsersResponse {
    pub users: Vec<UserDirectoryEntry>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonateRequest {
    pub user_id: String,
    pub reason: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ImpersonateResponse {
    pub token: String,
    pub expires_in_seconds: i64,
}
