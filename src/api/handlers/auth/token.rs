//! Token issuing and verification (HS256 JWTs, one shared secret).
//!
//! Three kinds are minted, distinguished purely by their claims:
//! a temporary 2FA token (`twoFactor: true`), a full session token
//! (`sessionId`), and a read-only impersonation token (`impersonation`).

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::error::{AuthError, MSG_INVALID_TOKEN};
use super::roles::{AdminRole, Role};
use super::storage::UserRecord;

/// Signed token payload. Field names follow the wire format consumed by the
/// frontend, hence the camelCase rename.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Claims {
    pub(crate) sub: Uuid,
    pub(crate) email: String,
    pub(crate) role: Role,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) two_factor: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) session_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) impersonation: Option<ImpersonationClaims>,
}

/// Impersonation context; exists only inside a signed token, never persisted.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ImpersonationClaims {
    pub(crate) actor_user_id: Uuid,
    pub(crate) actor_admin_role: AdminRole,
    pub(crate) mode: ImpersonationMode,
    pub(crate) issued_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) reason: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum ImpersonationMode {
    #[serde(rename = "readOnly")]
    ReadOnly,
}

/// Mints and verifies all three token kinds with one shared secret.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Temporary 2FA token: accepted only by the 2FA verification endpoint.
    pub(super) fn issue_two_factor(&self, user: &UserRecord, ttl_seconds: i64) -> Result<String> {
        let iat = now_unix();
        self.sign(&Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat,
            exp: iat + ttl_seconds,
            two_factor: Some(true),
            session_id: None,
            impersonation: None,
        })
    }

    /// Full session token; always paired with an existing session row.
    pub(super) fn issue_session(
        &self,
        user: &UserRecord,
        session_id: Uuid,
        ttl_seconds: i64,
    ) -> Result<String> {
        let iat = now_unix();
        self.sign(&Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat,
            exp: iat + ttl_seconds,
            two_factor: None,
            session_id: Some(session_id),
            impersonation: None,
        })
    }

    /// Read-only impersonation token for `target`, acting on behalf of an
    /// internal admin. Carries no session id.
    pub(super) fn issue_impersonation(
        &self,
        target: &UserRecord,
        actor_user_id: Uuid,
        actor_admin_role: AdminRole,
        reason: Option<String>,
        ttl_seconds: i64,
    ) -> Result<String> {
        let iat = now_unix();
        self.sign(&Claims {
            sub: target.id,
            email: target.email.clone(),
            role: target.role,
            iat,
            exp: iat + ttl_seconds,
            two_factor: None,
            session_id: None,
            impersonation: Some(ImpersonationClaims {
                actor_user_id,
                actor_admin_role,
                mode: ImpersonationMode::ReadOnly,
                issued_at: iat,
                reason,
            }),
        })
    }

    fn sign(&self, claims: &Claims) -> Result<String> {
        encode(&Header::default(), claims, &self.encoding).context("failed to sign token")
    }

    /// Verify signature and expiry. Cryptographic and expiry failures are
    /// indistinguishable to the caller; only key misconfiguration surfaces
    /// as an internal error.
    pub(super) fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Ok(data.claims),
            Err(err) => match err.kind() {
                ErrorKind::InvalidEcdsaKey
                | ErrorKind::InvalidRsaKey(_)
                | ErrorKind::InvalidKeyFormat => {
                    Err(AuthError::Internal(anyhow!("token key error: {err}")))
                }
                _ => Err(AuthError::Unauthorized(MSG_INVALID_TOKEN)),
            },
        }
    }
}

/// Unix seconds for token iat/exp claims.
pub(super) fn now_unix() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: "alice@example.com".to_string(),
            name: Some("Alice".to_string()),
            password_hash: String::new(),
            role: Role::User,
            admin_role: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            token_invalid_before: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn session_token_round_trips() -> Result<()> {
        let signer = TokenSigner::new("sekreto");
        let user = user();
        let session_id = Uuid::new_v4();

        let token = signer.issue_session(&user, session_id, 3600)?;
        let claims = signer
            .decode(&token)
            .map_err(|err| anyhow!("decode failed: {err:?}"))?;

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.session_id, Some(session_id));
        assert_eq!(claims.two_factor, None);
        assert!(claims.impersonation.is_none());
        assert_eq!(claims.exp - claims.iat, 3600);
        Ok(())
    }

    #[test]
    fn two_factor_token_is_flagged_and_sessionless() -> Result<()> {
        let signer = TokenSigner::new("sekreto");
        let token = signer.issue_two_factor(&user(), 600)?;
        let claims = signer
            .decode(&token)
            .map_err(|err| anyhow!("decode failed: {err:?}"))?;
        assert_eq!(claims.two_factor, Some(true));
        assert!(claims.session_id.is_none());
        Ok(())
    }

    #[test]
    fn impersonation_token_carries_read_only_mode() -> Result<()> {
        let signer = TokenSigner::new("sekreto");
        let target = user();
        let actor_id = Uuid::new_v4();
        let token = signer.issue_impersonation(
            &target,
            actor_id,
            AdminRole::SupportAgent,
            Some("ticket 42".to_string()),
            3600,
        )?;
        let claims = signer
            .decode(&token)
            .map_err(|err| anyhow!("decode failed: {err:?}"))?;

        let impersonation = claims.impersonation.context("missing impersonation")?;
        assert_eq!(impersonation.actor_user_id, actor_id);
        assert_eq!(impersonation.actor_admin_role, AdminRole::SupportAgent);
        assert_eq!(impersonation.mode, ImpersonationMode::ReadOnly);
        assert_eq!(impersonation.reason.as_deref(), Some("ticket 42"));
        assert!(claims.session_id.is_none());
        Ok(())
    }

    #[test]
    fn wire_format_uses_camel_case_keys() -> Result<()> {
        let claims = Claims {
            sub: Uuid::nil(),
            email: "a@example.com".to_string(),
            role: Role::Admin,
            iat: 1,
            exp: 2,
            two_factor: Some(true),
            session_id: Some(Uuid::nil()),
            impersonation: Some(ImpersonationClaims {
                actor_user_id: Uuid::nil(),
                actor_admin_role: AdminRole::OpsAdmin,
                mode: ImpersonationMode::ReadOnly,
                issued_at: 1,
                reason: None,
            }),
        };
        let value = serde_json::to_value(&claims)?;
        assert!(value.get("twoFactor").is_some());
        assert!(value.get("sessionId").is_some());
        let impersonation = value.get("impersonation").context("impersonation")?;
        assert_eq!(
            impersonation.get("mode").and_then(serde_json::Value::as_str),
            Some("readOnly")
        );
        assert!(impersonation.get("actorUserId").is_some());
        assert!(impersonation.get("actorAdminRole").is_some());
        assert!(impersonation.get("reason").is_none());
        Ok(())
    }

    #[test]
    fn expired_token_is_rejected() -> Result<()> {
        let signer = TokenSigner::new("sekreto");
        // Past the default decode leeway.
        let token = signer.issue_session(&user(), Uuid::new_v4(), -120)?;
        assert!(matches!(
            signer.decode(&token),
            Err(AuthError::Unauthorized(_))
        ));
        Ok(())
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() -> Result<()> {
        let signer = TokenSigner::new("sekreto");
        let other = TokenSigner::new("alia-sekreto");
        let token = other.issue_session(&user(), Uuid::new_v4(), 3600)?;
        assert!(matches!(
            signer.decode(&token),
            Err(AuthError::Unauthorized(_))
        ));
        Ok(())
    }

    #[test]
    fn garbage_token_is_rejected() {
        let signer = TokenSigner::new("sekreto");
        assert!(matches!(
            signer.decode("not.a.jwt"),
            Err(AuthError::Unauthorized(_))
        ));
    }
}
