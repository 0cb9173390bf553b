//! Auth module tests.
//!
//! Database-backed tests connect to `DATABASE_URL` and are skipped when the
//! variable is unset, so the pure tests keep running everywhere.

use super::error::{AuthError, MSG_TWO_FACTOR_REQUIRED};
use super::login::login_response;
use super::password::{hash_password, verify_password};
use super::principal::{require_auth, token_invalidated};
use super::storage::{
    create_session, enable_two_factor, insert_user, list_sessions, lookup_user_by_email,
    lookup_user_by_id, session_is_valid, sign_out_all, store_two_factor_secret, touch_last_login,
    touch_session, SignupOutcome,
};
use super::token::TokenSigner;
use super::types::LoginRequest;
use super::{AuthConfig, AuthState};
use anyhow::{bail, Context, Result};
use axum::body::to_bytes;
use axum::http::{header::AUTHORIZATION, HeaderMap, HeaderValue, StatusCode};
use sqlx::postgres::PgPoolOptions;
use sqlx::{Connection, PgConnection, PgPool};
use std::sync::Arc;
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

struct TestDb {
    pool: PgPool,
}

impl TestDb {
    async fn new() -> Result<Self> {
        let Ok(dsn) = std::env::var("DATABASE_URL") else {
            eprintln!("Skipping integration test: DATABASE_URL not set");
            bail!("DATABASE_URL not set");
        };

        apply_schema(&dsn).await?;

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&dsn)
            .await
            .context("failed to connect test pool")?;

        Ok(Self { pool })
    }
}

async fn apply_schema(dsn: &str) -> Result<()> {
    let mut connection = PgConnection::connect(dsn)
        .await
        .context("failed to connect for schema setup")?;

    for (index, statement) in split_sql_statements(SCHEMA_SQL).iter().enumerate() {
        sqlx::query(statement)
            .execute(&mut connection)
            .await
            .with_context(|| format!("failed to execute schema statement {}", index + 1))?;
    }

    Ok(())
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

async fn create_test_user(pool: &PgPool, email: &str, password: &str) -> Result<Uuid> {
    let password_hash = hash_password(password)?;
    match insert_user(pool, email, Some("Test User"), &password_hash).await? {
        SignupOutcome::Created(created) => Ok(created.id),
        SignupOutcome::Conflict => bail!("unexpected conflict for {email}"),
    }
}

#[test]
fn auth_config_builder_reaches_signer() -> Result<()> {
    // A state built from config mints tokens verifiable with the same secret.
    let config = AuthConfig::new("sekreto".to_string(), "https://sesamo.dev".to_string())
        .with_session_ttl_seconds(60);
    let state = super::AuthState::new(config);
    assert_eq!(state.config().frontend_base_url(), "https://sesamo.dev");
    Ok(())
}

#[test]
fn temp_token_never_carries_a_session() -> Result<()> {
    let signer = TokenSigner::new("sekreto");
    let user = test_user_record();
    let token = signer.issue_two_factor(&user, 600)?;
    let claims = signer
        .decode(&token)
        .map_err(|err| anyhow::anyhow!("decode failed: {err:?}"))?;
    assert_eq!(claims.two_factor, Some(true));
    assert!(claims.session_id.is_none());
    assert!(claims.impersonation.is_none());
    Ok(())
}

#[tokio::test]
async fn temp_token_is_rejected_by_the_request_validator() -> Result<()> {
    // The temp-token rejection fires before any query, so a lazy pool that
    // never connects is enough.
    let pool = PgPoolOptions::new().connect_lazy("postgres://localhost:5432/unreachable")?;
    let state = Arc::new(AuthState::new(AuthConfig::new(
        "sekreto".to_string(),
        "https://sesamo.dev".to_string(),
    )));

    let token = state.signer().issue_two_factor(&test_user_record(), 600)?;
    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}"))?,
    );

    assert!(matches!(
        require_auth(&headers, &pool, &state).await,
        Err(AuthError::Unauthorized(MSG_TWO_FACTOR_REQUIRED))
    ));
    Ok(())
}

fn test_user_record() -> super::storage::UserRecord {
    super::storage::UserRecord {
        id: Uuid::new_v4(),
        email: "flow@example.com".to_string(),
        name: None,
        password_hash: String::new(),
        role: super::roles::Role::User,
        admin_role: None,
        two_factor_enabled: true,
        two_factor_secret: None,
        token_invalid_before: None,
        created_at: time::OffsetDateTime::UNIX_EPOCH,
    }
}

#[tokio::test]
async fn signup_conflict_on_duplicate_email() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = unique_email("dup");
    let password_hash = hash_password("pass-word-1")?;
    let first = insert_user(&db.pool, &email, None, &password_hash).await?;
    assert!(matches!(first, SignupOutcome::Created(_)));

    let second = insert_user(&db.pool, &email, None, &password_hash).await?;
    assert!(matches!(second, SignupOutcome::Conflict));
    Ok(())
}

#[tokio::test]
async fn credential_lookup_and_verify_round_trip() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = unique_email("login");
    let user_id = create_test_user(&db.pool, &email, "correct-password").await?;

    let user = lookup_user_by_email(&db.pool, &email)
        .await?
        .context("user not found")?;
    assert_eq!(user.id, user_id);
    assert!(verify_password("correct-password", &user.password_hash)?);
    assert!(!verify_password("wrong-password", &user.password_hash)?);

    touch_last_login(&db.pool, user_id).await?;
    Ok(())
}

#[tokio::test]
async fn session_lifecycle_create_validate_revoke() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = unique_email("session");
    let user_id = create_test_user(&db.pool, &email, "pass-word-1").await?;

    let session_id =
        create_session(&db.pool, user_id, Some("1.2.3.4"), Some("test-agent")).await?;
    assert!(session_is_valid(&db.pool, session_id).await?);
    assert!(!session_is_valid(&db.pool, Uuid::new_v4()).await?);

    touch_session(&db.pool, session_id).await?;

    let sessions = list_sessions(&db.pool, user_id).await?;
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].id, session_id);
    assert_eq!(sessions[0].ip.as_deref(), Some("1.2.3.4"));
    Ok(())
}

#[tokio::test]
async fn sign_out_all_revokes_sessions_and_moves_watermark() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = unique_email("signout");
    let user_id = create_test_user(&db.pool, &email, "pass-word-1").await?;

    let first = create_session(&db.pool, user_id, None, None).await?;
    let second = create_session(&db.pool, user_id, None, None).await?;

    // A token minted before sign-out-all, by its iat.
    let iat_before = super::token::now_unix() - 1;

    let revoked = sign_out_all(&db.pool, user_id).await?;
    assert_eq!(revoked, 2);
    assert!(!session_is_valid(&db.pool, first).await?);
    assert!(!session_is_valid(&db.pool, second).await?);
    assert!(list_sessions(&db.pool, user_id).await?.is_empty());

    let user = lookup_user_by_id(&db.pool, user_id)
        .await?
        .context("user not found")?;
    assert!(token_invalidated(iat_before, user.token_invalid_before));

    // Repeating revokes nothing further; sessions stay logically revoked.
    let revoked_again = sign_out_all(&db.pool, user_id).await?;
    assert_eq!(revoked_again, 0);
    Ok(())
}

#[tokio::test]
async fn login_challenges_instead_of_issuing_access_token_when_two_factor_enabled() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = unique_email("challenge");
    let user_id = create_test_user(&db.pool, &email, "pass-word-1").await?;
    store_two_factor_secret(&db.pool, user_id, "JBSWY3DPEHPK3PXP").await?;
    enable_two_factor(&db.pool, user_id).await?;

    let state = AuthState::new(AuthConfig::new(
        "sekreto".to_string(),
        "https://sesamo.dev".to_string(),
    ));
    let request = LoginRequest {
        email: email.clone(),
        password: "pass-word-1".to_string(),
    };
    let response = login_response(&HeaderMap::new(), &db.pool, &state, &request)
        .await
        .map_err(|err| anyhow::anyhow!("login failed: {err:?}"))?;
    assert_eq!(response.status(), StatusCode::OK);

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let value: serde_json::Value = serde_json::from_slice(&body)?;
    assert_eq!(
        value.get("requires2FA").and_then(serde_json::Value::as_bool),
        Some(true)
    );
    assert!(value.get("tempToken").is_some());
    assert!(value.get("accessToken").is_none());

    // No session is created until the second phase completes.
    assert!(list_sessions(&db.pool, user_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn login_fails_closed_when_two_factor_enabled_without_secret() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = unique_email("secretless");
    let user_id = create_test_user(&db.pool, &email, "pass-word-1").await?;
    // Flag flipped without a stored secret: a data defect, never reachable
    // through the enrollment flow.
    enable_two_factor(&db.pool, user_id).await?;

    let state = AuthState::new(AuthConfig::new(
        "sekreto".to_string(),
        "https://sesamo.dev".to_string(),
    ));
    let request = LoginRequest {
        email,
        password: "pass-word-1".to_string(),
    };
    let result = login_response(&HeaderMap::new(), &db.pool, &state, &request).await;
    assert!(matches!(result, Err(AuthError::Internal(_))));
    assert!(list_sessions(&db.pool, user_id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn two_factor_enrollment_is_pending_until_confirmed() -> Result<()> {
    let Ok(db) = TestDb::new().await else {
        return Ok(());
    };

    let email = unique_email("twofactor");
    let user_id = create_test_user(&db.pool, &email, "pass-word-1").await?;

    store_two_factor_secret(&db.pool, user_id, "JBSWY3DPEHPK3PXP").await?;
    let user = lookup_user_by_id(&db.pool, user_id)
        .await?
        .context("user not found")?;
    assert!(!user.two_factor_enabled);
    assert_eq!(user.two_factor_secret.as_deref(), Some("JBSWY3DPEHPK3PXP"));

    enable_two_factor(&db.pool, user_id).await?;
    let user = lookup_user_by_id(&db.pool, user_id)
        .await?
        .context("user not found")?;
    assert!(user.two_factor_enabled);
    Ok(())
}
