//! Database helpers for users, sessions, and the sign-out-all coordinator.

use anyhow::{Context, Result};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::str::FromStr;
use time::OffsetDateTime;
use tracing::Instrument;
use uuid::Uuid;

use super::roles::{AdminRole, Role};
use super::utils::is_unique_violation;

/// Outcome when attempting to create a new user.
#[derive(Debug)]
pub(super) enum SignupOutcome {
    Created(CreatedUser),
    Conflict,
}

/// Fields returned to the client after signup; never includes the hash.
#[derive(Debug)]
pub(super) struct CreatedUser {
    pub(super) id: Uuid,
    pub(super) created_at: OffsetDateTime,
}

/// Full user row as the auth pipeline sees it.
#[derive(Clone, Debug)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: Option<String>,
    pub(crate) password_hash: String,
    pub(crate) role: Role,
    pub(crate) admin_role: Option<AdminRole>,
    pub(crate) two_factor_enabled: bool,
    pub(crate) two_factor_secret: Option<String>,
    pub(crate) token_invalid_before: Option<OffsetDateTime>,
    pub(crate) created_at: OffsetDateTime,
}

/// One active session row, as listed for the owning user.
#[derive(Debug)]
pub(super) struct SessionRow {
    pub(super) id: Uuid,
    pub(super) ip: Option<String>,
    pub(super) user_agent: Option<String>,
    pub(super) created_at: OffsetDateTime,
    pub(super) last_seen_at: OffsetDateTime,
}

/// Directory entry for the admin user listing.
#[derive(Debug)]
pub(super) struct UserSummary {
    pub(super) id: Uuid,
    pub(super) email: String,
    pub(super) name: Option<String>,
    pub(super) role: Role,
    pub(super) admin_role: Option<AdminRole>,
    pub(super) two_factor_enabled: bool,
    pub(super) last_login_at: Option<OffsetDateTime>,
    pub(super) created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, email, name, password_hash, role, admin_role, \
     two_factor_enabled, two_factor_secret, token_invalid_before, created_at";

fn user_from_row(row: &PgRow) -> Result<UserRecord> {
    let role: String = row.get("role");
    let admin_role: Option<String> = row.get("admin_role");
    Ok(UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        role: Role::from_str(&role)?,
        admin_role: admin_role
            .as_deref()
            .map(AdminRole::from_str)
            .transpose()?,
        two_factor_enabled: row.get("two_factor_enabled"),
        two_factor_secret: row.get("two_factor_secret"),
        token_invalid_before: row.get("token_invalid_before"),
        created_at: row.get("created_at"),
    })
}

pub(super) async fn insert_user(
    pool: &PgPool,
    email: &str,
    name: Option<&str>,
    password_hash: &str,
) -> Result<SignupOutcome> {
    let query = r"
        INSERT INTO users (email, name, password_hash)
        VALUES ($1, $2, $3)
        RETURNING id, created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .bind(name)
        .bind(password_hash)
        .fetch_one(pool)
        .instrument(span)
        .await;

    match row {
        Ok(row) => Ok(SignupOutcome::Created(CreatedUser {
            id: row.get("id"),
            created_at: row.get("created_at"),
        })),
        Err(err) if is_unique_violation(&err) => Ok(SignupOutcome::Conflict),
        Err(err) => Err(err).context("failed to insert user"),
    }
}

pub(super) async fn lookup_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;

    row.as_ref().map(user_from_row).transpose()
}

pub(super) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query.as_str()
    );
    let row = sqlx::query(&query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;

    row.as_ref().map(user_from_row).transpose()
}

/// Create a session row for a freshly authenticated device.
pub(super) async fn create_session(
    pool: &PgPool,
    user_id: Uuid,
    ip: Option<&str>,
    user_agent: Option<&str>,
) -> Result<Uuid> {
    let query = r"
        INSERT INTO sessions (user_id, ip, user_agent)
        VALUES ($1, $2, $3)
        RETURNING id
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .bind(ip)
        .bind(user_agent)
        .fetch_one(pool)
        .instrument(span)
        .await
        .context("failed to create session")?;
    Ok(row.get("id"))
}

/// True iff the session exists and has not been revoked.
pub(super) async fn session_is_valid(pool: &PgPool, session_id: Uuid) -> Result<bool> {
    let query = "SELECT revoked_at IS NULL AS valid FROM sessions WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(session_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to check session validity")?;

    Ok(row.is_some_and(|row| row.get::<bool, _>("valid")))
}

/// Heartbeat write; callers throttle and fire-and-forget this.
pub(super) async fn touch_session(pool: &PgPool, session_id: Uuid) -> Result<()> {
    let query = "UPDATE sessions SET last_seen_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(session_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to touch session")?;
    Ok(())
}

pub(super) async fn touch_last_login(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET last_login_at = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to update last login")?;
    Ok(())
}

/// Active (non-revoked) sessions for a user, newest first.
pub(super) async fn list_sessions(pool: &PgPool, user_id: Uuid) -> Result<Vec<SessionRow>> {
    let query = r"
        SELECT id, ip, user_agent, created_at, last_seen_at
        FROM sessions
        WHERE user_id = $1 AND revoked_at IS NULL
        ORDER BY created_at DESC
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(user_id)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list sessions")?;

    Ok(rows
        .into_iter()
        .map(|row| SessionRow {
            id: row.get("id"),
            ip: row.get("ip"),
            user_agent: row.get("user_agent"),
            created_at: row.get("created_at"),
            last_seen_at: row.get("last_seen_at"),
        })
        .collect())
}

/// Sign-out-all coordinator: one transaction moves the user's
/// `token_invalid_before` watermark and revokes every active session, so
/// there is no window where one is updated without the other.
pub(super) async fn sign_out_all(pool: &PgPool, user_id: Uuid) -> Result<u64> {
    let mut tx = pool.begin().await.context("begin sign-out-all")?;

    let query = "UPDATE users SET token_invalid_before = NOW() WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to set token watermark")?;

    let query = r"
        UPDATE sessions
        SET revoked_at = NOW()
        WHERE user_id = $1 AND revoked_at IS NULL
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let revoked = sqlx::query(query)
        .bind(user_id)
        .execute(&mut *tx)
        .instrument(span)
        .await
        .context("failed to revoke sessions")?
        .rows_affected();

    tx.commit().await.context("commit sign-out-all")?;
    Ok(revoked)
}

/// Store an unconfirmed TOTP secret; enrollment stays pending until the
/// first code is confirmed.
pub(super) async fn store_two_factor_secret(
    pool: &PgPool,
    user_id: Uuid,
    secret: &str,
) -> Result<()> {
    let query = r"
        UPDATE users
        SET two_factor_secret = $2,
            two_factor_enabled = FALSE
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(secret)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to store two-factor secret")?;
    Ok(())
}

pub(super) async fn enable_two_factor(pool: &PgPool, user_id: Uuid) -> Result<()> {
    let query = "UPDATE users SET two_factor_enabled = TRUE WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to enable two-factor")?;
    Ok(())
}

/// User directory for the admin read route.
pub(super) async fn list_users(pool: &PgPool) -> Result<Vec<UserSummary>> {
    let query = r"
        SELECT id, email, name, role, admin_role, two_factor_enabled,
               last_login_at, created_at
        FROM users
        ORDER BY created_at
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list users")?;

    rows.into_iter()
        .map(|row| {
            let role: String = row.get("role");
            let admin_role: Option<String> = row.get("admin_role");
            Ok(UserSummary {
                id: row.get("id"),
                email: row.get("email"),
                name: row.get("name"),
                role: Role::from_str(&role)?,
                admin_role: admin_role
                    .as_deref()
                    .map(AdminRole::from_str)
                    .transpose()?,
                two_factor_enabled: row.get("two_factor_enabled"),
                last_login_at: row.get("last_login_at"),
                created_at: row.get("created_at"),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signup_outcome_debug_names() {
        let created = SignupOutcome::Created(CreatedUser {
            id: Uuid::nil(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        });
        assert!(format!("{created:?}").starts_with("Created"));
        assert_eq!(format!("{:?}", SignupOutcome::Conflict), "Conflict");
    }

    #[test]
    fn session_row_holds_values() {
        let row = SessionRow {
            id: Uuid::nil(),
            ip: Some("1.2.3.4".to_string()),
            user_agent: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
            last_seen_at: OffsetDateTime::UNIX_EPOCH,
        };
        assert_eq!(row.id, Uuid::nil());
        assert_eq!(row.ip.as_deref(), Some("1.2.3.4"));
        assert!(row.user_agent.is_none());
    }
}
