use crate::api;
use anyhow::Result;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub token_secret: String,
    pub session_ttl_seconds: i64,
    pub two_factor_ttl_seconds: i64,
    pub impersonation_ttl_seconds: i64,
    pub heartbeat_interval_seconds: u64,
    pub totp_issuer: String,
    pub frontend_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config =
        api::handlers::auth::AuthConfig::new(args.token_secret, args.frontend_base_url)
            .with_session_ttl_seconds(args.session_ttl_seconds)
            .with_two_factor_ttl_seconds(args.two_factor_ttl_seconds)
            .with_impersonation_ttl_seconds(args.impersonation_ttl_seconds)
            .with_heartbeat_interval_seconds(args.heartbeat_interval_seconds)
            .with_totp_issuer(args.totp_issuer);

    api::new(args.port, args.dsn, auth_config).await
}
