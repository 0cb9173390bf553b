//! Auth-related CLI arguments: token secret, TTLs, and TOTP issuer.

use anyhow::{Context, Result};
use clap::{Arg, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";

#[must_use]
pub fn with_args(command: Command) -> Command {
    let command = with_token_args(command);
    with_session_args(command)
}

fn with_token_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long("token-secret")
                .help("Shared secret used to sign and verify bearer tokens")
                .env("SESAMO_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new("two-factor-ttl-seconds")
                .long("two-factor-ttl-seconds")
                .help("Temporary 2FA token TTL in seconds")
                .env("SESAMO_TWO_FACTOR_TTL_SECONDS")
                .default_value("600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("impersonation-ttl-seconds")
                .long("impersonation-ttl-seconds")
                .help("Impersonation token TTL in seconds")
                .env("SESAMO_IMPERSONATION_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("totp-issuer")
                .long("totp-issuer")
                .help("Issuer label embedded in TOTP provisioning URLs")
                .env("SESAMO_TOTP_ISSUER")
                .default_value("sesamo.dev"),
        )
}

fn with_session_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("session-ttl-seconds")
                .long("session-ttl-seconds")
                .help("Full session token TTL in seconds")
                .env("SESAMO_SESSION_TTL_SECONDS")
                .default_value("43200")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new("heartbeat-interval-seconds")
                .long("heartbeat-interval-seconds")
                .help("Minimum interval between session heartbeat writes")
                .env("SESAMO_HEARTBEAT_INTERVAL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("frontend-base-url")
                .long("frontend-base-url")
                .help("Frontend base URL used as the allowed CORS origin")
                .env("SESAMO_FRONTEND_BASE_URL")
                .default_value("https://sesamo.dev"),
        )
}

/// Parsed auth-related options.
#[derive(Debug)]
pub struct Options {
    pub token_secret: String,
    pub session_ttl_seconds: i64,
    pub two_factor_ttl_seconds: i64,
    pub impersonation_ttl_seconds: i64,
    pub heartbeat_interval_seconds: u64,
    pub totp_issuer: String,
    pub frontend_base_url: String,
}

impl Options {
    /// Extract options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &clap::ArgMatches) -> Result<Self> {
        let token_secret = matches
            .get_one::<String>(ARG_TOKEN_SECRET)
            .cloned()
            .context("missing required argument: --token-secret")?;
        let session_ttl_seconds = matches
            .get_one::<i64>("session-ttl-seconds")
            .copied()
            .unwrap_or(43200);
        let two_factor_ttl_seconds = matches
            .get_one::<i64>("two-factor-ttl-seconds")
            .copied()
            .unwrap_or(600);
        let impersonation_ttl_seconds = matches
            .get_one::<i64>("impersonation-ttl-seconds")
            .copied()
            .unwrap_or(3600);
        let heartbeat_interval_seconds = matches
            .get_one::<u64>("heartbeat-interval-seconds")
            .copied()
            .unwrap_or(300);
        let totp_issuer = matches
            .get_one::<String>("totp-issuer")
            .cloned()
            .unwrap_or_else(|| "sesamo.dev".to_string());
        let frontend_base_url = matches
            .get_one::<String>("frontend-base-url")
            .cloned()
            .unwrap_or_else(|| "https://sesamo.dev".to_string());

        Ok(Self {
            token_secret,
            session_ttl_seconds,
            two_factor_ttl_seconds,
            impersonation_ttl_seconds,
            heartbeat_interval_seconds,
            totp_issuer,
            frontend_base_url,
        })
    }
}
