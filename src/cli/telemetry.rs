//! Logging initialization for the CLI and server.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Initialize the global tracing subscriber.
///
/// Output format is human-readable by default; set `SESAMO_LOG_FORMAT=json`
/// for structured logs in production.
///
/// # Errors
///
/// Returns an error if filter directives fail to parse or a subscriber is
/// already installed.
pub fn init(verbosity_level: Option<Level>) -> Result<()> {
    let verbosity_level = verbosity_level.unwrap_or(Level::ERROR);

    let filter = EnvFilter::builder()
        .with_default_directive(verbosity_level.into())
        .from_env_lossy()
        .add_directive("hyper=error".parse()?)
        .add_directive("tokio=error".parse()?);

    let json = std::env::var("SESAMO_LOG_FORMAT").is_ok_and(|fmt| fmt.eq_ignore_ascii_case("json"));

    if json {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .json();
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_file(false)
            .with_line_number(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_target(false)
            .pretty();
        let subscriber = Registry::default().with(fmt_layer).with(filter);
        tracing::subscriber::set_global_default(subscriber)?;
    }

    Ok(())
}
