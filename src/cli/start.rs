//! CLI entry: parse arguments, bring up telemetry, hand back the action.

use crate::cli::{actions::Action, commands, dispatch, telemetry};
use anyhow::Result;

/// Each `-v` raises the log level one notch; absent means errors only.
const fn verbosity_to_level(verbosity: u8) -> Option<tracing::Level> {
    match verbosity {
        0 => None,
        1 => Some(tracing::Level::WARN),
        2 => Some(tracing::Level::INFO),
        3 => Some(tracing::Level::DEBUG),
        _ => Some(tracing::Level::TRACE),
    }
}

/// Parse the command line and return the action for the binary to execute.
///
/// Telemetry is initialized here so argument errors still print cleanly
/// before any subscriber is installed.
///
/// # Errors
///
/// Returns an error if telemetry setup or argument dispatch fails.
pub fn start() -> Result<Action> {
    let matches = commands::new().get_matches();

    let level = verbosity_to_level(
        matches
            .get_one::<u8>(commands::logging::ARG_VERBOSITY)
            .copied()
            .unwrap_or(0),
    );

    telemetry::init(level)?;

    dispatch::handler(&matches)
}

#[cfg(test)]
mod tests {
    use super::verbosity_to_level;

    #[test]
    fn verbosity_levels_map_to_tracing() {
        assert_eq!(verbosity_to_level(0), None);
        assert_eq!(verbosity_to_level(1), Some(tracing::Level::WARN));
        assert_eq!(verbosity_to_level(2), Some(tracing::Level::INFO));
        assert_eq!(verbosity_to_level(3), Some(tracing::Level::DEBUG));
        assert_eq!(verbosity_to_level(4), Some(tracing::Level::TRACE));
        assert_eq!(verbosity_to_level(250), Some(tracing::Level::TRACE));
    }
}
