//! Verbosity argument shared by every invocation.
//!
//! Accepts either repeated `-v` flags or a named level through
//! `SESAMO_LOG_LEVEL` ("info", "debug", ...); both resolve to the same count.

use clap::{builder::ValueParser, Arg, Command};

pub const ARG_VERBOSITY: &str = "verbosity";

#[must_use]
pub fn level_parser() -> ValueParser {
    ValueParser::from(move |level: &str| -> std::result::Result<u8, String> {
        // Raw counts (from repeated -v) pass through unchanged.
        if let Ok(count) = level.parse::<u8>() {
            if count <= 5 {
                return Ok(count);
            }
        }

        match level.to_lowercase().as_str() {
            "error" => Ok(0),
            "warn" => Ok(1),
            "info" => Ok(2),
            "debug" => Ok(3),
            "trace" => Ok(4),
            _ => Err("invalid log level".to_string()),
        }
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help("Verbosity level: ERROR, WARN, INFO, DEBUG, TRACE (default: ERROR)")
            .env("SESAMO_LOG_LEVEL")
            .global(true)
            .action(clap::ArgAction::Count)
            .value_parser(level_parser()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_levels_map_to_counts() {
        let parser = level_parser();
        let command = Command::new("probe").arg(
            Arg::new("level")
                .long("level")
                .value_parser(parser),
        );
        for (name, expected) in [("error", 0u8), ("warn", 1), ("INFO", 2), ("trace", 4)] {
            let matches = command
                .clone()
                .get_matches_from(vec!["probe", "--level", name]);
            assert_eq!(matches.get_one::<u8>("level").copied(), Some(expected));
        }
    }

    #[test]
    fn out_of_range_and_unknown_levels_are_rejected() {
        let command = Command::new("probe").arg(
            Arg::new("level")
                .long("level")
                .value_parser(level_parser()),
        );
        assert!(command
            .clone()
            .try_get_matches_from(vec!["probe", "--level", "verbose"])
            .is_err());
        assert!(command
            .try_get_matches_from(vec!["probe", "--level", "9"])
            .is_err());
    }
}
