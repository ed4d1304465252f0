use clap::{Arg, ArgAction, Command, builder::ValueParser};

pub const ARG_VERBOSITY: &str = "verbosity";
pub const ENV_LOG_LEVEL: &str = "CONFIRMER_LOG_LEVEL";

/// Level names accepted by `CONFIRMER_LOG_LEVEL`, indexed by verbosity count.
const LEVEL_NAMES: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

fn parse_level(level: &str) -> Option<u8> {
    if let Ok(count) = level.parse::<u8>() {
        return (usize::from(count) < LEVEL_NAMES.len()).then_some(count);
    }

    let level = level.to_ascii_lowercase();
    LEVEL_NAMES
        .iter()
        .position(|name| *name == level)
        .and_then(|index| u8::try_from(index).ok())
}

#[must_use]
pub fn validator_log_level() -> ValueParser {
    ValueParser::from(|level: &str| -> Result<u8, String> {
        parse_level(level).ok_or_else(|| {
            format!(
                "invalid log level '{level}', expected 0-4 or one of: {}",
                LEVEL_NAMES.join(", ")
            )
        })
    })
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(
        Arg::new(ARG_VERBOSITY)
            .short('v')
            .long("verbose")
            .help(
                "Repeat to raise confirmer's log level: -v WARN, -vv INFO, -vvv DEBUG, -vvvv TRACE. \
                 Without it only errors are logged; RUST_LOG directives still apply",
            )
            .env(ENV_LOG_LEVEL)
            .global(true)
            .action(ArgAction::Count)
            .value_parser(validator_log_level()),
    )
}
