use clap::{Arg, ArgAction, Command};

pub const NAME: &str = "resolve";
pub const ARG_URL: &str = "url";
pub const ARG_ACCESS_TOKEN: &str = "access-token";
pub const ARG_NO_WAIT: &str = "no-wait";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(NAME)
        .about("Resolve one confirmation link and print the resulting state")
        .arg(
            Arg::new(ARG_URL)
                .help("Confirmation link, query string and fragment included")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN)
                .long(ARG_ACCESS_TOKEN)
                .help("Access token of an already active session, used when the link carries no tokens")
                .env("CONFIRMER_ACCESS_TOKEN")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_NO_WAIT)
                .long(ARG_NO_WAIT)
                .help("Exit without waiting for the dashboard redirect")
                .action(ArgAction::SetTrue),
        )
}
