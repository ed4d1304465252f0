use clap::{Arg, Command};

pub const NAME: &str = "server";
pub const ARG_PORT: &str = "port";

#[must_use]
pub fn subcommand() -> Command {
    Command::new(NAME)
        .about("Serve the confirmation API over HTTP")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("CONFIRMER_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
}
