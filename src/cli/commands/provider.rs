use clap::{Arg, Command};
use url::Url;

pub const ARG_PROVIDER_URL: &str = "provider-url";
pub const ARG_PROVIDER_API_KEY: &str = "provider-api-key";
pub const ARG_PROVIDER_TIMEOUT_MS: &str = "provider-timeout-ms";
pub const ARG_DASHBOARD_PATH: &str = "dashboard-path";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_PROVIDER_URL)
                .long(ARG_PROVIDER_URL)
                .help("Identity provider auth endpoint, e.g. https://<project>.supabase.co/auth/v1")
                .env("CONFIRMER_PROVIDER_URL")
                .value_parser(clap::value_parser!(Url))
                .required(true),
        )
        .arg(
            Arg::new(ARG_PROVIDER_API_KEY)
                .long(ARG_PROVIDER_API_KEY)
                .help("Public API key sent as the `apikey` header")
                .env("CONFIRMER_PROVIDER_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_PROVIDER_TIMEOUT_MS)
                .long(ARG_PROVIDER_TIMEOUT_MS)
                .help("Timeout for each identity provider call, in milliseconds")
                .env("CONFIRMER_PROVIDER_TIMEOUT_MS")
                .default_value("10000")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new(ARG_DASHBOARD_PATH)
                .long(ARG_DASHBOARD_PATH)
                .help("Route to navigate to after a successful confirmation")
                .env("CONFIRMER_DASHBOARD_PATH")
                .default_value("/dashboard"),
        )
}
