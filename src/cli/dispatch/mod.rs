use crate::cli::{
    actions::{Action, resolve, server},
    commands::{self, provider},
    globals::GlobalArgs,
};
use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let globals = globals(matches)?;

    match matches.subcommand() {
        Some((commands::resolve::NAME, sub)) => Ok(Action::Resolve(resolve::Args {
            url: sub
                .get_one::<String>(commands::resolve::ARG_URL)
                .cloned()
                .context("missing required argument: <URL>")?,
            access_token: sub
                .get_one::<String>(commands::resolve::ARG_ACCESS_TOKEN)
                .cloned()
                .map(SecretString::from),
            wait: !sub.get_flag(commands::resolve::ARG_NO_WAIT),
            globals,
        })),
        Some((commands::server::NAME, sub)) => Ok(Action::Server(server::Args {
            port: sub
                .get_one::<u16>(commands::server::ARG_PORT)
                .copied()
                .unwrap_or(8080),
            globals,
        })),
        Some((name, _)) => bail!("unknown subcommand: {name}"),
        None => bail!("missing subcommand"),
    }
}

fn globals(matches: &clap::ArgMatches) -> Result<GlobalArgs> {
    let provider_url = matches
        .get_one::<Url>(provider::ARG_PROVIDER_URL)
        .cloned()
        .context("missing required argument: --provider-url")?;
    let api_key = matches
        .get_one::<String>(provider::ARG_PROVIDER_API_KEY)
        .cloned()
        .context("missing required argument: --provider-api-key")?;

    let mut globals = GlobalArgs::new(provider_url, SecretString::from(api_key));
    if let Some(ms) = matches.get_one::<u64>(provider::ARG_PROVIDER_TIMEOUT_MS) {
        globals.provider_timeout = Duration::from_millis(*ms);
    }
    if let Some(path) = matches.get_one::<String>(provider::ARG_DASHBOARD_PATH) {
        globals.dashboard_path.clone_from(path);
    }

    Ok(globals)
}
