use crate::{
    cli::globals::GlobalArgs,
    confirm::{ConfirmationPage, IncomingParameters, LogNavigator, ResolverState, Resolver},
};
use anyhow::{Context, Result, bail};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub url: String,
    pub access_token: Option<SecretString>,
    pub wait: bool,
    pub globals: GlobalArgs,
}

/// Run one page activation for `args.url` and print the resulting state.
/// # Errors
/// Returns an error if the URL cannot be parsed or the confirmation does not succeed.
pub async fn execute(args: Args) -> Result<()> {
    let params = IncomingParameters::from_url(&args.url).context("Invalid confirmation URL")?;
    debug!(present = ?params.present_keys(), "parsed confirmation link");

    let client = args.globals.gotrue_client()?;
    let provider = match args.access_token {
        Some(token) => client.scoped_with_access_token(token),
        None => client.scoped(),
    };
    let resolver = Arc::new(Resolver::new(provider, args.globals.resolver_config()));

    let mut page = ConfirmationPage::new(resolver, Arc::new(LogNavigator));
    let state = page.activate(&params).await.clone();

    println!("{}", serde_json::to_string_pretty(&state)?);

    match state {
        ResolverState::Succeeded => {
            if args.wait && page.wait_for_navigation().await {
                info!("redirect completed");
            }
            Ok(())
        }
        ResolverState::Failed(message) => bail!(message),
        ResolverState::Loading => bail!("confirmation did not complete"),
    }
}
