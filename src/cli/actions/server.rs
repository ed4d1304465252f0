use crate::{
    api::{self, ConfirmationService},
    cli::globals::GlobalArgs,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub globals: GlobalArgs,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the provider client cannot be built or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    debug!(globals = ?args.globals, "starting confirmation server");

    let client = args.globals.gotrue_client()?;
    let service = ConfirmationService::new(client, args.globals.resolver_config());

    api::new(args.port, Arc::new(service)).await
}
