use crate::{
    confirm::ResolverConfig,
    provider::{
        GoTrueClient, GoTrueConfig,
        gotrue::REQUEST_TIMEOUT_GRACE,
    },
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::time::Duration;
use url::Url;

/// Settings shared by every subcommand.
#[derive(Clone)]
pub struct GlobalArgs {
    pub provider_url: Url,
    pub provider_api_key: SecretString,
    pub provider_timeout: Duration,
    pub dashboard_path: String,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(provider_url: Url, provider_api_key: SecretString) -> Self {
        Self {
            provider_url,
            provider_api_key,
            provider_timeout: crate::confirm::resolver::DEFAULT_PROVIDER_TIMEOUT,
            dashboard_path: crate::confirm::resolver::DEFAULT_DASHBOARD_PATH.to_string(),
        }
    }

    /// The HTTP timeout outlasts `provider_timeout` so the resolver's bound fires first.
    #[must_use]
    pub fn gotrue_config(&self) -> GoTrueConfig {
        GoTrueConfig::new(self.provider_url.clone(), self.provider_api_key.clone())
            .with_request_timeout(self.provider_timeout.saturating_add(REQUEST_TIMEOUT_GRACE))
    }

    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn gotrue_client(&self) -> Result<GoTrueClient> {
        GoTrueClient::new(self.gotrue_config()).context("Failed to build identity provider client")
    }

    #[must_use]
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::new()
            .with_dashboard_path(self.dashboard_path.clone())
            .with_provider_timeout(self.provider_timeout)
            .normalize()
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("provider_url", &self.provider_url.as_str())
            .field("provider_api_key", &"***")
            .field("provider_timeout", &self.provider_timeout)
            .field("dashboard_path", &self.dashboard_path)
            .finish()
    }
}
