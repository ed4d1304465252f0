//! The token-reconciliation state machine.
//!
//! One call to [`Resolver::resolve`] selects a plan, performs at most two
//! provider calls (the session install and its OTP fallback), and returns a
//! terminal outcome. Nothing is retried; every provider call is bounded by
//! the configured timeout.

use super::{
    classify::{Failure, classify_provider_error},
    navigation::NavigationPlan,
    outcome::{ConfirmedVia, ReconciliationOutcome},
    params::IncomingParameters,
    strategy::{self, Plan},
};
use crate::provider::{IdentityProvider, OtpType, ProviderError, SessionPayload};
use secrecy::SecretString;
use std::{future::Future, time::Duration};
use tokio::time::timeout;
use tracing::{Span, debug, info, instrument, warn};

pub const DEFAULT_DASHBOARD_PATH: &str = "/dashboard";
/// Redirect delay after the link's tokens were accepted.
pub const TOKEN_REDIRECT_DELAY: Duration = Duration::from_millis(2000);
/// Redirect delay when an already-active session proved confirmation.
pub const AMBIENT_REDIRECT_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct ResolverConfig {
    dashboard_path: String,
    token_redirect_delay: Duration,
    ambient_redirect_delay: Duration,
    provider_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            dashboard_path: DEFAULT_DASHBOARD_PATH.to_string(),
            token_redirect_delay: TOKEN_REDIRECT_DELAY,
            ambient_redirect_delay: AMBIENT_REDIRECT_DELAY,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_dashboard_path(mut self, path: impl Into<String>) -> Self {
        self.dashboard_path = path.into();
        self
    }

    #[must_use]
    pub fn with_token_redirect_delay(mut self, delay: Duration) -> Self {
        self.token_redirect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_ambient_redirect_delay(mut self, delay: Duration) -> Self {
        self.ambient_redirect_delay = delay;
        self
    }

    #[must_use]
    pub fn with_provider_timeout(mut self, provider_timeout: Duration) -> Self {
        self.provider_timeout = provider_timeout;
        self
    }

    /// Replace unusable values: a zero timeout or a blank/relative dashboard path.
    #[must_use]
    pub fn normalize(self) -> Self {
        let provider_timeout = if self.provider_timeout.is_zero() {
            DEFAULT_PROVIDER_TIMEOUT
        } else {
            self.provider_timeout
        };
        let trimmed = self.dashboard_path.trim();
        let dashboard_path = if trimmed.is_empty() {
            DEFAULT_DASHBOARD_PATH.to_string()
        } else if trimmed.starts_with('/') {
            trimmed.to_string()
        } else {
            format!("/{trimmed}")
        };

        Self {
            dashboard_path,
            provider_timeout,
            ..self
        }
    }

    #[must_use]
    pub fn dashboard_path(&self) -> &str {
        &self.dashboard_path
    }

    #[must_use]
    pub fn provider_timeout(&self) -> Duration {
        self.provider_timeout
    }

    #[must_use]
    pub fn redirect_delay(&self, via: ConfirmedVia) -> Duration {
        match via {
            ConfirmedVia::LinkTokens => self.token_redirect_delay,
            ConfirmedVia::AmbientSession => self.ambient_redirect_delay,
        }
    }
}

/// Result of one resolution: the outcome plus the redirect a success earns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub outcome: ReconciliationOutcome,
    pub navigation: Option<NavigationPlan>,
}

impl Resolution {
    #[must_use]
    pub fn failed(failure: Failure) -> Self {
        Self {
            outcome: ReconciliationOutcome::Failed(failure),
            navigation: None,
        }
    }

    #[must_use]
    pub fn indeterminate() -> Self {
        Self {
            outcome: ReconciliationOutcome::Indeterminate,
            navigation: None,
        }
    }
}

#[derive(Debug)]
pub struct Resolver<P> {
    provider: P,
    config: ResolverConfig,
}

impl<P: IdentityProvider> Resolver<P> {
    #[must_use]
    pub fn new(provider: P, config: ResolverConfig) -> Self {
        Self {
            provider,
            config: config.normalize(),
        }
    }

    #[must_use]
    pub fn provider(&self) -> &P {
        &self.provider
    }

    #[must_use]
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a confirmation link to a terminal outcome.
    #[instrument(skip_all, fields(strategy, link_type = params.link_type()))]
    pub async fn resolve(&self, params: &IncomingParameters) -> Resolution {
        let plan = strategy::select(params);
        Span::current().record("strategy", plan.strategy().name());
        debug!(present = ?params.present_keys(), "confirmation parameters");

        let outcome = match plan {
            Plan::InstallSession {
                access_token,
                refresh_token,
                fallback_token_hash,
            } => {
                self.install_session(&access_token, &refresh_token, fallback_token_hash.as_ref())
                    .await
            }
            Plan::VerifyOtp { token_hash } => self.verify_otp(&token_hash).await,
            Plan::CheckAmbientSession {
                link_parameters_present,
            } => self.check_ambient_session(link_parameters_present).await,
        };

        match &outcome {
            ReconciliationOutcome::Confirmed { via, .. } => info!(?via, "email confirmed"),
            ReconciliationOutcome::Failed(failure) => {
                warn!(kind = ?failure.kind, "email confirmation failed");
            }
            ReconciliationOutcome::Indeterminate => {}
        }

        let navigation = match &outcome {
            ReconciliationOutcome::Confirmed { via, .. } => Some(NavigationPlan {
                path: self.config.dashboard_path.clone(),
                delay: self.config.redirect_delay(*via),
            }),
            _ => None,
        };

        Resolution {
            outcome,
            navigation,
        }
    }

    async fn install_session(
        &self,
        access_token: &SecretString,
        refresh_token: &SecretString,
        fallback_token_hash: Option<&SecretString>,
    ) -> ReconciliationOutcome {
        let primary = match self
            .bounded(self.provider.set_session(access_token, refresh_token))
            .await
        {
            Ok(payload) => return confirm_payload(payload),
            Err(err) => err,
        };

        let Some(token_hash) = fallback_token_hash else {
            return ReconciliationOutcome::Failed(classify_provider_error(&primary));
        };

        debug!(error = %primary, "session install rejected, trying token hash");
        match self
            .bounded(self.provider.verify_otp(token_hash, OtpType::Email))
            .await
        {
            Ok(payload) => confirm_payload(payload),
            Err(fallback) => {
                debug!(error = %fallback, "token hash fallback rejected");
                // The session install is the primary credential; report its failure.
                ReconciliationOutcome::Failed(classify_provider_error(&primary))
            }
        }
    }

    async fn verify_otp(&self, token_hash: &SecretString) -> ReconciliationOutcome {
        match self
            .bounded(self.provider.verify_otp(token_hash, OtpType::Email))
            .await
        {
            Ok(payload) => confirm_payload(payload),
            Err(err) => ReconciliationOutcome::Failed(classify_provider_error(&err)),
        }
    }

    async fn check_ambient_session(&self, link_parameters_present: bool) -> ReconciliationOutcome {
        match self.bounded(self.provider.get_session()).await {
            Err(ProviderError::Timeout(_)) => ReconciliationOutcome::Failed(Failure::provider_timeout()),
            Err(err) => {
                warn!(error = %err, "session lookup failed");
                ReconciliationOutcome::Failed(Failure::session_check_failed())
            }
            Ok(Some(session)) if session.user.is_email_confirmed() => {
                ReconciliationOutcome::Confirmed {
                    user: session.user,
                    via: ConfirmedVia::AmbientSession,
                }
            }
            Ok(Some(_)) => ReconciliationOutcome::Failed(Failure::email_not_confirmed()),
            Ok(None) if link_parameters_present => {
                ReconciliationOutcome::Failed(Failure::link_missing_parameters())
            }
            Ok(None) => ReconciliationOutcome::Failed(Failure::link_required()),
        }
    }

    async fn bounded<T>(
        &self,
        call: impl Future<Output = Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        match timeout(self.config.provider_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.config.provider_timeout)),
        }
    }
}

// A user identity is enough: the provider does not issue sessions for unconfirmed accounts.
fn confirm_payload(payload: SessionPayload) -> ReconciliationOutcome {
    match payload.user {
        Some(user) => {
            debug!(
                email_confirmed_at_present = user.email_confirmed_at.is_some(),
                "provider returned a user"
            );
            ReconciliationOutcome::Confirmed {
                user,
                via: ConfirmedVia::LinkTokens,
            }
        }
        None => ReconciliationOutcome::Failed(Failure::confirmation_incomplete()),
    }
}
