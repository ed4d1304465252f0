//! Page lifecycle around one resolution.
//!
//! A [`ConfirmationPage`] owns the UI state, runs the resolver in its own
//! task and owns the redirect timer a success schedules. Dropping the page
//! (or the in-flight `activate` future) aborts whatever is still pending.

use super::{
    classify::Failure,
    navigation::{NavigationTimer, Navigator},
    outcome::{ReconciliationOutcome, ResolverState},
    params::IncomingParameters,
    resolver::{Resolution, Resolver},
};
use crate::provider::IdentityProvider;
use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, warn};

struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> AbortOnDrop<T> {
    async fn join(&mut self) -> Result<T, JoinError> {
        (&mut self.0).await
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Run one resolution in its own task.
///
/// Dropping the returned future aborts the task and any in-flight provider
/// call. A panic becomes the generic failure; a task cancelled by the
/// runtime yields `Indeterminate`.
pub async fn resolve_guarded<P>(resolver: Arc<Resolver<P>>, params: IncomingParameters) -> Resolution
where
    P: IdentityProvider + 'static,
{
    let mut task = AbortOnDrop(tokio::spawn(async move {
        resolver.resolve(&params).await
    }));

    match task.join().await {
        Ok(resolution) => resolution,
        Err(err) if err.is_panic() => {
            error!("confirmation task panicked");
            Resolution::failed(Failure::unexpected())
        }
        Err(_) => Resolution::indeterminate(),
    }
}

pub struct ConfirmationPage<P, N> {
    resolver: Arc<Resolver<P>>,
    navigator: Arc<N>,
    state: ResolverState,
    outcome: Option<ReconciliationOutcome>,
    timer: Option<NavigationTimer>,
}

impl<P, N> ConfirmationPage<P, N>
where
    P: IdentityProvider + 'static,
    N: Navigator + 'static,
{
    #[must_use]
    pub fn new(resolver: Arc<Resolver<P>>, navigator: Arc<N>) -> Self {
        Self {
            resolver,
            navigator,
            state: ResolverState::default(),
            outcome: None,
            timer: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ResolverState {
        &self.state
    }

    /// Outcome of the last activation, `None` until one completes.
    #[must_use]
    pub fn outcome(&self) -> Option<&ReconciliationOutcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn navigation_pending(&self) -> bool {
        self.timer.as_ref().is_some_and(NavigationTimer::is_pending)
    }

    /// Resolve `params` and settle the page.
    ///
    /// A settled page ignores further activations and makes no provider
    /// calls. An `Indeterminate` outcome leaves the page loading.
    pub async fn activate(&mut self, params: &IncomingParameters) -> &ResolverState {
        if self.state.is_terminal() {
            debug!("page already settled, ignoring activation");
            return &self.state;
        }

        let resolution = resolve_guarded(Arc::clone(&self.resolver), params.clone()).await;
        self.apply(resolution);
        &self.state
    }

    /// Wait for the scheduled redirect; `true` if it fired.
    pub async fn wait_for_navigation(&mut self) -> bool {
        match self.timer.take() {
            Some(timer) => timer.fired().await,
            None => false,
        }
    }

    fn apply(&mut self, resolution: Resolution) {
        let next = resolution.outcome.state();
        if next.is_terminal() {
            if let Err(err) = self.state.settle(next) {
                warn!(%err, "discarding late outcome");
                return;
            }
            if let Some(plan) = resolution.navigation {
                self.timer = Some(NavigationTimer::schedule(
                    Arc::clone(&self.navigator),
                    plan,
                ));
            }
        }
        self.outcome = Some(resolution.outcome);
    }
}
