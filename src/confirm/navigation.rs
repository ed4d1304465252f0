//! Delayed navigation after a successful confirmation.
//!
//! A [`NavigationTimer`] is the handle to one scheduled redirect. Dropping or
//! cancelling it aborts the redirect, so a torn-down page never navigates.

use std::{sync::Arc, time::Duration};
use tokio::{task::JoinHandle, time::sleep};
use tracing::{debug, info};

/// Client-side route transition.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str);
}

impl<N: Navigator + ?Sized> Navigator for Arc<N> {
    fn navigate_to(&self, path: &str) {
        (**self).navigate_to(path);
    }
}

/// Navigator for headless runs: records the transition in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate_to(&self, path: &str) {
        info!(path, "navigating");
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationPlan {
    pub path: String,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct NavigationTimer {
    handle: Option<JoinHandle<()>>,
}

impl NavigationTimer {
    /// Spawn the redirect. Must be called from within a tokio runtime.
    #[must_use]
    pub fn schedule<N: Navigator + 'static>(navigator: Arc<N>, plan: NavigationPlan) -> Self {
        debug!(path = %plan.path, delay = ?plan.delay, "navigation scheduled");
        let handle = tokio::spawn(async move {
            sleep(plan.delay).await;
            navigator.navigate_to(&plan.path);
        });

        Self {
            handle: Some(handle),
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn cancel(mut self) {
        self.abort();
    }

    /// Wait for the redirect; `true` if the navigator was called.
    pub async fn fired(mut self) -> bool {
        match self.handle.take() {
            Some(handle) => handle.await.is_ok(),
            None => false,
        }
    }

    fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            if !handle.is_finished() {
                debug!("navigation cancelled");
            }
            handle.abort();
        }
    }
}

impl Drop for NavigationTimer {
    fn drop(&mut self) {
        self.abort();
    }
}
