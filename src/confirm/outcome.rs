//! Outcome of one resolution and the UI state derived from it.

use super::classify::Failure;
use crate::provider::SessionUser;
use serde::Serialize;
use thiserror::Error;

/// How a confirmation was reached; selects the redirect delay.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfirmedVia {
    /// The link's own tokens were accepted just now.
    LinkTokens,
    /// A session that was already active proved the email is confirmed.
    AmbientSession,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    Confirmed {
        user: SessionUser,
        via: ConfirmedVia,
    },
    Failed(Failure),
    /// The attempt was abandoned before a result arrived.
    Indeterminate,
}

impl ReconciliationOutcome {
    #[must_use]
    pub fn state(&self) -> ResolverState {
        match self {
            Self::Confirmed { .. } => ResolverState::Succeeded,
            Self::Failed(failure) => ResolverState::Failed(failure.message.clone()),
            Self::Indeterminate => ResolverState::Loading,
        }
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// UI-facing state of a confirmation page.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum ResolverState {
    #[default]
    Loading,
    Succeeded,
    Failed(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("confirmation already settled as {0:?}")]
    AlreadySettled(ResolverState),
    #[error("only terminal states can be entered")]
    NotTerminal,
}

impl ResolverState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Succeeded => "succeeded",
            Self::Failed(_) => "failed",
        }
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Move from `Loading` to a terminal state exactly once.
    /// # Errors
    /// Returns an error if the state is already terminal or `next` is `Loading`.
    pub fn settle(&mut self, next: Self) -> Result<(), TransitionError> {
        if self.is_terminal() {
            return Err(TransitionError::AlreadySettled(self.clone()));
        }
        if !next.is_terminal() {
            return Err(TransitionError::NotTerminal);
        }
        *self = next;
        Ok(())
    }
}
