//! Identity provider capability consumed by the confirmation resolver.
//!
//! The resolver never talks to a concrete provider directly; it receives an
//! [`IdentityProvider`] so tests can substitute a scripted double and the
//! binaries can plug in the HTTP client from [`gotrue`].
//!
//! Tokens cross this boundary as [`SecretString`] and must never be logged.

pub mod gotrue;
pub mod scripted;

pub use gotrue::{GoTrueClient, GoTrueConfig, GoTrueProvider};
pub use scripted::{ProviderCall, ScriptedProvider};

use secrecy::SecretString;
use serde::Deserialize;
use std::{future::Future, sync::Arc, time::Duration};
use thiserror::Error;

/// OTP flavour submitted with a token hash. Confirmation links are always `email`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtpType {
    Email,
}

impl OtpType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
        }
    }
}

/// The slice of the provider's user record the resolver reads.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SessionUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<String>,
}

impl SessionUser {
    /// A user counts as confirmed once the provider stamped `email_confirmed_at`.
    #[must_use]
    pub fn is_email_confirmed(&self) -> bool {
        self.email_confirmed_at
            .as_deref()
            .is_some_and(|value| !value.trim().is_empty())
    }
}

/// An authenticated session held by the provider client.
#[derive(Clone, Debug)]
pub struct Session {
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    /// Unix timestamp (seconds); `None` when the provider did not say.
    pub expires_at: Option<i64>,
    pub user: SessionUser,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now_unix: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now_unix)
    }
}

/// Successful result of `set_session` and `verify_otp`.
#[derive(Clone, Debug, Default)]
pub struct SessionPayload {
    pub user: Option<SessionUser>,
    pub session: Option<Session>,
}

impl SessionPayload {
    #[must_use]
    pub fn for_user(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            session: None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The provider answered and rejected the request.
    #[error("{message}")]
    Api {
        status: Option<u16>,
        code: Option<String>,
        message: String,
    },
    /// The request never produced a provider answer.
    #[error("{0}")]
    Transport(String),
    #[error("identity provider did not respond within {0:?}")]
    Timeout(Duration),
    /// The provider answered with something that is not a valid payload.
    #[error("unexpected identity provider response: {0}")]
    Decode(String),
}

impl ProviderError {
    /// Rejection carrying only a message, the shape most providers return.
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Api {
            status: None,
            code: None,
            message: message.into(),
        }
    }

    /// Machine-readable error code, when the provider sent one.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }
}

/// Capability contract the resolver needs from an identity provider.
pub trait IdentityProvider: Send + Sync {
    /// Establish a session directly from a bearer/refresh token pair.
    fn set_session(
        &self,
        access_token: &SecretString,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<SessionPayload, ProviderError>> + Send;

    /// Validate a single-use token hash.
    fn verify_otp(
        &self,
        token_hash: &SecretString,
        otp_type: OtpType,
    ) -> impl Future<Output = Result<SessionPayload, ProviderError>> + Send;

    /// Currently active session, if any.
    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, ProviderError>> + Send;
}

impl<P: IdentityProvider + ?Sized> IdentityProvider for Arc<P> {
    fn set_session(
        &self,
        access_token: &SecretString,
        refresh_token: &SecretString,
    ) -> impl Future<Output = Result<SessionPayload, ProviderError>> + Send {
        (**self).set_session(access_token, refresh_token)
    }

    fn verify_otp(
        &self,
        token_hash: &SecretString,
        otp_type: OtpType,
    ) -> impl Future<Output = Result<SessionPayload, ProviderError>> + Send {
        (**self).verify_otp(token_hash, otp_type)
    }

    fn get_session(&self) -> impl Future<Output = Result<Option<Session>, ProviderError>> + Send {
        (**self).get_session()
    }
}
