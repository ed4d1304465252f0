//! In-memory identity provider with canned answers.
//!
//! Each method returns a clone of its scripted result every time it is called,
//! so the same script can drive repeated resolutions. Calls are recorded in
//! order (without token values) for assertions.

use super::{IdentityProvider, OtpType, ProviderError, Session, SessionPayload};
use secrecy::SecretString;
use std::{
    sync::{Mutex, PoisonError},
    time::Duration,
};
use tokio::time::sleep;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProviderCall {
    SetSession,
    VerifyOtp(OtpType),
    GetSession,
}

#[derive(Debug, Default)]
pub struct ScriptedProvider {
    set_session: Option<Result<SessionPayload, ProviderError>>,
    verify_otp: Option<Result<SessionPayload, ProviderError>>,
    get_session: Option<Result<Option<Session>, ProviderError>>,
    latency: Duration,
    panics: bool,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_set_session(mut self, result: Result<SessionPayload, ProviderError>) -> Self {
        self.set_session = Some(result);
        self
    }

    #[must_use]
    pub fn on_verify_otp(mut self, result: Result<SessionPayload, ProviderError>) -> Self {
        self.verify_otp = Some(result);
        self
    }

    #[must_use]
    pub fn on_get_session(mut self, result: Result<Option<Session>, ProviderError>) -> Self {
        self.get_session = Some(result);
        self
    }

    /// Delay every answer, e.g. to exercise provider timeouts.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Panic inside every call after it is recorded.
    #[must_use]
    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn record(&self, call: ProviderCall) {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(call);
    }

    async fn answer<T: Clone>(
        &self,
        call: ProviderCall,
        script: Option<&Result<T, ProviderError>>,
    ) -> Result<T, ProviderError> {
        self.record(call);
        if !self.latency.is_zero() {
            sleep(self.latency).await;
        }
        if self.panics {
            panic!("scripted provider panic on {call:?}");
        }
        script
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::Decode(format!("unscripted call: {call:?}"))))
    }
}

impl IdentityProvider for ScriptedProvider {
    async fn set_session(
        &self,
        _access_token: &SecretString,
        _refresh_token: &SecretString,
    ) -> Result<SessionPayload, ProviderError> {
        self.answer(ProviderCall::SetSession, self.set_session.as_ref())
            .await
    }

    async fn verify_otp(
        &self,
        _token_hash: &SecretString,
        otp_type: OtpType,
    ) -> Result<SessionPayload, ProviderError> {
        self.answer(ProviderCall::VerifyOtp(otp_type), self.verify_otp.as_ref())
            .await
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        self.answer(ProviderCall::GetSession, self.get_session.as_ref())
            .await
    }
}
