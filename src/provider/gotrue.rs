//! GoTrue-compatible HTTP identity provider.
//!
//! Only the endpoints a confirmation link needs are covered:
//!
//! - `GET  /user` resolves the user behind an access token.
//! - `POST /token?grant_type=refresh_token` rotates a stale access token.
//! - `POST /verify` consumes an email token hash.
//! - `GET  /health` is used by the service health probe.
//!
//! `GoTrueClient` is cheap to clone and shared process-wide. Each confirmation
//! gets its own [`GoTrueProvider`] scope so installed sessions never leak
//! between callers.

use super::{IdentityProvider, OtpType, ProviderError, Session, SessionPayload, SessionUser};
use crate::APP_USER_AGENT;
use reqwest::{
    Client, Response, StatusCode,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};
use url::Url;

/// Headroom the HTTP client timeout keeps over the resolver's own bound.
pub const REQUEST_TIMEOUT_GRACE: Duration = Duration::from_secs(2);
/// Default request timeout applied by the HTTP client itself.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(12);
/// Message used when a request never reached the provider.
pub const FAILED_TO_FETCH: &str = "Failed to fetch";
/// Maximum number of error body characters kept in provider messages.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct GoTrueConfig {
    base_url: Url,
    api_key: SecretString,
    request_timeout: Duration,
}

impl GoTrueConfig {
    /// `base_url` points at the auth API root, e.g. `https://project.supabase.co/auth/v1`.
    #[must_use]
    pub fn new(base_url: Url, api_key: SecretString) -> Self {
        Self {
            base_url,
            api_key,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        if !timeout.is_zero() {
            self.request_timeout = timeout;
        }
        self
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

#[derive(Clone, Debug)]
pub struct GoTrueClient {
    http: Client,
    config: Arc<GoTrueConfig>,
}

impl GoTrueClient {
    /// Build the shared client.
    /// # Errors
    /// Returns an error if the API key is not a valid header value or the HTTP client cannot be built.
    pub fn new(config: GoTrueConfig) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let mut api_key = HeaderValue::from_str(config.api_key.expose_secret())
            .map_err(|_| ProviderError::Transport("API key is not a valid header value".into()))?;
        api_key.set_sensitive(true);
        headers.insert("apikey", api_key);

        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|err| ProviderError::Transport(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            config: Arc::new(config),
        })
    }

    /// Fresh provider scope without any session.
    #[must_use]
    pub fn scoped(&self) -> GoTrueProvider {
        GoTrueProvider {
            client: self.clone(),
            bearer: None,
            session: Mutex::new(None),
        }
    }

    /// Provider scope whose ambient session is the user behind `access_token`.
    #[must_use]
    pub fn scoped_with_access_token(&self, access_token: SecretString) -> GoTrueProvider {
        GoTrueProvider {
            bearer: Some(access_token),
            ..self.scoped()
        }
    }

    /// Probe the provider's own health endpoint.
    /// # Errors
    /// Returns an error if the provider is unreachable or unhealthy.
    pub async fn health(&self) -> Result<(), ProviderError> {
        let response = self
            .http
            .get(self.endpoint("health"))
            .send()
            .await
            .map_err(transport_error)?;
        read_json(response).await.map(|_| ())
    }

    #[instrument(skip_all)]
    async fn fetch_user(&self, access_token: &SecretString) -> Result<SessionUser, ProviderError> {
        let response = self
            .http
            .get(self.endpoint("user"))
            .header(AUTHORIZATION, bearer(access_token)?)
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_json(response).await?;
        serde_json::from_value(body).map_err(|err| ProviderError::Decode(err.to_string()))
    }

    #[instrument(skip_all)]
    async fn refresh(&self, refresh_token: &SecretString) -> Result<Session, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", "refresh_token")])
            .json(&json!({ "refresh_token": refresh_token.expose_secret() }))
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_json(response).await?;
        session_from_body(&body)?
            .ok_or_else(|| ProviderError::Decode("refresh response carried no session".into()))
    }

    #[instrument(skip_all, fields(otp_type = otp_type.as_str()))]
    async fn verify(
        &self,
        token_hash: &SecretString,
        otp_type: OtpType,
    ) -> Result<SessionPayload, ProviderError> {
        let response = self
            .http
            .post(self.endpoint("verify"))
            .json(&json!({
                "type": otp_type.as_str(),
                "token_hash": token_hash.expose_secret(),
            }))
            .send()
            .await
            .map_err(transport_error)?;
        let body = read_json(response).await?;
        let session = session_from_body(&body)?;
        let user = match &session {
            Some(session) => Some(session.user.clone()),
            None => user_from_body(&body)?,
        };
        Ok(SessionPayload { user, session })
    }

    fn endpoint(&self, path: &str) -> String {
        let base = self.config.base_url.as_str().trim_end_matches('/');
        format!("{}/{}", base, path.trim_start_matches('/'))
    }
}

/// Per-confirmation view of the provider holding at most one session.
#[derive(Debug)]
pub struct GoTrueProvider {
    client: GoTrueClient,
    bearer: Option<SecretString>,
    session: Mutex<Option<Session>>,
}

impl GoTrueProvider {
    async fn store(&self, session: Session) {
        *self.session.lock().await = Some(session);
    }
}

impl IdentityProvider for GoTrueProvider {
    async fn set_session(
        &self,
        access_token: &SecretString,
        refresh_token: &SecretString,
    ) -> Result<SessionPayload, ProviderError> {
        let session = match self.client.fetch_user(access_token).await {
            Ok(user) => Session {
                access_token: access_token.clone(),
                refresh_token: Some(refresh_token.clone()),
                expires_at: None,
                user,
            },
            Err(ProviderError::Api {
                status: Some(401 | 403),
                ..
            }) => {
                debug!("access token rejected, rotating with refresh token");
                self.client.refresh(refresh_token).await?
            }
            Err(err) => return Err(err),
        };

        self.store(session.clone()).await;
        Ok(SessionPayload {
            user: Some(session.user.clone()),
            session: Some(session),
        })
    }

    async fn verify_otp(
        &self,
        token_hash: &SecretString,
        otp_type: OtpType,
    ) -> Result<SessionPayload, ProviderError> {
        let payload = self.client.verify(token_hash, otp_type).await?;
        if let Some(session) = &payload.session {
            self.store(session.clone()).await;
        }
        Ok(payload)
    }

    async fn get_session(&self) -> Result<Option<Session>, ProviderError> {
        let mut stored = self.session.lock().await;

        if let Some(session) = stored.as_ref() {
            if !session.is_expired(unix_now()) {
                return Ok(Some(session.clone()));
            }
            let Some(refresh_token) = session.refresh_token.clone() else {
                warn!("stored session expired without a refresh token");
                *stored = None;
                return Ok(None);
            };
            let refreshed = self.client.refresh(&refresh_token).await?;
            *stored = Some(refreshed.clone());
            return Ok(Some(refreshed));
        }

        let Some(access_token) = &self.bearer else {
            return Ok(None);
        };
        let user = match self.client.fetch_user(access_token).await {
            Ok(user) => user,
            Err(ProviderError::Api {
                status: Some(401 | 403),
                ..
            }) => {
                debug!("seeded access token rejected, no ambient session");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let session = Session {
            access_token: access_token.clone(),
            refresh_token: None,
            expires_at: None,
            user,
        };
        *stored = Some(session.clone());
        Ok(Some(session))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SessionBody {
    access_token: String,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: SessionUser,
}

fn bearer(token: &SecretString) -> Result<HeaderValue, ProviderError> {
    let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|_| ProviderError::rejected("Invalid access token"))?;
    value.set_sensitive(true);
    Ok(value)
}

/// Request URLs stay in the logs; callers only see a fixed message.
fn transport_error(err: reqwest::Error) -> ProviderError {
    warn!(error = %err, "identity provider request failed");
    if err.is_connect() || err.is_timeout() || err.is_request() {
        ProviderError::Transport(FAILED_TO_FETCH.to_string())
    } else {
        ProviderError::Transport(err.without_url().to_string())
    }
}

async fn read_json(response: Response) -> Result<Value, ProviderError> {
    let status = response.status();
    let body = response.text().await.map_err(transport_error)?;

    if status.is_success() {
        serde_json::from_str(&body).map_err(|err| ProviderError::Decode(err.to_string()))
    } else {
        Err(api_error(status, &body))
    }
}

fn api_error(status: StatusCode, body: &str) -> ProviderError {
    let parsed: ErrorBody = serde_json::from_str(body).unwrap_or_default();
    let code = parsed
        .error_code
        .or_else(|| parsed.error.clone().filter(|value| is_code_like(value)));
    let message = parsed
        .msg
        .or(parsed.message)
        .or(parsed.error_description)
        .or(parsed.error)
        .unwrap_or_else(|| fallback_message(status, body));

    ProviderError::Api {
        status: Some(status.as_u16()),
        code,
        message,
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("Request failed")
            .to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}

fn is_code_like(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn session_from_body(body: &Value) -> Result<Option<Session>, ProviderError> {
    if body.get("access_token").is_none() {
        return Ok(None);
    }
    let parsed: SessionBody = serde_json::from_value(body.clone())
        .map_err(|err| ProviderError::Decode(err.to_string()))?;
    let expires_at = parsed
        .expires_at
        .or_else(|| parsed.expires_in.map(|seconds| unix_now().saturating_add(seconds)));

    Ok(Some(Session {
        access_token: SecretString::from(parsed.access_token),
        refresh_token: parsed.refresh_token.map(SecretString::from),
        expires_at,
        user: parsed.user,
    }))
}

/// Verify may answer with `{ "user": {...} }`, with the bare user, or with neither.
fn user_from_body(body: &Value) -> Result<Option<SessionUser>, ProviderError> {
    let candidate = match body.get("user") {
        Some(Value::Null) | None if body.get("id").is_some() => body,
        Some(Value::Null) | None => return Ok(None),
        Some(user) => user,
    };
    serde_json::from_value(candidate.clone())
        .map(Some)
        .map_err(|err| ProviderError::Decode(err.to_string()))
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
}
