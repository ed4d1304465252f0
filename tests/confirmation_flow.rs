//! End-to-end confirmation flows against a mocked GoTrue server.
//!
//! Each test drives a [`ConfirmationPage`] backed by the real HTTP provider,
//! so link parsing, strategy selection, the provider wire format and error
//! classification are exercised together.

use anyhow::Result;
use confirmer::{
    confirm::{
        ConfirmationPage, ConfirmedVia, ErrorKind, IncomingParameters, Navigator,
        ReconciliationOutcome, ResolverConfig, ResolverState, Resolver, classify,
    },
    provider::{GoTrueClient, GoTrueConfig, GoTrueProvider},
};
use secrecy::SecretString;
use serde_json::json;
use std::{
    sync::{Arc, Mutex},
    time::Duration,
};
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path, query_param},
};

#[derive(Default)]
struct RecordingNavigator {
    paths: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    fn paths(&self) -> Vec<String> {
        self.paths
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate_to(&self, path: &str) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_string());
        }
    }
}

fn client(server: &MockServer) -> Result<GoTrueClient> {
    let base = Url::parse(&format!("{}/auth/v1", server.uri()))?;
    let config = GoTrueConfig::new(base, SecretString::from("anon-key".to_string()));
    Ok(GoTrueClient::new(config)?)
}

fn page(
    provider: GoTrueProvider,
    config: ResolverConfig,
) -> (
    ConfirmationPage<GoTrueProvider, RecordingNavigator>,
    Arc<RecordingNavigator>,
) {
    let navigator = Arc::new(RecordingNavigator::default());
    let resolver = Arc::new(Resolver::new(provider, config));
    (ConfirmationPage::new(resolver, Arc::clone(&navigator)), navigator)
}

fn user_json() -> serde_json::Value {
    json!({
        "id": "0b9e",
        "email": "patient@example.com",
        "email_confirmed_at": "2024-05-01T10:00:00Z"
    })
}

#[tokio::test]
async fn fragment_tokens_confirm_and_redirect() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer fresh-access"))
        .and(header("apikey", "anon-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let config = ResolverConfig::new().with_token_redirect_delay(Duration::from_millis(20));
    let (mut page, navigator) = page(client(&server)?.scoped(), config);
    let params = IncomingParameters::from_url(
        "https://app.example.com/auth/confirm#access_token=fresh-access&refresh_token=r1&type=signup",
    )?;

    assert_eq!(page.activate(&params).await, &ResolverState::Succeeded);
    assert!(matches!(
        page.outcome(),
        Some(ReconciliationOutcome::Confirmed {
            via: ConfirmedVia::LinkTokens,
            ..
        })
    ));

    assert!(page.wait_for_navigation().await);
    assert_eq!(navigator.paths(), vec!["/dashboard".to_string()]);
    Ok(())
}

#[tokio::test]
async fn stale_token_pair_falls_back_to_token_hash() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "error_code": "bad_jwt",
            "msg": "invalid JWT: token is expired"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": 400,
            "error_code": "refresh_token_not_found",
            "msg": "Invalid Refresh Token: Refresh Token Not Found"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .and(body_json(json!({ "type": "email", "token_hash": "pkce_abc" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-2",
            "refresh_token": "refresh-2",
            "expires_in": 3600,
            "user": user_json()
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (mut page, _navigator) = page(client(&server)?.scoped(), ResolverConfig::new());
    let params = IncomingParameters::from_url(
        "/auth/confirm?token_hash=pkce_abc&type=email#access_token=old&refresh_token=used",
    )?;

    assert_eq!(page.activate(&params).await, &ResolverState::Succeeded);
    Ok(())
}

#[tokio::test]
async fn rejected_token_pair_without_hash_reports_refresh_failure() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "msg": "invalid JWT: token is expired"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid Refresh Token: Already Used"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (mut page, navigator) = page(client(&server)?.scoped(), ResolverConfig::new());
    let params = IncomingParameters::from_parts("access_token=a&refresh_token=b", "");

    assert_eq!(
        page.activate(&params).await,
        &ResolverState::Failed(classify::REFRESH_TOKEN_REJECTED.to_string())
    );
    assert!(!page.navigation_pending());
    assert!(navigator.paths().is_empty());
    Ok(())
}

#[tokio::test]
async fn expired_token_hash_is_classified_by_code() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "code": 403,
            "error_code": "otp_expired",
            "msg": "Email link is invalid or has expired"
        })))
        .mount(&server)
        .await;

    let (mut page, _navigator) = page(client(&server)?.scoped(), ResolverConfig::new());
    page.activate(&IncomingParameters::from_parts("token_hash=x", ""))
        .await;

    let failure = page.outcome().and_then(ReconciliationOutcome::failure);
    assert_eq!(failure.map(|f| f.kind), Some(ErrorKind::ExpiredOrInvalidToken));
    assert_eq!(
        failure.map(|f| f.message.as_str()),
        Some(classify::LINK_EXPIRED)
    );
    Ok(())
}

#[tokio::test]
async fn ambient_session_confirms_with_shorter_delay() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer ambient-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .mount(&server)
        .await;

    let config = ResolverConfig::new().with_ambient_redirect_delay(Duration::from_millis(10));
    let provider = client(&server)?.scoped_with_access_token(SecretString::from(
        "ambient-token".to_string(),
    ));
    let (mut page, navigator) = page(provider, config);

    assert_eq!(
        page.activate(&IncomingParameters::default()).await,
        &ResolverState::Succeeded
    );
    assert!(matches!(
        page.outcome(),
        Some(ReconciliationOutcome::Confirmed {
            via: ConfirmedVia::AmbientSession,
            ..
        })
    ));
    assert!(page.wait_for_navigation().await);
    assert_eq!(navigator.paths(), vec!["/dashboard".to_string()]);
    Ok(())
}

#[tokio::test]
async fn direct_visit_without_session_needs_the_link() -> Result<()> {
    let server = MockServer::start().await;
    let (mut page, _navigator) = page(client(&server)?.scoped(), ResolverConfig::new());

    assert_eq!(
        page.activate(&IncomingParameters::from_url("/auth/confirm")?)
            .await,
        &ResolverState::Failed(classify::LINK_REQUIRED.to_string())
    );
    Ok(())
}

#[tokio::test]
async fn unreachable_provider_is_unavailable() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = ResolverConfig::new().with_provider_timeout(Duration::from_millis(100));
    let provider =
        client(&server)?.scoped_with_access_token(SecretString::from("slow".to_string()));
    let (mut page, _navigator) = page(provider, config);

    page.activate(&IncomingParameters::default()).await;
    let failure = page.outcome().and_then(ReconciliationOutcome::failure);
    assert_eq!(failure.map(|f| f.kind), Some(ErrorKind::ProviderUnavailable));
    assert_eq!(
        failure.map(|f| f.message.as_str()),
        Some(classify::PROVIDER_TIMEOUT)
    );
    Ok(())
}

#[tokio::test]
async fn connection_failure_does_not_leak_provider_url() -> Result<()> {
    let base = Url::parse("http://127.0.0.1:9/internal-auth/v1")?;
    let client = GoTrueClient::new(GoTrueConfig::new(
        base,
        SecretString::from("anon-key".to_string()),
    ))?;
    let (mut page, navigator) = page(client.scoped(), ResolverConfig::new());

    page.activate(&IncomingParameters::from_parts("token_hash=x", ""))
        .await;

    let failure = page.outcome().and_then(ReconciliationOutcome::failure);
    let message = failure.map(|f| f.message.clone()).unwrap_or_default();
    assert!(message.contains("Failed to fetch"), "{message}");
    assert!(!message.contains("127.0.0.1"), "{message}");
    assert!(!message.contains("internal-auth"), "{message}");
    assert!(navigator.paths().is_empty());
    Ok(())
}
