//! HTTP surface tests: the full router, its layers and the status mapping.

use anyhow::Result;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header::AUTHORIZATION},
};
use confirmer::{
    api::{self, ConfirmationService, handlers::confirmations::ConfirmationResponse},
    confirm::{ErrorKind, Recovery, ResolverConfig, classify},
    provider::{GoTrueClient, GoTrueConfig},
};
use secrecy::SecretString;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tower::ServiceExt;
use url::Url;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_json, header, method, path},
};

fn app(server: &MockServer, config: ResolverConfig) -> Result<Router> {
    let base = Url::parse(&format!("{}/auth/v1", server.uri()))?;
    let client = GoTrueClient::new(GoTrueConfig::new(
        base,
        SecretString::from("anon-key".to_string()),
    ))?;
    Ok(api::app(Arc::new(ConfirmationService::new(client, config))))
}

fn confirm_request(payload: &Value, bearer: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/v1/confirmations")
        .header("Content-Type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    Ok(builder.body(Body::from(serde_json::to_vec(payload)?))?)
}

async fn read_confirmation(response: axum::response::Response) -> Result<ConfirmationResponse> {
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&body)?)
}

fn user_json() -> Value {
    json!({
        "id": "0b9e",
        "email": "patient@example.com",
        "email_confirmed_at": "2024-05-01T10:00:00Z"
    })
}

#[tokio::test]
async fn health_reports_provider_status() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "GoTrue" })))
        .mount(&server)
        .await;

    let response = app(&server, ResolverConfig::new())?
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert!(response.headers().contains_key("x-request-id"));

    let body = to_bytes(response.into_body(), usize::MAX).await?;
    let health: Value = serde_json::from_slice(&body)?;
    assert_eq!(health["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(health["provider"], "ok");
    Ok(())
}

#[tokio::test]
async fn health_is_unavailable_when_provider_is_down() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/health"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let response = app(&server, ResolverConfig::new())?
        .oneshot(
            Request::builder()
                .method("OPTIONS")
                .uri("/health")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = to_bytes(response.into_body(), usize::MAX).await?;
    assert!(body.is_empty());
    Ok(())
}

#[tokio::test]
async fn request_ids_are_propagated() -> Result<()> {
    let server = MockServer::start().await;
    let response = app(&server, ResolverConfig::new())?
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "req-42")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(
        response
            .headers()
            .get("x-request-id")
            .and_then(|value| value.to_str().ok()),
        Some("req-42")
    );
    Ok(())
}

#[tokio::test]
async fn token_hash_link_confirms() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .and(body_json(json!({ "type": "email", "token_hash": "hash-9" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "user": user_json() })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = json!({ "url": "https://app.example.com/auth/confirm?token_hash=hash-9&type=email" });
    let response = app(&server, ResolverConfig::new().with_dashboard_path("/home"))?
        .oneshot(confirm_request(&payload, None)?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let confirmation = read_confirmation(response).await?;
    assert_eq!(confirmation.state, "succeeded");
    let redirect = confirmation.redirect.map(|r| (r.path, r.delay_ms));
    assert_eq!(redirect, Some(("/home".to_string(), 2000)));
    Ok(())
}

#[tokio::test]
async fn direct_visit_is_unprocessable() -> Result<()> {
    let server = MockServer::start().await;
    let payload = json!({ "url": "https://app.example.com/auth/confirm" });
    let response = app(&server, ResolverConfig::new())?
        .oneshot(confirm_request(&payload, None)?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let confirmation = read_confirmation(response).await?;
    assert_eq!(confirmation.state, "failed");
    assert_eq!(confirmation.kind, Some(ErrorKind::NoAccessContext));
    assert_eq!(confirmation.message.as_deref(), Some(classify::LINK_REQUIRED));
    assert_eq!(
        confirmation.recovery,
        vec![Recovery::LogIn, Recovery::SignUpAgain]
    );
    Ok(())
}

#[tokio::test]
async fn bearer_header_seeds_the_ambient_session() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer signed-in"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
        .expect(1)
        .mount(&server)
        .await;

    let payload = json!({ "url": "/auth/confirm" });
    let response = app(&server, ResolverConfig::new())?
        .oneshot(confirm_request(&payload, Some("signed-in"))?)
        .await?;

    assert_eq!(response.status(), StatusCode::OK);
    let confirmation = read_confirmation(response).await?;
    assert_eq!(confirmation.redirect.map(|r| r.delay_ms), Some(1500));
    Ok(())
}

#[tokio::test]
async fn expired_bearer_falls_through_to_link_required() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .and(header("authorization", "Bearer expired"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": 401,
            "error_code": "bad_jwt",
            "msg": "invalid JWT: token is expired"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let payload = json!({ "url": "https://app.example.com/auth/confirm" });
    let response = app(&server, ResolverConfig::new())?
        .oneshot(confirm_request(&payload, Some("expired"))?)
        .await?;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let confirmation = read_confirmation(response).await?;
    assert_eq!(confirmation.kind, Some(ErrorKind::NoAccessContext));
    assert_eq!(confirmation.message.as_deref(), Some(classify::LINK_REQUIRED));
    assert!(!confirmation.recovery.contains(&Recovery::Retry));
    Ok(())
}

#[tokio::test]
async fn slow_provider_is_service_unavailable() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/verify"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let payload = json!({ "url": "/auth/confirm?token_hash=slow" });
    let config = ResolverConfig::new().with_provider_timeout(Duration::from_millis(100));
    let response = app(&server, config)?
        .oneshot(confirm_request(&payload, None)?)
        .await?;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let confirmation = read_confirmation(response).await?;
    assert_eq!(confirmation.kind, Some(ErrorKind::ProviderUnavailable));
    Ok(())
}

#[tokio::test]
async fn missing_payload_is_a_bad_request() -> Result<()> {
    let server = MockServer::start().await;
    let response = app(&server, ResolverConfig::new())?
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/v1/confirmations")
                .body(Body::empty())?,
        )
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unparsable_url_is_a_bad_request() -> Result<()> {
    let server = MockServer::start().await;
    let response = app(&server, ResolverConfig::new())?
        .oneshot(confirm_request(&json!({ "url": "http://[::1" }), None)?)
        .await?;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    Ok(())
}
