use crate::{
    confirm::{Resolver, ResolverConfig},
    provider::{GoTrueClient, GoTrueProvider},
};
use anyhow::Result;
use axum::{
    Extension, Router,
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::options,
};
use secrecy::SecretString;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{Span, info, info_span};
use ulid::Ulid;
use utoipa_axum::router::OpenApiRouter;

pub mod handlers;
mod openapi;

pub use openapi::openapi;

/// Shared state for the confirmation endpoints.
#[derive(Clone, Debug)]
pub struct ConfirmationService {
    client: GoTrueClient,
    config: ResolverConfig,
}

impl ConfirmationService {
    #[must_use]
    pub fn new(client: GoTrueClient, config: ResolverConfig) -> Self {
        Self {
            client,
            config: config.normalize(),
        }
    }

    #[must_use]
    pub fn client(&self) -> &GoTrueClient {
        &self.client
    }

    /// A resolver with its own provider session, seeded with `bearer` when present.
    #[must_use]
    pub fn resolver(&self, bearer: Option<SecretString>) -> Resolver<GoTrueProvider> {
        let provider = match bearer {
            Some(token) => self.client.scoped_with_access_token(token),
            None => self.client.scoped(),
        };
        Resolver::new(provider, self.config.clone())
    }
}

/// Build the API router with all documented routes registered.
#[must_use]
pub fn router() -> OpenApiRouter {
    openapi::api_router()
}

/// The full application: documented routes, `OPTIONS /health` and the request layers.
pub fn app(service: Arc<ConfirmationService>) -> Router {
    let (router, _openapi) = router().split_for_parts();
    router
        .route("/health", options(handlers::health))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(service)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to bind or serve
pub async fn new(port: u16, service: Arc<ConfirmationService>) -> Result<()> {
    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app(service).into_make_service())
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
