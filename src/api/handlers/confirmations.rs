use super::bearer_token;
use crate::{
    api::ConfirmationService,
    confirm::{
        ErrorKind, IncomingParameters, NavigationPlan, ReconciliationOutcome, Recovery,
        Resolution, Resolver, page::resolve_guarded,
    },
    provider::IdentityProvider,
};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ConfirmationRequest {
    /// The confirmation link as opened by the user, query and fragment included.
    pub url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub path: String,
    pub delay_ms: u64,
}

impl From<NavigationPlan> for Redirect {
    fn from(plan: NavigationPlan) -> Self {
        Self {
            path: plan.path,
            delay_ms: u64::try_from(plan.delay.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationResponse {
    /// `succeeded`, `failed` or `loading`.
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(default)]
    pub recovery: Vec<Recovery>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Redirect>,
}

impl ConfirmationResponse {
    fn from_resolution(resolution: Resolution) -> (StatusCode, Self) {
        let state = resolution.outcome.state();
        let status = match &resolution.outcome {
            ReconciliationOutcome::Confirmed { .. } => StatusCode::OK,
            ReconciliationOutcome::Failed(failure) => match failure.kind {
                ErrorKind::ProviderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Unexpected => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::UNPROCESSABLE_ENTITY,
            },
            ReconciliationOutcome::Indeterminate => StatusCode::SERVICE_UNAVAILABLE,
        };
        let failure = resolution.outcome.failure();

        let response = Self {
            state: state.label().to_string(),
            message: state.message().map(str::to_string),
            kind: failure.map(|failure| failure.kind),
            recovery: failure.map(|failure| failure.recovery.to_vec()).unwrap_or_default(),
            redirect: resolution.navigation.map(Redirect::from),
        };
        (status, response)
    }
}

/// Resolve a confirmation link with `resolver`.
pub async fn resolve_link<P>(
    resolver: Resolver<P>,
    params: IncomingParameters,
) -> (StatusCode, ConfirmationResponse)
where
    P: IdentityProvider + 'static,
{
    let resolution = resolve_guarded(Arc::new(resolver), params).await;
    ConfirmationResponse::from_resolution(resolution)
}

#[utoipa::path(
    post,
    path= "/v1/confirmations",
    request_body = ConfirmationRequest,
    responses (
        (status = 200, description = "Email confirmed; follow the redirect", body = ConfirmationResponse, content_type = "application/json"),
        (status = 400, description = "Missing payload or unparsable URL", body = String),
        (status = 422, description = "The link or account cannot be confirmed", body = ConfirmationResponse),
        (status = 500, description = "Unexpected failure", body = ConfirmationResponse),
        (status = 503, description = "Identity provider unavailable", body = ConfirmationResponse),
    ),
    tag= "confirmations"
)]
#[instrument(skip_all)]
pub async fn confirm(
    headers: HeaderMap,
    service: Extension<Arc<ConfirmationService>>,
    payload: Option<Json<ConfirmationRequest>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload".to_string()).into_response();
    };

    let params = match IncomingParameters::from_url(&request.url) {
        Ok(params) => params,
        Err(err) => {
            debug!("Rejecting confirmation URL: {}", err);
            return (StatusCode::BAD_REQUEST, err.to_string()).into_response();
        }
    };

    let resolver = service.resolver(bearer_token(&headers));
    let (status, response) = resolve_link(resolver, params).await;

    (status, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{Failure, ResolverConfig};
    use crate::provider::{ProviderError, ScriptedProvider, Session, SessionPayload, SessionUser};
    use secrecy::SecretString;

    fn user() -> SessionUser {
        SessionUser {
            id: "user-1".to_string(),
            email: Some("patient@example.com".to_string()),
            email_confirmed_at: Some("2024-01-01".to_string()),
        }
    }

    fn resolver(provider: ScriptedProvider) -> Resolver<ScriptedProvider> {
        Resolver::new(provider, ResolverConfig::new())
    }

    #[tokio::test]
    async fn success_carries_the_redirect() {
        let provider = ScriptedProvider::new().on_verify_otp(Ok(SessionPayload::for_user(user())));
        let params = IncomingParameters::from_parts("token_hash=h&type=email", "");
        let (status, response) = resolve_link(resolver(provider), params).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.state, "succeeded");
        assert!(response.message.is_none());
        assert!(response.recovery.is_empty());
        assert_eq!(
            response.redirect,
            Some(Redirect {
                path: "/dashboard".to_string(),
                delay_ms: 2000
            })
        );
    }

    #[tokio::test]
    async fn link_failures_are_unprocessable() {
        let provider = ScriptedProvider::new()
            .on_set_session(Err(ProviderError::rejected("Invalid Refresh Token")));
        let params = IncomingParameters::from_parts("", "access_token=a&refresh_token=b");
        let (status, response) = resolve_link(resolver(provider), params).await;

        let expected = Failure::refresh_token_rejected();
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.state, "failed");
        assert_eq!(response.message, Some(expected.message));
        assert_eq!(response.kind, Some(ErrorKind::ExpiredOrInvalidToken));
        assert_eq!(response.recovery, expected.recovery.to_vec());
        assert!(response.redirect.is_none());
    }

    #[tokio::test]
    async fn provider_outages_are_service_unavailable() {
        let provider = ScriptedProvider::new()
            .on_get_session(Err(ProviderError::Transport("connection refused".into())));
        let (status, response) =
            resolve_link(resolver(provider), IncomingParameters::default()).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.kind, Some(ErrorKind::ProviderUnavailable));
    }

    #[tokio::test]
    async fn panics_are_internal_errors() {
        let provider = ScriptedProvider::new().panicking();
        let (status, response) =
            resolve_link(resolver(provider), IncomingParameters::default()).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(response.kind, Some(ErrorKind::Unexpected));
    }

    #[tokio::test]
    async fn ambient_success_uses_the_shorter_delay() {
        let session = Session {
            access_token: SecretString::from("access".to_string()),
            refresh_token: None,
            expires_at: None,
            user: user(),
        };
        let provider = ScriptedProvider::new().on_get_session(Ok(Some(session)));
        let (status, response) =
            resolve_link(resolver(provider), IncomingParameters::default()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(response.redirect.map(|r| r.delay_ms), Some(1500));
    }

    #[test]
    fn response_wire_format() {
        let (_, response) = ConfirmationResponse::from_resolution(Resolution::failed(
            Failure::link_required(),
        ));
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["state"], "failed");
        assert_eq!(json["kind"], "no_access_context");
        assert_eq!(json["recovery"], serde_json::json!(["log_in", "sign_up_again"]));
        assert!(json.get("redirect").is_none());
    }
}
