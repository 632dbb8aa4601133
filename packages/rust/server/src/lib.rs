//! HTTP surface for the content pipeline.
//!
//! Exposes `POST /content-pipeline` (also mounted at `/`), a CORS preflight
//! answer for browser callers, and `GET /health`.

pub mod dto;

use std::sync::Arc;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::signal;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, error, info, instrument, warn};
use url::Url;

use contentpipe_core::gateway::{self, GatewayClient};
use contentpipe_core::{SilentProgress, run_pipeline};
use contentpipe_shared::{
    AppConfig, ContentPipelineError, ErrorKind, GatewayConfig, PipelineRequest, Result,
    resolve_api_key,
};

use crate::dto::{ErrorBody, PipelineBody, PipelineResponse};

/// Headers browser clients are allowed to send on the pipeline route.
const ALLOWED_HEADERS: [&str; 4] = ["authorization", "x-client-info", "apikey", "content-type"];

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// Where the upstream API key comes from.
#[derive(Debug, Clone)]
pub enum ApiKeySource {
    /// Read the env var named in the gateway config on every request.
    Env,
    /// Fixed key, supplied by the embedding application.
    Fixed(String),
}

/// Immutable state shared by every request.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<StateInner>,
}

struct StateInner {
    gateway: GatewayConfig,
    endpoint: Url,
    http: reqwest::Client,
    api_key: ApiKeySource,
}

impl AppState {
    pub fn new(gateway: GatewayConfig, api_key: ApiKeySource) -> Result<Self> {
        let endpoint = gateway.validate()?;
        let http = gateway::build_http_client(&gateway)?;
        Ok(Self {
            inner: Arc::new(StateInner {
                gateway,
                endpoint,
                http,
                api_key,
            }),
        })
    }

    fn api_key(&self) -> Result<String> {
        match &self.inner.api_key {
            ApiKeySource::Env => resolve_api_key(&self.inner.gateway),
            ApiKeySource::Fixed(key) if !key.is_empty() => Ok(key.clone()),
            ApiKeySource::Fixed(_) => Err(ContentPipelineError::config(format!(
                "{} is not configured",
                self.inner.gateway.api_key_env
            ))),
        }
    }

    fn client(&self) -> Result<GatewayClient> {
        let key = self.api_key()?;
        Ok(GatewayClient::with_http(
            self.inner.http.clone(),
            self.inner.endpoint.clone(),
            self.inner.gateway.model.clone(),
            key,
        ))
    }
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(content_pipeline).options(preflight))
        .route(
            "/content-pipeline",
            post(content_pipeline).options(preflight),
        )
        .route("/health", get(health))
        .layer(cors_layer())
        .layer(access_log_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(ALLOWED_HEADERS.map(HeaderName::from_static))
        .expose_headers([header::CONTENT_TYPE])
}

/// Request/response access log, emitted at INFO so the default filter shows it.
fn access_log_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>> {
    TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO))
}

/// Bind the configured address and serve until Ctrl+C or SIGTERM.
pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = AppState::new(config.gateway.clone(), ApiKeySource::Env)?;

    if resolve_api_key(&config.gateway).is_err() {
        warn!(
            var = %config.gateway.api_key_env,
            "API key env var is not set, requests will fail until it is"
        );
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ContentPipelineError::Network(format!("failed to bind {addr}: {e}")))?;

    info!(%addr, model = %config.gateway.model, "content pipeline server listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ContentPipelineError::Network(format!("server terminated with error: {e}")))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received terminate signal, shutting down"),
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn preflight() -> StatusCode {
    StatusCode::OK
}

async fn content_pipeline(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PipelineBody>, JsonRejection>,
) -> Response {
    match handle_pipeline(&state, payload).await {
        Ok(body) => Json(body).into_response(),
        Err(err) => {
            error!(error = %err, "content pipeline request failed");
            error_response(&err)
        }
    }
}

#[instrument(skip_all)]
async fn handle_pipeline(
    state: &AppState,
    payload: std::result::Result<Json<PipelineBody>, JsonRejection>,
) -> Result<PipelineResponse> {
    let Json(body) = payload.map_err(|e| ContentPipelineError::validation(e.body_text()))?;
    let request = PipelineRequest::new(body.message, body.context.unwrap_or_default())?;

    // Resolved before anything goes upstream.
    let client = state.client()?;

    let result = run_pipeline(&client, &request, &SilentProgress).await?;
    Ok(result.into())
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Config | ErrorKind::Upstream | ErrorKind::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn error_response(err: &ContentPipelineError) -> Response {
    (
        status_for(err.kind()),
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn gateway_for(server: &MockServer) -> GatewayConfig {
        GatewayConfig {
            endpoint: format!("{}/v1/chat/completions", server.uri()),
            ..GatewayConfig::default()
        }
    }

    fn app_for(server: &MockServer, key: ApiKeySource) -> Router {
        router(AppState::new(gateway_for(server), key).unwrap())
    }

    fn completion(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"content": text}}]
        }))
    }

    async fn mount(server: &MockServer, marker: &str, response: ResponseTemplate, calls: u64) {
        Mock::given(method("POST"))
            .and(body_string_contains(marker))
            .respond_with(response)
            .expect(calls)
            .mount(server)
            .await;
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let server = MockServer::start().await;
        let app = app_for(&server, ApiKeySource::Fixed("k".into()));

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn pipeline_success_returns_content_and_trace() {
        let server = MockServer::start().await;
        mount(&server, "IDEA AGENT", completion("three angles"), 1).await;
        mount(&server, "DRAFT AGENT", completion("a draft"), 1).await;
        mount(&server, "EDITOR AGENT", completion("Sip. Smile. Repeat."), 1).await;

        let app = app_for(&server, ApiKeySource::Fixed("k".into()));
        let response = app
            .oneshot(post_json(
                "/content-pipeline",
                r#"{"message":"Write a tagline for a coffee shop","context":""}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );

        let body = json_body(response).await;
        assert_eq!(body["content"], "Sip. Smile. Repeat.");
        assert_eq!(body["pipeline"]["finalContent"], "Sip. Smile. Repeat.");
        let agents: Vec<_> = body["pipeline"]["stages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["agent"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(agents, ["Idea Agent", "Draft Agent", "Editor Agent"]);
        assert_eq!(body["pipeline"]["stages"][1]["output"], "a draft");
    }

    #[tokio::test]
    async fn root_path_is_an_alias() {
        let server = MockServer::start().await;
        mount(&server, "IDEA AGENT", completion("i"), 1).await;
        mount(&server, "DRAFT AGENT", completion("d"), 1).await;
        mount(&server, "EDITOR AGENT", completion("e"), 1).await;

        let app = app_for(&server, ApiKeySource::Fixed("k".into()));
        let response = app
            .oneshot(post_json("/", r#"{"message":"hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["content"], "e");
    }

    #[tokio::test]
    async fn upstream_failure_returns_error_without_pipeline() {
        let server = MockServer::start().await;
        mount(&server, "IDEA AGENT", completion("i"), 1).await;
        mount(&server, "DRAFT AGENT", completion("d"), 1).await;
        mount(&server, "EDITOR AGENT", ResponseTemplate::new(503), 1).await;

        let app = app_for(&server, ApiKeySource::Fixed("k".into()));
        let response = app
            .oneshot(post_json("/content-pipeline", r#"{"message":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = json_body(response).await;
        assert_eq!(body, json!({"error": "Editor Agent error: 503"}));
    }

    #[tokio::test]
    async fn missing_api_key_short_circuits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("never"))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = GatewayConfig {
            api_key_env: "CP_TEST_UNSET_KEY_98765".into(),
            ..gateway_for(&server)
        };
        let app = router(AppState::new(gateway, ApiKeySource::Env).unwrap());
        let response = app
            .oneshot(post_json("/content-pipeline", r#"{"message":"hi"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json_body(response).await,
            json!({"error": "CP_TEST_UNSET_KEY_98765 is not configured"})
        );
    }

    #[tokio::test]
    async fn invalid_bodies_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(completion("never"))
            .expect(0)
            .mount(&server)
            .await;

        for body in ["not json", r#"{"context":"x"}"#, r#"{"message":"   "}"#] {
            let app = app_for(&server, ApiKeySource::Fixed("k".into()));
            let response = app
                .oneshot(post_json("/content-pipeline", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let value = json_body(response).await;
            assert!(value["error"].is_string());
            assert!(value.get("pipeline").is_none());
        }
    }

    #[tokio::test]
    async fn preflight_returns_permissive_cors() {
        let server = MockServer::start().await;
        let app = app_for(&server, ApiKeySource::Fixed("k".into()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/content-pipeline")
            .header("origin", "https://app.example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "apikey, content-type")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get("access-control-allow-origin").unwrap(), "*");
        let allowed = headers
            .get("access-control-allow-headers")
            .unwrap()
            .to_str()
            .unwrap();
        for name in ALLOWED_HEADERS {
            assert!(allowed.contains(name), "missing {name} in {allowed}");
        }
    }

    #[tokio::test]
    async fn bare_options_is_answered() {
        let server = MockServer::start().await;
        let app = app_for(&server, ApiKeySource::Fixed("k".into()));

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/content-pipeline")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[derive(Clone, Default)]
    struct CapturedEvents(Arc<std::sync::Mutex<Vec<(Level, String)>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CapturedEvents {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            let meta = event.metadata();
            self.0
                .lock()
                .unwrap()
                .push((*meta.level(), meta.target().to_string()));
        }
    }

    #[tokio::test]
    async fn access_log_is_emitted_at_info() {
        use tracing_subscriber::layer::SubscriberExt;

        let captured = CapturedEvents::default();
        let subscriber = tracing_subscriber::registry().with(captured.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let server = MockServer::start().await;
        let app = app_for(&server, ApiKeySource::Fixed("k".into()));
        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let events = captured.0.lock().unwrap();
        let access: Vec<_> = events
            .iter()
            .filter(|(_, target)| target.starts_with("tower_http::trace"))
            .collect();
        assert!(
            access.len() >= 2,
            "expected request and response events, got {events:?}"
        );
        assert!(access.iter().all(|(level, _)| *level == Level::INFO));
    }

    #[test]
    fn state_rejects_unusable_endpoint() {
        let gateway = GatewayConfig {
            endpoint: "ftp://gateway.example/v1".into(),
            ..GatewayConfig::default()
        };
        let err = AppState::new(gateway, ApiKeySource::Fixed("k".into()))
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn state_keeps_validated_endpoint() {
        let state = AppState::new(GatewayConfig::default(), ApiKeySource::Fixed("k".into()))
            .unwrap();
        assert_eq!(
            state.inner.endpoint.as_str(),
            "https://ai.gateway.lovable.dev/v1/chat/completions"
        );
        assert!(state.client().is_ok());
    }

    #[test]
    fn empty_fixed_key_is_a_config_error() {
        let state = AppState::new(GatewayConfig::default(), ApiKeySource::Fixed(String::new()))
            .unwrap();
        let err = state.api_key().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
    }
}
