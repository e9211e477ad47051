//! chatgate - a request-validation gate for OpenAI compatible chat completions
//!
//! This library decides, before any backend work happens, whether a chat completion request is
//! well formed. Malformed requests are rejected with a `{message, param, code}` triple naming
//! the offending field; valid requests are handed to a text or video completion service
//! depending on the model's capability.
//!
//! The decision logic lives in [`schema`] (field-level checks) and [`validation`] (content
//! rules) and is usable without the HTTP layer:
//!
//! ```ignore
//! use chatgate::registry::Models;
//! use chatgate::schema::{ChatCompletionRequest, ChatRequest};
//! use chatgate::validation::validate_request;
//!
//! let wire: ChatCompletionRequest = serde_json::from_slice(body)?;
//! let request = ChatRequest::try_from(wire)?;
//! validate_request(&request, &models)?;
//! ```

use axum::Router;
use axum::routing::{get, post};
use axum_prometheus::{
    GenericMetricLayer, Handle, PrometheusMetricLayerBuilder,
    metrics_exporter_prometheus::PrometheusHandle,
};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, instrument};

pub mod client;
pub mod errors;
pub mod handlers;
mod models;
pub mod registry;
pub mod schema;
pub mod traits;
pub mod upstream;
pub mod validation;

use registry::ModelRegistry;
use traits::{CompletionService, NoOpQuota, QuotaService};

/// The application state shared by all handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn ModelRegistry>,
    pub completions: Arc<dyn CompletionService>,
    pub quota: Arc<dyn QuotaService>,
}

impl AppState {
    /// Create a new AppState with no quota enforcement
    pub fn new(registry: Arc<dyn ModelRegistry>, completions: Arc<dyn CompletionService>) -> Self {
        Self {
            registry,
            completions,
            quota: Arc::new(NoOpQuota),
        }
    }

    /// Replace the quota service
    pub fn with_quota(mut self, quota: Arc<dyn QuotaService>) -> Self {
        self.quota = quota;
        self
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("models", &self.registry.list().len())
            .finish_non_exhaustive()
    }
}

/// Build the main router
/// This creates routes for:
/// - `POST /v1/chat/completions` - Validates and dispatches chat completions
/// - `GET /v1/models` - Returns the registered models
/// - `GET /models` - Alias of `/v1/models`
#[instrument(skip(state))]
pub fn build_router(state: AppState) -> Router {
    info!("Building router");
    Router::new()
        .route("/v1/chat/completions", post(handlers::chat_completions))
        .route("/v1/models", get(handlers::models))
        .route("/models", get(handlers::models))
        .with_state(state)
}

/// Builds a router for the metrics endpoint.
#[instrument(skip(handle))]
pub fn build_metrics_router(handle: PrometheusHandle) -> Router {
    info!("Building metrics router");
    Router::new().route(
        "/metrics",
        axum::routing::get(move || async move { handle.render() }),
    )
}

type MetricsLayerAndHandle = (
    GenericMetricLayer<'static, PrometheusHandle, Handle>,
    PrometheusHandle,
);

/// Builds a layer and handle for prometheus metrics collection.
///
/// # Parameters
/// - `prefix`: A string prefix for the metrics, either a string literal or an owned string.
pub fn build_metrics_layer_and_handle(
    prefix: impl Into<Cow<'static, str>>,
) -> MetricsLayerAndHandle {
    info!("Building metrics layer");
    PrometheusMetricLayerBuilder::new()
        .with_prefix(prefix)
        .enable_response_body_size(true)
        .with_endpoint_label_type(axum_prometheus::EndpointLabel::Exact)
        .with_default_metrics()
        .build_pair()
}

#[cfg(test)]
pub mod test_utils {
    use super::*;
    use crate::client::HttpClient;
    use crate::registry::{ModelInfo, Models};
    use crate::traits::{
        Completion, CompletionError, CompletionRequest, QuotaError, VideoCompletionRequest,
    };
    use async_trait::async_trait;
    use axum::http::StatusCode;
    use std::sync::Mutex;

    pub struct MockHttpClient {
        pub requests: Arc<Mutex<Vec<MockRequest>>>,
        response_builder: Arc<dyn Fn() -> axum::response::Response + Send + Sync>,
    }

    #[derive(Debug, Clone)]
    pub struct MockRequest {
        pub method: String,
        pub uri: String,
        pub headers: Vec<(String, String)>,
        pub body: Vec<u8>,
    }

    impl MockHttpClient {
        pub fn new(status: StatusCode, body: &str) -> Self {
            let body = body.to_string();
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                response_builder: Arc::new(move || {
                    axum::response::Response::builder()
                        .status(status)
                        .body(axum::body::Body::from(body.clone()))
                        .unwrap()
                }),
            }
        }

        pub fn new_streaming(status: StatusCode, chunks: Vec<String>) -> Self {
            Self {
                requests: Arc::new(Mutex::new(Vec::new())),
                response_builder: Arc::new(move || {
                    use axum::body::Body;
                    use futures_util::stream;

                    let stream = stream::iter(
                        chunks
                            .clone()
                            .into_iter()
                            .map(|chunk| Ok::<_, std::io::Error>(chunk.into_bytes())),
                    );

                    axum::response::Response::builder()
                        .status(status)
                        .header("content-type", "text/event-stream")
                        .body(Body::from_stream(stream))
                        .unwrap()
                }),
            }
        }

        pub fn get_requests(&self) -> Vec<MockRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl std::fmt::Debug for MockHttpClient {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("MockHttpClient")
                .field("requests", &self.requests)
                .field("response_builder", &"<closure>")
                .finish()
        }
    }

    impl Clone for MockHttpClient {
        fn clone(&self) -> Self {
            Self {
                requests: Arc::clone(&self.requests),
                response_builder: Arc::clone(&self.response_builder),
            }
        }
    }

    #[async_trait]
    impl HttpClient for MockHttpClient {
        async fn request(
            &self,
            req: axum::extract::Request,
        ) -> Result<axum::response::Response, Box<dyn std::error::Error + Send + Sync>> {
            let method = req.method().to_string();
            let uri = req.uri().to_string();
            let headers = req
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();

            let body = axum::body::to_bytes(req.into_body(), usize::MAX)
                .await
                .map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?
                .to_vec();

            self.requests.lock().unwrap().push(MockRequest {
                method,
                uri,
                headers,
                body,
            });

            Ok((self.response_builder)())
        }
    }

    /// Records every request the gate lets through.
    #[derive(Debug, Clone, Default)]
    pub struct RecordingService {
        pub text: Arc<Mutex<Vec<CompletionRequest>>>,
        pub video: Arc<Mutex<Vec<VideoCompletionRequest>>>,
    }

    #[async_trait]
    impl CompletionService for RecordingService {
        async fn complete(
            &self,
            request: CompletionRequest,
        ) -> Result<Completion, CompletionError> {
            self.text.lock().unwrap().push(request);
            Ok(Completion::Json(serde_json::json!({"object": "chat.completion"})))
        }

        async fn complete_video(
            &self,
            request: VideoCompletionRequest,
        ) -> Result<Completion, CompletionError> {
            self.video.lock().unwrap().push(request);
            Ok(Completion::Json(serde_json::json!({"object": "video.completion"})))
        }
    }

    /// Rejects every request as over quota.
    #[derive(Debug, Clone, Default)]
    pub struct ExhaustedQuota;

    #[async_trait]
    impl QuotaService for ExhaustedQuota {
        async fn enforce_daily_quota(
            &self,
            _api_key: Option<&str>,
            model: &str,
        ) -> Result<(), QuotaError> {
            Err(QuotaError::Exceeded {
                model: model.to_string(),
            })
        }
    }

    /// A quota backend that can never be reached.
    #[derive(Debug, Clone, Default)]
    pub struct UnavailableQuota;

    #[async_trait]
    impl QuotaService for UnavailableQuota {
        async fn enforce_daily_quota(
            &self,
            _api_key: Option<&str>,
            _model: &str,
        ) -> Result<(), QuotaError> {
            Err(QuotaError::Unavailable("connection refused".to_string()))
        }
    }

    /// Accepts every model name at validation time but has no entry by the time the
    /// request is routed, as after a reload that removed the model.
    #[derive(Debug, Clone, Default)]
    pub struct VanishingRegistry;

    impl ModelRegistry for VanishingRegistry {
        fn get(&self, _name: &str) -> Option<ModelInfo> {
            None
        }

        fn list(&self) -> Vec<(String, ModelInfo)> {
            Vec::new()
        }

        fn is_valid(&self, _name: &str) -> bool {
            true
        }
    }

    pub fn test_models() -> Models {
        Models::from_iter([
            ("grok-4".to_string(), ModelInfo::builder().build()),
            (
                "grok-imagine".to_string(),
                ModelInfo::builder().video(true).build(),
            ),
        ])
    }
}
