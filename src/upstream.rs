//! Forwarding completion service
//!
//! Posts validated requests to the OpenAI compatible backend configured for each model in the
//! registry. Streaming responses are relayed chunk by chunk; everything else is read whole.
use crate::client::HttpClient;
use crate::registry::ModelRegistry;
use crate::traits::{
    Completion, CompletionError, CompletionRequest, CompletionService, VideoCompletionRequest,
};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, header};
use futures_util::{StreamExt, TryStreamExt};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

const CHAT_COMPLETIONS_PATH: &str = "v1/chat/completions";

pub struct UpstreamService<T: HttpClient> {
    http_client: T,
    registry: Arc<dyn ModelRegistry>,
}

impl<T: HttpClient> std::fmt::Debug for UpstreamService<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamService")
            .field("http_client", &self.http_client)
            .finish_non_exhaustive()
    }
}

impl<T: HttpClient + Send + Sync> UpstreamService<T> {
    pub fn new(http_client: T, registry: Arc<dyn ModelRegistry>) -> Self {
        Self {
            http_client,
            registry,
        }
    }

    #[instrument(skip(self, payload))]
    async fn forward<P: Serialize + Sync>(
        &self,
        model: &str,
        payload: &P,
    ) -> Result<Completion, CompletionError> {
        let info = self.registry.get(model).ok_or_else(|| {
            CompletionError::Unavailable(format!("model {model} is no longer registered"))
        })?;
        let base = info.url.as_ref().ok_or_else(|| {
            CompletionError::Unavailable(format!("no upstream url configured for {model}"))
        })?;

        let mut body = serde_json::to_value(payload)
            .map_err(|e| CompletionError::Unavailable(format!("failed to encode request: {e}")))?;
        if let (Some(rewrite), Some(object)) = (&info.upstream_model, body.as_object_mut()) {
            debug!("Rewriting model to: {}", rewrite);
            object.insert("model".to_string(), Value::String(rewrite.clone()));
        }

        let uri = base
            .join(CHAT_COMPLETIONS_PATH)
            .map_err(|e| CompletionError::Unavailable(format!("invalid upstream url: {e}")))?;

        let mut builder = axum::http::Request::builder()
            .method(Method::POST)
            .uri(uri.as_str())
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = &info.key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        let request = builder
            .body(Body::from(body.to_string()))
            .map_err(|e| CompletionError::Unavailable(format!("failed to build request: {e}")))?;

        debug!(uri = %uri, "Forwarding validated request");
        let response = self
            .http_client
            .request(request)
            .await
            .map_err(|e| CompletionError::Unavailable(e.to_string()))?;

        let status = response.status();
        let is_stream = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));

        if status.is_success() && is_stream {
            let stream = response
                .into_body()
                .into_data_stream()
                .map_err(|e| CompletionError::Unavailable(e.to_string()))
                .boxed();
            return Ok(Completion::Stream(stream));
        }

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .map_err(|e| CompletionError::Unavailable(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(CompletionError::Rejected {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }

        serde_json::from_slice(&bytes)
            .map(Completion::Json)
            .map_err(|e| CompletionError::Unavailable(format!("failed to parse response: {e}")))
    }
}

#[async_trait]
impl<T: HttpClient + Send + Sync> CompletionService for UpstreamService<T> {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError> {
        self.forward(&request.model, &request).await
    }

    async fn complete_video(
        &self,
        request: VideoCompletionRequest,
    ) -> Result<Completion, CompletionError> {
        self.forward(&request.completion.model, &request).await
    }
}
