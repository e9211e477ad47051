//! Completion service trait
//!
//! Implement this trait to plug a text or video generation backend behind the gate. The gate
//! calls it only with requests that have passed validation, and hands over the messages as
//! plain JSON dictionaries.

use crate::schema::{ChatRequest, VideoConfig};
use async_trait::async_trait;
use axum::body::Bytes;
use futures_util::stream::BoxStream;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Incremental response chunks, already framed for the client (e.g. SSE `data:` lines).
pub type ChunkStream = BoxStream<'static, Result<Bytes, CompletionError>>;

/// What a completion service returns.
pub enum Completion {
    /// A complete, structured result
    Json(Value),
    /// A sequence of incremental chunks
    Stream(ChunkStream),
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Completion::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Completion::Stream(_) => f.debug_tuple("Stream").field(&"<stream>").finish(),
        }
    }
}

/// Error type for completion services
#[derive(Debug, Clone, PartialEq)]
pub enum CompletionError {
    /// The backend answered with a non-success status; passed through to the client
    Rejected { status: u16, body: String },
    /// The backend could not be reached or its answer could not be read
    Unavailable(String),
}

impl fmt::Display for CompletionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompletionError::Rejected { status, .. } => {
                write!(f, "Completion backend rejected request with status {}", status)
            }
            CompletionError::Unavailable(msg) => {
                write!(f, "Completion backend unavailable: {}", msg)
            }
        }
    }
}

impl std::error::Error for CompletionError {}

/// A validated text completion request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<String>,
}

impl From<&ChatRequest> for CompletionRequest {
    fn from(request: &ChatRequest) -> Self {
        CompletionRequest {
            model: request.model.clone(),
            messages: request.message_values(),
            stream: request.stream,
            thinking: request.reasoning_mode.clone(),
        }
    }
}

/// A validated video completion request: the text request plus resolved video parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoCompletionRequest {
    #[serde(flatten)]
    pub completion: CompletionRequest,
    #[serde(flatten)]
    pub video: VideoConfig,
}

impl From<&ChatRequest> for VideoCompletionRequest {
    fn from(request: &ChatRequest) -> Self {
        VideoCompletionRequest {
            completion: CompletionRequest::from(request),
            video: request.resolved_video_config(),
        }
    }
}

/// Trait for the services that do the actual generation.
///
/// # Example
///
/// ```ignore
/// use chatgate::traits::{Completion, CompletionError, CompletionRequest, CompletionService,
///     VideoCompletionRequest};
/// use async_trait::async_trait;
///
/// struct Echo;
///
/// #[async_trait]
/// impl CompletionService for Echo {
///     async fn complete(
///         &self,
///         request: CompletionRequest,
///     ) -> Result<Completion, CompletionError> {
///         Ok(Completion::Json(serde_json::json!({ "echo": request.messages })))
///     }
///
///     async fn complete_video(
///         &self,
///         request: VideoCompletionRequest,
///     ) -> Result<Completion, CompletionError> {
///         Err(CompletionError::Unavailable("no video backend".into()))
///     }
/// }
/// ```
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate a text completion.
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, CompletionError>;

    /// Generate a video completion.
    async fn complete_video(
        &self,
        request: VideoCompletionRequest,
    ) -> Result<Completion, CompletionError>;
}
