/// Axum handlers for the chat completions gate
use crate::errors::{ApiError, ErrorCode, ValidationError};
use crate::models::ListModelResponse;
use crate::registry::ModelCapability;
use crate::schema::{ChatCompletionRequest, ChatRequest};
use crate::traits::{Completion, CompletionRequest, QuotaError, VideoCompletionRequest};
use crate::validation::validate_request;
use crate::AppState;
use axum::{
    Json,
    body::Body,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, instrument, warn};

/// Validates a chat completion request and, if it is well formed, hands it to the text or
/// video completion service depending on the model's capability.
///
/// Order of checks: body shape, field values (roles, content shape, video parameters), model
/// existence, message content. Quota is only consulted once all of these pass.
#[instrument(skip_all)]
pub async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(rejection_error)?;

    let request = ChatRequest::try_from(payload)?;
    validate_request(&request, state.registry.as_ref())?;

    info!(
        model = %request.model,
        messages = request.messages.len(),
        stream = ?request.stream,
        "Chat completion request accepted"
    );

    match state
        .quota
        .enforce_daily_quota(bearer_token(&headers), &request.model)
        .await
    {
        Ok(()) => {}
        Err(QuotaError::Exceeded { model }) => return Err(ApiError::QuotaExceeded { model }),
        Err(e) => warn!(error = %e, "Quota check failed, continuing"),
    }

    let completion = match state.registry.capability(&request.model) {
        ModelCapability::Video => {
            debug!("Routing to video completion service");
            state
                .completions
                .complete_video(VideoCompletionRequest::from(&request))
                .await?
        }
        ModelCapability::Text => {
            debug!("Routing to text completion service");
            state
                .completions
                .complete(CompletionRequest::from(&request))
                .await?
        }
        // Removed by a registry reload since validation.
        ModelCapability::Unknown => {
            return Err(ValidationError::model_not_found(&request.model).into());
        }
    };

    Ok(completion_response(completion))
}

#[instrument(skip(state))]
pub async fn models(State(state): State<AppState>) -> impl IntoResponse {
    Json(ListModelResponse::from_registry(state.registry.as_ref()))
}

fn completion_response(completion: Completion) -> Response {
    match completion {
        Completion::Json(value) => Json(value).into_response(),
        Completion::Stream(stream) => (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            Body::from_stream(stream),
        )
            .into_response(),
    }
}

/// The bearer token, if any. It is only forwarded to the quota service, never checked here.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Maps body extraction failures onto the common error shape.
fn rejection_error(err: JsonRejection) -> ValidationError {
    let message = match &err {
        JsonRejection::JsonDataError(e) => {
            debug!(error = %e, "Invalid JSON data");
            format!("Invalid request body: {}", e.body_text())
        }
        JsonRejection::JsonSyntaxError(e) => {
            debug!(error = %e, "JSON syntax error");
            format!("JSON syntax error: {}", e.body_text())
        }
        JsonRejection::MissingJsonContentType(_) => {
            "Content-Type must be application/json".to_string()
        }
        JsonRejection::BytesRejection(e) => {
            warn!(error = %e, "Failed to read request body");
            "Failed to read request body".to_string()
        }
        _ => "Invalid request".to_string(),
    };
    ValidationError::new(message, "", ErrorCode::InvalidRequest)
}
