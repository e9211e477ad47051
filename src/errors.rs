//! Error types surfaced to clients and collaborators
//!
//! Every rejection produced by the gate carries the same triple: a human readable `message`,
//! a dotted `param` path pointing at the offending field, and a stable machine-readable
//! `code`. The codes are part of the public contract and must never change spelling.
use crate::traits::CompletionError;
use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fmt;
use tracing::{debug, error, warn};

/// Stable rejection codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    ModelNotFound,
    EmptyContent,
    EmptyBlock,
    MissingType,
    EmptyType,
    InvalidType,
    EmptyText,
    MissingUrl,
    InvalidAspectRatio,
    InvalidVideoLength,
    InvalidResolution,
    InvalidPreset,
    InvalidRole,
    InvalidContent,
    InvalidRequest,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ModelNotFound => "model_not_found",
            ErrorCode::EmptyContent => "empty_content",
            ErrorCode::EmptyBlock => "empty_block",
            ErrorCode::MissingType => "missing_type",
            ErrorCode::EmptyType => "empty_type",
            ErrorCode::InvalidType => "invalid_type",
            ErrorCode::EmptyText => "empty_text",
            ErrorCode::MissingUrl => "missing_url",
            ErrorCode::InvalidAspectRatio => "invalid_aspect_ratio",
            ErrorCode::InvalidVideoLength => "invalid_video_length",
            ErrorCode::InvalidResolution => "invalid_resolution",
            ErrorCode::InvalidPreset => "invalid_preset",
            ErrorCode::InvalidRole => "invalid_role",
            ErrorCode::InvalidContent => "invalid_content",
            ErrorCode::InvalidRequest => "invalid_request",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request violation. Validation is fail-fast, so a rejected request yields
/// exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} (param: {param}, code: {code})")]
pub struct ValidationError {
    pub message: String,
    pub param: String,
    pub code: ErrorCode,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, param: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            message: message.into(),
            param: param.into(),
            code,
        }
    }

    pub fn model_not_found(model: &str) -> Self {
        Self::new(
            format!("The model `{model}` does not exist or you do not have access to it."),
            "model",
            ErrorCode::ModelNotFound,
        )
    }
}

/// Errors returned by the chat completions endpoint.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Daily quota exceeded for model `{model}`")]
    QuotaExceeded { model: String },

    #[error(transparent)]
    Completion(#[from] CompletionError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Validation(err) => {
                // Client mistakes, not system failures.
                debug!(code = %err.code, param = %err.param, "Rejected request");
                let body = json!({
                    "error": {
                        "message": err.message,
                        "type": "invalid_request_error",
                        "param": err.param,
                        "code": err.code,
                    }
                });
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::QuotaExceeded { model } => {
                warn!(model = %model, "Daily quota exceeded");
                let body = json!({
                    "error": {
                        "message": format!("Daily quota exceeded for model `{model}`"),
                        "type": "rate_limit_error",
                        "param": "model",
                        "code": "quota_exceeded",
                    }
                });
                (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response()
            }
            ApiError::Completion(CompletionError::Rejected { status, body }) => {
                // Backend errors are passed through as-is.
                warn!(status, "Completion backend rejected request");
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
                (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
            }
            ApiError::Completion(CompletionError::Unavailable(message)) => {
                error!(error = %message, "Completion service failed");
                let body = json!({
                    "error": {
                        "message": "Failed to reach completion service",
                        "type": "upstream_error",
                        "param": null,
                        "code": "upstream_error",
                    }
                });
                (StatusCode::BAD_GATEWAY, Json(body)).into_response()
            }
        }
    }
}
