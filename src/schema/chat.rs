//! Chat Completions request schemas
//!
//! The accepted shape follows the OpenAI Chat Completions message format: a role plus either
//! plain text or a list of typed content blocks.
//! See: https://platform.openai.com/docs/api-reference/chat

use super::video::{RawVideoConfig, VideoConfig};
use crate::errors::{ErrorCode, ValidationError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// Request body for POST /v1/chat/completions, as received on the wire.
///
/// Unknown top-level fields are ignored so that richer clients keep working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatCompletionRequest {
    /// The model to use for completion
    pub model: String,

    /// The messages to generate a completion for
    pub messages: Vec<RawMessage>,

    /// Whether to stream the response. Absent means "let the service decide".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,

    /// Reasoning mode tag ("enabled", "disabled"), passed through untouched
    #[serde(
        rename = "thinking",
        alias = "reasoning_mode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reasoning_mode: Option<String>,

    /// Video generation parameters, only used by video-capable models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_config: Option<RawVideoConfig>,
}

/// A message as received on the wire. Both fields are kept as raw JSON so a bad role or an
/// unexpected content shape is reported with its exact location instead of a generic parse
/// failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub role: Value,
    #[serde(default)]
    pub content: Value,
}

/// The role of the message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Developer,
    System,
    User,
    Assistant,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Developer, Role::System, Role::User, Role::Assistant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Developer => "developer",
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|role| role.as_str() == value)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message content - either a string or an array of content blocks
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

/// A single content block. The payload is opaque to the schema; the content validator
/// decides which fields matter for which `type`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ContentBlock(Map<String, Value>);

impl ContentBlock {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The raw `type` tag, if the key is present at all.
    pub fn block_type(&self) -> Option<&Value> {
        self.0.get("type")
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// A schema-valid message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// The plain dictionary form handed to completion services.
    pub fn to_value(&self) -> Value {
        let content = match &self.content {
            MessageContent::Text(text) => Value::String(text.clone()),
            MessageContent::Blocks(blocks) => Value::Array(
                blocks
                    .iter()
                    .map(|block| Value::Object(block.fields().clone()))
                    .collect(),
            ),
        };
        json!({ "role": self.role.as_str(), "content": content })
    }
}

/// A schema-valid chat request. Constructed only through `TryFrom<ChatCompletionRequest>`.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub stream: Option<bool>,
    pub reasoning_mode: Option<String>,
    pub video_config: Option<VideoConfig>,
}

impl ChatRequest {
    pub fn message_values(&self) -> Vec<Value> {
        self.messages.iter().map(Message::to_value).collect()
    }

    /// The video parameters to use, falling back to defaults when none were supplied.
    pub fn resolved_video_config(&self) -> VideoConfig {
        self.video_config.clone().unwrap_or_default()
    }
}

impl TryFrom<ChatCompletionRequest> for ChatRequest {
    type Error = ValidationError;

    fn try_from(request: ChatCompletionRequest) -> Result<Self, Self::Error> {
        let messages = request
            .messages
            .into_iter()
            .enumerate()
            .map(|(idx, message)| convert_message(idx, message))
            .collect::<Result<Vec<_>, _>>()?;

        let video_config = request
            .video_config
            .map(VideoConfig::try_from)
            .transpose()?;

        Ok(ChatRequest {
            model: request.model,
            messages,
            stream: request.stream,
            reasoning_mode: request.reasoning_mode,
            video_config,
        })
    }
}

fn convert_message(idx: usize, message: RawMessage) -> Result<Message, ValidationError> {
    let role = message
        .role
        .as_str()
        .and_then(Role::parse)
        .ok_or_else(|| {
            ValidationError::new(
                "role must be one of developer, system, user, assistant",
                format!("messages.{idx}.role"),
                ErrorCode::InvalidRole,
            )
        })?;

    let content = match message.content {
        Value::String(text) => MessageContent::Text(text),
        Value::Array(items) => MessageContent::Blocks(
            items
                .into_iter()
                .enumerate()
                .map(|(block_idx, item)| match item {
                    Value::Object(fields) => Ok(ContentBlock::new(fields)),
                    // A null entry is an empty block; the content validator reports it.
                    Value::Null => Ok(ContentBlock::default()),
                    _ => Err(ValidationError::new(
                        "Content block must be an object",
                        format!("messages.{idx}.content.{block_idx}"),
                        ErrorCode::InvalidContent,
                    )),
                })
                .collect::<Result<Vec<_>, _>>()?,
        ),
        _ => {
            return Err(ValidationError::new(
                "Message content must be a string or an array of content blocks",
                format!("messages.{idx}.content"),
                ErrorCode::InvalidContent,
            ));
        }
    };

    Ok(Message { role, content })
}
