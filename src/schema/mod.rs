//! Request schemas for the chat completions gate
//!
//! Requests are parsed in two steps. The wire types (`ChatCompletionRequest` and friends)
//! are deliberately lenient so that malformed field values still deserialize, then
//! `ChatRequest::try_from` converts them into the typed model, rejecting bad field values
//! with a precise `param` path and a stable code.

pub mod chat;
pub mod video;

pub use chat::{
    ChatCompletionRequest, ChatRequest, ContentBlock, Message, MessageContent, RawMessage, Role,
};
pub use video::{AspectRatio, Preset, RawVideoConfig, Resolution, VideoConfig};
