//! Content validation for chat requests
//!
//! Runs after schema conversion. Messages are walked in order and blocks within a message in
//! order; the first violation aborts validation. Nothing here performs I/O.

use crate::errors::{ErrorCode, ValidationError};
use crate::registry::ModelRegistry;
use crate::schema::{ChatRequest, ContentBlock, Message, MessageContent, Role};
use serde_json::Value;
use tracing::{debug, instrument};

pub const TEXT: &str = "text";
pub const IMAGE_URL: &str = "image_url";
pub const INPUT_AUDIO: &str = "input_audio";
pub const FILE: &str = "file";

/// Block types that carry a non-text payload. A message containing one of these may also
/// carry blank text blocks (e.g. an image with an empty caption).
const NON_TEXT_TYPES: [&str; 3] = [IMAGE_URL, INPUT_AUDIO, FILE];

const USER_TYPES: &[&str] = &[TEXT, IMAGE_URL, INPUT_AUDIO, FILE];
const TEXT_ONLY: &[&str] = &[TEXT];

/// Blank means nothing but whitespace, counting the ASCII information separators
/// (U+001C..=U+001F) as whitespace too.
fn is_blank(text: &str) -> bool {
    text.trim_matches(|c: char| c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c))
        .is_empty()
}

/// Block types each role may send.
pub fn permitted_block_types(role: Role) -> &'static [&'static str] {
    match role {
        Role::User => USER_TYPES,
        Role::Developer | Role::System | Role::Assistant => TEXT_ONLY,
    }
}

/// Validates a schema-valid request: the model must be known to the registry, then every
/// message must pass the content rules.
#[instrument(skip_all, fields(model = %request.model))]
pub fn validate_request<R>(request: &ChatRequest, registry: &R) -> Result<(), ValidationError>
where
    R: ModelRegistry + ?Sized,
{
    if !registry.is_valid(&request.model) {
        return Err(ValidationError::model_not_found(&request.model));
    }

    validate_messages(&request.messages)?;

    debug!(messages = request.messages.len(), "Request validated");
    Ok(())
}

/// Applies the content rules to each message in order, failing on the first violation.
pub fn validate_messages(messages: &[Message]) -> Result<(), ValidationError> {
    messages
        .iter()
        .enumerate()
        .try_for_each(|(idx, message)| validate_message(idx, message))
}

fn validate_message(idx: usize, message: &Message) -> Result<(), ValidationError> {
    let blocks = match &message.content {
        MessageContent::Text(text) => {
            if is_blank(text) {
                return Err(ValidationError::new(
                    "Message content cannot be empty",
                    format!("messages.{idx}.content"),
                    ErrorCode::EmptyContent,
                ));
            }
            return Ok(());
        }
        MessageContent::Blocks(blocks) => blocks,
    };

    if blocks.is_empty() {
        return Err(ValidationError::new(
            "Message content cannot be an empty array",
            format!("messages.{idx}.content"),
            ErrorCode::EmptyContent,
        ));
    }

    let has_non_text_block = blocks.iter().any(|block| {
        block
            .block_type()
            .and_then(Value::as_str)
            .is_some_and(|ty| NON_TEXT_TYPES.contains(&ty))
    });

    for (block_idx, block) in blocks.iter().enumerate() {
        validate_block(idx, block_idx, message.role, block, has_non_text_block)?;
    }

    Ok(())
}

fn validate_block(
    idx: usize,
    block_idx: usize,
    role: Role,
    block: &ContentBlock,
    has_non_text_block: bool,
) -> Result<(), ValidationError> {
    let path = format!("messages.{idx}.content.{block_idx}");

    if block.is_empty() {
        return Err(ValidationError::new(
            "Content block cannot be empty",
            path,
            ErrorCode::EmptyBlock,
        ));
    }

    let block_type = match block.block_type() {
        None => {
            return Err(ValidationError::new(
                "Content block must have a 'type' field",
                path,
                ErrorCode::MissingType,
            ));
        }
        Some(Value::String(ty)) if !is_blank(ty) => ty.as_str(),
        Some(_) => {
            return Err(ValidationError::new(
                "Content block 'type' cannot be empty",
                format!("{path}.type"),
                ErrorCode::EmptyType,
            ));
        }
    };

    if !permitted_block_types(role).contains(&block_type) {
        let message = match role {
            Role::User => format!("Invalid content block type: '{block_type}'"),
            _ => format!("The `{role}` role only supports 'text' type, got '{block_type}'"),
        };
        return Err(ValidationError::new(
            message,
            format!("{path}.type"),
            ErrorCode::InvalidType,
        ));
    }

    match block_type {
        TEXT => {
            let blank = match block.get("text") {
                None => true,
                Some(Value::String(text)) => is_blank(text),
                Some(_) => true,
            };
            if blank && !has_non_text_block {
                return Err(ValidationError::new(
                    "Text content cannot be empty",
                    format!("{path}.text"),
                    ErrorCode::EmptyText,
                ));
            }
        }
        IMAGE_URL => {
            let has_url = block
                .get(IMAGE_URL)
                .and_then(Value::as_object)
                .and_then(|image| image.get("url"))
                .and_then(Value::as_str)
                .is_some_and(|url| !url.is_empty());
            if !has_url {
                return Err(ValidationError::new(
                    "image_url must have a 'url' field",
                    format!("{path}.image_url"),
                    ErrorCode::MissingUrl,
                ));
            }
        }
        // input_audio and file payloads are checked by the completion service.
        _ => {}
    }

    Ok(())
}
