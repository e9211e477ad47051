//! Collaborator traits for the chat completions gate
//!
//! The gate only decides whether a request is well formed. What happens next is delegated:
//!
//! - **QuotaService**: Best-effort daily quota check, consulted only for valid requests
//! - **CompletionService**: Text and video generation, returning a full result or a chunk stream

mod completion;
mod quota;

pub use completion::{
    ChunkStream, Completion, CompletionError, CompletionRequest, CompletionService,
    VideoCompletionRequest,
};
pub use quota::{NoOpQuota, QuotaError, QuotaService};
