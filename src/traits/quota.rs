//! Daily quota trait
//!
//! Quota is enforced after validation and before any completion call, so a rejected request
//! never consumes quota.

use async_trait::async_trait;
use std::fmt;

/// Error type for quota checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaError {
    /// The caller has used up today's allowance for this model
    Exceeded { model: String },
    /// The quota backend could not be consulted
    Unavailable(String),
}

impl fmt::Display for QuotaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaError::Exceeded { model } => write!(f, "Daily quota exceeded for {}", model),
            QuotaError::Unavailable(msg) => write!(f, "Quota backend unavailable: {}", msg),
        }
    }
}

impl std::error::Error for QuotaError {}

/// Trait for enforcing a per-key daily quota.
///
/// The check is best effort: `QuotaError::Unavailable` is logged and the request proceeds,
/// only `QuotaError::Exceeded` rejects it.
#[async_trait]
pub trait QuotaService: Send + Sync {
    /// Record one request for `api_key` against `model`, failing if the quota is spent.
    ///
    /// `api_key` is the bearer token as presented by the client, or `None` when absent.
    async fn enforce_daily_quota(&self, api_key: Option<&str>, model: &str)
    -> Result<(), QuotaError>;
}

/// No-op implementation that never limits anything.
///
/// This is the default when no quota backend is configured.
#[derive(Debug, Clone, Default)]
pub struct NoOpQuota;

#[async_trait]
impl QuotaService for NoOpQuota {
    async fn enforce_daily_quota(
        &self,
        _api_key: Option<&str>,
        _model: &str,
    ) -> Result<(), QuotaError> {
        Ok(())
    }
}
