//! Error types for the analysis pipeline.

use std::time::Duration;

/// Pipeline errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RiftError {
    /// Upstream asked us to slow down.
    #[error("rate limited: retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    /// Requested match or resource does not exist.
    #[error("not found: {resource}")]
    NotFound { resource: String },

    /// Connection reset, 5xx, timeout.
    #[error("transient network error: {message}")]
    TransientNetwork { message: String },

    /// Generated output violates its structural contract.
    #[error("validation failure: {message}")]
    ValidationFailure { message: String },

    /// Generated text makes claims the fact ledger cannot back.
    #[error("hallucination detected: {detail}")]
    HallucinationDetected { detail: String },

    /// Interaction token expired or the original message is gone.
    #[error("delivery expired: {message}")]
    DeliveryExpired { message: String },

    /// Durable store error.
    #[error("storage error: {message}")]
    Storage { message: String },

    /// Narrative cache store error.
    #[error("cache error: {message}")]
    Cache { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("unknown error: {message}")]
    Unknown { message: String },
}

impl RiftError {
    /// Error reported when a per-call timeout elapses. Classified as transient.
    pub fn timeout(operation: &str, after: Duration) -> Self {
        Self::TransientNetwork {
            message: format!("{} timed out after {}ms", operation, after.as_millis()),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::TransientNetwork {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationFailure {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the error is retryable at a stage boundary.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::TransientNetwork { .. })
    }

    /// Stable label used in logs and stage notes.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "rate_limited",
            Self::NotFound { .. } => "not_found",
            Self::TransientNetwork { .. } => "transient_network",
            Self::ValidationFailure { .. } => "validation_failure",
            Self::HallucinationDetected { .. } => "hallucination_detected",
            Self::DeliveryExpired { .. } => "delivery_expired",
            Self::Storage { .. } => "storage",
            Self::Cache { .. } => "cache",
            Self::Config { .. } => "config",
            Self::Unknown { .. } => "unknown",
        }
    }
}

impl From<reqwest::Error> for RiftError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::ValidationFailure {
                message: err.to_string(),
            };
        }
        Self::TransientNetwork {
            message: err.to_string(),
        }
    }
}

impl From<rusqlite::Error> for RiftError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RiftError {
    fn from(err: serde_json::Error) -> Self {
        Self::ValidationFailure {
            message: err.to_string(),
        }
    }
}

/// Result type for pipeline operations.
pub type RiftResult<T> = Result<T, RiftError>;
