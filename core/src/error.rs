use serde::Serialize;
use utoipa::ToSchema;

/// Structured error body returned by the HTTP API.
/// Turns never surface these to the chat user; they are for API clients
/// that send malformed requests.
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiError {
    /// Machine-readable error code (e.g. "validation_failed", "unauthorized")
    pub error: String,
    /// Human-readable description of what went wrong
    pub message: String,
    /// Which field caused the error (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// The value that was received (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<serde_json::Value>,
    /// Request ID for tracing and debugging
    pub request_id: String,
    /// Hint about what the correct usage looks like
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docs_hint: Option<String>,
}

/// Error codes used across the API
pub mod codes {
    pub const VALIDATION_FAILED: &str = "validation_failed";
    pub const INTERNAL_ERROR: &str = "internal_error";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const RATE_LIMITED: &str = "rate_limited";
}

/// Failure of the external text-completion collaborator.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("generation collaborator is not configured: {0}")]
    NotConfigured(String),
    #[error("generation timed out after {0} seconds")]
    Timeout(u64),
    #[error("generation transport failed: {0}")]
    Transport(String),
    #[error("generation returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("generation returned no content")]
    EmptyResponse,
}

/// Failure of the note store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("note store backend failed: {0}")]
    Backend(String),
    #[error("note store unavailable")]
    Unavailable,
}
