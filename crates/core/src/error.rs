//! Error types for the taskpilot domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum.

use thiserror::Error;

/// The top-level error type for all taskpilot operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Tool errors ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// The model call failed. Never retried inside the agent loop.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Tool dispatch failures. These are recovered by the agent loop and
/// relayed to the model as the observation for the failed action.
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Invalid arguments for {operation}: {reason}")]
    InvalidArguments { operation: String, reason: String },

    #[error("Operation {operation} failed: {reason}")]
    OperationFailed { operation: String, reason: String },
}

impl ToolError {
    /// Short machine-readable tag for this error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::UnknownOperation(_) => "unknown_operation",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::OperationFailed { .. } => "operation_failed",
        }
    }

    /// Render this error as structured data for the model.
    pub fn to_observation(&self) -> serde_json::Value {
        serde_json::json!({
            "error": {
                "kind": self.kind(),
                "message": self.to_string(),
            }
        })
    }

    /// Wrap a store failure raised while running `operation`.
    pub fn from_store(operation: &str, err: StoreError) -> Self {
        match err {
            StoreError::InvalidArgument(reason) => ToolError::InvalidArguments {
                operation: operation.to_string(),
                reason,
            },
            other => ToolError::OperationFailed {
                operation: operation.to_string(),
                reason: other.to_string(),
            },
        }
    }
}
