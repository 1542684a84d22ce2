//! Error types for the parley domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum, folded into [`Error`].

use thiserror::Error;

/// The top-level error type for all parley operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Model backend errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Tool errors (recorded as observations inside the agent loop) ---
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    // --- Client went away or the sink broke ---
    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    // --- History persistence ---
    #[error("History error: {0}")]
    History(#[from] HistoryError),

    // --- Queue / registry ---
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The model call made while planning a step failed.
    #[error("Planning failed at step {step}: {source}")]
    Planning {
        step: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("invalid mode: {0}")]
    InvalidMode(String),

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when the failure came from the delivery sink, either directly or
    /// underneath a planning failure.
    pub fn is_delivery_failure(&self) -> bool {
        match self {
            Self::Delivery(_) => true,
            Self::Planning { source, .. } => source.is_delivery_failure(),
            _ => false,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),

    #[error("{tool_name} failed: {reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("{tool_name} timed out after {timeout_secs}s")]
    Timeout { tool_name: String, timeout_secs: u64 },

    #[error("invalid tool input: {0}")]
    InvalidArguments(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("delivery sink is closed")]
    Closed,

    #[error("delivery sink is broken: {0}")]
    Broken(String),
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("correlation id already registered: {0}")]
    DuplicateCorrelation(String),

    #[error("failed to publish to {queue}: {reason}")]
    PublishFailed { queue: String, reason: String },

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("queue closed: {0}")]
    QueueClosed(String),
}
