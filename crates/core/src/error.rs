//! Error types for the docchat domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each pipeline stage has its own error enum; the top-level [`Error`]
//! carries the originating one unchanged.

use thiserror::Error;

/// The top-level error type for all docchat operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Retrieval errors ---
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    // --- Prompt template errors ---
    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    // --- Conversation history errors ---
    #[error("History format error: {0}")]
    HistoryFormat(#[from] HistoryFormatError),

    // --- Completion errors ---
    #[error("Completion error: {0}")]
    Completion(#[from] CompletionError),
}

impl Error {
    /// Stable, machine-readable error kind.
    ///
    /// Completion errors are qualified by their subtype, e.g.
    /// `completion.rate_limited`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Retrieval(_) => "retrieval",
            Self::Template(_) => "template",
            Self::HistoryFormat(_) => "history_format",
            Self::Completion(e) => e.kind(),
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum RetrievalError {
    #[error("Result count must be positive (got k = {0})")]
    InvalidK(usize),

    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Query embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("Missing value for template variable '{name}'")]
    MissingVariable { name: String },

    #[error("Malformed template at byte {position}: {reason}")]
    Malformed { position: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HistoryFormatError {
    #[error("History turn {index} has {len} element(s), expected exactly 2 (question, answer)")]
    WrongArity { index: usize, len: usize },

    #[error("Unknown message role '{0}'")]
    UnknownRole(String),
}

#[derive(Debug, Clone, Error)]
pub enum CompletionError {
    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Model refused to answer: {raw}")]
    Refusal { raw: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("API request failed: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request cancelled by caller")]
    Cancelled,

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl CompletionError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RateLimited { .. } => "completion.rate_limited",
            Self::Timeout(_) => "completion.timeout",
            Self::Transport(_) => "completion.transport",
            Self::Refusal { .. } => "completion.refusal",
            Self::Authentication(_) => "completion.authentication",
            Self::Api { .. } => "completion.api",
            Self::StreamInterrupted(_) => "completion.stream_interrupted",
            Self::Cancelled => "completion.cancelled",
            Self::NotConfigured(_) => "completion.not_configured",
        }
    }
}
