//! Error types for the LLMpu domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Registers, memory and sessions each have their own error enum; the
//! top-level [`Error`] wraps them.

use thiserror::Error;

/// The top-level error type for all LLMpu operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Register errors ---
    #[error("Register error: {0}")]
    Register(#[from] RegisterError),

    // --- Memory errors ---
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),

    // --- Session errors ---
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// A register name outside the fixed set, or a context index out of range.
    #[error("Unknown register '{0}'")]
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("Invalid memory path: '{path}'")]
    PathNotFound { path: String },

    #[error("Invalid memory location for {operation}: '{path}'")]
    InvalidLocation { path: String, operation: &'static str },

    #[error("Cannot pop from empty memory location: '{path}'")]
    EmptySequence { path: String },

    #[error("Storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// The provider answered with a non-success status. `body` is the raw
    /// payload, unmodified.
    #[error("API request failed (status: {status_code}): {body}")]
    Api { status_code: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("Session not configured: {0}")]
    NotConfigured(String),
}
