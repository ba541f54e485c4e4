//! Structured error types for aura
//!
//! Uses thiserror for ergonomic error definitions with automatic Display
//! and Error trait implementations. The adapters mostly log-and-drop malformed
//! input instead of returning these; the typed variants exist for the paths
//! that do propagate.

use thiserror::Error;

/// All possible errors in aura
#[derive(Error, Debug)]
pub enum AuraError {
    /// Socket connection or I/O error
    #[error("Socket error: {0}")]
    Socket(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem watcher setup or notification error
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

/// Convenience Result type using AuraError
pub type Result<T> = std::result::Result<T, AuraError>;
