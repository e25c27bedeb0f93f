//! Error types for the render pipeline

use thiserror::Error;

use vstility_plugin::PluginError;

/// Render pipeline errors
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Input file not found: {0}")]
    InputNotFound(String),

    #[error("Failed to decode audio file: {0}")]
    DecodeError(String),

    #[error("Failed to open output stream: {0}")]
    OutputStreamError(String),

    #[error("Failed to construct encode writer: {0}")]
    EncodeWriterError(String),

    #[error("Channel mismatch: expected {expected}, got {actual}")]
    ChannelMismatch { expected: usize, actual: usize },

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for render operations
pub type RenderResult<T> = Result<T, RenderError>;
