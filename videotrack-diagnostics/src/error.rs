//! Diagnostics error types

use thiserror::Error;
use videotrack_core::CoreError;

/// Errors raised by the diagnostics layer
#[derive(Error, Debug)]
pub enum DiagnosticsError {
    /// Invalid telemetry or logging configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// A report could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Host layer failure
    #[error("Host error: {0}")]
    Core(#[from] CoreError),
}
