//! Error types for the video track host layer

use thiserror::Error;

/// Main error type for host-level operations
#[derive(Error, Debug)]
pub enum CoreError {
    /// Initialization error
    #[error("Initialization failed: {reason}")]
    Initialization {
        /// Reason for initialization failure
        reason: String,
    },

    /// No async runtime available to drive timers and tasks
    #[error("No runtime available: {reason}")]
    RuntimeUnavailable {
        /// Why the runtime could not be found
        reason: String,
    },

    /// Missing configuration error
    #[error("Missing required configuration: {field}")]
    MissingConfiguration {
        /// Missing configuration field
        field: String,
    },

    /// Invalid state error
    #[error("Invalid state: expected {expected}, got {actual}")]
    InvalidState {
        /// Expected state
        expected: String,
        /// Actual state
        actual: String,
    },
}

impl CoreError {
    /// Get error code for programmatic handling
    pub fn error_code(&self) -> String {
        match self {
            CoreError::Initialization { .. } => "INITIALIZATION_FAILED".to_string(),
            CoreError::RuntimeUnavailable { .. } => "RUNTIME_UNAVAILABLE".to_string(),
            CoreError::MissingConfiguration { .. } => "MISSING_CONFIGURATION".to_string(),
            CoreError::InvalidState { .. } => "INVALID_STATE".to_string(),
        }
    }

    /// Whether retrying the operation later could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::RuntimeUnavailable { .. })
    }
}
