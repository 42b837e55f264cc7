//! Media error types and handling
//!
//! Only configuration errors are meant to reach callers of the track API.
//! Capture-gate failures and processing faults are absorbed by the capture
//! loop and show up in logs and processor events instead.

use thiserror::Error;
use videotrack_core::CoreError;

/// Main error type for video track operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// Invalid configuration provided
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// A processor is already attached to the track
    #[error("A VideoProcessor has already been added.")]
    ProcessorAlreadyAdded,

    /// No processor is attached to the track
    #[error("No existing VideoProcessor detected.")]
    NoProcessor,

    /// The processor passed to remove is not the attached one
    #[error("The provided VideoProcessor is different than the existing one.")]
    ProcessorMismatch,

    /// The track has no playback element yet
    #[error("VideoTrack has not been initialized.")]
    TrackNotInitialized,

    /// Another add/remove is running on the same track
    #[error("A VideoProcessor add or remove is already in progress.")]
    LifecycleBusy,

    /// The playback element failed to start
    #[error("Playback failed: {reason}")]
    PlaybackFailed {
        /// Failure reason
        reason: String,
    },

    /// Host layer failure
    #[error("Host error: {source}")]
    Host {
        /// Underlying host error
        #[from]
        source: CoreError,
    },
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::LifecycleBusy => true,
            MediaError::PlaybackFailed { .. } => true,
            MediaError::Host { source } => source.is_retryable(),
            MediaError::InvalidConfiguration { .. } => false,
            MediaError::ProcessorAlreadyAdded => false,
            MediaError::NoProcessor => false,
            MediaError::ProcessorMismatch => false,
            MediaError::TrackNotInitialized => false,
        }
    }

    /// Get error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            MediaError::InvalidConfiguration { .. } => ErrorCategory::Configuration,
            MediaError::ProcessorAlreadyAdded => ErrorCategory::Configuration,
            MediaError::NoProcessor => ErrorCategory::Configuration,
            MediaError::ProcessorMismatch => ErrorCategory::Configuration,
            MediaError::TrackNotInitialized => ErrorCategory::State,
            MediaError::LifecycleBusy => ErrorCategory::State,
            MediaError::PlaybackFailed { .. } => ErrorCategory::Playback,
            MediaError::Host { .. } => ErrorCategory::System,
        }
    }
}

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// System-level errors (runtime, host)
    System,
    /// Configuration and parameter errors
    Configuration,
    /// State management errors
    State,
    /// Playback element errors
    Playback,
}
