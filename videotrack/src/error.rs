//! Session error types

use thiserror::Error;
use videotrack_core::CoreError;
use videotrack_diagnostics::DiagnosticsError;
use videotrack_media::MediaError;

/// Errors returned by the session API
#[derive(Error, Debug)]
pub enum SessionError {
    /// Invalid session configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration {
        /// Error message
        message: String,
    },

    /// The session was closed
    #[error("Session is closed")]
    Closed,

    /// A track with this ID already exists
    #[error("Track already exists: {id}")]
    DuplicateTrack {
        /// Track ID
        id: String,
    },

    /// The session reached `max_tracks`
    #[error("Track limit reached: {limit}")]
    TrackLimit {
        /// Configured limit
        limit: usize,
    },

    /// Track level failure
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Telemetry or logging failure
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),

    /// Host layer failure
    #[error(transparent)]
    Core(#[from] CoreError),
}
