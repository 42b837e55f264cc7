//! Configuration types and defaults

use crate::{SessionError, TelemetryConfig, VideoTrackConfig, DEFAULT_LOG_FILTER};

/// Global video track configuration
#[derive(Debug, Clone)]
pub struct GlobalConfig {
    /// Enable debug logging
    pub debug_logging: bool,
    /// Log filter used when `RUST_LOG` is not set
    pub log_filter: String,
    /// Maximum number of tracks per session
    pub max_tracks: usize,
    /// Defaults for tracks created by the session
    pub track: VideoTrackConfig,
    /// Processor telemetry settings
    pub telemetry: TelemetryConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            debug_logging: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            max_tracks: 16,
            track: VideoTrackConfig::default(),
            telemetry: TelemetryConfig::default(),
        }
    }
}

impl GlobalConfig {
    /// Configuration with debug logging turned on
    pub fn debug() -> Self {
        Self {
            debug_logging: true,
            log_filter: "debug".to_string(),
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.max_tracks == 0 {
            return Err(SessionError::InvalidConfiguration {
                message: "max_tracks must be > 0".to_string(),
            });
        }
        self.track.validate()?;
        self.telemetry.validate()?;
        Ok(())
    }
}
