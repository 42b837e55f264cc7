//! Video track configuration

use crate::error::MediaError;
use crate::tracks::TrackOrigin;

/// Frame rate assumed when the media source does not report one
pub const DEFAULT_FRAME_RATE: f64 = 24.0;

/// Per-track configuration
#[derive(Debug, Clone)]
pub struct VideoTrackConfig {
    /// Frame rate used for pacing when the source reports none
    pub default_frame_rate: f64,
    /// Capacity of the track event channel
    pub event_capacity: usize,
    /// Frames buffered per subscriber of the processed source
    pub frame_capacity: usize,
    /// Whether this track is local or received from a remote participant
    pub origin: TrackOrigin,
}

impl Default for VideoTrackConfig {
    fn default() -> Self {
        Self {
            default_frame_rate: DEFAULT_FRAME_RATE,
            event_capacity: 64,
            frame_capacity: 4,
            origin: TrackOrigin::Local,
        }
    }
}

impl VideoTrackConfig {
    /// Configuration for a track received from a remote participant
    pub fn remote() -> Self {
        Self {
            origin: TrackOrigin::Remote,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), MediaError> {
        if !self.default_frame_rate.is_finite() || self.default_frame_rate <= 0.0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Invalid default frame rate".to_string(),
            });
        }

        if self.event_capacity == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Event capacity must be > 0".to_string(),
            });
        }

        if self.frame_capacity == 0 {
            return Err(MediaError::InvalidConfiguration {
                message: "Frame capacity must be > 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = VideoTrackConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_frame_rate, 24.0);
        assert_eq!(config.origin, TrackOrigin::Local);
        assert_eq!(VideoTrackConfig::remote().origin, TrackOrigin::Remote);
    }

    #[test]
    fn test_invalid_configs() {
        let config = VideoTrackConfig {
            default_frame_rate: 0.0,
            ..VideoTrackConfig::default()
        };
        assert!(config.validate().is_err());

        let config = VideoTrackConfig {
            default_frame_rate: f64::INFINITY,
            ..VideoTrackConfig::default()
        };
        assert!(config.validate().is_err());

        let config = VideoTrackConfig {
            event_capacity: 0,
            ..VideoTrackConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
