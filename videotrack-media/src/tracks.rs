//! Frame, geometry and event types shared by the video track

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// Video frame representation
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// RGBA pixel data, row-major, `width * 4` bytes per row
    pub data: Bytes,
    /// Timestamp in milliseconds
    pub timestamp: u64,
}

impl VideoFrame {
    /// Create a frame from raw RGBA data
    pub fn new(width: u32, height: u32, data: impl Into<Bytes>, timestamp: u64) -> Self {
        Self {
            width,
            height,
            data: data.into(),
            timestamp,
        }
    }

    /// Bytes in one row of pixels
    pub fn stride(&self) -> usize {
        self.width as usize * crate::frame_buffer::BYTES_PER_PIXEL
    }
}

/// Video resolution information
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct VideoResolution {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl VideoResolution {
    /// Create a resolution
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 1280x720
    pub const HD: Self = Self::new(1280, 720);
    /// 640x480
    pub const VGA: Self = Self::new(640, 480);

    /// Number of pixels; wide enough for any `u32` geometry
    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

/// A track's width and height; both are `None` until the track has started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels, if known
    pub width: Option<u32>,
    /// Height in pixels, if known
    pub height: Option<u32>,
}

impl Dimensions {
    /// Whether these dimensions differ from the given resolution
    pub fn differs_from(&self, resolution: VideoResolution) -> bool {
        self.width != Some(resolution.width) || self.height != Some(resolution.height)
    }
}

impl From<VideoResolution> for Dimensions {
    fn from(resolution: VideoResolution) -> Self {
        Self {
            width: Some(resolution.width),
            height: Some(resolution.height),
        }
    }
}

/// Where the track's media comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackOrigin {
    /// Captured and published by this side
    Local,
    /// Received from a remote participant
    Remote,
}

/// Events observable on a video track
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEvent {
    /// The track's dimensions changed
    DimensionsChanged {
        /// The new dimensions
        dimensions: Dimensions,
    },
    /// There is enough video data to begin playback
    Started,
    /// The track was enabled
    Enabled,
    /// The track was disabled ("paused")
    Disabled,
}

impl TrackEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            TrackEvent::DimensionsChanged { .. } => "dimensionsChanged",
            TrackEvent::Started => "started",
            TrackEvent::Enabled => "enabled",
            TrackEvent::Disabled => "disabled",
        }
    }
}
