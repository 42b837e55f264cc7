//! # Video Track Media
//!
//! Video tracks with pluggable frame processors. A [`VideoTrack`] samples
//! frames from its playback element, runs them through a [`VideoProcessor`]
//! on an adaptive schedule and republishes the output as a
//! [`ProcessedSource`] that attachments render instead of the original.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod capture;
mod capture_loop;
pub mod config;
pub mod error;
pub mod events;
pub mod frame_buffer;
pub mod pixel_ratio;
pub mod processed;
pub mod processor;
pub mod source;
pub mod tracks;
pub mod video_track;

// Re-export main types
pub use capture::{
    capture_period, check_capture, next_capture_delay, CaptureBlocker, CaptureCheck,
    CaptureConditions, SourceStatus,
};
pub use config::{VideoTrackConfig, DEFAULT_FRAME_RATE};
pub use error::{ErrorCategory, MediaError, MediaResult};
pub use events::{ProcessorEvent, ProcessorEventSink, ProcessorInfo};
pub use frame_buffer::{FrameBuffer, FrameBufferPair, BYTES_PER_PIXEL};
pub use pixel_ratio::{CallbackId, DevicePixelRatioMonitor, PixelRatioCallback};
pub use processed::ProcessedSource;
pub use processor::{
    run_processor, FrameOutcome, ProcessOutcome, ProcessorError, ProcessorResult, VideoProcessor,
};
pub use source::{
    Attachment, ElementEvent, FrameSource, MediaSource, ReadyState, RenderSource, SourceEvent,
    SourceSettings,
};
pub use tracks::{Dimensions, TrackEvent, TrackOrigin, VideoFrame, VideoResolution};
pub use video_track::{VideoTrack, VideoTrackBuilder};
