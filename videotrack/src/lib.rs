//! # Video Track
//!
//! Video tracks with pluggable frame processors. A processor receives each
//! captured frame in an input buffer, writes its result to an output buffer,
//! and the track republishes that output as a new video source that every
//! attached renderer switches to.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use videotrack::{FrameBuffer, MediaSource, ProcessOutcome, Session, VideoProcessor};
//!
//! struct Grayscale;
//!
//! impl VideoProcessor for Grayscale {
//!     fn process_frame<'a>(
//!         &'a self,
//!         input: &'a FrameBuffer,
//!         output: &'a mut FrameBuffer,
//!     ) -> ProcessOutcome<'a> {
//!         for (src, dst) in input.data().chunks(4).zip(output.data_mut().chunks_mut(4)) {
//!             let luma = ((src[0] as u32 + src[1] as u32 + src[2] as u32) / 3) as u8;
//!             dst.copy_from_slice(&[luma, luma, luma, src[3]]);
//!         }
//!         ProcessOutcome::done()
//!     }
//! }
//!
//! # async fn example(camera: Arc<dyn MediaSource>) -> Result<(), videotrack::SessionError> {
//! let session = Session::init()?;
//! let track = session.video_track(camera).id("camera").create()?;
//! track.add_processor(Arc::new(Grayscale))?;
//!
//! let mut events = session.telemetry().subscribe();
//! while let Ok(report) = events.recv().await {
//!     println!("{} fps", report.output_frame_rate);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use videotrack_core::{CoreError, HostCapabilities, Scheduler, TaskHandle, TimerHandle, TokioScheduler};

pub use videotrack_media::{
    Attachment, DevicePixelRatioMonitor, Dimensions, ElementEvent, FrameBuffer, FrameOutcome,
    FrameSource, MediaError, MediaSource, ProcessOutcome, ProcessedSource, ProcessorError,
    ProcessorEvent, ProcessorEventSink, ProcessorInfo, ProcessorResult, ReadyState, RenderSource,
    SourceEvent, SourceSettings, TrackEvent, TrackOrigin, VideoFrame, VideoProcessor,
    VideoResolution, VideoTrack, VideoTrackBuilder, VideoTrackConfig,
};

pub use videotrack_diagnostics::{
    DebugLogger, DiagnosticsError, ProcessorEventObserver, ProcessorTelemetry, ReportKind,
    TelemetryConfig, DEFAULT_LOG_FILTER,
};

// Public API modules
pub mod config;
pub mod error;
pub mod event;
pub mod session;

// Re-export main API types
pub use config::GlobalConfig;
pub use error::SessionError;
pub use event::{EventFilter, EventStream};
pub use session::{Session, TrackBuilder};
