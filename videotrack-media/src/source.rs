//! Collaborator interfaces: the live media source, the playback element
//! frames are drawn from, and the rendering attachments.

use crate::error::MediaResult;
use crate::processed::ProcessedSource;
use crate::tracks::{VideoFrame, VideoResolution};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Current settings reported by a media source
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SourceSettings {
    /// Width in pixels, if known
    pub width: Option<u32>,
    /// Height in pixels, if known
    pub height: Option<u32>,
    /// Frames per second, if known
    pub frame_rate: Option<f64>,
}

impl SourceSettings {
    /// Resolution with missing values treated as zero
    pub fn resolution(&self) -> VideoResolution {
        VideoResolution::new(self.width.unwrap_or(0), self.height.unwrap_or(0))
    }
}

/// Whether a source can still produce media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Producing media
    Live,
    /// Will never produce media again
    Ended,
}

/// Transitions reported by a media source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEvent {
    /// The source stopped delivering media
    Muted,
    /// The source resumed delivering media
    Unmuted,
    /// The source ended
    Ended,
}

/// The live media input of a track.
///
/// Owned elsewhere; the track only reads it, subscribes to it and propagates
/// its enabled flag.
pub trait MediaSource: Send + Sync + fmt::Debug {
    /// Stable id of the source
    fn id(&self) -> &str;

    /// Whether the source is enabled
    fn is_enabled(&self) -> bool;

    /// Enable or disable the source
    fn set_enabled(&self, enabled: bool);

    /// Whether the source is currently muted
    fn is_muted(&self) -> bool;

    /// Whether the source is live or ended
    fn ready_state(&self) -> ReadyState;

    /// Current resolution and frame rate
    fn settings(&self) -> SourceSettings;

    /// Subscribe to mute/unmute/ended transitions
    fn subscribe(&self) -> broadcast::Receiver<SourceEvent>;
}

/// Signals raised by the playback element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementEvent {
    /// Metadata, including the intrinsic size, is available
    LoadedMetadata,
    /// The intrinsic size changed
    Resize,
}

/// The playback element the track renders its source into; frames are
/// sampled from here.
#[async_trait]
pub trait FrameSource: Send + Sync + fmt::Debug {
    /// Begin playback; resolves once frames are flowing
    async fn play(&self) -> MediaResult<()>;

    /// Intrinsic video size (zero until metadata is loaded)
    fn video_dimensions(&self) -> VideoResolution;

    /// The frame currently being displayed, if any
    fn current_frame(&self) -> Option<VideoFrame>;

    /// Subscribe to metadata and resize notifications
    fn subscribe(&self) -> broadcast::Receiver<ElementEvent>;
}

/// What an attachment should render
#[derive(Debug, Clone)]
pub enum RenderSource {
    /// The track's original media source
    Original(Arc<dyn MediaSource>),
    /// The processor's output
    Processed(Arc<ProcessedSource>),
    /// Nothing (detached, or the source is gone)
    Empty,
}

impl RenderSource {
    /// Whether this is the processed output
    pub fn is_processed(&self) -> bool {
        matches!(self, RenderSource::Processed(_))
    }

    /// Id of the underlying source, if any
    pub fn source_id(&self) -> Option<String> {
        match self {
            RenderSource::Original(source) => Some(source.id().to_string()),
            RenderSource::Processed(source) => Some(source.id().to_string()),
            RenderSource::Empty => None,
        }
    }
}

/// A rendering target bound to the track
pub trait Attachment: Send + Sync + fmt::Debug {
    /// Stable id of the attachment
    fn id(&self) -> &str;

    /// Replace what this attachment renders
    fn set_source(&self, source: RenderSource);
}
