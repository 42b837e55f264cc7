//! The synthetic output stream fed from a processor's output buffer

use crate::frame_buffer::FrameBuffer;
use crate::tracks::VideoFrame;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;
use tokio::sync::broadcast;
use tracing::trace;
use uuid::Uuid;

/// Media source produced from the output buffer while a processor is attached.
///
/// Frames are only emitted when [`ProcessedSource::request_frame`] is called;
/// there is no free-running capture.
#[derive(Debug)]
pub struct ProcessedSource {
    id: String,
    enabled: AtomicBool,
    muted: AtomicBool,
    frames_published: AtomicU64,
    created_at: Instant,
    frame_tx: broadcast::Sender<VideoFrame>,
}

impl ProcessedSource {
    /// Create a new source; `capacity` bounds frames buffered per subscriber
    pub fn new(capacity: usize) -> Self {
        let (frame_tx, _) = broadcast::channel(capacity.max(1));
        Self {
            id: Uuid::new_v4().to_string(),
            enabled: AtomicBool::new(true),
            muted: AtomicBool::new(false),
            frames_published: AtomicU64::new(0),
            created_at: Instant::now(),
            frame_tx,
        }
    }

    /// Unique id of this source instance
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Whether the source is enabled
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Mirror the track's enabled flag
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Whether consumers reported the source as muted
    pub fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    /// Record the mute state reported by whatever consumes this source
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    /// Frames published so far
    pub fn frames_published(&self) -> u64 {
        self.frames_published.load(Ordering::SeqCst)
    }

    /// Publish the current contents of `output` as a new frame
    pub fn request_frame(&self, output: &FrameBuffer) {
        let timestamp = self.created_at.elapsed().as_millis() as u64;
        let sequence = self.frames_published.fetch_add(1, Ordering::SeqCst) + 1;
        trace!("Processed source {} publishing frame {}", self.id, sequence);
        // No subscribers is fine; the frame is simply dropped
        let _ = self.frame_tx.send(output.to_frame(timestamp));
    }

    /// Subscribe to published frames
    pub fn subscribe(&self) -> broadcast::Receiver<VideoFrame> {
        self.frame_tx.subscribe()
    }
}
