//! Video track: processor lifecycle, attachments and dimension tracking
//!
//! A [`VideoTrack`] pulls frames from its playback element, runs them through
//! an optional [`VideoProcessor`] and republishes the result as a
//! [`ProcessedSource`]. The capture loop itself lives in `capture_loop.rs`;
//! this module binds it to attach/detach, enable/disable, publish and
//! processor add/remove transitions.

use crate::capture::{check_capture, CaptureCheck, CaptureConditions, CaptureSession, SourceStatus};
use crate::config::VideoTrackConfig;
use crate::error::{MediaError, MediaResult};
use crate::events::{ProcessorEvent, ProcessorEventSink, ProcessorInfo};
use crate::frame_buffer::FrameBufferPair;
use crate::processed::ProcessedSource;
use crate::processor::VideoProcessor;
use crate::source::{
    Attachment, ElementEvent, FrameSource, MediaSource, ReadyState, RenderSource, SourceEvent,
};
use crate::tracks::{Dimensions, TrackEvent, TrackOrigin};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, trace, warn};
use uuid::Uuid;
use videotrack_core::{HostCapabilities, Scheduler, TaskHandle, TokioScheduler};

/// Fluent builder for [`VideoTrack`]
#[derive(Default)]
pub struct VideoTrackBuilder {
    id: Option<String>,
    media_source: Option<Arc<dyn MediaSource>>,
    config: VideoTrackConfig,
    scheduler: Option<Arc<dyn Scheduler>>,
    capabilities: Option<HostCapabilities>,
}

impl VideoTrackBuilder {
    /// Set the track id (a random id is used otherwise)
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Set the live media source; the track only keeps a weak reference
    pub fn media_source(mut self, source: Arc<dyn MediaSource>) -> Self {
        self.media_source = Some(source);
        self
    }

    /// Per-track configuration
    pub fn config(mut self, config: VideoTrackConfig) -> Self {
        self.config = config;
        self
    }

    /// Scheduler driving the capture loop (defaults to the current tokio runtime)
    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Override detected host capabilities
    pub fn capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = Some(capabilities);
        self
    }

    /// Validate the configuration and create the track
    pub fn build(self) -> MediaResult<VideoTrack> {
        self.config.validate()?;

        let scheduler: Arc<dyn Scheduler> = match self.scheduler {
            Some(scheduler) => scheduler,
            None => Arc::new(TokioScheduler::current()?),
        };
        let capabilities = self.capabilities.unwrap_or_else(HostCapabilities::detect);
        let id = self.id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let is_enabled = self.media_source.as_ref().map_or(true, |s| s.is_enabled());
        let (events, _) = broadcast::channel(self.config.event_capacity);

        debug!("Creating video track {}", id);
        let state = TrackState {
            media_source: self.media_source.as_ref().map(Arc::downgrade),
            frame_source: None,
            dimensions: Dimensions::default(),
            is_enabled,
            is_started: false,
            is_publishing: false,
            attachments: Vec::new(),
            processor: None,
            processed_source: None,
            buffers: None,
            capture: CaptureSession::default(),
            unmute_listener: None,
            dimension_listener: None,
        };

        Ok(VideoTrack {
            shared: Arc::new(Shared {
                id,
                config: self.config,
                capabilities,
                scheduler,
                state: Mutex::new(state),
                lifecycle_busy: AtomicBool::new(false),
                events,
                processor_sinks: RwLock::new(Vec::new()),
            }),
        })
    }
}

/// A media stream of kind video with an optional frame processor
#[derive(Clone)]
pub struct VideoTrack {
    shared: Arc<Shared>,
}

pub(crate) struct Shared {
    pub(crate) id: String,
    pub(crate) config: VideoTrackConfig,
    pub(crate) capabilities: HostCapabilities,
    pub(crate) scheduler: Arc<dyn Scheduler>,
    pub(crate) state: Mutex<TrackState>,
    lifecycle_busy: AtomicBool,
    events: broadcast::Sender<TrackEvent>,
    processor_sinks: RwLock<Vec<Arc<dyn ProcessorEventSink>>>,
}

pub(crate) struct TrackState {
    media_source: Option<Weak<dyn MediaSource>>,
    pub(crate) frame_source: Option<Arc<dyn FrameSource>>,
    dimensions: Dimensions,
    is_enabled: bool,
    is_started: bool,
    is_publishing: bool,
    attachments: Vec<Arc<dyn Attachment>>,
    pub(crate) processor: Option<Arc<dyn VideoProcessor>>,
    pub(crate) processed_source: Option<Arc<ProcessedSource>>,
    pub(crate) buffers: Option<FrameBufferPair>,
    pub(crate) capture: CaptureSession,
    unmute_listener: Option<TaskHandle>,
    dimension_listener: Option<TaskHandle>,
}

impl TrackState {
    pub(crate) fn media_source(&self) -> Option<Arc<dyn MediaSource>> {
        self.media_source.as_ref().and_then(Weak::upgrade)
    }

    fn render_source(&self) -> RenderSource {
        if let Some(processed) = &self.processed_source {
            RenderSource::Processed(processed.clone())
        } else if let Some(source) = self.media_source() {
            RenderSource::Original(source)
        } else {
            RenderSource::Empty
        }
    }

    fn capture_conditions(&self) -> CaptureConditions {
        CaptureConditions {
            source: self.media_source().map(|source| SourceStatus {
                enabled: source.is_enabled(),
                ended: source.ready_state() == ReadyState::Ended,
            }),
            has_processor: self.processor.is_some(),
            attachment_count: self.attachments.len(),
            is_publishing: self.is_publishing,
        }
    }
}

/// Held while an add/remove runs; a second one fails with `LifecycleBusy`
struct LifecycleGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for LifecycleGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

fn same_processor(a: &Arc<dyn VideoProcessor>, b: &Arc<dyn VideoProcessor>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl Shared {
    pub(crate) fn capture_check(&self, state: &TrackState) -> CaptureCheck {
        check_capture(&state.capture_conditions())
    }

    fn lifecycle_guard(&self) -> MediaResult<LifecycleGuard<'_>> {
        self.lifecycle_busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| MediaError::LifecycleBusy)?;
        Ok(LifecycleGuard {
            busy: &self.lifecycle_busy,
        })
    }

    fn emit_track_event(&self, event: TrackEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(crate) fn emit_processor_event(&self, event: ProcessorEvent) {
        if matches!(event, ProcessorEvent::Stats) {
            trace!("Track {} processor event: stats", self.id);
        } else {
            debug!("Track {} processor event: {:?}", self.id, event);
        }

        let sinks = self.processor_sinks.read().clone();
        for sink in sinks {
            sink.on_processor_event(&self.id, &event);
        }
    }

    /// Point every attachment at the processed source if there is one,
    /// otherwise at the original source
    fn update_attachments(&self) {
        let (attachments, source) = {
            let state = self.state.lock();
            (state.attachments.clone(), state.render_source())
        };
        for attachment in attachments {
            attachment.set_source(source.clone());
        }
    }

    fn add_processor_inner(self: &Arc<Self>, processor: Arc<dyn VideoProcessor>) -> MediaResult<()> {
        let info = {
            let mut state = self.state.lock();
            if state.processor.is_some() {
                return Err(MediaError::ProcessorAlreadyAdded);
            }
            if state.frame_source.is_none() {
                return Err(MediaError::TrackNotInitialized);
            }

            debug!("Adding {} to track {}", processor.name(), self.id);
            let source = state.media_source();
            if state.unmute_listener.is_none() {
                if let Some(source) = &source {
                    state.unmute_listener = Some(self.spawn_unmute_listener(source));
                }
            }

            let settings = source.as_ref().map(|s| s.settings()).unwrap_or_default();
            let resolution = settings.resolution();
            let frame_rate = settings.frame_rate.unwrap_or(self.config.default_frame_rate);

            let processed = Arc::new(ProcessedSource::new(self.config.frame_capacity));
            processed.set_enabled(source.as_ref().is_some_and(|s| s.is_enabled()));

            state.buffers = Some(FrameBufferPair::new(resolution.width, resolution.height));
            state.processed_source = Some(processed);
            state.processor = Some(processor.clone());

            ProcessorInfo {
                processor: processor.name().to_string(),
                capture_width: resolution.width,
                capture_height: resolution.height,
                input_frame_rate: frame_rate,
                is_remote_track: self.config.origin == TrackOrigin::Remote,
            }
        };

        info!("Added {} to track {}", processor.name(), self.id);
        self.emit_processor_event(ProcessorEvent::Add(info));
        self.update_attachments();
        self.start_capture();
        Ok(())
    }

    fn remove_processor_inner(self: &Arc<Self>, processor: &Arc<dyn VideoProcessor>) -> MediaResult<()> {
        {
            let state = self.state.lock();
            let current = state.processor.as_ref().ok_or(MediaError::NoProcessor)?;
            if !same_processor(current, processor) {
                return Err(MediaError::ProcessorMismatch);
            }
        }

        self.emit_processor_event(ProcessorEvent::Remove);
        info!("Removing {} from track {}", processor.name(), self.id);

        let listener = {
            let mut state = self.state.lock();
            state.capture.halt();
            state.processor = None;
            state.processed_source = None;
            state.buffers = None;
            state.unmute_listener.take()
        };
        drop(listener);

        self.update_attachments();
        Ok(())
    }

    /// Tear down and recreate the processor binding so the processed source
    /// starts over
    fn restart_processor(self: &Arc<Self>) {
        let Ok(_guard) = self.lifecycle_guard() else {
            debug!("Skipping processor restart on track {}: add/remove in progress", self.id);
            return;
        };
        let Some(processor) = self.state.lock().processor.clone() else {
            return;
        };

        let restarted = self
            .remove_processor_inner(&processor)
            .and_then(|()| self.add_processor_inner(processor));
        if let Err(error) = restarted {
            warn!("Failed to restart processor on track {}: {}", self.id, error);
        }
    }

    fn spawn_unmute_listener(self: &Arc<Self>, source: &Arc<dyn MediaSource>) -> TaskHandle {
        let mut events = source.subscribe();
        let weak = Arc::downgrade(self);

        let listener = async move {
            loop {
                match events.recv().await {
                    Ok(SourceEvent::Unmuted) => {
                        let Some(shared) = weak.upgrade() else { break };
                        shared.handle_source_unmuted();
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Unmute listener skipped {} source events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        };
        self.scheduler.spawn(listener.boxed())
    }

    fn handle_source_unmuted(self: &Arc<Self>) {
        debug!("MediaSource unmuted on track {}", self.id);
        let processed = self.state.lock().processed_source.clone();

        // A processed source can stay muted after its input unmutes; it never
        // recovers on its own
        if processed.is_some_and(|p| p.is_muted()) {
            debug!("MediaSource is unmuted but the processed source is muted. Restarting processor.");
            self.restart_processor();
        }
    }

    fn spawn_dimension_listener(self: &Arc<Self>, frame_source: &Arc<dyn FrameSource>) -> TaskHandle {
        let mut events = frame_source.subscribe();
        let weak = Arc::downgrade(self);

        let listener = async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => event,
                    // Missed notifications only matter for the latest size
                    Err(RecvError::Lagged(_)) => ElementEvent::Resize,
                    Err(RecvError::Closed) => break,
                };
                let Some(shared) = weak.upgrade() else { break };
                shared.handle_element_event(event);
            }
        };
        self.scheduler.spawn(listener.boxed())
    }

    fn handle_element_event(&self, event: ElementEvent) {
        let (dimensions, is_started) = {
            let mut state = self.state.lock();
            let Some(element) = state.frame_source.clone() else {
                return;
            };
            let resolution = element.video_dimensions();
            if !state.dimensions.differs_from(resolution) {
                return;
            }
            state.dimensions = resolution.into();
            (state.dimensions, state.is_started)
        };

        trace!("Element event {:?} on track {}", event, self.id);
        if is_started {
            debug!("Dimensions changed: {:?}", dimensions);
            self.emit_track_event(TrackEvent::DimensionsChanged { dimensions });
        }
    }
}

impl VideoTrack {
    /// Create a track builder
    pub fn builder() -> VideoTrackBuilder {
        VideoTrackBuilder::default()
    }

    /// Get track ID
    pub fn id(&self) -> &str {
        &self.shared.id
    }

    /// Whether the track is local or remote
    pub fn origin(&self) -> TrackOrigin {
        self.shared.config.origin
    }

    /// Track configuration
    pub fn config(&self) -> &VideoTrackConfig {
        &self.shared.config
    }

    /// Last recorded dimensions
    pub fn dimensions(&self) -> Dimensions {
        self.shared.state.lock().dimensions
    }

    /// Whether the track is enabled
    pub fn is_enabled(&self) -> bool {
        self.shared.state.lock().is_enabled
    }

    /// Whether there is enough video data to begin playback
    pub fn is_started(&self) -> bool {
        self.shared.state.lock().is_started
    }

    /// Whether the track is being published
    pub fn is_publishing(&self) -> bool {
        self.shared.state.lock().is_publishing
    }

    /// Whether the capture loop is running
    pub fn is_capturing(&self) -> bool {
        self.shared.state.lock().capture.is_capturing()
    }

    /// Whether a capture iteration is scheduled and waiting
    pub fn has_pending_timer(&self) -> bool {
        self.shared.state.lock().capture.has_pending_timer()
    }

    /// Iterations completed by the current capture session
    pub fn capture_iterations(&self) -> u64 {
        self.shared.state.lock().capture.iterations()
    }

    /// Number of rendering attachments
    pub fn attachment_count(&self) -> usize {
        self.shared.state.lock().attachments.len()
    }

    /// The live media source, if it is still around
    pub fn media_source(&self) -> Option<Arc<dyn MediaSource>> {
        self.shared.state.lock().media_source()
    }

    /// The attached processor, if any
    pub fn processor(&self) -> Option<Arc<dyn VideoProcessor>> {
        self.shared.state.lock().processor.clone()
    }

    /// Source of processed frames; `None` unless a processor is attached
    pub fn processed_source(&self) -> Option<Arc<ProcessedSource>> {
        self.shared.state.lock().processed_source.clone()
    }

    /// Subscribe to track events
    pub fn subscribe(&self) -> broadcast::Receiver<TrackEvent> {
        self.shared.events.subscribe()
    }

    /// Register an observer for processor events
    pub fn add_processor_observer(&self, sink: Arc<dyn ProcessorEventSink>) {
        self.shared.processor_sinks.write().push(sink);
    }

    /// Bind the playback element frames are drawn from and start tracking
    /// its dimensions
    pub fn initialize(&self, frame_source: Arc<dyn FrameSource>) {
        let listener = self.shared.spawn_dimension_listener(&frame_source);
        let mut state = self.shared.state.lock();
        state.frame_source = Some(frame_source);
        state.dimension_listener = Some(listener);
    }

    /// Handle a metadata or resize notification from the playback element
    pub fn handle_element_event(&self, event: ElementEvent) {
        self.shared.handle_element_event(event);
    }

    /// Mark the track started, taking its dimensions from the playback element
    pub fn start(&self) -> MediaResult<()> {
        let dimensions = {
            let mut state = self.shared.state.lock();
            if state.is_started {
                return Ok(());
            }
            let element = state
                .frame_source
                .clone()
                .ok_or(MediaError::TrackNotInitialized)?;
            state.dimensions = element.video_dimensions().into();
            state.is_started = true;
            state.dimensions
        };

        debug!("Dimensions: {:?}", dimensions);
        self.shared
            .emit_track_event(TrackEvent::DimensionsChanged { dimensions });
        self.shared.emit_track_event(TrackEvent::Started);
        Ok(())
    }

    /// Attach a rendering target; restarts capture if a processor is active
    pub fn attach(&self, attachment: Arc<dyn Attachment>) {
        let (source, has_processor) = {
            let mut state = self.shared.state.lock();
            if !state.attachments.iter().any(|a| a.id() == attachment.id()) {
                state.attachments.push(attachment.clone());
            }
            (state.render_source(), state.processor.is_some())
        };

        debug!("Attached {} to track {}", attachment.id(), self.id());
        attachment.set_source(source);
        if has_processor {
            self.shared.start_capture();
        }
    }

    /// Detach one rendering target.
    ///
    /// Capture is not stopped here; the gate halts it on the next iteration
    /// once nothing consumes the frames.
    pub fn detach(&self, id: &str) -> Option<Arc<dyn Attachment>> {
        let detached = {
            let mut state = self.shared.state.lock();
            let index = state.attachments.iter().position(|a| a.id() == id)?;
            state.attachments.remove(index)
        };
        detached.set_source(RenderSource::Empty);
        Some(detached)
    }

    /// Detach every rendering target
    pub fn detach_all(&self) -> Vec<Arc<dyn Attachment>> {
        let detached = std::mem::take(&mut self.shared.state.lock().attachments);
        for attachment in &detached {
            attachment.set_source(RenderSource::Empty);
        }
        detached
    }

    /// Enable or disable ("pause") the track
    pub fn set_enabled(&self, enabled: bool) {
        let (source, processed, has_processor) = {
            let mut state = self.shared.state.lock();
            if state.is_enabled == enabled {
                return;
            }
            state.is_enabled = enabled;
            (
                state.media_source(),
                state.processed_source.clone(),
                state.processor.is_some(),
            )
        };

        if let Some(source) = source {
            source.set_enabled(enabled);
        }
        if let Some(processed) = processed {
            processed.set_enabled(enabled);
        }

        self.shared.emit_track_event(if enabled {
            TrackEvent::Enabled
        } else {
            TrackEvent::Disabled
        });
        if enabled && has_processor {
            self.shared.start_capture();
        }
    }

    /// Report whether the track is being published to remote participants
    pub fn set_publishing(&self, publishing: bool) {
        let has_processor = {
            let mut state = self.shared.state.lock();
            state.is_publishing = publishing;
            state.processor.is_some()
        };
        if publishing && has_processor {
            self.shared.start_capture();
        }
    }

    /// Replace the live media source; `None` when the source went away
    pub fn set_media_source(&self, source: Option<Arc<dyn MediaSource>>) {
        let has_processor = {
            let mut state = self.shared.state.lock();
            state.media_source = source.as_ref().map(Arc::downgrade);
            if state.processor.is_some() {
                state.unmute_listener = source
                    .as_ref()
                    .map(|source| self.shared.spawn_unmute_listener(source));
            }
            if let (Some(processed), Some(source)) = (&state.processed_source, &source) {
                processed.set_enabled(source.is_enabled());
            }
            state.processor.is_some()
        };

        self.shared.update_attachments();
        if has_processor && source.is_some() {
            self.shared.start_capture();
        }
    }

    /// Attach a processor and start capturing frames through it.
    ///
    /// In environments without processing support this only logs a warning.
    pub fn add_processor(&self, processor: Arc<dyn VideoProcessor>) -> MediaResult<&Self> {
        if !self.shared.capabilities.supports_processing() {
            warn!("Adding a VideoProcessor is not supported in this environment.");
            return Ok(self);
        }

        let _guard = self.shared.lifecycle_guard()?;
        self.shared.add_processor_inner(processor)?;
        Ok(self)
    }

    /// Remove the attached processor; `processor` must be the one added
    pub fn remove_processor(&self, processor: &Arc<dyn VideoProcessor>) -> MediaResult<&Self> {
        let _guard = self.shared.lifecycle_guard()?;
        self.shared.remove_processor_inner(processor)?;
        Ok(self)
    }
}

impl fmt::Debug for VideoTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("VideoTrack")
            .field("id", &self.shared.id)
            .field("dimensions", &state.dimensions)
            .field("is_enabled", &state.is_enabled)
            .field("is_started", &state.is_started)
            .field("has_processor", &state.processor.is_some())
            .field("is_capturing", &state.capture.is_capturing())
            .finish()
    }
}
