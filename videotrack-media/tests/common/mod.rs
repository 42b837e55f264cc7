//! Test doubles for the collaborators a video track talks to

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use videotrack_media::*;

// ============================================================================
// MEDIA SOURCE
// ============================================================================

#[derive(Debug)]
pub struct MockSource {
    id: String,
    enabled: AtomicBool,
    muted: AtomicBool,
    ended: AtomicBool,
    settings: Mutex<SourceSettings>,
    events: broadcast::Sender<SourceEvent>,
}

impl MockSource {
    pub fn new(width: u32, height: u32, frame_rate: f64) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            id: "camera-0".to_string(),
            enabled: AtomicBool::new(true),
            muted: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            settings: Mutex::new(SourceSettings {
                width: Some(width),
                height: Some(height),
                frame_rate: Some(frame_rate),
            }),
            events,
        })
    }

    pub fn set_resolution(&self, width: u32, height: u32) {
        let mut settings = self.settings.lock();
        settings.width = Some(width);
        settings.height = Some(height);
    }

    pub fn set_frame_rate(&self, frame_rate: f64) {
        self.settings.lock().frame_rate = Some(frame_rate);
    }

    pub fn end(&self) {
        self.ended.store(true, Ordering::SeqCst);
        let _ = self.events.send(SourceEvent::Ended);
    }

    pub fn mute(&self) {
        self.muted.store(true, Ordering::SeqCst);
        let _ = self.events.send(SourceEvent::Muted);
    }

    pub fn unmute(&self) {
        self.muted.store(false, Ordering::SeqCst);
        let _ = self.events.send(SourceEvent::Unmuted);
    }
}

impl MediaSource for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn ready_state(&self) -> ReadyState {
        if self.ended.load(Ordering::SeqCst) {
            ReadyState::Ended
        } else {
            ReadyState::Live
        }
    }

    fn settings(&self) -> SourceSettings {
        *self.settings.lock()
    }

    fn subscribe(&self) -> broadcast::Receiver<SourceEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// PLAYBACK ELEMENT
// ============================================================================

#[derive(Debug)]
pub struct MockElement {
    dimensions: Mutex<VideoResolution>,
    fail_play: AtomicBool,
    play_calls: AtomicUsize,
    events: broadcast::Sender<ElementEvent>,
}

impl MockElement {
    pub fn new(width: u32, height: u32) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            dimensions: Mutex::new(VideoResolution::new(width, height)),
            fail_play: AtomicBool::new(false),
            play_calls: AtomicUsize::new(0),
            events,
        })
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }

    pub fn play_calls(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    /// Change the intrinsic size and notify like a real element would
    pub fn resize(&self, width: u32, height: u32) {
        *self.dimensions.lock() = VideoResolution::new(width, height);
        self.emit(ElementEvent::Resize);
    }

    pub fn emit(&self, event: ElementEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl FrameSource for MockElement {
    async fn play(&self) -> MediaResult<()> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(MediaError::PlaybackFailed {
                reason: "autoplay blocked".to_string(),
            });
        }
        Ok(())
    }

    fn video_dimensions(&self) -> VideoResolution {
        *self.dimensions.lock()
    }

    fn current_frame(&self) -> Option<VideoFrame> {
        let dimensions = *self.dimensions.lock();
        let len = dimensions.pixel_count() as usize * BYTES_PER_PIXEL;
        Some(VideoFrame::new(
            dimensions.width,
            dimensions.height,
            vec![7u8; len],
            0,
        ))
    }

    fn subscribe(&self) -> broadcast::Receiver<ElementEvent> {
        self.events.subscribe()
    }
}

// ============================================================================
// ATTACHMENTS
// ============================================================================

/// Keeps only the latest source so replaced sources can be dropped
#[derive(Debug)]
pub struct MockAttachment {
    id: String,
    source: Mutex<Option<RenderSource>>,
    updates: AtomicUsize,
}

impl MockAttachment {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            source: Mutex::new(None),
            updates: AtomicUsize::new(0),
        })
    }

    pub fn current(&self) -> Option<RenderSource> {
        self.source.lock().clone()
    }

    pub fn renders_processed(&self) -> bool {
        self.current().is_some_and(|s| s.is_processed())
    }

    pub fn updates(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

impl Attachment for MockAttachment {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_source(&self, source: RenderSource) {
        *self.source.lock() = Some(source);
        self.updates.fetch_add(1, Ordering::SeqCst);
    }
}

/// Tries to add a second processor while the track is updating attachments
#[derive(Debug)]
pub struct ReentrantAttachment {
    track: Mutex<Option<VideoTrack>>,
    results: Mutex<Vec<MediaResult<()>>>,
}

impl ReentrantAttachment {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            track: Mutex::new(None),
            results: Mutex::new(Vec::new()),
        })
    }

    pub fn bind(&self, track: &VideoTrack) {
        *self.track.lock() = Some(track.clone());
    }

    pub fn attempts(&self) -> usize {
        self.results.lock().len()
    }

    pub fn busy_rejections(&self) -> usize {
        self.results
            .lock()
            .iter()
            .filter(|r| matches!(r, Err(MediaError::LifecycleBusy)))
            .count()
    }
}

impl Attachment for ReentrantAttachment {
    fn id(&self) -> &str {
        "reentrant"
    }

    fn set_source(&self, source: RenderSource) {
        if !source.is_processed() {
            return;
        }
        let track = self.track.lock().clone();
        if let Some(track) = track {
            let other: Arc<dyn VideoProcessor> = CountingProcessor::new();
            let result = track.add_processor(other).map(|_| ());
            self.results.lock().push(result);
        }
    }
}

// ============================================================================
// PROCESSORS
// ============================================================================

/// Buffer geometry seen by one processor call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallRecord {
    pub width: u32,
    pub height: u32,
    pub generation: u64,
}

/// Copies input to output synchronously, optionally after an async delay
pub struct CountingProcessor {
    delay: Option<Duration>,
    calls: Mutex<Vec<(Instant, CallRecord)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl CountingProcessor {
    pub fn new() -> Arc<Self> {
        Self::build(None)
    }

    pub fn with_delay(delay: Duration) -> Arc<Self> {
        Self::build(Some(delay))
    }

    fn build(delay: Option<Duration>) -> Arc<Self> {
        Arc::new(Self {
            delay,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn records(&self) -> Vec<CallRecord> {
        self.calls.lock().iter().map(|(_, r)| *r).collect()
    }

    /// Gaps between consecutive call starts
    pub fn intervals(&self) -> Vec<Duration> {
        let calls = self.calls.lock();
        calls.windows(2).map(|w| w[1].0 - w[0].0).collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn enter(&self, input: &FrameBuffer) {
        self.calls.lock().push((
            Instant::now(),
            CallRecord {
                width: input.width(),
                height: input.height(),
                generation: input.generation(),
            },
        ));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl VideoProcessor for CountingProcessor {
    fn process_frame<'a>(
        &'a self,
        input: &'a FrameBuffer,
        output: &'a mut FrameBuffer,
    ) -> ProcessOutcome<'a> {
        self.enter(input);
        match self.delay {
            None => {
                output.data_mut().copy_from_slice(input.data());
                self.leave();
                ProcessOutcome::done()
            }
            Some(delay) => ProcessOutcome::pending(async move {
                tokio::time::sleep(delay).await;
                output.data_mut().copy_from_slice(input.data());
                self.leave();
                Ok::<(), ProcessorError>(())
            }),
        }
    }

    fn name(&self) -> &str {
        "CountingProcessor"
    }
}

#[derive(Debug, Clone, Copy)]
pub enum FailureMode {
    Error,
    Panic,
    AsyncError,
}

/// Fails every frame
pub struct FailingProcessor {
    mode: FailureMode,
    calls: AtomicUsize,
}

impl FailingProcessor {
    pub fn new(mode: FailureMode) -> Arc<Self> {
        Arc::new(Self {
            mode,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VideoProcessor for FailingProcessor {
    fn process_frame<'a>(
        &'a self,
        _input: &'a FrameBuffer,
        _output: &'a mut FrameBuffer,
    ) -> ProcessOutcome<'a> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            FailureMode::Error => Err(ProcessorError::new("segmentation model missing")).into(),
            FailureMode::Panic => panic!("processor exploded"),
            FailureMode::AsyncError => ProcessOutcome::pending(async {
                Err::<(), _>(ProcessorError::new("inference timed out"))
            }),
        }
    }

    fn name(&self) -> &str {
        "FailingProcessor"
    }
}

// ============================================================================
// EVENT SINK
// ============================================================================

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, ProcessorEvent)>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(|(_, e)| e.name()).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|(_, e)| e.name() == name)
            .count()
    }

    pub fn stop_reasons(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|(_, e)| match e {
                ProcessorEvent::Stop { reason } => Some(reason.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn add_info(&self) -> Option<ProcessorInfo> {
        self.events.lock().iter().find_map(|(_, e)| match e {
            ProcessorEvent::Add(info) => Some(info.clone()),
            _ => None,
        })
    }
}

impl ProcessorEventSink for RecordingSink {
    fn on_processor_event(&self, track_id: &str, event: &ProcessorEvent) {
        self.events
            .lock()
            .push((track_id.to_string(), event.clone()));
    }
}

// ============================================================================
// FIXTURE
// ============================================================================

pub struct Fixture {
    pub track: VideoTrack,
    pub source: Arc<MockSource>,
    pub element: Arc<MockElement>,
    pub attachment: Arc<MockAttachment>,
    pub sink: Arc<RecordingSink>,
}

/// An initialized 640x480@30 track with one attachment; must run inside a
/// tokio runtime
pub fn fixture() -> Fixture {
    fixture_with(VideoTrackConfig::default())
}

pub fn fixture_with(config: VideoTrackConfig) -> Fixture {
    let source = MockSource::new(640, 480, 30.0);
    let element = MockElement::new(640, 480);
    let attachment = MockAttachment::new("preview");
    let sink = RecordingSink::new();

    let track = VideoTrack::builder()
        .id("video-1")
        .media_source(source.clone())
        .config(config)
        .capabilities(videotrack_core::HostCapabilities::full())
        .build()
        .unwrap();
    track.add_processor_observer(sink.clone());
    track.initialize(element.clone());
    track.attach(attachment.clone());

    Fixture {
        track,
        source,
        element,
        attachment,
        sink,
    }
}

/// Let spawned tasks and due timers run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}
