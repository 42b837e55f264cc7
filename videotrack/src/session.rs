//! Session management and API

use crate::{
    EventFilter, EventStream, GlobalConfig, HostCapabilities, MediaSource, ProcessorEventObserver,
    Scheduler, SessionError, TokioScheduler, VideoTrack, VideoTrackConfig,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};
use videotrack_diagnostics::DebugLogger;

/// Owns the video tracks of one session and the telemetry they report to
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    config: GlobalConfig,
    scheduler: Arc<dyn Scheduler>,
    capabilities: HostCapabilities,
    telemetry: Arc<ProcessorEventObserver>,
    tracks: RwLock<HashMap<String, VideoTrack>>,
    closed: AtomicBool,
}

impl Session {
    /// Start a session with default settings on the current tokio runtime
    ///
    /// # Example
    /// ```rust,no_run
    /// use videotrack::Session;
    ///
    /// # async fn example() -> Result<(), videotrack::SessionError> {
    /// let session = Session::init()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn init() -> Result<Self, SessionError> {
        Self::init_with(GlobalConfig::default())
    }

    /// Start a session with custom configuration on the current tokio runtime
    pub fn init_with(config: GlobalConfig) -> Result<Self, SessionError> {
        let scheduler = TokioScheduler::current()?;
        Self::with_scheduler(config, Arc::new(scheduler))
    }

    /// Start a session driven by an explicit scheduler
    pub fn with_scheduler(
        config: GlobalConfig,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self, SessionError> {
        config.validate()?;
        if config.debug_logging {
            DebugLogger::init_with_filter(&config.log_filter)?;
        }

        let telemetry = Arc::new(ProcessorEventObserver::new(config.telemetry.clone())?);
        let capabilities = HostCapabilities::detect();
        info!(
            "Video track session started (processing supported: {})",
            capabilities.supports_processing()
        );

        Ok(Self {
            inner: Arc::new(SessionInner {
                config,
                scheduler,
                capabilities,
                telemetry,
                tracks: RwLock::new(HashMap::new()),
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Session configuration
    pub fn config(&self) -> &GlobalConfig {
        &self.inner.config
    }

    /// Create a track builder for `source`
    pub fn video_track(&self, source: Arc<dyn MediaSource>) -> TrackBuilder {
        TrackBuilder {
            session: self.clone(),
            source,
            id: None,
            config: self.inner.config.track.clone(),
            capabilities: self.inner.capabilities,
        }
    }

    /// Create a track with the session defaults
    pub fn create_video_track(&self, source: Arc<dyn MediaSource>) -> Result<VideoTrack, SessionError> {
        self.video_track(source).create()
    }

    /// Look up a track by ID
    pub fn track(&self, id: &str) -> Option<VideoTrack> {
        self.inner.tracks.read().get(id).cloned()
    }

    /// All tracks in the session
    pub fn tracks(&self) -> Vec<VideoTrack> {
        self.inner.tracks.read().values().cloned().collect()
    }

    /// Events of one track, filtered
    pub fn events(&self, track_id: &str, filter: EventFilter) -> Option<EventStream> {
        self.track(track_id)
            .map(|track| EventStream::filtered(track.subscribe(), filter))
    }

    /// Shared telemetry observer every track reports to
    pub fn telemetry(&self) -> Arc<ProcessorEventObserver> {
        self.inner.telemetry.clone()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Tear down every track: remove its processor and detach all consumers
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        let tracks: Vec<VideoTrack> = self.inner.tracks.write().drain().map(|(_, t)| t).collect();
        info!("Closing session with {} tracks", tracks.len());

        for track in tracks {
            if let Some(processor) = track.processor() {
                if let Err(e) = track.remove_processor(&processor) {
                    warn!("Failed to remove processor from track {}: {}", track.id(), e);
                }
            }
            track.detach_all();
            debug!("Closed track {}", track.id());
        }
    }

    fn register(&self, track: VideoTrack) -> Result<VideoTrack, SessionError> {
        if self.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut tracks = self.inner.tracks.write();
        if tracks.contains_key(track.id()) {
            return Err(SessionError::DuplicateTrack {
                id: track.id().to_string(),
            });
        }
        if tracks.len() >= self.inner.config.max_tracks {
            return Err(SessionError::TrackLimit {
                limit: self.inner.config.max_tracks,
            });
        }

        track.add_processor_observer(self.inner.telemetry.clone());
        tracks.insert(track.id().to_string(), track.clone());
        debug!("Registered track {}", track.id());
        Ok(track)
    }
}

/// Fluent builder for tracks owned by a session
#[derive(Debug)]
pub struct TrackBuilder {
    session: Session,
    source: Arc<dyn MediaSource>,
    id: Option<String>,
    config: VideoTrackConfig,
    capabilities: HostCapabilities,
}

impl TrackBuilder {
    /// Set the track ID
    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Mark the track as received from a remote participant
    pub fn remote(mut self) -> Self {
        self.config.origin = crate::TrackOrigin::Remote;
        self
    }

    /// Override the session's track configuration
    pub fn config(mut self, config: VideoTrackConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the detected host capabilities
    pub fn capabilities(mut self, capabilities: HostCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Build the track and register it with the session
    pub fn create(self) -> Result<VideoTrack, SessionError> {
        if self.session.is_closed() {
            return Err(SessionError::Closed);
        }

        let mut builder = VideoTrack::builder()
            .media_source(self.source)
            .config(self.config)
            .scheduler(self.session.inner.scheduler.clone())
            .capabilities(self.capabilities);
        if let Some(id) = &self.id {
            builder = builder.id(id);
        }

        let track = builder.build()?;
        self.session.register(track)
    }
}
