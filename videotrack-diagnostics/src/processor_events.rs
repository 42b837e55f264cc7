//! Processor event observation and telemetry reports

use crate::error::DiagnosticsError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, trace};
use videotrack_media::{ProcessorEvent, ProcessorEventSink, ProcessorInfo};

/// Telemetry configuration
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// How often a stats report is produced while frames flow
    pub report_interval: Duration,
    /// Reports buffered per subscriber
    pub channel_capacity: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            report_interval: Duration::from_secs(10),
            channel_capacity: 32,
        }
    }
}

impl TelemetryConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), DiagnosticsError> {
        if self.report_interval.is_zero() {
            return Err(DiagnosticsError::InvalidConfiguration {
                message: "Report interval must be > 0".to_string(),
            });
        }
        if self.channel_capacity == 0 {
            return Err(DiagnosticsError::InvalidConfiguration {
                message: "Channel capacity must be > 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Why a report was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    /// Periodic report while capturing
    Stats,
    /// Last report of a capture session
    Final,
}

/// One telemetry report for a track's processor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorTelemetry {
    /// Track the report is about
    pub track_id: String,
    /// Report kind
    pub kind: ReportKind,
    /// Processor metadata from the `add` event, if it was observed
    pub processor: Option<ProcessorInfo>,
    /// Published frames per second over the window
    pub output_frame_rate: f64,
    /// Frames published in the window
    pub frames_in_window: u64,
    /// Frames published since the processor was added
    pub total_frames: u64,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Stop reason, for final reports caused by the capture loop stopping
    pub reason: Option<String>,
    /// When the report was produced
    pub timestamp: DateTime<Utc>,
}

impl ProcessorTelemetry {
    /// Serialize the report as JSON
    pub fn to_json(&self) -> Result<String, DiagnosticsError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[derive(Debug, Default)]
struct TrackSession {
    info: Option<ProcessorInfo>,
    window_start: Option<Instant>,
    frames_in_window: u64,
    total_frames: u64,
}

impl TrackSession {
    fn report(
        &mut self,
        track_id: &str,
        kind: ReportKind,
        reason: Option<String>,
        now: Instant,
    ) -> ProcessorTelemetry {
        let window = self
            .window_start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
        let output_frame_rate = if window.is_zero() {
            0.0
        } else {
            self.frames_in_window as f64 / window.as_secs_f64()
        };

        let report = ProcessorTelemetry {
            track_id: track_id.to_string(),
            kind,
            processor: self.info.clone(),
            output_frame_rate,
            frames_in_window: self.frames_in_window,
            total_frames: self.total_frames,
            window_ms: window.as_millis() as u64,
            reason,
            timestamp: Utc::now(),
        };

        self.window_start = Some(now);
        self.frames_in_window = 0;
        report
    }
}

/// Observes processor events from any number of tracks and turns them into
/// periodic telemetry reports
pub struct ProcessorEventObserver {
    config: TelemetryConfig,
    sessions: Mutex<HashMap<String, TrackSession>>,
    reports: broadcast::Sender<ProcessorTelemetry>,
    last_reports: Mutex<HashMap<String, ProcessorTelemetry>>,
}

impl ProcessorEventObserver {
    /// Create an observer
    pub fn new(config: TelemetryConfig) -> Result<Self, DiagnosticsError> {
        config.validate()?;
        let (reports, _) = broadcast::channel(config.channel_capacity);
        Ok(Self {
            config,
            sessions: Mutex::new(HashMap::new()),
            reports,
            last_reports: Mutex::new(HashMap::new()),
        })
    }

    /// Subscribe to telemetry reports
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessorTelemetry> {
        self.reports.subscribe()
    }

    /// Most recent report for a track
    pub fn last_report(&self, track_id: &str) -> Option<ProcessorTelemetry> {
        self.last_reports.lock().get(track_id).cloned()
    }

    /// Frames published since the track's processor was added
    pub fn total_frames(&self, track_id: &str) -> u64 {
        self.sessions
            .lock()
            .get(track_id)
            .map_or(0, |session| session.total_frames)
    }

    /// Number of tracks with an active processor session
    pub fn active_tracks(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Record an event observed at `now`
    pub fn record_at(&self, track_id: &str, event: &ProcessorEvent, now: Instant) {
        let report = {
            let mut sessions = self.sessions.lock();
            match event {
                ProcessorEvent::Add(info) => {
                    info!(
                        "{} added to track {} ({}x{} @ {} fps, remote: {})",
                        info.processor,
                        track_id,
                        info.capture_width,
                        info.capture_height,
                        info.input_frame_rate,
                        info.is_remote_track
                    );
                    sessions.insert(
                        track_id.to_string(),
                        TrackSession {
                            info: Some(info.clone()),
                            ..TrackSession::default()
                        },
                    );
                    None
                }
                ProcessorEvent::Start => {
                    debug!("Capture started on track {}", track_id);
                    let session = sessions.entry(track_id.to_string()).or_default();
                    session.window_start = Some(now);
                    session.frames_in_window = 0;
                    None
                }
                ProcessorEvent::Stats => {
                    let session = sessions.entry(track_id.to_string()).or_default();
                    session.frames_in_window += 1;
                    session.total_frames += 1;
                    let start = *session.window_start.get_or_insert(now);
                    if now.saturating_duration_since(start) >= self.config.report_interval {
                        Some(session.report(track_id, ReportKind::Stats, None, now))
                    } else {
                        None
                    }
                }
                ProcessorEvent::Stop { reason } => {
                    info!("Capture stopped on track {}: {}", track_id, reason);
                    sessions.get_mut(track_id).and_then(|session| {
                        (session.frames_in_window > 0).then(|| {
                            session.report(track_id, ReportKind::Final, Some(reason.clone()), now)
                        })
                    })
                }
                ProcessorEvent::Remove => {
                    info!("Processor removed from track {}", track_id);
                    sessions.remove(track_id).and_then(|mut session| {
                        (session.frames_in_window > 0)
                            .then(|| session.report(track_id, ReportKind::Final, None, now))
                    })
                }
            }
        };

        if let Some(report) = report {
            self.publish(report);
        }
    }

    fn publish(&self, report: ProcessorTelemetry) {
        trace!(
            "Track {} output {:.1} fps ({} frames)",
            report.track_id,
            report.output_frame_rate,
            report.frames_in_window
        );
        self.last_reports
            .lock()
            .insert(report.track_id.clone(), report.clone());
        // No subscribers is fine
        let _ = self.reports.send(report);
    }
}

impl ProcessorEventSink for ProcessorEventObserver {
    fn on_processor_event(&self, track_id: &str, event: &ProcessorEvent) {
        self.record_at(track_id, event, Instant::now());
    }
}

impl std::fmt::Debug for ProcessorEventObserver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessorEventObserver")
            .field("config", &self.config)
            .field("active_tracks", &self.active_tracks())
            .finish()
    }
}
