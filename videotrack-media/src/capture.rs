//! Capture gating, pacing and per-session loop state

use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;
use videotrack_core::{TaskHandle, TimerHandle};

/// State of the media source as seen by the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceStatus {
    /// Whether the source is enabled
    pub enabled: bool,
    /// Whether the source has ended
    pub ended: bool,
}

/// Everything the capture gate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureConditions {
    /// `None` when the track has no media source
    pub source: Option<SourceStatus>,
    /// Whether a processor is attached
    pub has_processor: bool,
    /// Number of rendering attachments
    pub attachment_count: usize,
    /// Whether the track is being published
    pub is_publishing: bool,
}

/// Why capture is not permitted; variants are in check order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureBlocker {
    /// The track has no media source
    SourceMissing,
    /// The media source is disabled
    SourceDisabled,
    /// The media source has ended
    SourceEnded,
    /// No processor is attached
    NoProcessor,
    /// Nothing renders the frames and the track is not published
    NoConsumers,
}

impl fmt::Display for CaptureBlocker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            CaptureBlocker::SourceMissing => "MediaSource is null",
            CaptureBlocker::SourceDisabled => "MediaSource is disabled",
            CaptureBlocker::SourceEnded => "MediaSource is ended",
            CaptureBlocker::NoProcessor => "VideoProcessor not detected.",
            CaptureBlocker::NoConsumers => {
                "VideoTrack is not publishing and there is no attached element."
            }
        };
        f.write_str(message)
    }
}

/// Result of one gate evaluation; recomputed every iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureCheck {
    blocker: Option<CaptureBlocker>,
}

impl CaptureCheck {
    /// Whether frames may be captured
    pub fn can_capture(&self) -> bool {
        self.blocker.is_none()
    }

    /// The first failing check, if any
    pub fn blocker(&self) -> Option<CaptureBlocker> {
        self.blocker
    }

    /// Human-readable reason, empty when capture is permitted
    pub fn reason(&self) -> String {
        self.blocker.map(|b| b.to_string()).unwrap_or_default()
    }
}

/// Decide whether frames may be captured; the first failing check wins
pub fn check_capture(conditions: &CaptureConditions) -> CaptureCheck {
    let blocker = match conditions.source {
        None => Some(CaptureBlocker::SourceMissing),
        Some(source) if !source.enabled => Some(CaptureBlocker::SourceDisabled),
        Some(source) if source.ended => Some(CaptureBlocker::SourceEnded),
        Some(_) if !conditions.has_processor => Some(CaptureBlocker::NoProcessor),
        Some(_) if conditions.attachment_count == 0 && !conditions.is_publishing => {
            Some(CaptureBlocker::NoConsumers)
        }
        Some(_) => None,
    };

    if let Some(blocker) = blocker {
        debug!("{}", blocker);
    }
    CaptureCheck { blocker }
}

/// Nominal gap between frames: `floor(1000 / frame_rate)` milliseconds.
///
/// Falls back to `default_frame_rate` when the source reports nothing usable.
pub fn capture_period(frame_rate: Option<f64>, default_frame_rate: f64) -> Duration {
    let rate = frame_rate
        .filter(|rate| rate.is_finite() && *rate > 0.0)
        .unwrap_or(default_frame_rate);
    Duration::from_millis((1000.0 / rate).floor() as u64)
}

/// Delay before the next iteration: the nominal period minus the time the
/// previous iteration took, never negative; zero when nothing was measured yet
pub fn next_capture_delay(
    frame_rate: Option<f64>,
    default_frame_rate: f64,
    measured_iteration: Option<Duration>,
) -> Duration {
    match measured_iteration {
        None => Duration::ZERO,
        Some(measured) => {
            capture_period(frame_rate, default_frame_rate).saturating_sub(measured)
        }
    }
}

/// Loop bookkeeping owned by one track
#[derive(Debug, Default)]
pub struct CaptureSession {
    is_capturing: bool,
    generation: u64,
    pending_timer: Option<TimerHandle>,
    startup: Option<TaskHandle>,
    last_iteration_start: Option<Instant>,
    measured_iteration: Option<Duration>,
    iterations: u64,
}

impl CaptureSession {
    /// Whether the loop is in `Capturing`
    pub fn is_capturing(&self) -> bool {
        self.is_capturing
    }

    /// Generation of the current (or last) session
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `generation` is the live session
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_capturing && self.generation == generation
    }

    /// Enter `Capturing` with fresh timing; returns the new session's generation
    pub fn begin(&mut self) -> u64 {
        self.cancel_timer();
        self.startup = None;
        self.generation += 1;
        self.is_capturing = true;
        self.last_iteration_start = None;
        self.measured_iteration = None;
        self.iterations = 0;
        self.generation
    }

    /// Return to `Idle`; any in-flight iteration of this session becomes stale
    pub fn halt(&mut self) {
        self.cancel_timer();
        self.startup = None;
        self.is_capturing = false;
        self.generation += 1;
    }

    /// Keep the task that waits for playback so it is dropped with the session
    pub fn set_startup(&mut self, generation: u64, task: TaskHandle) {
        if self.is_current(generation) {
            self.startup = Some(task);
        }
    }

    /// Cancel the pending timer, if any
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.pending_timer.take() {
            timer.cancel();
        }
    }

    /// Store the timer for the next iteration, cancelling any previous one
    pub fn set_timer(&mut self, timer: TimerHandle) {
        self.cancel_timer();
        self.pending_timer = Some(timer);
    }

    /// The pending timer has fired; forget it
    pub fn timer_fired(&mut self) {
        self.pending_timer = None;
    }

    /// Whether a timer is armed and has not fired yet
    pub fn has_pending_timer(&self) -> bool {
        self.pending_timer.as_ref().is_some_and(TimerHandle::is_pending)
    }

    /// Record when the current iteration started
    pub fn mark_iteration_start(&mut self, now: Instant) {
        self.last_iteration_start = Some(now);
    }

    /// Record how long the iteration that started last took
    pub fn finish_iteration(&mut self, now: Instant) {
        if let Some(start) = self.last_iteration_start {
            self.measured_iteration = Some(now.saturating_duration_since(start));
        }
        self.iterations += 1;
    }

    /// Duration of the last completed iteration
    pub fn measured_iteration(&self) -> Option<Duration> {
        self.measured_iteration
    }

    /// Iterations completed in the current session
    pub fn iterations(&self) -> u64 {
        self.iterations
    }
}
