//! The adaptive capture loop.
//!
//! One session at a time: `start_capture` waits for playback, then each
//! iteration draws the current frame, runs the processor, publishes the
//! output and schedules the next iteration so that processing time is
//! absorbed into the frame period. Every scheduled callback carries the
//! generation of the session that created it and does nothing once that
//! session is gone.

use crate::capture::next_capture_delay;
use crate::events::ProcessorEvent;
use crate::frame_buffer::FrameBufferPair;
use crate::processed::ProcessedSource;
use crate::processor::{run_processor, VideoProcessor};
use crate::source::{FrameSource, MediaSource};
use crate::video_track::{Shared, TrackState};
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, error, trace};

/// Everything one iteration needs, taken out of the track while it runs
struct IterationWork {
    source: Arc<dyn MediaSource>,
    element: Arc<dyn FrameSource>,
    processor: Arc<dyn VideoProcessor>,
    processed: Option<Arc<ProcessedSource>>,
    buffers: FrameBufferPair,
}

impl TrackState {
    fn take_iteration_work(&mut self) -> Option<IterationWork> {
        let source = self.media_source()?;
        let element = self.frame_source.clone()?;
        let processor = self.processor.clone()?;
        let buffers = self.buffers.take()?;
        Some(IterationWork {
            source,
            element,
            processor,
            processed: self.processed_source.clone(),
            buffers,
        })
    }
}

impl Shared {
    /// Enter `Capturing` unless already there or the gate says no
    pub(crate) fn start_capture(self: &Arc<Self>) {
        let (generation, element) = {
            let mut state = self.state.lock();
            if state.capture.is_capturing() {
                debug!("Ignoring capture request. Capture is already in progress");
                return;
            }
            if !self.capture_check(&state).can_capture() {
                debug!("Cannot capture frames. Ignoring capture request.");
                return;
            }
            let Some(element) = state.frame_source.clone() else {
                debug!("Cannot capture frames before the track is initialized");
                return;
            };
            (state.capture.begin(), element)
        };

        debug!("Start capturing frames on track {}", self.id);
        self.emit_processor_event(ProcessorEvent::Start);

        let weak = Arc::downgrade(self);
        let startup = async move {
            let played = element.play().await;
            let Some(shared) = weak.upgrade() else {
                return;
            };
            match played {
                Ok(()) => shared.schedule_next(generation),
                Err(e) => {
                    error!("Video element cannot be played on track {}: {}", shared.id, e);
                    shared.abandon_capture(generation);
                }
            }
        };

        let task = self.scheduler.spawn(startup.boxed());
        self.state.lock().capture.set_startup(generation, task);
    }

    /// Drop back to `Idle` if `generation` is still the live session
    fn abandon_capture(&self, generation: u64) {
        let mut state = self.state.lock();
        if state.capture.is_current(generation) {
            state.capture.halt();
        }
    }

    /// Arm the single pending timer for the next iteration
    pub(crate) fn schedule_next(self: &Arc<Self>, generation: u64) {
        let mut state = self.state.lock();
        if !state.capture.is_current(generation) {
            return;
        }

        // Frame rate is read fresh so source changes apply to the next frame
        let frame_rate = state.media_source().and_then(|s| s.settings().frame_rate);
        let delay = next_capture_delay(
            frame_rate,
            self.config.default_frame_rate,
            state.capture.measured_iteration(),
        );
        trace!("Next capture on track {} in {:?}", self.id, delay);

        state.capture.cancel_timer();
        let weak = Arc::downgrade(self);
        let timer = self.scheduler.schedule(
            delay,
            async move {
                if let Some(shared) = weak.upgrade() {
                    shared.run_iteration(generation).await;
                }
            }
            .boxed(),
        );
        state.capture.set_timer(timer);
    }

    async fn run_iteration(self: Arc<Self>, generation: u64) {
        let work = {
            let mut state = self.state.lock();
            if !state.capture.is_current(generation) {
                return;
            }
            state.capture.timer_fired();

            let check = self.capture_check(&state);
            if !check.can_capture() {
                state.capture.halt();
                drop(state);
                debug!("Cannot capture frames. Stopping capturing frames.");
                self.emit_processor_event(ProcessorEvent::Stop {
                    reason: check.reason(),
                });
                return;
            }

            let now = self.scheduler.now();
            match state.take_iteration_work() {
                Some(work) => {
                    state.capture.mark_iteration_start(now);
                    work
                }
                None => {
                    debug!("Capture state incomplete on track {}; going idle", self.id);
                    state.capture.halt();
                    return;
                }
            }
        };

        let IterationWork {
            source,
            element,
            processor,
            processed,
            mut buffers,
        } = work;

        let resolution = source.settings().resolution();
        if buffers.fit_to(resolution.width, resolution.height) {
            debug!(
                "Resized frame buffers to {}x{} on track {}",
                resolution.width, resolution.height, self.id
            );
        }
        if let Some(frame) = element.current_frame() {
            buffers.input.draw(&frame);
        }

        let outcome = run_processor(processor.as_ref(), &mut buffers).await;

        let published = {
            let mut state = self.state.lock();
            if !state.capture.is_current(generation) {
                trace!("Discarding frame from a superseded capture session");
                return;
            }

            let published = match (&processed, outcome.is_processed()) {
                (Some(processed), true) => {
                    processed.request_frame(&buffers.output);
                    true
                }
                _ => false,
            };
            state.buffers = Some(buffers);
            state.capture.finish_iteration(self.scheduler.now());
            published
        };

        if published {
            self.emit_processor_event(ProcessorEvent::Stats);
        }
        self.schedule_next(generation);
    }
}
