//! Video processor capability and the adapter that runs it
//!
//! A processor may finish a frame immediately or hand back a future. Either
//! way [`run_processor`] resolves exactly once, and any failure (an error
//! result or a panic, synchronous or not) becomes a dropped frame.

use crate::frame_buffer::{FrameBuffer, FrameBufferPair};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;
use tracing::debug;

/// Failure reported by a processor for a single frame
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ProcessorError {
    message: String,
}

impl ProcessorError {
    /// Create an error with `message`
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ProcessorError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ProcessorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Outcome of processing one frame
pub type ProcessorResult = Result<(), ProcessorError>;

/// What `process_frame` handed back: a finished result or one still in flight
pub enum ProcessOutcome<'a> {
    /// The frame finished synchronously
    Ready(ProcessorResult),
    /// The frame finishes when the future resolves
    Pending(BoxFuture<'a, ProcessorResult>),
}

impl<'a> ProcessOutcome<'a> {
    /// A frame that was processed synchronously
    pub fn done() -> Self {
        ProcessOutcome::Ready(Ok(()))
    }

    /// A frame that finishes when `future` resolves
    pub fn pending<F>(future: F) -> Self
    where
        F: Future<Output = ProcessorResult> + Send + 'a,
    {
        ProcessOutcome::Pending(future.boxed())
    }
}

impl From<ProcessorResult> for ProcessOutcome<'_> {
    fn from(result: ProcessorResult) -> Self {
        ProcessOutcome::Ready(result)
    }
}

/// A user-supplied per-frame transform.
///
/// Only one invocation per track runs at a time, so implementations do not
/// need to be reentrant.
pub trait VideoProcessor: Send + Sync {
    /// Read from `input` and write the processed frame into `output`
    fn process_frame<'a>(
        &'a self,
        input: &'a FrameBuffer,
        output: &'a mut FrameBuffer,
    ) -> ProcessOutcome<'a>;

    /// Name used in logs and processor events
    fn name(&self) -> &str {
        "VideoProcessor"
    }
}

/// Normalized result of one processor invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The output buffer holds a new frame
    Processed,
    /// No output for this frame
    Dropped {
        /// What went wrong
        reason: String,
    },
}

impl FrameOutcome {
    /// Whether the output buffer holds a new frame
    pub fn is_processed(&self) -> bool {
        matches!(self, FrameOutcome::Processed)
    }
}

/// Run `processor` over the buffer pair and wait for it to finish
pub async fn run_processor(
    processor: &dyn VideoProcessor,
    buffers: &mut FrameBufferPair,
) -> FrameOutcome {
    let FrameBufferPair { input, output } = buffers;
    let input: &FrameBuffer = input;

    // Moving `output` into the call keeps the closure `FnOnce`, so the
    // outcome may borrow the buffers past the closure body
    let outcome = match panic::catch_unwind(AssertUnwindSafe(move || {
        let output = output;
        processor.process_frame(input, output)
    })) {
        Ok(outcome) => outcome,
        Err(payload) => {
            let reason = panic_message(payload.as_ref());
            debug!("Exception detected after calling process_frame: {}", reason);
            return FrameOutcome::Dropped { reason };
        }
    };

    let result = match outcome {
        ProcessOutcome::Ready(result) => result,
        ProcessOutcome::Pending(future) => match AssertUnwindSafe(future).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(ProcessorError::new(panic_message(payload.as_ref()))),
        },
    };

    match result {
        Ok(()) => FrameOutcome::Processed,
        Err(error) => {
            debug!("{} failed to process frame: {}", processor.name(), error);
            FrameOutcome::Dropped {
                reason: error.to_string(),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "processor panicked".to_string()
    }
}
