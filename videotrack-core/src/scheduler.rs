//! Timer and task scheduling
//!
//! The capture loop never talks to a runtime directly. It asks a [`Scheduler`]
//! to run a future after a delay and keeps the returned [`TimerHandle`]; dropping
//! or cancelling that handle prevents the future from running if the delay has
//! not elapsed yet. Once the delay elapses the future runs to completion.

use crate::error::CoreError;
use futures::future::BoxFuture;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::trace;

/// Host capability for delayed and background execution
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Current time as seen by this scheduler
    fn now(&self) -> Instant;

    /// Run `task` once `delay` has elapsed unless the returned handle is cancelled first
    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle;

    /// Run `task` in the background until it completes or the handle is dropped
    fn spawn(&self, task: BoxFuture<'static, ()>) -> TaskHandle;
}

/// Cancellation handle for one scheduled callback.
///
/// Dropping the handle cancels the callback.
#[derive(Debug)]
pub struct TimerHandle {
    cancel: Option<oneshot::Sender<()>>,
}

impl TimerHandle {
    /// Create a handle and the receiving side a scheduler waits on.
    ///
    /// The receiver resolves when the handle is cancelled or dropped.
    pub fn new() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { cancel: Some(tx) }, rx)
    }

    /// Whether the callback is still waiting for its delay to elapse
    pub fn is_pending(&self) -> bool {
        self.cancel.as_ref().is_some_and(|tx| !tx.is_closed())
    }

    /// Cancel the callback if it has not started yet
    pub fn cancel(mut self) {
        self.fire_cancel();
    }

    fn fire_cancel(&mut self) {
        if let Some(tx) = self.cancel.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.fire_cancel();
    }
}

/// Handle to a background task; the task is aborted when the handle is dropped
pub struct TaskHandle {
    abort: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl TaskHandle {
    /// Wrap an abort callback
    pub fn new<F>(abort: F) -> Self
    where
        F: FnOnce() + Send + Sync + 'static,
    {
        Self {
            abort: Some(Box::new(abort)),
        }
    }

    /// Abort the task now
    pub fn abort(mut self) {
        if let Some(abort) = self.abort.take() {
            abort();
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        if let Some(abort) = self.abort.take() {
            abort();
        }
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("live", &self.abort.is_some())
            .finish()
    }
}

/// Scheduler backed by a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Use the runtime the caller is running on
    pub fn current() -> Result<Self, CoreError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|e| CoreError::RuntimeUnavailable {
                reason: e.to_string(),
            })?;
        Ok(Self { handle })
    }

    /// Use an explicit runtime handle
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        // tokio's clock honours a paused test runtime
        tokio::time::Instant::now().into_std()
    }

    fn schedule(&self, delay: Duration, task: BoxFuture<'static, ()>) -> TimerHandle {
        let (handle, mut cancelled) = TimerHandle::new();
        trace!("Scheduling callback in {:?}", delay);

        self.handle.spawn(async move {
            let fired = tokio::select! {
                biased;
                _ = &mut cancelled => false,
                _ = tokio::time::sleep(delay) => true,
            };
            drop(cancelled);
            if fired {
                task.await;
            }
        });

        handle
    }

    fn spawn(&self, task: BoxFuture<'static, ()>) -> TaskHandle {
        let join = self.handle.spawn(task);
        TaskHandle::new(move || join.abort())
    }
}
