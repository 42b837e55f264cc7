//! # Video Track Core
//!
//! Host abstractions shared by the video track crates: the scheduler the
//! capture loop runs on, environment capability detection, and the host-level
//! error type. Nothing in here knows about frames or processors.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod host;
pub mod scheduler;

// Re-export main types
pub use error::CoreError;
pub use host::{HostCapabilities, DISABLE_OFFSCREEN_ENV};
pub use scheduler::{Scheduler, TaskHandle, TimerHandle, TokioScheduler};
