//! # Video Track Diagnostics
//!
//! Telemetry and logging for video track processing.
//! Provides a processor event observer that turns per-frame events into
//! periodic reports, and structured logging setup.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod debug_logger;
pub mod error;
pub mod processor_events;

// Re-export main types
pub use debug_logger::{DebugLogger, DEFAULT_LOG_FILTER};
pub use error::DiagnosticsError;
pub use processor_events::{ProcessorEventObserver, ProcessorTelemetry, ReportKind, TelemetryConfig};
