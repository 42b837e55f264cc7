//! Structured debug logging system

use crate::error::DiagnosticsError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the process-wide tracing subscriber
#[derive(Debug, Default)]
pub struct DebugLogger;

impl DebugLogger {
    /// Initialize logging with the default filter
    pub fn init_logging() -> Result<(), DiagnosticsError> {
        Self::init_with_filter(DEFAULT_LOG_FILTER)
    }

    /// Initialize logging; `RUST_LOG` takes precedence over `default_filter`.
    ///
    /// Safe to call more than once: if a global subscriber is already
    /// installed it is left in place.
    pub fn init_with_filter(default_filter: &str) -> Result<(), DiagnosticsError> {
        let filter = Self::filter(default_filter)?;
        if tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init()
            .is_err()
        {
            debug!("Tracing subscriber already installed");
        }
        Ok(())
    }

    fn filter(default_filter: &str) -> Result<EnvFilter, DiagnosticsError> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter))
            .map_err(|e| DiagnosticsError::InvalidConfiguration {
                message: format!("Invalid log filter '{}': {}", default_filter, e),
            })
    }
}
