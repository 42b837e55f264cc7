//! Environment capability detection

use std::sync::OnceLock;
use tracing::debug;

/// Environment variable that disables off-thread frame buffers for the process
pub const DISABLE_OFFSCREEN_ENV: &str = "VIDEOTRACK_DISABLE_OFFSCREEN";

static DETECTED: OnceLock<HostCapabilities> = OnceLock::new();

/// Capabilities of the host environment relevant to frame processing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostCapabilities {
    /// Whether frame buffers that can be handed to a processor off the render path are available
    pub offscreen_buffers: bool,
}

impl HostCapabilities {
    /// Capabilities of a host that supports everything
    pub const fn full() -> Self {
        Self {
            offscreen_buffers: true,
        }
    }

    /// Detect the host capabilities.
    ///
    /// Detection runs once per process; later calls return the cached value.
    pub fn detect() -> Self {
        *DETECTED.get_or_init(|| {
            let capabilities = Self {
                offscreen_buffers: std::env::var_os(DISABLE_OFFSCREEN_ENV).is_none(),
            };
            debug!("Detected host capabilities: {:?}", capabilities);
            capabilities
        })
    }

    /// Whether video processors can be added in this environment
    pub fn supports_processing(&self) -> bool {
        self.offscreen_buffers
    }
}

impl Default for HostCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_is_cached() {
        let first = HostCapabilities::detect();
        let second = HostCapabilities::detect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_processing_support() {
        assert!(HostCapabilities::full().supports_processing());
        let limited = HostCapabilities {
            offscreen_buffers: false,
        };
        assert!(!limited.supports_processing());
    }
}
