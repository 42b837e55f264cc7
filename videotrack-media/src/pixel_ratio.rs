//! Device pixel ratio monitoring

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Callback invoked with the new ratio
pub type PixelRatioCallback = Arc<dyn Fn(f64) + Send + Sync>;

/// Identifies a registered callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

struct Registry {
    ratio: f64,
    next_id: u64,
    callbacks: Vec<(CallbackId, PixelRatioCallback)>,
}

/// Tracks the host's device pixel ratio and notifies callbacks when it changes
pub struct DevicePixelRatioMonitor {
    registry: Mutex<Registry>,
}

impl DevicePixelRatioMonitor {
    /// Create a monitor starting at `initial_ratio`
    pub fn new(initial_ratio: f64) -> Self {
        Self {
            registry: Mutex::new(Registry {
                ratio: initial_ratio,
                next_id: 0,
                callbacks: Vec::new(),
            }),
        }
    }

    /// The last reported ratio
    pub fn current(&self) -> f64 {
        self.registry.lock().ratio
    }

    /// Register `callback`; returns its id and the current ratio
    pub fn register_callback(&self, callback: PixelRatioCallback) -> (CallbackId, f64) {
        let mut registry = self.registry.lock();
        let id = CallbackId(registry.next_id);
        registry.next_id += 1;
        registry.callbacks.push((id, callback));
        (id, registry.ratio)
    }

    /// Returns false if `id` was not registered
    pub fn unregister(&self, id: CallbackId) -> bool {
        let mut registry = self.registry.lock();
        let before = registry.callbacks.len();
        registry.callbacks.retain(|(registered, _)| *registered != id);
        registry.callbacks.len() != before
    }

    /// Report the host's current ratio
    pub fn update(&self, ratio: f64) {
        let callbacks: Vec<PixelRatioCallback> = {
            let mut registry = self.registry.lock();
            if registry.ratio == ratio {
                return;
            }
            registry.ratio = ratio;
            registry.callbacks.iter().map(|(_, cb)| cb.clone()).collect()
        };

        debug!("Device pixel ratio changed to {}", ratio);
        // Callbacks may re-register, so the lock is released first
        for callback in callbacks {
            callback(ratio);
        }
    }
}

impl Default for DevicePixelRatioMonitor {
    fn default() -> Self {
        Self::new(1.0)
    }
}
