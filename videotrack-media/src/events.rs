//! Processor lifecycle events and the observers that receive them

use serde::{Deserialize, Serialize};

/// Metadata carried by the `add` event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorInfo {
    /// Processor name
    pub processor: String,
    /// Width frames are captured at
    pub capture_width: u32,
    /// Height frames are captured at
    pub capture_height: u32,
    /// Frame rate reported by the source
    pub input_frame_rate: f64,
    /// Whether the track was received from a remote participant
    pub is_remote_track: bool,
}

/// What happened to the processor attached to a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum ProcessorEvent {
    /// A processor was attached
    Add(ProcessorInfo),
    /// The capture loop started
    Start,
    /// The capture loop stopped because capture is no longer permitted
    Stop {
        /// Why capture is not permitted
        reason: String,
    },
    /// A processed frame was published
    Stats,
    /// The processor was removed
    Remove,
}

impl ProcessorEvent {
    /// Lowercase event name
    pub fn name(&self) -> &'static str {
        match self {
            ProcessorEvent::Add(_) => "add",
            ProcessorEvent::Start => "start",
            ProcessorEvent::Stop { .. } => "stop",
            ProcessorEvent::Stats => "stats",
            ProcessorEvent::Remove => "remove",
        }
    }
}

/// Receives processor events from a track.
///
/// Called synchronously from the track; implementations should not block.
pub trait ProcessorEventSink: Send + Sync {
    /// Called for every processor event on `track_id`
    fn on_processor_event(&self, track_id: &str, event: &ProcessorEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(ProcessorEvent::Start.name(), "start");
        assert_eq!(
            ProcessorEvent::Stop {
                reason: "x".to_string()
            }
            .name(),
            "stop"
        );
        assert_eq!(ProcessorEvent::Remove.name(), "remove");
    }
}
