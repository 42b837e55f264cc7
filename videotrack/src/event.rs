//! Event streams over track events

use crate::TrackEvent;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

/// Event filter for selective event processing
#[derive(Debug, Clone)]
pub struct EventFilter {
    /// Whether to include dimension changes
    pub include_dimension_events: bool,
    /// Whether to include the started event
    pub include_lifecycle_events: bool,
    /// Whether to include enabled/disabled events
    pub include_state_events: bool,
    /// Specific event types to include (if specified, overrides other filters)
    pub specific_event_types: Option<Vec<String>>,
}

impl EventFilter {
    /// Create a filter that includes all events
    pub fn all() -> Self {
        Self {
            include_dimension_events: true,
            include_lifecycle_events: true,
            include_state_events: true,
            specific_event_types: None,
        }
    }

    /// Create a filter that includes only dimension changes
    pub fn dimensions_only() -> Self {
        Self {
            include_dimension_events: true,
            include_lifecycle_events: false,
            include_state_events: false,
            specific_event_types: None,
        }
    }

    /// Create a filter for specific event types
    pub fn specific(event_types: Vec<String>) -> Self {
        Self {
            include_dimension_events: false,
            include_lifecycle_events: false,
            include_state_events: false,
            specific_event_types: Some(event_types),
        }
    }

    /// Check if an event should be included based on this filter
    pub fn should_include(&self, event: &TrackEvent) -> bool {
        if let Some(ref specific_types) = self.specific_event_types {
            return specific_types.iter().any(|t| t == event.event_type());
        }

        match event {
            TrackEvent::DimensionsChanged { .. } => self.include_dimension_events,
            TrackEvent::Started => self.include_lifecycle_events,
            TrackEvent::Enabled | TrackEvent::Disabled => self.include_state_events,
        }
    }
}

impl Default for EventFilter {
    fn default() -> Self {
        Self::all()
    }
}

/// Stream of events from one video track
#[derive(Debug)]
pub struct EventStream {
    receiver: broadcast::Receiver<TrackEvent>,
    filter: EventFilter,
}

impl EventStream {
    /// Create a stream over a track event receiver
    pub fn new(receiver: broadcast::Receiver<TrackEvent>) -> Self {
        Self::filtered(receiver, EventFilter::all())
    }

    /// Create a stream that only yields events matching `filter`
    pub fn filtered(receiver: broadcast::Receiver<TrackEvent>, filter: EventFilter) -> Self {
        Self { receiver, filter }
    }

    /// Get the next matching event; `None` once the track is gone
    pub async fn next(&mut self) -> Option<TrackEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.should_include(&event) => return Some(event),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Event stream lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Try to get the next matching event without waiting
    pub fn try_next(&mut self) -> Option<TrackEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if self.filter.should_include(&event) => return Some(event),
                Ok(_) | Err(TryRecvError::Lagged(_)) => {}
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Update the filter
    pub fn set_filter(&mut self, filter: EventFilter) {
        self.filter = filter;
    }

    /// Get the current filter
    pub fn filter(&self) -> &EventFilter {
        &self.filter
    }
}
