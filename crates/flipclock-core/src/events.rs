use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::controller::DisplayMode;

/// Every state change in the core produces an Event.
/// Renderers and other collaborators subscribe to them through [`EventSink`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    CountdownStarted {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    /// One countdown second, carrying the value being displayed.
    Tick {
        hours: u64,
        minutes: u64,
        seconds: u64,
    },
    /// The countdown ran out. Carries the duration it was started with.
    Expired {
        duration_secs: u64,
        at: DateTime<Utc>,
    },
    PendingChanged {
        seconds: u64,
    },
    CommittedChanged {
        seconds: u64,
    },
    ModeChanged {
        mode: DisplayMode,
    },
    GoalChanged {
        goal: Option<String>,
    },
    ControlsVisibility {
        visible: bool,
    },
}

/// A subscriber to core events.
pub trait EventSink {
    fn on_event(&mut self, event: &Event);
}

impl<F> EventSink for F
where
    F: FnMut(&Event),
{
    fn on_event(&mut self, event: &Event) {
        (*self)(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(Event::PendingChanged { seconds: 90 }).unwrap();
        assert_eq!(json["type"], "PendingChanged");
        assert_eq!(json["seconds"], 90);

        let json = serde_json::to_value(Event::ModeChanged {
            mode: DisplayMode::Clock,
        })
        .unwrap();
        assert_eq!(json["mode"], "clock");
    }
}
