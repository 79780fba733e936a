//! Terminal output for frames and events.
//!
//! Human mode redraws the clock in place on one line and prints ledger
//! changes below it; JSON mode prints one event per line and no frames.

use std::io::Write;

use flipclock_core::{DigitFrame, DisplayRenderer, Event, EventSink, Hms};

/// Redraws `HH:MM:SS` in place.
struct TerminalRenderer;

impl DisplayRenderer for TerminalRenderer {
    fn render(&mut self, frame: &DigitFrame) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "\r  {}  ", frame.text());
        let _ = out.flush();
    }
}

pub fn renderer(json: bool) -> Box<dyn DisplayRenderer> {
    if json {
        Box::new(|_: &DigitFrame| {})
    } else {
        Box::new(TerminalRenderer)
    }
}

pub fn sink(json: bool) -> Box<dyn EventSink> {
    if json {
        Box::new(|event: &Event| match serde_json::to_string(event) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to serialize event"),
        })
    } else {
        Box::new(|event: &Event| {
            if let Some(line) = describe(event) {
                println!("\n{line}");
            }
        })
    }
}

/// One-line human description; `None` for events the clock face already shows.
pub fn describe(event: &Event) -> Option<String> {
    match event {
        Event::CountdownStarted { duration_secs, .. } => Some(format!(
            "countdown started: {}",
            Hms::from_secs(*duration_secs)
        )),
        Event::Expired { duration_secs, .. } => Some(format!(
            "countdown finished: {}",
            Hms::from_secs(*duration_secs)
        )),
        Event::PendingChanged { seconds } => {
            Some(format!("pending: {}", Hms::from_secs(*seconds)))
        }
        Event::CommittedChanged { seconds } => {
            Some(format!("effective today: {}", Hms::from_secs(*seconds)))
        }
        Event::ModeChanged { mode } => Some(format!("mode: {mode:?}").to_lowercase()),
        Event::GoalChanged { goal } => Some(match goal {
            Some(goal) => format!("goal: {goal}"),
            None => "goal cleared".to_string(),
        }),
        Event::Tick { .. } | Event::ControlsVisibility { .. } => None,
    }
}
