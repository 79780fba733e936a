//! Auto-hiding on-screen controls.
//!
//! Any user activity shows the controls and re-arms a single one-shot hide
//! task; the controls disappear once the delay passes with no activity.

use tracing::debug;

use crate::events::Event;
use crate::timer::{Scheduler, TaskHandle, TaskKind};

pub const DEFAULT_HIDE_DELAY_MS: u64 = 5_000;

#[derive(Debug)]
pub struct ControlsVisibility {
    visible: bool,
    hide_delay_ms: u64,
    pending_hide: Option<TaskHandle>,
}

impl Default for ControlsVisibility {
    fn default() -> Self {
        Self::new(DEFAULT_HIDE_DELAY_MS)
    }
}

impl ControlsVisibility {
    pub fn new(hide_delay_ms: u64) -> Self {
        Self {
            visible: true,
            hide_delay_ms,
            pending_hide: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn hide_delay_ms(&self) -> u64 {
        self.hide_delay_ms
    }

    /// Show controls and restart the hide countdown.
    /// Emits an event only when visibility actually changes.
    pub fn note_activity(&mut self, sched: &mut Scheduler) -> Option<Event> {
        if let Some(handle) = self.pending_hide.take() {
            sched.cancel(handle);
        }
        self.pending_hide = Some(sched.once(TaskKind::HideControls, self.hide_delay_ms));

        if self.visible {
            return None;
        }
        self.visible = true;
        Some(Event::ControlsVisibility { visible: true })
    }

    /// Called when the hide task fires.
    pub fn on_hide_due(&mut self, handle: TaskHandle) -> Option<Event> {
        if self.pending_hide != Some(handle) {
            debug!("ignoring superseded hide task");
            return None;
        }
        self.pending_hide = None;
        if !self.visible {
            return None;
        }
        self.visible = false;
        Some(Event::ControlsVisibility { visible: false })
    }

    pub fn cancel(&mut self, sched: &mut Scheduler) {
        if let Some(handle) = self.pending_hide.take() {
            sched.cancel(handle);
        }
    }
}
