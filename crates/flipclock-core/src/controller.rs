//! Mode controller.
//!
//! Owns every piece of page-lifetime state: the display mode, the
//! countdown engine and its driver, the effective-time ledger, the
//! controls auto-hide, the goal tag and the task scheduler.
//!
//! ## Drivers
//!
//! Two periodic tasks feed the display, each firing once per second:
//!
//! - the **clock driver** exists only while the Clock mode is shown;
//! - the **countdown driver** is installed by `start()` and survives mode
//!   switches, so a countdown keeps running (and expiring, and staging
//!   pending time) behind the clock. Tick events are always published;
//!   only the renderer is gated on the mode.
//!
//! Starting a countdown cancels the previous countdown driver before
//! installing the new one, so at most one task ever decrements the engine.
//! The first tick of a run is delivered by `start()` itself.
//!
//! Switching modes and a countdown expiring both reveal the controls and
//! restart their hide delay, like any user input.
//!
//! ## Usage
//!
//! ```ignore
//! let mut ctl = ModeController::new(&config, time, Box::new(renderer));
//! ctl.subscribe(Box::new(sink));
//! ctl.start_countdown();
//! // On the host loop:
//! ctl.pump(elapsed_ms);
//! ```

use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::{parse_field, Hms, TimeSource};
use crate::display::{DisplayRenderer, FlipTracker};
use crate::error::ValidationError;
use crate::events::{Event, EventSink};
use crate::ledger::EffectiveTimeLedger;
use crate::storage::Config;
use crate::timer::{CountdownEngine, CountdownPhase, Scheduler, TaskHandle, TaskKind};
use crate::visibility::ControlsVisibility;

/// Both drivers fire once per second.
pub const TICK_PERIOD_MS: u64 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    Clock,
    Countdown,
}

/// The three countdown input fields as typed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountdownInputs {
    pub hours: String,
    pub minutes: String,
    pub seconds: String,
}

impl CountdownInputs {
    pub fn new(hours: &str, minutes: &str, seconds: &str) -> Self {
        Self {
            hours: hours.to_string(),
            minutes: minutes.to_string(),
            seconds: seconds.to_string(),
        }
    }

    pub fn from_hms(value: Hms) -> Self {
        Self {
            hours: value.hours.to_string(),
            minutes: value.minutes.to_string(),
            seconds: value.seconds.to_string(),
        }
    }

    /// Leniently parsed and clamped, but not normalised: `0:90:0` stays as is.
    pub fn parsed(&self) -> Hms {
        Hms::clamped(
            parse_field(&self.hours),
            parse_field(&self.minutes),
            parse_field(&self.seconds),
        )
    }
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub mode: DisplayMode,
    pub countdown: CountdownPhase,
    pub remaining: Hms,
    pub duration_secs: u64,
    pub pending_secs: u64,
    pub committed_secs: u64,
    pub goal: Option<String>,
    pub goal_visible: bool,
    pub controls_visible: bool,
}

pub struct ModeController {
    mode: DisplayMode,
    countdown: CountdownEngine,
    countdown_driver: Option<TaskHandle>,
    clock_driver: Option<TaskHandle>,
    ledger: EffectiveTimeLedger,
    controls: ControlsVisibility,
    scheduler: Scheduler,
    inputs: CountdownInputs,
    goal: Option<String>,
    flips: FlipTracker,
    time: Rc<dyn TimeSource>,
    renderer: Box<dyn DisplayRenderer>,
    sinks: Vec<Box<dyn EventSink>>,
}

impl fmt::Debug for ModeController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModeController")
            .field("mode", &self.mode)
            .field("countdown", &self.countdown)
            .field("ledger", &self.ledger)
            .field("goal", &self.goal)
            .field("sinks", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

impl ModeController {
    /// Build the controller and enter the configured initial mode.
    ///
    /// The countdown inputs are pre-filled with the configured default
    /// duration; no countdown is started.
    pub fn new(
        config: &Config,
        time: Rc<dyn TimeSource>,
        renderer: Box<dyn DisplayRenderer>,
    ) -> Self {
        let mut ctl = Self {
            mode: config.display.initial_mode,
            countdown: CountdownEngine::with_fallback(config.countdown.fallback_seconds),
            countdown_driver: None,
            clock_driver: None,
            ledger: EffectiveTimeLedger::new(time.clone()),
            controls: ControlsVisibility::new(config.controls_hide_ms()),
            scheduler: Scheduler::new(),
            inputs: CountdownInputs::from_hms(config.default_duration()),
            goal: None,
            flips: FlipTracker::new(),
            time,
            renderer,
            sinks: Vec::new(),
        };
        ctl.enter(config.display.initial_mode);
        ctl
    }

    pub fn subscribe(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn countdown(&self) -> &CountdownEngine {
        &self.countdown
    }

    pub fn ledger(&self) -> &EffectiveTimeLedger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn inputs(&self) -> &CountdownInputs {
        &self.inputs
    }

    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// The goal is only shown outside Clock mode.
    pub fn goal_visible(&self) -> bool {
        self.goal.is_some() && self.mode != DisplayMode::Clock
    }

    pub fn controls_visible(&self) -> bool {
        self.controls.is_visible()
    }

    /// Earliest scheduled task, for the host to sleep until.
    pub fn next_due(&self) -> Option<u64> {
        self.scheduler.next_due()
    }

    /// Current state, rolling the ledger over first if the day changed.
    pub fn snapshot(&mut self) -> Snapshot {
        let committed_secs = self.committed_today();
        Snapshot {
            mode: self.mode,
            countdown: self.countdown.phase(),
            remaining: self.countdown.remaining(),
            duration_secs: self.countdown.original_duration_secs(),
            pending_secs: self.ledger.pending_secs(),
            committed_secs,
            goal: self.goal.clone(),
            goal_visible: self.goal_visible(),
            controls_visible: self.controls.is_visible(),
        }
    }

    // ── Mode switching ───────────────────────────────────────────────

    /// Show the wall clock. A running countdown keeps running unseen.
    pub fn show_clock(&mut self) {
        self.enter(DisplayMode::Clock);
    }

    /// Show the countdown: its live value if one was started, otherwise
    /// the input fields.
    pub fn show_countdown(&mut self) {
        self.enter(DisplayMode::Countdown);
    }

    /// Re-render after the host was hidden (e.g. a background tab).
    pub fn refresh_visible(&mut self) {
        if self.mode == DisplayMode::Clock {
            let now = self.time.time_of_day();
            self.render(now);
        }
    }

    fn enter(&mut self, mode: DisplayMode) {
        if let Some(handle) = self.clock_driver.take() {
            self.scheduler.cancel(handle);
        }

        let changed = self.mode != mode;
        self.mode = mode;
        if changed {
            info!(?mode, "display mode changed");
        }

        match mode {
            DisplayMode::Clock => {
                let now = self.time.time_of_day();
                self.render(now);
                self.clock_driver = Some(self.scheduler.every(TaskKind::ClockDisplay, TICK_PERIOD_MS));
            }
            DisplayMode::Countdown => {
                let shown = match self.countdown.phase() {
                    CountdownPhase::Running | CountdownPhase::Expired => self.countdown.remaining(),
                    CountdownPhase::Idle => self.inputs.parsed(),
                };
                self.render(shown);
            }
        }

        if changed {
            self.publish(Event::ModeChanged { mode });
        }
        self.note_activity();
    }

    // ── Countdown ────────────────────────────────────────────────────

    pub fn set_inputs(&mut self, inputs: CountdownInputs) {
        self.inputs = inputs;
    }

    /// Start a countdown from the current input fields.
    pub fn start_countdown(&mut self) {
        let duration = self.inputs.parsed();
        self.start_hms(duration);
    }

    /// Start a countdown; negative fields count as zero.
    pub fn start(&mut self, hours: i64, minutes: i64, seconds: i64) {
        self.start_hms(Hms::clamped(hours, minutes, seconds));
    }

    fn start_hms(&mut self, duration: Hms) {
        if let Some(event) = self.ledger.rollover_if_new_day() {
            self.publish(event);
        }

        if let Some(handle) = self.countdown_driver.take() {
            self.scheduler.cancel(handle);
        }
        let events = self.countdown.start_hms(duration);
        let generation = self.countdown.generation();
        self.countdown_driver = Some(
            self.scheduler
                .every(TaskKind::CountdownTick { generation }, TICK_PERIOD_MS),
        );
        for event in events {
            self.on_countdown_event(event);
        }
    }

    fn on_countdown_tick(&mut self, generation: u64) {
        if let Some(event) = self.countdown.tick_generation(generation) {
            self.on_countdown_event(event);
        }
    }

    fn on_countdown_event(&mut self, event: Event) {
        match event {
            Event::Tick {
                hours,
                minutes,
                seconds,
            } => {
                if self.mode == DisplayMode::Countdown {
                    self.render(Hms::new(hours, minutes, seconds));
                }
                self.publish(event);
            }
            Event::Expired { duration_secs, .. } => {
                if let Some(handle) = self.countdown_driver.take() {
                    self.scheduler.cancel(handle);
                }
                self.publish(event);
                let staged = self.ledger.on_countdown_expired(duration_secs);
                self.publish(staged);
                self.note_activity();
            }
            other => self.publish(other),
        }
    }

    // ── Effective time ───────────────────────────────────────────────

    pub fn commit_pending(&mut self) {
        for event in self.ledger.commit_pending() {
            self.publish(event);
        }
    }

    pub fn clear_pending(&mut self) {
        let event = self.ledger.clear_pending();
        self.publish(event);
    }

    pub fn edit_pending(
        &mut self,
        hours: i64,
        minutes: i64,
        seconds: i64,
    ) -> Result<(), ValidationError> {
        let event = self.ledger.edit_pending(hours, minutes, seconds)?;
        self.publish(event);
        Ok(())
    }

    pub fn edit_pending_str(&mut self, text: &str) -> Result<(), ValidationError> {
        let event = self.ledger.edit_pending_str(text)?;
        self.publish(event);
        Ok(())
    }

    /// Today's committed total, rolling over first.
    pub fn committed_today(&mut self) -> u64 {
        if let Some(event) = self.ledger.rollover_if_new_day() {
            self.publish(event);
        }
        self.ledger.committed_secs()
    }

    // ── Goal and controls ────────────────────────────────────────────

    /// Set the goal tag. Surrounding whitespace is dropped; empty clears it.
    pub fn set_goal(&mut self, text: &str) {
        let trimmed = text.trim();
        let goal = (!trimmed.is_empty()).then(|| trimmed.to_string());
        if goal == self.goal {
            return;
        }
        self.goal = goal;
        self.publish(Event::GoalChanged {
            goal: self.goal.clone(),
        });
    }

    /// Any user input: show the controls and restart the hide delay.
    pub fn note_activity(&mut self) {
        if let Some(event) = self.controls.note_activity(&mut self.scheduler) {
            self.publish(event);
        }
    }

    // ── Host loop ────────────────────────────────────────────────────

    /// Advance to `now_ms` on the host's monotonic clock and run every task
    /// that came due, one at a time. Returns how many ran.
    pub fn pump(&mut self, now_ms: u64) -> usize {
        let mut ran = 0;
        while let Some((handle, kind)) = self.scheduler.pop_due(now_ms) {
            ran += 1;
            match kind {
                TaskKind::ClockDisplay => {
                    if self.clock_driver == Some(handle) {
                        let now = self.time.time_of_day();
                        self.render(now);
                    }
                }
                TaskKind::CountdownTick { generation } => {
                    if self.countdown_driver == Some(handle) {
                        self.on_countdown_tick(generation);
                    }
                }
                TaskKind::HideControls => {
                    if let Some(event) = self.controls.on_hide_due(handle) {
                        self.publish(event);
                    }
                }
            }
        }
        ran
    }

    /// Cancel every timer. Safe to call more than once.
    pub fn shutdown(&mut self) {
        if !self.scheduler.is_empty() {
            debug!(tasks = self.scheduler.len(), "cancelling scheduled tasks");
        }
        self.clock_driver = None;
        self.countdown_driver = None;
        self.controls.cancel(&mut self.scheduler);
        self.scheduler.cancel_all();
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn render(&mut self, value: Hms) {
        let frame = self.flips.frame(value);
        self.renderer.render(&frame);
    }

    fn publish(&mut self, event: Event) {
        for sink in &mut self.sinks {
            sink.on_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::display::DigitFrame;
    use chrono::NaiveDate;
    use std::cell::RefCell;

    type Frames = Rc<RefCell<Vec<DigitFrame>>>;

    fn controller() -> (ModeController, Frames, Rc<ManualTimeSource>) {
        let start = NaiveDate::from_ymd_opt(2026, 10, 15)
            .and_then(|d| d.and_hms_opt(9, 15, 0))
            .unwrap();
        let clock = Rc::new(ManualTimeSource::new(start));
        let frames: Frames = Rc::default();
        let sink = frames.clone();
        let renderer = move |frame: &DigitFrame| sink.borrow_mut().push(*frame);
        let ctl = ModeController::new(&Config::default(), clock.clone(), Box::new(renderer));
        (ctl, frames, clock)
    }

    fn last_text(frames: &Frames) -> String {
        frames.borrow().last().map(|f| f.text()).unwrap_or_default()
    }

    #[test]
    fn starts_in_countdown_showing_default_inputs() {
        let (ctl, frames, _) = controller();
        assert_eq!(ctl.mode(), DisplayMode::Countdown);
        assert_eq!(ctl.countdown().phase(), CountdownPhase::Idle);
        assert_eq!(frames.borrow().len(), 1);
        assert_eq!(last_text(&frames), "00:30:00");
        assert_eq!(ctl.scheduler().len(), 1);
        assert_eq!(ctl.scheduler().count(|k| *k == TaskKind::HideControls), 1);
    }

    #[test]
    fn clock_mode_renders_now_and_every_second() {
        let (mut ctl, frames, clock) = controller();
        ctl.show_clock();
        assert_eq!(last_text(&frames), "09:15:00");

        clock.advance_secs(1);
        assert_eq!(ctl.pump(1_000), 1);
        assert_eq!(last_text(&frames), "09:15:01");
    }

    #[test]
    fn reentering_clock_keeps_a_single_driver() {
        let (mut ctl, _, _) = controller();
        ctl.show_clock();
        ctl.show_clock();
        assert_eq!(ctl.scheduler().count(|k| *k == TaskKind::ClockDisplay), 1);
        ctl.show_countdown();
        assert_eq!(ctl.scheduler().count(|k| *k == TaskKind::ClockDisplay), 0);
    }

    #[test]
    fn countdown_ticks_render_only_in_countdown_mode() {
        let (mut ctl, frames, _) = controller();
        ctl.start(0, 0, 5);
        assert_eq!(last_text(&frames), "00:00:05");
        ctl.pump(1_000);
        assert_eq!(last_text(&frames), "00:00:04");

        ctl.show_clock();
        let rendered = frames.borrow().len();
        ctl.pump(2_000);
        // clock driver installed at 1s fires at 2s; the countdown tick does not render
        assert_eq!(frames.borrow().len(), rendered + 1);
        assert_eq!(ctl.countdown().remaining_secs(), 3);
    }

    #[test]
    fn restart_replaces_the_countdown_driver() {
        let (mut ctl, _, _) = controller();
        ctl.start(0, 0, 10);
        ctl.pump(1_000);
        ctl.start(0, 0, 3);
        let ticks = |k: &TaskKind| matches!(k, TaskKind::CountdownTick { .. });
        assert_eq!(ctl.scheduler().count(ticks), 1);

        ctl.pump(2_000);
        assert_eq!(ctl.countdown().remaining_secs(), 2);
    }

    #[test]
    fn start_from_inputs_is_lenient() {
        let (mut ctl, _, _) = controller();
        ctl.set_inputs(CountdownInputs::new("x", "-4", "7s"));
        ctl.start_countdown();
        assert_eq!(ctl.countdown().original_duration_secs(), 7);

        ctl.set_inputs(CountdownInputs::new("", "", ""));
        ctl.start_countdown();
        assert_eq!(ctl.countdown().original_duration_secs(), 60);
    }

    #[test]
    fn goal_hidden_in_clock_mode() {
        let (mut ctl, _, _) = controller();
        ctl.set_goal("  write the report ");
        assert_eq!(ctl.goal(), Some("write the report"));
        assert!(ctl.goal_visible());

        ctl.show_clock();
        assert!(!ctl.goal_visible());
        ctl.show_countdown();
        assert!(ctl.goal_visible());

        ctl.set_goal("   ");
        assert_eq!(ctl.goal(), None);
        assert!(!ctl.goal_visible());
    }

    #[test]
    fn controls_hide_after_inactivity() {
        let (mut ctl, _, _) = controller();
        ctl.note_activity();
        ctl.pump(4_000);
        assert!(ctl.controls_visible());
        ctl.pump(5_000);
        assert!(!ctl.controls_visible());
    }

    #[test]
    fn start_renders_and_publishes_the_first_tick() {
        let (mut ctl, frames, _) = controller();
        let events: Rc<RefCell<Vec<Event>>> = Rc::default();
        let sink = events.clone();
        ctl.subscribe(Box::new(move |e: &Event| sink.borrow_mut().push(e.clone())));

        let before = frames.borrow().len();
        ctl.start(0, 0, 5);
        assert_eq!(frames.borrow().len(), before + 1);
        assert_eq!(last_text(&frames), "00:00:05");

        let events = events.borrow();
        assert!(matches!(
            events[0],
            Event::CountdownStarted {
                duration_secs: 5,
                ..
            }
        ));
        assert_eq!(
            events[1],
            Event::Tick {
                hours: 0,
                minutes: 0,
                seconds: 5
            }
        );
    }

    #[test]
    fn start_behind_the_clock_does_not_render() {
        let (mut ctl, frames, _) = controller();
        ctl.show_clock();
        let before = frames.borrow().len();
        ctl.start(0, 0, 5);
        assert_eq!(frames.borrow().len(), before);
    }

    #[test]
    fn mode_switch_reveals_hidden_controls() {
        let (mut ctl, _, _) = controller();
        ctl.pump(5_000);
        assert!(!ctl.controls_visible());

        ctl.show_clock();
        assert!(ctl.controls_visible());
        assert_eq!(ctl.scheduler().count(|k| *k == TaskKind::HideControls), 1);
        ctl.pump(10_000);
        assert!(!ctl.controls_visible());
    }

    #[test]
    fn expiry_reveals_hidden_controls() {
        let (mut ctl, _, _) = controller();
        let events: Rc<RefCell<Vec<Event>>> = Rc::default();
        let sink = events.clone();
        ctl.subscribe(Box::new(move |e: &Event| sink.borrow_mut().push(e.clone())));

        ctl.pump(5_000);
        assert!(!ctl.controls_visible());

        ctl.start(0, 0, 1);
        ctl.pump(6_000);
        assert!(!ctl.controls_visible());
        ctl.pump(7_000);
        assert_eq!(ctl.countdown().phase(), CountdownPhase::Expired);
        assert!(ctl.controls_visible());
        assert_eq!(
            events.borrow().last(),
            Some(&Event::ControlsVisibility { visible: true })
        );
        assert_eq!(ctl.scheduler().count(|k| *k == TaskKind::HideControls), 1);

        ctl.pump(11_999);
        assert!(ctl.controls_visible());
        ctl.pump(12_000);
        assert!(!ctl.controls_visible());
    }

    #[test]
    fn refresh_visible_only_in_clock_mode() {
        let (mut ctl, frames, clock) = controller();
        ctl.refresh_visible();
        assert_eq!(frames.borrow().len(), 1);

        ctl.show_clock();
        clock.advance_secs(42);
        ctl.refresh_visible();
        assert_eq!(last_text(&frames), "09:15:42");
    }

    #[test]
    fn shutdown_cancels_everything_idempotently() {
        let (mut ctl, _, _) = controller();
        ctl.start(0, 1, 0);
        ctl.show_clock();
        ctl.note_activity();
        assert_eq!(ctl.scheduler().len(), 3);

        ctl.shutdown();
        ctl.shutdown();
        assert!(ctl.scheduler().is_empty());
        assert_eq!(ctl.next_due(), None);
        assert_eq!(ctl.pump(60_000), 0);
    }

    #[test]
    fn initial_mode_from_config() {
        let clock = Rc::new(ManualTimeSource::new(
            NaiveDate::from_ymd_opt(2026, 1, 1)
                .and_then(|d| d.and_hms_opt(7, 0, 0))
                .unwrap(),
        ));
        let mut config = Config::default();
        config.display.initial_mode = DisplayMode::Clock;
        let ctl = ModeController::new(&config, clock, Box::new(|_: &DigitFrame| {}));
        assert_eq!(ctl.mode(), DisplayMode::Clock);
        assert_eq!(ctl.scheduler().count(|k| *k == TaskKind::ClockDisplay), 1);
    }
}
