//! Countdown engine.
//!
//! Like the rest of the core, the engine owns no thread: the host calls
//! `tick()` once per second while a countdown runs.
//!
//! ## Phases
//!
//! ```text
//! Idle -> Running -> Expired
//!           ^           |
//!           +-- start --+
//! ```
//!
//! `start` emits the first `Tick` itself, showing the full duration. Each
//! later `tick()` shows one second less, so a run of `n` seconds produces
//! `n + 1` ticks in total: the zero state arrives on host tick `n` and stays
//! visible for a full second, then host tick `n + 1` reports `Expired`.
//!
//! Every `start()` bumps a generation counter. Ticks from a host timer that
//! belonged to an earlier run can be addressed to their generation with
//! [`CountdownEngine::tick_generation`] and are dropped.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::clock::Hms;
use crate::events::Event;

/// Duration used when a countdown is started with a total below one second.
pub const DEFAULT_FALLBACK_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CountdownPhase {
    Idle,
    Running,
    /// Ran out; holds the zero state until the next start.
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountdownEngine {
    phase: CountdownPhase,
    remaining_secs: u64,
    original_secs: u64,
    generation: u64,
    fallback_secs: u64,
}

impl Default for CountdownEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CountdownEngine {
    pub fn new() -> Self {
        Self::with_fallback(DEFAULT_FALLBACK_SECS)
    }

    /// Engine whose zero-duration fallback is `fallback_secs` (at least 1).
    pub fn with_fallback(fallback_secs: u64) -> Self {
        Self {
            phase: CountdownPhase::Idle,
            remaining_secs: 0,
            original_secs: 0,
            generation: 0,
            fallback_secs: fallback_secs.max(1),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> CountdownPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == CountdownPhase::Running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.remaining_secs
    }

    pub fn remaining(&self) -> Hms {
        Hms::from_secs(self.remaining_secs)
    }

    pub fn original_duration_secs(&self) -> u64 {
        self.original_secs
    }

    /// Identifies the current run; bumped by every `start`.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn fallback_secs(&self) -> u64 {
        self.fallback_secs
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start (or restart) from signed inputs.
    ///
    /// Negative fields count as zero and a total below one second falls back
    /// to the configured default. Any run in progress is abandoned.
    ///
    /// Returns `CountdownStarted` followed by the first `Tick`.
    pub fn start(&mut self, hours: i64, minutes: i64, seconds: i64) -> Vec<Event> {
        self.start_hms(Hms::clamped(hours, minutes, seconds))
    }

    pub fn start_hms(&mut self, duration: Hms) -> Vec<Event> {
        let mut total = duration.total_secs();
        if total < 1 {
            debug!(fallback = self.fallback_secs, "zero countdown, using fallback");
            total = self.fallback_secs;
        }

        self.generation += 1;
        self.phase = CountdownPhase::Running;
        self.remaining_secs = total;
        self.original_secs = total;

        info!(duration_secs = total, generation = self.generation, "countdown started");
        vec![
            Event::CountdownStarted {
                duration_secs: total,
                at: Utc::now(),
            },
            self.shown(),
        ]
    }

    /// Advance one second. Returns the next `Tick` or, once zero has been
    /// shown, `Expired`. Does nothing unless running.
    pub fn tick(&mut self) -> Option<Event> {
        if !self.is_running() {
            return None;
        }

        if self.remaining_secs == 0 {
            self.phase = CountdownPhase::Expired;
            info!(duration_secs = self.original_secs, "countdown expired");
            return Some(Event::Expired {
                duration_secs: self.original_secs,
                at: Utc::now(),
            });
        }

        self.remaining_secs -= 1;
        Some(self.shown())
    }

    /// `tick()` for a host timer installed for run `generation`.
    pub fn tick_generation(&mut self, generation: u64) -> Option<Event> {
        if generation != self.generation {
            debug!(stale = generation, current = self.generation, "dropping stale tick");
            return None;
        }
        self.tick()
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// `Tick` for the value currently shown.
    fn shown(&self) -> Event {
        let shown = self.remaining();
        Event::Tick {
            hours: shown.hours,
            minutes: shown.minutes,
            seconds: shown.seconds,
        }
    }
}
