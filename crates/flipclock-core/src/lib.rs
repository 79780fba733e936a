//! # flipclock Core Library
//!
//! This library provides the timing logic behind a flip-clock display:
//! the wall clock, a once-per-second countdown, and a daily tally of
//! "effective time" built from completed countdowns. Drawing digits is left
//! to a [`DisplayRenderer`]; the core only decides what to show and when.
//!
//! ## Architecture
//!
//! - **Countdown Engine**: a caller-ticked state machine that counts down to
//!   zero, shows the zero state for one tick, then reports expiry
//! - **Effective-Time Ledger**: pending/committed seconds with a lazy
//!   day rollover
//! - **Mode Controller**: switches between clock and countdown display and
//!   owns every timer through a single-threaded [`Scheduler`]
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`ModeController`]: top-level orchestrator
//! - [`CountdownEngine`]: countdown state machine
//! - [`EffectiveTimeLedger`]: daily effective-time accounting
//! - [`Config`]: application configuration management

pub mod clock;
pub mod controller;
pub mod display;
pub mod error;
pub mod events;
pub mod ledger;
pub mod storage;
pub mod timer;
pub mod visibility;

pub use clock::{Hms, ManualTimeSource, SystemTimeSource, TimeSource};
pub use controller::{CountdownInputs, DisplayMode, ModeController, Snapshot, TICK_PERIOD_MS};
pub use display::{DigitFrame, DisplayRenderer, FlipTracker};
pub use error::{ConfigError, CoreError, ValidationError};
pub use events::{Event, EventSink};
pub use ledger::EffectiveTimeLedger;
pub use storage::Config;
pub use timer::{CountdownEngine, CountdownPhase, Scheduler, TaskHandle, TaskKind};
pub use visibility::ControlsVisibility;
