//! Wall-clock time sources.
//!
//! The clock display and the effective-time day rollover both read local
//! time through [`TimeSource`], so tests and embedders can substitute a
//! controllable clock.

use std::cell::Cell;

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};

use super::Hms;

/// Supplies the current local wall-clock time.
pub trait TimeSource {
    fn now(&self) -> NaiveDateTime;

    /// Current calendar date.
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Current time of day as `(h, m, s)`.
    fn time_of_day(&self) -> Hms {
        let now = self.now();
        Hms::new(
            u64::from(now.hour()),
            u64::from(now.minute()),
            u64::from(now.second()),
        )
    }
}

/// System local time via chrono.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A manually advanced clock.
#[derive(Debug)]
pub struct ManualTimeSource {
    current: Cell<NaiveDateTime>,
}

impl ManualTimeSource {
    pub fn new(start: NaiveDateTime) -> Self {
        Self {
            current: Cell::new(start),
        }
    }

    pub fn set(&self, at: NaiveDateTime) {
        self.current.set(at);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.current
            .set(self.current.get() + chrono::Duration::seconds(secs));
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> NaiveDateTime {
        self.current.get()
    }
}
