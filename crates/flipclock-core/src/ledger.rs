//! Daily effective-time ledger.
//!
//! Expired countdowns stage their duration as *pending*; the user then adds
//! it to today's committed total, clears it, or edits it first. Only the
//! most recent expiry is staged: a second expiry overwrites the first.
//!
//! The committed total belongs to one calendar day. There is no background
//! timer for midnight; the date is compared lazily before every commit and
//! every user-visible read.

use std::fmt;
use std::rc::Rc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::clock::{Hms, TimeSource};
use crate::error::ValidationError;
use crate::events::Event;

pub struct EffectiveTimeLedger {
    committed_secs: u64,
    pending_secs: u64,
    last_reset: NaiveDate,
    time: Rc<dyn TimeSource>,
}

impl fmt::Debug for EffectiveTimeLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectiveTimeLedger")
            .field("committed_secs", &self.committed_secs)
            .field("pending_secs", &self.pending_secs)
            .field("last_reset", &self.last_reset)
            .finish_non_exhaustive()
    }
}

impl EffectiveTimeLedger {
    /// Empty ledger dated today.
    pub fn new(time: Rc<dyn TimeSource>) -> Self {
        Self {
            committed_secs: 0,
            pending_secs: 0,
            last_reset: time.today(),
            time,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Committed total as last stored, without a date check.
    pub fn committed_secs(&self) -> u64 {
        self.committed_secs
    }

    pub fn pending_secs(&self) -> u64 {
        self.pending_secs
    }

    pub fn last_reset_date(&self) -> NaiveDate {
        self.last_reset
    }

    /// Today's committed total, rolling over first if the date changed.
    pub fn committed_today(&mut self) -> u64 {
        self.rollover_if_new_day();
        self.committed_secs
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Stage the duration of a countdown that just ran out.
    pub fn on_countdown_expired(&mut self, duration_secs: u64) -> Event {
        if self.pending_secs > 0 && self.pending_secs != duration_secs {
            info!(
                dropped = self.pending_secs,
                staged = duration_secs,
                "uncommitted pending time replaced"
            );
        }
        self.pending_secs = duration_secs;
        Event::PendingChanged {
            seconds: self.pending_secs,
        }
    }

    /// Add pending time to today's total. No-op when nothing is pending.
    pub fn commit_pending(&mut self) -> Vec<Event> {
        if self.pending_secs == 0 {
            return Vec::new();
        }

        let mut events = Vec::with_capacity(3);
        events.extend(self.rollover_if_new_day());

        self.committed_secs = self.committed_secs.saturating_add(self.pending_secs);
        info!(
            added = self.pending_secs,
            committed = self.committed_secs,
            "pending time committed"
        );
        self.pending_secs = 0;

        events.push(Event::CommittedChanged {
            seconds: self.committed_secs,
        });
        events.push(Event::PendingChanged { seconds: 0 });
        events
    }

    pub fn clear_pending(&mut self) -> Event {
        self.pending_secs = 0;
        Event::PendingChanged { seconds: 0 }
    }

    /// Replace the pending amount with a user-entered duration.
    ///
    /// Requires `hours >= 0`, `0 <= minutes < 60` and `0 <= seconds < 60`;
    /// on failure nothing changes.
    pub fn edit_pending(
        &mut self,
        hours: i64,
        minutes: i64,
        seconds: i64,
    ) -> Result<Event, ValidationError> {
        if let Err(e) = validate_edit(hours, minutes, seconds) {
            warn!(error = %e, "pending time edit rejected");
            return Err(e);
        }

        self.pending_secs = Hms::clamped(hours, minutes, seconds).total_secs();
        Ok(Event::PendingChanged {
            seconds: self.pending_secs,
        })
    }

    /// [`edit_pending`](Self::edit_pending) from `HH:MM:SS` text.
    pub fn edit_pending_str(&mut self, text: &str) -> Result<Event, ValidationError> {
        let (h, m, s) = Hms::split_fields(text.trim()).inspect_err(|e| {
            warn!(error = %e, "pending time edit rejected");
        })?;
        self.edit_pending(h, m, s)
    }

    /// Zero the committed total if the calendar date moved on.
    pub fn rollover_if_new_day(&mut self) -> Option<Event> {
        let today = self.time.today();
        if today == self.last_reset {
            return None;
        }

        info!(
            from = %self.last_reset,
            to = %today,
            discarded = self.committed_secs,
            "effective time rolled over"
        );
        self.committed_secs = 0;
        self.last_reset = today;
        Some(Event::CommittedChanged { seconds: 0 })
    }
}

fn validate_edit(hours: i64, minutes: i64, seconds: i64) -> Result<(), ValidationError> {
    if hours < 0 {
        return Err(ValidationError::OutOfRange {
            field: "hours",
            value: hours,
            expected: ">= 0",
        });
    }
    if !(0..60).contains(&minutes) {
        return Err(ValidationError::OutOfRange {
            field: "minutes",
            value: minutes,
            expected: "0..=59",
        });
    }
    if !(0..60).contains(&seconds) {
        return Err(ValidationError::OutOfRange {
            field: "seconds",
            value: seconds,
            expected: "0..=59",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use chrono::NaiveDateTime;

    fn noon(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap()
    }

    fn ledger_on(day: u32) -> (Rc<ManualTimeSource>, EffectiveTimeLedger) {
        let clock = Rc::new(ManualTimeSource::new(noon(day)));
        let ledger = EffectiveTimeLedger::new(clock.clone());
        (clock, ledger)
    }

    #[test]
    fn expiry_stages_and_commit_applies() {
        let (_clock, mut ledger) = ledger_on(15);
        assert_eq!(
            ledger.on_countdown_expired(90),
            Event::PendingChanged { seconds: 90 }
        );
        assert_eq!(ledger.pending_secs(), 90);

        let events = ledger.commit_pending();
        assert_eq!(
            events,
            vec![
                Event::CommittedChanged { seconds: 90 },
                Event::PendingChanged { seconds: 0 },
            ]
        );
        assert_eq!(ledger.committed_secs(), 90);
        assert_eq!(ledger.pending_secs(), 0);
    }

    #[test]
    fn second_expiry_overwrites_pending() {
        let (_clock, mut ledger) = ledger_on(15);
        ledger.on_countdown_expired(600);
        ledger.on_countdown_expired(300);
        assert_eq!(ledger.pending_secs(), 300);
    }

    #[test]
    fn commit_with_nothing_pending_is_a_no_op() {
        let (_clock, mut ledger) = ledger_on(15);
        ledger.on_countdown_expired(120);
        ledger.commit_pending();
        assert!(ledger.commit_pending().is_empty());
        assert!(ledger.commit_pending().is_empty());
        assert_eq!(ledger.committed_secs(), 120);
    }

    #[test]
    fn commit_accumulates_within_a_day() {
        let (_clock, mut ledger) = ledger_on(15);
        ledger.on_countdown_expired(60);
        ledger.commit_pending();
        ledger.on_countdown_expired(1800);
        ledger.commit_pending();
        assert_eq!(ledger.committed_secs(), 1860);
    }

    #[test]
    fn clear_drops_pending() {
        let (_clock, mut ledger) = ledger_on(15);
        ledger.on_countdown_expired(45);
        assert_eq!(ledger.clear_pending(), Event::PendingChanged { seconds: 0 });
        assert_eq!(ledger.pending_secs(), 0);
        assert!(ledger.commit_pending().is_empty());
    }

    #[test]
    fn edit_rejects_out_of_range_without_mutation() {
        let (_clock, mut ledger) = ledger_on(15);
        ledger.on_countdown_expired(90);

        assert!(matches!(
            ledger.edit_pending(0, 61, 0),
            Err(ValidationError::OutOfRange { field: "minutes", .. })
        ));
        assert!(ledger.edit_pending(0, 0, 60).is_err());
        assert!(ledger.edit_pending(-1, 0, 0).is_err());
        assert!(ledger.edit_pending(0, -1, 0).is_err());
        assert_eq!(ledger.pending_secs(), 90);

        assert_eq!(
            ledger.edit_pending(2, 0, 5),
            Ok(Event::PendingChanged { seconds: 7205 })
        );
    }

    #[test]
    fn edit_from_text() {
        let (_clock, mut ledger) = ledger_on(15);
        ledger.edit_pending_str("00:25:00").unwrap();
        assert_eq!(ledger.pending_secs(), 1500);

        assert!(matches!(
            ledger.edit_pending_str("25:00"),
            Err(ValidationError::InvalidFormat(_))
        ));
        assert!(ledger.edit_pending_str("00:75:00").is_err());
        assert_eq!(ledger.pending_secs(), 1500);
    }

    #[test]
    fn rollover_resets_before_applying_pending() {
        let (clock, mut ledger) = ledger_on(14);
        ledger.on_countdown_expired(3600);
        ledger.commit_pending();
        assert_eq!(ledger.committed_secs(), 3600);

        clock.set(noon(15));
        ledger.on_countdown_expired(90);
        let events = ledger.commit_pending();

        assert_eq!(events[0], Event::CommittedChanged { seconds: 0 });
        assert_eq!(ledger.committed_secs(), 90);
        assert_eq!(ledger.last_reset_date(), clock.today());
    }

    #[test]
    fn rollover_happens_once_per_date() {
        let (clock, mut ledger) = ledger_on(14);
        ledger.on_countdown_expired(60);
        ledger.commit_pending();

        clock.set(noon(15));
        assert!(ledger.rollover_if_new_day().is_some());
        assert!(ledger.rollover_if_new_day().is_none());

        ledger.on_countdown_expired(30);
        ledger.commit_pending();
        assert_eq!(ledger.committed_today(), 30);
    }

    #[test]
    fn read_after_midnight_rolls_over() {
        let (clock, mut ledger) = ledger_on(14);
        ledger.on_countdown_expired(60);
        ledger.commit_pending();

        clock.advance_secs(12 * 3600);
        assert_eq!(ledger.committed_secs(), 60);
        assert_eq!(ledger.committed_today(), 0);
    }
}
