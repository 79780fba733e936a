//! Six-digit frames handed to the renderer.
//!
//! The renderer animates a flip for each digit whose value changed since
//! the previous frame, so frames carry a per-digit `changed` flag computed
//! by [`FlipTracker`].

use serde::{Deserialize, Serialize};

use crate::clock::Hms;

/// Highest hour count the two hour digits can show.
pub const MAX_DISPLAY_HOURS: u64 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigitFrame {
    pub value: Hms,
    /// `HHMMSS` as ASCII digits.
    pub digits: [char; 6],
    /// Digits that differ from the previous frame. All set on the first frame.
    pub changed: [bool; 6],
}

impl DigitFrame {
    /// `HH:MM:SS` text of the frame.
    pub fn text(&self) -> String {
        let d = &self.digits;
        format!("{}{}:{}{}:{}{}", d[0], d[1], d[2], d[3], d[4], d[5])
    }

    pub fn flips(&self) -> usize {
        self.changed.iter().filter(|c| **c).count()
    }
}

/// External collaborator that draws frames.
pub trait DisplayRenderer {
    fn render(&mut self, frame: &DigitFrame);
}

impl<F> DisplayRenderer for F
where
    F: FnMut(&DigitFrame),
{
    fn render(&mut self, frame: &DigitFrame) {
        (*self)(frame)
    }
}

/// Remembers the last rendered digits.
#[derive(Debug, Default, Clone)]
pub struct FlipTracker {
    previous: Option<[char; 6]>,
}

impl FlipTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frame(&mut self, value: Hms) -> DigitFrame {
        let digits = digits_of(value);
        let changed = match self.previous {
            Some(prev) => std::array::from_fn(|i| prev[i] != digits[i]),
            None => [true; 6],
        };
        self.previous = Some(digits);
        DigitFrame {
            value,
            digits,
            changed,
        }
    }
}

fn digits_of(value: Hms) -> [char; 6] {
    let hours = value.hours.min(MAX_DISPLAY_HOURS);
    let text = format!("{:02}{:02}{:02}", hours, value.minutes % 100, value.seconds % 100);
    let mut out = ['0'; 6];
    for (slot, ch) in out.iter_mut().zip(text.chars()) {
        *slot = ch;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_frame_flips_everything() {
        let mut tracker = FlipTracker::new();
        let frame = tracker.frame(Hms::new(0, 30, 0));
        assert_eq!(frame.digits, ['0', '0', '3', '0', '0', '0']);
        assert_eq!(frame.flips(), 6);
        assert_eq!(frame.text(), "00:30:00");
    }

    #[test]
    fn only_changed_digits_flip() {
        let mut tracker = FlipTracker::new();
        tracker.frame(Hms::new(0, 30, 0));
        let frame = tracker.frame(Hms::new(0, 29, 59));
        assert_eq!(frame.changed, [false, false, true, true, true, true]);

        let frame = tracker.frame(Hms::new(0, 29, 58));
        assert_eq!(frame.changed, [false, false, false, false, false, true]);
    }

    #[test]
    fn hours_saturate_at_two_digits() {
        let mut tracker = FlipTracker::new();
        assert_eq!(tracker.frame(Hms::new(150, 0, 1)).text(), "99:00:01");
    }
}
