use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An hours/minutes/seconds decomposition of a duration or a time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hms {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
}

impl Hms {
    pub const ZERO: Hms = Hms {
        hours: 0,
        minutes: 0,
        seconds: 0,
    };

    pub fn new(hours: u64, minutes: u64, seconds: u64) -> Self {
        Self {
            hours,
            minutes,
            seconds,
        }
    }

    /// Split a second count into `h = r / 3600`, `m = (r % 3600) / 60`, `s = r % 60`.
    pub fn from_secs(total: u64) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    /// Total seconds, saturating on absurd hour counts.
    pub fn total_secs(&self) -> u64 {
        self.hours
            .saturating_mul(3600)
            .saturating_add(self.minutes.saturating_mul(60))
            .saturating_add(self.seconds)
    }

    /// Build from signed user input, clamping negatives to zero.
    ///
    /// Minutes and seconds are not range checked: `(0, 90, 0)` is a valid
    /// ninety minute countdown.
    pub fn clamped(hours: i64, minutes: i64, seconds: i64) -> Self {
        Self {
            hours: hours.max(0) as u64,
            minutes: minutes.max(0) as u64,
            seconds: seconds.max(0) as u64,
        }
    }

    /// Split `HH:MM:SS` text into its three leniently parsed fields.
    ///
    /// Anything other than exactly three colon separated parts is rejected;
    /// range checks are left to the caller.
    pub fn split_fields(text: &str) -> Result<(i64, i64, i64), ValidationError> {
        let parts: Vec<&str> = text.split(':').collect();
        match parts.as_slice() {
            [h, m, s] => Ok((parse_field(h), parse_field(m), parse_field(s))),
            _ => Err(ValidationError::InvalidFormat(text.to_string())),
        }
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds
        )
    }
}

/// Parse a numeric input field the way a form field is read: leading
/// whitespace is skipped, an optional sign and the leading run of digits
/// are taken, and anything without digits reads as 0.
///
/// `"12abc"` is 12, `"  -5"` is -5, `"abc"` and `""` are 0.
pub fn parse_field(raw: &str) -> i64 {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}
