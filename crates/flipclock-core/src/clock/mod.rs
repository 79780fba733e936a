mod hms;
mod source;

pub use hms::{parse_field, Hms};
pub use source::{ManualTimeSource, SystemTimeSource, TimeSource};
