mod countdown;
mod scheduler;

pub use countdown::{CountdownEngine, CountdownPhase, DEFAULT_FALLBACK_SECS};
pub use scheduler::{Scheduler, TaskHandle, TaskKind};
