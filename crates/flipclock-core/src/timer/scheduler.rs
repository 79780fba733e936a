//! Cancellable periodic and one-shot tasks on a single-threaded loop.
//!
//! The scheduler does not own a thread or a runtime. The host advances it
//! with [`Scheduler::pop_due`] and sleeps until [`Scheduler::next_due`];
//! times are milliseconds on the host's monotonic clock.
//!
//! Due tasks are handed out one at a time, so a task dispatched earlier in
//! the same pump can cancel one that would have fired right after it.

use serde::{Deserialize, Serialize};

/// What a scheduled task drives when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Refresh the wall-clock display.
    ClockDisplay,
    /// Advance the countdown run identified by `generation`.
    CountdownTick { generation: u64 },
    /// Auto-hide the on-screen controls.
    HideControls,
}

/// Handle to a scheduled task. Cancelling it twice is harmless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u64);

#[derive(Debug, Clone)]
struct Scheduled {
    handle: TaskHandle,
    kind: TaskKind,
    /// `None` for one-shot tasks.
    period_ms: Option<u64>,
    due_ms: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    next_id: u64,
    now_ms: u64,
    tasks: Vec<Scheduled>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last time the host reported.
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Run `kind` every `period_ms`, first firing one period from now.
    pub fn every(&mut self, kind: TaskKind, period_ms: u64) -> TaskHandle {
        let period_ms = period_ms.max(1);
        self.install(kind, Some(period_ms), period_ms)
    }

    /// Run `kind` once after `delay_ms`.
    pub fn once(&mut self, kind: TaskKind, delay_ms: u64) -> TaskHandle {
        self.install(kind, None, delay_ms)
    }

    /// Remove a task. Returns `false` if it had already fired or been cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.handle != handle);
        self.tasks.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    pub fn is_active(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|t| t.handle == handle)
    }

    /// Number of live tasks of the given kind.
    pub fn count(&self, pred: impl Fn(&TaskKind) -> bool) -> usize {
        self.tasks.iter().filter(|t| pred(&t.kind)).count()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest deadline among live tasks.
    pub fn next_due(&self) -> Option<u64> {
        self.tasks.iter().map(|t| t.due_ms).min()
    }

    /// Move the clock to `now_ms` and take the earliest task due by then.
    ///
    /// Periodic tasks are rescheduled one period later, so a host that fell
    /// behind gets every missed firing on successive calls. Ties go to the
    /// task installed first. Time never moves backwards.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<(TaskHandle, TaskKind)> {
        self.now_ms = self.now_ms.max(now_ms);

        let idx = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_ms <= self.now_ms)
            .min_by_key(|(_, t)| (t.due_ms, t.handle.0))
            .map(|(i, _)| i)?;

        let fired = match self.tasks[idx].period_ms {
            Some(period) => {
                let task = &mut self.tasks[idx];
                task.due_ms = task.due_ms.saturating_add(period);
                (task.handle, task.kind)
            }
            None => {
                let task = self.tasks.remove(idx);
                (task.handle, task.kind)
            }
        };
        Some(fired)
    }

    fn install(&mut self, kind: TaskKind, period_ms: Option<u64>, delay_ms: u64) -> TaskHandle {
        self.next_id += 1;
        let handle = TaskHandle(self.next_id);
        self.tasks.push(Scheduled {
            handle,
            kind,
            period_ms,
            due_ms: self.now_ms.saturating_add(delay_ms),
        });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn periodic_task_fires_each_period() {
        let mut sched = Scheduler::new();
        let h = sched.every(TaskKind::ClockDisplay, 1000);

        assert_eq!(sched.pop_due(999), None);
        assert_eq!(sched.pop_due(1000), Some((h, TaskKind::ClockDisplay)));
        assert_eq!(sched.pop_due(1000), None);
        assert_eq!(sched.next_due(), Some(2000));
    }

    #[test]
    fn late_host_catches_up_one_firing_at_a_time() {
        let mut sched = Scheduler::new();
        sched.every(TaskKind::ClockDisplay, 1000);

        let mut fired = 0;
        while sched.pop_due(3500).is_some() {
            fired += 1;
        }
        assert_eq!(fired, 3);
    }

    #[test]
    fn one_shot_fires_once() {
        let mut sched = Scheduler::new();
        let h = sched.once(TaskKind::HideControls, 5000);
        assert!(sched.is_active(h));
        assert_eq!(sched.pop_due(5000), Some((h, TaskKind::HideControls)));
        assert!(!sched.is_active(h));
        assert_eq!(sched.pop_due(10_000), None);
    }

    #[test]
    fn cancel_is_idempotent() {
        let mut sched = Scheduler::new();
        let h = sched.every(TaskKind::ClockDisplay, 1000);
        assert!(sched.cancel(h));
        assert!(!sched.cancel(h));
        assert!(sched.is_empty());
        assert_eq!(sched.pop_due(5000), None);
    }

    #[test]
    fn ties_go_to_first_installed() {
        let mut sched = Scheduler::new();
        let a = sched.every(TaskKind::CountdownTick { generation: 1 }, 1000);
        let b = sched.every(TaskKind::ClockDisplay, 1000);
        assert_eq!(sched.pop_due(1000).map(|(h, _)| h), Some(a));
        assert_eq!(sched.pop_due(1000).map(|(h, _)| h), Some(b));
    }

    #[test]
    fn installs_relative_to_last_reported_time() {
        let mut sched = Scheduler::new();
        assert_eq!(sched.pop_due(2500), None);
        sched.once(TaskKind::HideControls, 100);
        assert_eq!(sched.next_due(), Some(2600));
    }

    #[test]
    fn time_does_not_run_backwards() {
        let mut sched = Scheduler::new();
        sched.pop_due(5000);
        sched.pop_due(1000);
        assert_eq!(sched.now_ms(), 5000);
    }
}
