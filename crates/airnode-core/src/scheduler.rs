//! Cooperative timer table for recurring and one-shot tasks
//!
//! The scheduler never runs anything itself. [`Scheduler::tick`] hands back
//! the tasks that are due and the owner executes them, in order, on its own
//! call stack. Tasks are plain identifiers (usually a small `Copy` enum), so
//! no closures or captured state live inside the table.
//!
//! ## Timing rules
//!
//! - A recurring task fires first at `registration + period`, then on the
//!   grid `target + k * period`. The grid never drifts with tick jitter.
//! - If `tick` is called late, a recurring task fires once and its next target
//!   becomes the first grid point after `now`. Missed periods are not replayed.
//! - A one-shot task is removed from the table before it is handed out, so
//!   its handler may register a new one-shot.
//! - Tasks due in the same tick come out ordered by due time, ties broken by
//!   registration order.

use alloc::vec::Vec;
use log::{debug, warn};

/// Opaque identifier for a registered task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskHandle(u32);

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    handle: TaskHandle,
    task: T,
    due_ms: u64,
    period_ms: Option<u64>,
}

/// Timer table keyed on a monotonic millisecond clock
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    /// Kept in registration order
    tasks: Vec<ScheduledTask<T>>,
    now_ms: u64,
    next_handle: u32,
}

impl<T: Clone> Scheduler<T> {
    /// Create an empty scheduler whose clock starts at `start_ms`
    pub const fn new(start_ms: u64) -> Self {
        Self {
            tasks: Vec::new(),
            now_ms: start_ms,
            next_handle: 0,
        }
    }

    /// The scheduler clock, i.e. the latest time passed to [`Self::tick`]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    /// Register a task that fires every `period_ms`, starting one period from now
    pub fn schedule_repeating(&mut self, period_ms: u64, task: T) -> TaskHandle {
        let period_ms = if period_ms == 0 {
            warn!("Zero scheduling period requested, clamping to 1 ms");
            1
        } else {
            period_ms
        };

        self.register(period_ms, Some(period_ms), task)
    }

    /// Register a task that fires once, `delay_ms` from now
    pub fn schedule_once(&mut self, delay_ms: u64, task: T) -> TaskHandle {
        self.register(delay_ms, None, task)
    }

    fn register(&mut self, delay_ms: u64, period_ms: Option<u64>, task: T) -> TaskHandle {
        let handle = TaskHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);

        self.tasks.push(ScheduledTask {
            handle,
            task,
            due_ms: self.now_ms.saturating_add(delay_ms),
            period_ms,
        });

        handle
    }

    /// Advance the clock to `now_ms` and collect every task that is due.
    ///
    /// A `now_ms` earlier than the current clock counts as no time passing.
    /// Tasks registered while the returned tasks are being handled are not
    /// considered until the next call.
    pub fn tick(&mut self, now_ms: u64) -> Vec<T> {
        self.now_ms = self.now_ms.max(now_ms);
        let now = self.now_ms;

        let mut due: Vec<(u64, T)> = Vec::new();
        let mut index = 0;

        while index < self.tasks.len() {
            let entry = &mut self.tasks[index];
            if entry.due_ms > now {
                index += 1;
                continue;
            }

            let target = entry.due_ms;
            let period_ms = entry.period_ms;
            match period_ms {
                Some(period) => {
                    let missed = (now - target) / period;
                    if missed > 0 {
                        debug!("Task {:?} is {} period(s) late, firing once", entry.handle, missed);
                    }
                    entry.due_ms = target.saturating_add((missed + 1).saturating_mul(period));
                    due.push((target, entry.task.clone()));
                    index += 1;
                }
                None => {
                    // Remove before handing out so the handler may re-arm itself
                    let entry = self.tasks.remove(index);
                    due.push((target, entry.task));
                }
            }
        }

        // Stable sort keeps registration order among equal due times
        due.sort_by_key(|(target, _)| *target);
        due.into_iter().map(|(_, task)| task).collect()
    }

    /// Earliest due time among pending tasks
    pub fn next_deadline(&self) -> Option<u64> {
        self.tasks.iter().map(|entry| entry.due_ms).min()
    }

    /// Next due time of a specific task, if it is still registered
    pub fn due_time(&self, handle: TaskHandle) -> Option<u64> {
        self.tasks
            .iter()
            .find(|entry| entry.handle == handle)
            .map(|entry| entry.due_ms)
    }

    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.due_time(handle).is_some()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
