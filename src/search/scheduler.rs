//! Deferred task queue for the search session
//!
//! Debounce timers, load-signal follow-ups and scroll retries are all
//! modelled as tasks due at an `Instant`. Nothing runs on its own: the owner
//! calls `take_due(now)` from its tick and handles whatever came due. Every
//! task gets a `TaskHandle`, which is the only way to cancel it.

use std::time::Instant;

/// Cancellation token for a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(u64);

#[derive(Debug)]
struct Scheduled<T> {
    handle: TaskHandle,
    due: Instant,
    task: T,
}

/// A single-threaded queue of tasks ordered by due time.
#[derive(Debug)]
pub struct Scheduler<T> {
    tasks: Vec<Scheduled<T>>,
    next_handle: u64,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            next_handle: 0,
        }
    }

    /// Queue `task` to come due at `due`.
    pub fn schedule(&mut self, due: Instant, task: T) -> TaskHandle {
        self.next_handle += 1;
        let handle = TaskHandle(self.next_handle);
        self.tasks.push(Scheduled { handle, due, task });
        handle
    }

    /// Cancel a task. Returns `false` if it already ran or was cancelled.
    pub fn cancel(&mut self, handle: TaskHandle) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|scheduled| scheduled.handle != handle);
        self.tasks.len() != before
    }

    /// Cancel every queued task.
    pub fn cancel_all(&mut self) {
        self.tasks.clear();
    }

    /// Whether `handle` is still queued.
    pub fn is_pending(&self, handle: TaskHandle) -> bool {
        self.tasks.iter().any(|scheduled| scheduled.handle == handle)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// The earliest due time among queued tasks.
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.iter().map(|scheduled| scheduled.due).min()
    }

    /// Remove and return every task due at or before `now`.
    ///
    /// Tasks come back ordered by due time, ties broken by scheduling order.
    pub fn take_due(&mut self, now: Instant) -> Vec<(TaskHandle, T)> {
        let mut due = Vec::new();
        let mut remaining = Vec::with_capacity(self.tasks.len());
        for scheduled in self.tasks.drain(..) {
            if scheduled.due <= now {
                due.push(scheduled);
            } else {
                remaining.push(scheduled);
            }
        }
        self.tasks = remaining;

        due.sort_by_key(|scheduled| (scheduled.due, scheduled.handle));
        due.into_iter()
            .map(|scheduled| (scheduled.handle, scheduled.task))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_nothing_due_before_deadline() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(start + ms(300), "settle");

        assert!(scheduler.take_due(start + ms(299)).is_empty());
        assert_eq!(scheduler.len(), 1);

        let due = scheduler.take_due(start + ms(300));
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].1, "settle");
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_due_order_by_time_then_insertion() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        scheduler.schedule(start + ms(20), "c");
        scheduler.schedule(start + ms(10), "a");
        scheduler.schedule(start + ms(10), "b");

        let order: Vec<&str> = scheduler
            .take_due(start + ms(50))
            .into_iter()
            .map(|(_, task)| task)
            .collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(start, 1);

        assert!(scheduler.is_pending(handle));
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.is_pending(handle));
        assert!(!scheduler.cancel(handle));
        assert!(scheduler.take_due(start + ms(1)).is_empty());
    }

    #[test]
    fn test_handles_are_unique() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(start, ());
        scheduler.take_due(start);
        let b = scheduler.schedule(start, ());
        assert_ne!(a, b);
    }

    #[test]
    fn test_next_due_and_cancel_all() {
        let start = Instant::now();
        let mut scheduler = Scheduler::new();
        assert_eq!(scheduler.next_due(), None);

        scheduler.schedule(start + ms(40), ());
        scheduler.schedule(start + ms(15), ());
        assert_eq!(scheduler.next_due(), Some(start + ms(15)));

        scheduler.cancel_all();
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.next_due(), None);
    }
}
