//! Deferred and repeating tasks keyed by absolute deadlines
//!
//! Time is a monotonic clock in seconds supplied by the caller through
//! [`Scheduler::advance`]. Tasks are plain values; the owner decides what
//! running one means.

use std::collections::VecDeque;

use crate::error::SchedulerError;

/// Handle to a scheduled timer. Handles are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer<T> {
    handle: TimerHandle,
    deadline: f64,
    /// Re-arm period for repeating timers
    period: Option<f64>,
    task: T,
}

/// One-shot and repeating timers
#[derive(Debug, Clone)]
pub struct Scheduler<T> {
    now: f64,
    next_handle: u64,
    /// Pending timers in registration order
    timers: Vec<Timer<T>>,
    /// Timers found due at the start of the current pass
    due: VecDeque<TimerHandle>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    pub fn new() -> Self {
        Self {
            now: 0.0,
            next_handle: 1,
            timers: Vec::new(),
            due: VecDeque::new(),
        }
    }

    /// Current scheduler time
    pub fn now(&self) -> f64 {
        self.now
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Run `task` once, `seconds` from now
    pub fn delay(&mut self, seconds: f64, task: T) -> Result<TimerHandle, SchedulerError> {
        if !seconds.is_finite() || seconds < 0.0 {
            return Err(SchedulerError::InvalidDuration(seconds));
        }
        Ok(self.insert(self.now + seconds, None, task))
    }

    /// Run `task` every `seconds`, first at now + `seconds`
    pub fn repeat(&mut self, seconds: f64, task: T) -> Result<TimerHandle, SchedulerError> {
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(SchedulerError::InvalidPeriod(seconds));
        }
        Ok(self.insert(self.now + seconds, Some(seconds), task))
    }

    fn insert(&mut self, deadline: f64, period: Option<f64>, task: T) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.push(Timer {
            handle,
            deadline,
            period,
            task,
        });
        handle
    }

    /// Cancel a timer. Unknown or already-fired handles are ignored.
    pub fn cancel(&mut self, handle: TimerHandle) {
        if let Ok(idx) = self.index_of(handle) {
            self.timers.remove(idx);
        }
    }

    /// Whether the timer is still waiting to fire (or to fire again)
    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.index_of(handle).is_ok()
    }

    /// Deadline of a pending timer
    pub fn deadline(&self, handle: TimerHandle) -> Option<f64> {
        self.index_of(handle).ok().map(|i| self.timers[i].deadline)
    }

    /// Drop every pending timer
    pub fn clear(&mut self) {
        self.timers.clear();
        self.due.clear();
    }

    fn index_of(&self, handle: TimerHandle) -> Result<usize, usize> {
        // Handles are issued in increasing order and timers keep that order
        self.timers.binary_search_by_key(&handle, |t| t.handle)
    }

    /// Move the clock to `now` and snapshot the timers due at that time.
    ///
    /// Timers registered after this call wait for the next pass even if
    /// their deadline has already passed.
    pub fn advance(&mut self, now: f64) {
        if now > self.now {
            self.now = now;
        }
        let now = self.now;
        self.due = self
            .timers
            .iter()
            .filter(|t| t.deadline <= now)
            .map(|t| t.handle)
            .collect();
    }
}

impl<T: Clone> Scheduler<T> {
    /// Pop the next due task of the current pass.
    ///
    /// Returns tasks in registration order. A timer cancelled since the pass
    /// began is skipped; repeating timers are re-armed from their previous
    /// deadline, not from `now`.
    pub fn next_due(&mut self) -> Option<T> {
        while let Some(handle) = self.due.pop_front() {
            let Ok(idx) = self.index_of(handle) else {
                continue;
            };
            let timer = &mut self.timers[idx];
            if timer.deadline > self.now {
                continue;
            }
            match timer.period {
                Some(period) => {
                    timer.deadline += period;
                    return Some(timer.task.clone());
                }
                None => return Some(self.timers.remove(idx).task),
            }
        }
        None
    }

    /// Advance to `now` and run every due task through `run`.
    ///
    /// `run` receives the scheduler so tasks can register or cancel timers.
    pub fn tick(&mut self, now: f64, mut run: impl FnMut(&mut Self, T)) {
        self.advance(now);
        while let Some(task) = self.next_due() {
            run(self, task);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_rearms_from_deadline() {
        let mut sched = Scheduler::new();
        let handle = sched.repeat(1.0, "beat").unwrap();
        let mut fired = Vec::new();

        sched.tick(0.5, |_, t| fired.push(t));
        assert!(fired.is_empty());

        // Late tick: re-arm stays on the 1.0 cadence
        sched.tick(1.3, |_, t| fired.push(t));
        assert_eq!(fired, vec!["beat"]);
        assert_eq!(sched.deadline(handle), Some(2.0));

        sched.tick(2.0, |_, t| fired.push(t));
        assert_eq!(fired.len(), 2);
        assert_eq!(sched.deadline(handle), Some(3.0));
    }

    #[test]
    fn test_delay_fires_once() {
        let mut sched = Scheduler::new();
        let handle = sched.delay(0.5, 1).unwrap();
        let mut count = 0;
        sched.tick(0.4, |_, _| count += 1);
        assert_eq!(count, 0);
        sched.tick(0.5, |_, _| count += 1);
        sched.tick(3.0, |_, _| count += 1);
        assert_eq!(count, 1);
        assert!(!sched.is_pending(handle));
        // Cancelling a fired timer is a no-op
        sched.cancel(handle);
        assert!(sched.is_empty());
    }

    #[test]
    fn test_same_tick_fires_in_registration_order() {
        let mut sched = Scheduler::new();
        sched.delay(0.3, 'a').unwrap();
        sched.delay(0.1, 'b').unwrap();
        sched.delay(0.2, 'c').unwrap();
        let mut order = Vec::new();
        sched.tick(1.0, |_, t| order.push(t));
        assert_eq!(order, vec!['a', 'b', 'c']);
    }

    #[test]
    fn test_cancel_during_pass_prevents_fire() {
        let mut sched = Scheduler::new();
        sched.delay(0.1, 0u64).unwrap();
        let second = sched.delay(0.1, 1u64).unwrap();
        let mut fired = Vec::new();
        sched.tick(1.0, |s, t| {
            fired.push(t);
            if t == 0 {
                s.cancel(second);
            }
        });
        assert_eq!(fired, vec![0]);
    }

    #[test]
    fn test_repeating_timer_cancelled_in_own_callback() {
        let mut sched = Scheduler::new();
        let handle = sched.repeat(0.05, ()).unwrap();
        let mut count = 0;
        sched.tick(0.05, |s, _| {
            count += 1;
            s.cancel(handle);
        });
        sched.tick(0.10, |_, _| count += 1);
        sched.tick(0.15, |_, _| count += 1);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_timers_registered_during_pass_wait() {
        let mut sched = Scheduler::new();
        sched.delay(0.0, "first").unwrap();
        let mut fired = Vec::new();
        sched.tick(1.0, |s, t| {
            fired.push(t);
            if t == "first" {
                s.delay(0.0, "second").unwrap();
            }
        });
        assert_eq!(fired, vec!["first"]);
        sched.tick(1.0, |_, t| fired.push(t));
        assert_eq!(fired, vec!["first", "second"]);
    }

    #[test]
    fn test_invalid_durations() {
        let mut sched: Scheduler<()> = Scheduler::new();
        assert_eq!(
            sched.delay(-1.0, ()),
            Err(SchedulerError::InvalidDuration(-1.0))
        );
        assert_eq!(sched.repeat(0.0, ()), Err(SchedulerError::InvalidPeriod(0.0)));
        assert!(sched.delay(0.0, ()).is_ok());
    }

    #[test]
    fn test_clock_never_moves_backwards() {
        let mut sched = Scheduler::new();
        sched.advance(5.0);
        sched.advance(3.0);
        assert_eq!(sched.now(), 5.0);
        let handle = sched.delay(1.0, ()).unwrap();
        assert_eq!(sched.deadline(handle), Some(6.0));
    }
}
