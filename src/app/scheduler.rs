// logsift - app/scheduler.rs
//
// Debounce scheduler for channel buffer flushes.
//
// The scheduler holds at most one pending deadline. The first push of a burst
// arms it; later pushes before the deadline leave it alone, so a burst of any
// size produces exactly one flush. Nothing here sleeps or spawns: the owner's
// loop asks `is_due(now)` and sleeps until `deadline()` itself. Time is always
// passed in, which keeps the buffer logic deterministic under test.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FlushScheduler {
    delay: Duration,
    /// The single pending timer handle. `None` = nothing scheduled.
    deadline: Option<Instant>,
}

impl FlushScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm the timer to fire `delay` after `now` unless one is already armed.
    ///
    /// Returns `true` if this call armed it.
    pub fn schedule(&mut self, now: Instant) -> bool {
        if self.deadline.is_some() {
            return false;
        }
        self.deadline = Some(now + self.delay);
        true
    }

    /// Disarm the timer. Safe to call when nothing is scheduled.
    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// True once the armed deadline has been reached.
    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|at| now >= at)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the armed deadline, zero if already due.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.deadline.map(|at| at.saturating_duration_since(now))
    }
}
