//! Polling intervals shared by the readiness probe and process shutdown.

use std::time::Duration;

pub const INITIAL_POLL_INTERVAL: Duration = Duration::from_millis(10);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Exponential backoff bounded by a total budget.
///
/// Yields sleep intervals starting at `initial`, doubling up to `max`, and
/// stops once the intervals handed out would exceed `budget`.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    max: Duration,
    remaining: Duration,
}

impl Backoff {
    pub fn new(budget: Duration) -> Self {
        Self::with_intervals(INITIAL_POLL_INTERVAL, MAX_POLL_INTERVAL, budget)
    }

    pub fn with_intervals(initial: Duration, max: Duration, budget: Duration) -> Self {
        Self {
            next: initial.min(max),
            max,
            remaining: budget,
        }
    }
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.remaining.is_zero() || self.next.is_zero() {
            return None;
        }
        let delay = self.next.min(self.remaining);
        self.remaining -= delay;
        self.next = (self.next * 2).min(self.max);
        Some(delay)
    }
}
