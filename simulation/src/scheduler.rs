//! Wall-clock pacing for the tick engine.

use std::time::{Duration, Instant};

/// Decides when the next tick is due on the wall clock.
///
/// Overrun intervals never queue up: however late a poll arrives, it yields
/// at most one tick and the intervals that were missed are counted.
#[derive(Debug, Clone)]
pub struct TickScheduler {
    interval: Duration,
    next_due: Option<Instant>,
    skipped: u64,
}

impl TickScheduler {
    /// Creates a scheduler firing every `interval`. A zero interval becomes one millisecond.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            Duration::from_millis(1)
        } else {
            interval
        };
        Self {
            interval,
            next_due: None,
            skipped: 0,
        }
    }

    /// Reports whether a tick is due at `now` and schedules the following one.
    pub fn poll(&mut self, now: Instant) -> bool {
        let Some(due) = self.next_due else {
            self.next_due = now.checked_add(self.interval);
            return true;
        };
        if now < due {
            return false;
        }
        let missed = missed_intervals(now.duration_since(due), self.interval);
        self.skipped = self.skipped.saturating_add(missed);
        let steps = u32::try_from(missed.saturating_add(1)).unwrap_or(u32::MAX);
        self.next_due = due
            .checked_add(self.interval.saturating_mul(steps))
            .or_else(|| now.checked_add(self.interval));
        true
    }

    /// Time left until the next tick is due.
    #[must_use]
    pub fn time_until_next(&self, now: Instant) -> Duration {
        self.next_due
            .map_or(Duration::ZERO, |due| due.saturating_duration_since(now))
    }

    /// Intervals that were coalesced because a poll came late.
    #[must_use]
    pub fn skipped_intervals(&self) -> u64 {
        self.skipped
    }

    /// Tick interval.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }
}

fn missed_intervals(late: Duration, interval: Duration) -> u64 {
    u64::try_from(late.as_nanos() / interval.as_nanos()).unwrap_or(u64::MAX)
}
