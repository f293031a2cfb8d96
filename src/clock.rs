use std::time::{SystemTime, UNIX_EPOCH};

/// Source of "now" for event timestamps.
///
/// Timestamps are seconds since the Unix epoch as `f64`. The cache drives
/// both [`EventState::update_at`](crate::EventState::update_at) and
/// [`EventState::occurred_in_last_day_at`](crate::EventState::occurred_in_last_day_at)
/// from the same clock, so recency checks agree with recorded occurrences.
pub trait Clock: Send + Sync {
    /// Current time in seconds since the Unix epoch.
    fn now(&self) -> f64;
}

/// Wall clock backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    /// Returns `0.0` if the system clock is set before the Unix epoch.
    fn now(&self) -> f64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl<F> Clock for F
where
    F: Fn() -> f64 + Send + Sync,
{
    fn now(&self) -> f64 {
        self()
    }
}
