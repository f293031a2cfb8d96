use std::fmt;

use crate::clock::{Clock, SystemClock};

/// Seconds in a day; the window used by [`EventState::occurred_in_last_day`].
pub const ONE_DAY: f64 = 60.0 * 60.0 * 24.0;

/// Smallest timestamp [`EventState::update_at`] records. `0.0` is reserved
/// for "never recorded".
pub const EARLIEST_TIMESTAMP: f64 = f64::MIN_POSITIVE;

/// Counter, occurrence timestamps, and enabled flag for one named event.
///
/// Timestamps are seconds since the Unix epoch; `0.0` means "never
/// recorded". The accumulated count keeps growing while the event is
/// disabled, it is only hidden from [`count`](EventState::count).
///
/// # Examples
///
/// ```
/// use eventtally::EventState;
///
/// let mut state = EventState::new("app_launch");
/// assert_eq!(state.count(), 0);
///
/// state.update_at(3, 1_700_000_000.0);
/// assert_eq!(state.count(), 3);
/// assert_eq!(state.first_occurrence(), 1_700_000_000.0);
///
/// state.set_disabled(true);
/// assert_eq!(state.count(), 0);
/// assert_eq!(state.raw_count(), 3);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct EventState {
    name: String,
    first_occurrence: f64,
    last_occurrence: f64,
    raw_count: i64,
    disabled: bool,
}

impl EventState {
    /// Create a state that has never been updated: zero count, zero
    /// timestamps, enabled.
    pub fn new(name: impl Into<String>) -> Self {
        EventState {
            name: name.into(),
            first_occurrence: 0.0,
            last_occurrence: 0.0,
            raw_count: 0,
            disabled: false,
        }
    }

    pub(crate) fn from_parts(
        name: String,
        first_occurrence: f64,
        last_occurrence: f64,
        raw_count: i64,
        disabled: bool,
    ) -> Self {
        EventState {
            name,
            first_occurrence,
            last_occurrence,
            raw_count,
            disabled,
        }
    }

    pub(crate) fn rename(&mut self, name: &str) {
        self.name = name.to_string();
    }

    /// The event name. Fixed at creation.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Timestamp of the first update since creation or the last reset.
    pub fn first_occurrence(&self) -> f64 {
        self.first_occurrence
    }

    /// Timestamp of the most recent update.
    pub fn last_occurrence(&self) -> f64 {
        self.last_occurrence
    }

    /// The externally visible count: `0` while disabled, otherwise the
    /// accumulated total.
    pub fn count(&self) -> i64 {
        if self.disabled { 0 } else { self.raw_count }
    }

    /// The accumulated total, regardless of the disabled flag.
    pub fn raw_count(&self) -> i64 {
        self.raw_count
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    /// Set the disabled flag directly. Equivalent to
    /// [`EventCache::disable`](crate::EventCache::disable) /
    /// [`EventCache::enable`](crate::EventCache::enable).
    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Record an occurrence now, using the system clock.
    ///
    /// This ignores any clock injected into an
    /// [`EventCache`](crate::EventCache). On a handle from
    /// [`EventCache::state`](crate::EventCache::state), use
    /// [`EventCache::fire`](crate::EventCache::fire) so every timestamp
    /// comes from the same clock.
    pub fn update(&mut self, increment_by: i64) {
        self.update_at(increment_by, SystemClock.now());
    }

    /// Record an occurrence at `now`.
    ///
    /// Adds `increment_by` (which may be negative) to the count, saturating
    /// at `i64::MIN` / `i64::MAX`. Sets the last occurrence to `now`, and the
    /// first occurrence too if the event had never occurred. A clock that
    /// steps backwards never moves the last occurrence before the first.
    ///
    /// `now` is clamped to `[EARLIEST_TIMESTAMP, f64::MAX]` (NaN reads as
    /// [`EARLIEST_TIMESTAMP`]), so an updated state always has a nonzero,
    /// storable first occurrence.
    pub fn update_at(&mut self, increment_by: i64, now: f64) {
        let now = if now.is_nan() {
            EARLIEST_TIMESTAMP
        } else {
            now.clamp(EARLIEST_TIMESTAMP, f64::MAX)
        };
        self.raw_count = self.raw_count.saturating_add(increment_by);

        if self.first_occurrence == 0.0 {
            self.first_occurrence = now;
        }
        self.last_occurrence = now.max(self.first_occurrence);
    }

    /// Zero the count and both timestamps. The disabled flag is kept.
    pub fn reset(&mut self) {
        self.raw_count = 0;
        self.first_occurrence = 0.0;
        self.last_occurrence = 0.0;
    }

    /// Whether the last occurrence lies within the past 24 hours of the
    /// system clock.
    pub fn occurred_in_last_day(&self) -> bool {
        self.occurred_in_last_day_at(SystemClock.now())
    }

    /// Whether the last occurrence lies within [`ONE_DAY`] before `now`.
    ///
    /// An event that never occurred (last occurrence `0.0`) did not occur in
    /// the last day, whatever `now` is.
    pub fn occurred_in_last_day_at(&self, now: f64) -> bool {
        if self.last_occurrence == 0.0 {
            return false;
        }
        now - self.last_occurrence < ONE_DAY
    }

    /// Human-readable rendering for diagnostics. Not a storage format.
    pub fn log_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EventState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {{ first: {}, last: {}, count: {} }}",
            self.name, self.first_occurrence, self.last_occurrence, self.raw_count
        )
    }
}
