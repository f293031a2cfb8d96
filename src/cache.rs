use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fmt;

use log::{debug, info, trace, warn};

use crate::clock::{Clock, SystemClock};
use crate::codec;
use crate::error::{SyncError, SyncErrorKind};
use crate::legacy;
use crate::state::EventState;
use crate::store::PersistentStore;

/// Outcome of [`EventCache::synchronize`].
///
/// One entry failing does not stop the others from being written, so a
/// report can carry both a nonzero `written` and failures.
#[derive(Debug, Default)]
#[non_exhaustive]
pub struct SyncReport {
    /// Entries successfully handed to the store.
    pub written: usize,
    /// Per-entry failures, plus a flush failure if the final flush failed.
    pub failures: Vec<SyncError>,
}

impl SyncReport {
    /// `true` when every entry was written and the store flushed.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// In-memory event counters backed by a [`PersistentStore`].
///
/// Each event is read from the store the first time it is referenced and
/// kept in memory from then on; the in-memory state is authoritative once
/// loaded. Nothing is written back until [`synchronize`](Self::synchronize)
/// is called.
///
/// Every accessor resolves the event, creating a fresh state if neither
/// memory nor the store has one, so callers never handle a missing event.
///
/// # Examples
///
/// ```
/// use eventtally::{EventCache, MemoryStore};
///
/// let mut cache = EventCache::new(MemoryStore::new());
/// cache.fire("app_launch", 1);
/// cache.fire("app_launch", 1);
/// assert_eq!(cache.state("app_launch").count(), 2);
///
/// let report = cache.synchronize();
/// assert!(report.is_complete());
///
/// // A new cache over the same store sees the persisted count.
/// let mut reopened = EventCache::new(cache.into_store());
/// assert_eq!(reopened.state("app_launch").count(), 2);
/// ```
pub struct EventCache<S> {
    store: S,
    states: BTreeMap<String, EventState>,
    clock: Box<dyn Clock>,
    legacy_fallback: bool,
    flush_on_synchronize: bool,
}

impl<S> fmt::Debug for EventCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventCache")
            .field("states", &self.states)
            .field("legacy_fallback", &self.legacy_fallback)
            .field("flush_on_synchronize", &self.flush_on_synchronize)
            .finish()
    }
}

impl<S: PersistentStore> EventCache<S> {
    /// Create a cache over `store` with default settings.
    pub fn new(store: S) -> Self {
        Self::builder(store).build()
    }

    /// Start configuring a cache over `store`.
    ///
    /// # Examples
    ///
    /// ```
    /// use eventtally::{EventCache, MemoryStore};
    ///
    /// let mut cache = EventCache::builder(MemoryStore::new())
    ///     .clock(|| 1_700_000_000.0)
    ///     .legacy_fallback(false)
    ///     .build();
    /// cache.fire("signup", 1);
    /// assert_eq!(cache.state("signup").last_occurrence(), 1_700_000_000.0);
    /// ```
    pub fn builder(store: S) -> EventCacheBuilder<S> {
        EventCacheBuilder::new(store)
    }

    /// Record an occurrence of `event`, adding `increment_by` (which may be
    /// negative) to its count. In-memory only. See
    /// [`fire_once`](Self::fire_once) for the common increment of one.
    pub fn fire(&mut self, event: &str, increment_by: i64) {
        let now = self.clock.now();
        self.resolve(event).update_at(increment_by, now);
        debug!("eventtally: updated event '{event}' by {increment_by}");
    }

    /// Record a single occurrence of `event`. Same as `fire(event, 1)`.
    pub fn fire_once(&mut self, event: &str) {
        self.fire(event, 1);
    }

    /// Zero the count and timestamps of `event`. The disabled flag is kept.
    pub fn reset(&mut self, event: &str) {
        self.resolve(event).reset();
        debug!("eventtally: reset event '{event}'");
    }

    /// Hide the count of `event`. Accumulation continues underneath.
    pub fn disable(&mut self, event: &str) {
        self.resolve(event).set_disabled(true);
        debug!("eventtally: disabled event '{event}'");
    }

    /// Reveal the accumulated count of `event` again.
    pub fn enable(&mut self, event: &str) {
        self.resolve(event).set_disabled(false);
        debug!("eventtally: enabled event '{event}'");
    }

    /// The state of `event`, created if it doesn't exist yet.
    ///
    /// The handle is mutable so the disabled flag can be set on it directly.
    pub fn state(&mut self, event: &str) -> &mut EventState {
        let state = self.resolve(event);
        trace!("eventtally: {state}");
        state
    }

    /// Whether `event`, according to the cache clock, last occurred within
    /// the past 24 hours.
    pub fn occurred_in_last_day(&mut self, event: &str) -> bool {
        let now = self.clock.now();
        self.resolve(event).occurred_in_last_day_at(now)
    }

    /// Write every in-memory state to the store in the current format, then
    /// flush the store (unless disabled in the builder).
    ///
    /// A failure for one entry is logged and recorded in the report; the
    /// remaining entries are still written. In-memory state is never
    /// modified.
    pub fn synchronize(&mut self) -> SyncReport {
        let mut report = SyncReport::default();

        for (key, state) in &self.states {
            let bytes = match codec::encode(state) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("eventtally: could not encode '{key}': {e}");
                    report.failures.push(SyncError {
                        key: key.clone(),
                        kind: SyncErrorKind::Encode(e),
                    });
                    continue;
                }
            };

            match self.store.set(key, bytes) {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!("eventtally: could not persist '{key}': {e}");
                    report.failures.push(SyncError {
                        key: key.clone(),
                        kind: SyncErrorKind::Write(e),
                    });
                }
            }
        }

        if self.flush_on_synchronize {
            if let Err(e) = self.store.flush() {
                warn!("eventtally: store flush failed: {e}");
                report.failures.push(SyncError {
                    key: String::new(),
                    kind: SyncErrorKind::Flush(e),
                });
            }
        }

        info!(
            "eventtally: synchronized {} events ({} failed)",
            report.written,
            report.failures.len()
        );
        report
    }

    /// The in-memory state of `event`, if loaded. Never touches the store.
    pub fn peek(&self, event: &str) -> Option<&EventState> {
        self.states.get(event)
    }

    /// Whether `event` is loaded in memory.
    pub fn contains(&self, event: &str) -> bool {
        self.states.contains_key(event)
    }

    /// Names of the events held in memory, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Drop the in-memory state of `event` without persisting it. The next
    /// access reads the store again.
    pub fn evict(&mut self, event: &str) -> Option<EventState> {
        self.states.remove(event)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Consume the cache and return its store. Unsynchronized changes are
    /// discarded.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Memory, then store, then a fresh state.
    fn resolve(&mut self, event: &str) -> &mut EventState {
        match self.states.entry(event.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let state = load(&self.store, event, self.legacy_fallback)
                    .unwrap_or_else(|| EventState::new(event));
                entry.insert(state)
            }
        }
    }
}

/// Read and decode `event` from the store. Any failure is a miss.
fn load<S: PersistentStore>(store: &S, event: &str, legacy_fallback: bool) -> Option<EventState> {
    let bytes = match store.get(event) {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return None,
        Err(e) => {
            warn!("eventtally: reading '{event}' failed, starting fresh: {e}");
            return None;
        }
    };

    let mut state = match codec::decode(&bytes) {
        Ok(state) => {
            debug!("eventtally: loaded '{event}' from store");
            state
        }
        Err(current_err) if legacy_fallback => match legacy::decode(&bytes) {
            Ok(state) => {
                info!("eventtally: migrating legacy record for '{event}'");
                state
            }
            Err(legacy_err) => {
                warn!(
                    "eventtally: undecodable record for '{event}' \
                     (current: {current_err}; legacy: {legacy_err}), starting fresh"
                );
                return None;
            }
        },
        Err(e) => {
            warn!("eventtally: undecodable record for '{event}' ({e}), starting fresh");
            return None;
        }
    };

    if state.name() != event {
        warn!(
            "eventtally: record stored under '{event}' is named '{}', using the key",
            state.name()
        );
        state.rename(event);
    }
    Some(state)
}

/// Configures an [`EventCache`].
pub struct EventCacheBuilder<S> {
    store: S,
    clock: Box<dyn Clock>,
    legacy_fallback: bool,
    flush_on_synchronize: bool,
}

impl<S: PersistentStore> EventCacheBuilder<S> {
    fn new(store: S) -> Self {
        EventCacheBuilder {
            store,
            clock: Box::new(SystemClock),
            legacy_fallback: true,
            flush_on_synchronize: true,
        }
    }

    /// Time source for occurrences and recency checks. Defaults to
    /// [`SystemClock`].
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    /// Whether records that fail current-format decoding are retried with
    /// the legacy decoder. Defaults to `true`.
    pub fn legacy_fallback(mut self, enabled: bool) -> Self {
        self.legacy_fallback = enabled;
        self
    }

    /// Whether [`EventCache::synchronize`] flushes the store after writing.
    /// Defaults to `true`.
    pub fn flush_on_synchronize(mut self, enabled: bool) -> Self {
        self.flush_on_synchronize = enabled;
        self
    }

    pub fn build(self) -> EventCache<S> {
        EventCache {
            store: self.store,
            states: BTreeMap::new(),
            clock: self.clock,
            legacy_fallback: self.legacy_fallback,
            flush_on_synchronize: self.flush_on_synchronize,
        }
    }
}
