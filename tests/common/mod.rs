#![allow(dead_code)]

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use eventtally::legacy::REFERENCE_DATE_OFFSET;
use eventtally::{Clock, MemoryStore, PersistentStore, StoreError};
use serde_json::json;

pub const T0: f64 = 1_700_000_000.0;

/// A clock the test moves by hand. Clones share the same time.
#[derive(Clone)]
pub struct FixedClock(Arc<Mutex<f64>>);

impl FixedClock {
    pub fn at(now: f64) -> Self {
        FixedClock(Arc::new(Mutex::new(now)))
    }

    pub fn set(&self, now: f64) {
        *self.0.lock().unwrap() = now;
    }

    pub fn advance(&self, secs: f64) {
        *self.0.lock().unwrap() += secs;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> f64 {
        *self.0.lock().unwrap()
    }
}

/// Memory store that counts reads and fails on demand.
#[derive(Default)]
pub struct TestStore {
    pub inner: MemoryStore,
    pub fail_set: HashSet<String>,
    pub fail_get: bool,
    pub fail_flush: bool,
    pub gets: Cell<usize>,
    pub flushes: usize,
}

impl TestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_set(keys: &[&str]) -> Self {
        TestStore {
            fail_set: keys.iter().map(|k| k.to_string()).collect(),
            ..Self::default()
        }
    }
}

impl PersistentStore for TestStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.gets.set(self.gets.get() + 1);
        if self.fail_get {
            return Err(StoreError::Backend("read refused".into()));
        }
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        if self.fail_set.contains(key) {
            return Err(StoreError::Backend(format!("write refused for {key}")));
        }
        self.inner.set(key, value)
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        self.flushes += 1;
        if self.fail_flush {
            return Err(StoreError::Backend("flush refused".into()));
        }
        Ok(())
    }
}

/// Unix timestamp as the previous generation stored it (seconds since
/// 2001-01-01), keeping `0.0` as "never recorded".
pub fn to_reference_date(unix: f64) -> f64 {
    if unix == 0.0 { 0.0 } else { unix - REFERENCE_DATE_OFFSET }
}

/// Bytes as written by the previous-generation encoder, for Unix
/// timestamps `first` and `last`.
pub fn legacy_record(name: &str, first: f64, last: f64, count: i64, disabled: bool) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "$class": "EventEngine.EventStateImpl",
        "EventState_NameKey": name,
        "EventState_FirstOccurenceKey": to_reference_date(first),
        "EventState_LastOccurrenceKey": to_reference_date(last),
        "EventState_CountKey": count,
        "EventState_DisabledKey": disabled,
    }))
    .unwrap()
}
