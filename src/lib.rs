//! Named event counters kept in memory and persisted on request.
//!
//! An [`EventCache`] loads each event's [`EventState`] lazily from a
//! [`PersistentStore`], falling back to the legacy record format and then to
//! a fresh state, and writes everything back in the current format when
//! [`EventCache::synchronize`] is called.

mod cache;
mod clock;
pub mod codec;
mod error;
mod file_store;
pub mod legacy;
mod state;
mod store;

pub use cache::{EventCache, EventCacheBuilder, SyncReport};
pub use clock::{Clock, SystemClock};
pub use error::{DecodeError, EncodeError, StoreError, SyncError, SyncErrorKind};
pub use file_store::{value_hash, FileStore, LockMode};
pub use state::{EventState, EARLIEST_TIMESTAMP, ONE_DAY};
pub use store::{MemoryStore, PersistentStore};
