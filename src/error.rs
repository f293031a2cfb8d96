use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Bytes read from a store could not be turned into an
/// [`EventState`](crate::EventState).
///
/// The cache never surfaces this to callers: a record that fails to decode
/// is treated as missing and the event starts from a fresh state.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unknown record format '{0}'")]
    UnknownFormat(String),
    #[error("unsupported record version {0}")]
    UnsupportedVersion(u32),
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid field '{field}': {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// An event state could not be encoded for persistence.
#[derive(Debug, Error)]
#[error("failed to encode event state: {0}")]
pub struct EncodeError(#[from] pub serde_json::Error);

/// Failure reported by a [`PersistentStore`](crate::PersistentStore).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("another writer holds the lock on {}", .0.display())]
    Locked(PathBuf),
    #[error("store backend error: {0}")]
    Backend(String),
}

/// One entry that could not be persisted during
/// [`EventCache::synchronize`](crate::EventCache::synchronize).
#[derive(Debug, Error)]
#[error("could not persist '{key}': {kind}")]
pub struct SyncError {
    /// The event name (store key) the failure belongs to. Empty for a
    /// failed store flush.
    pub key: String,
    pub kind: SyncErrorKind,
}

#[derive(Debug, Error)]
pub enum SyncErrorKind {
    #[error(transparent)]
    Encode(#[from] EncodeError),
    #[error("write failed: {0}")]
    Write(StoreError),
    #[error("flush failed: {0}")]
    Flush(StoreError),
}
