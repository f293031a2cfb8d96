//! File-backed [`PersistentStore`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::store::PersistentStore;

/// Locking strategy for [`FileStore::open_with_lock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockMode {
    /// Hold an exclusive advisory lock for the lifetime of the store.
    #[default]
    Exclusive,
    /// No locking. The caller guarantees a single writer.
    None,
}

/// Compute the xxh64 hash of a stored value, hex-encoded.
pub fn value_hash(value: &[u8]) -> String {
    let hash = xxhash_rust::xxh64::xxh64(value, 0);
    format!("{:016x}", hash)
}

#[derive(Serialize, Deserialize)]
struct StoredLine {
    key: String,
    value: Vec<u8>,
    hash: String,
}

/// A key-value store kept in a single JSON-lines file.
///
/// The whole file is read into memory on open. [`set`](PersistentStore::set)
/// only stages a value; [`flush`](PersistentStore::flush) rewrites the file
/// atomically (`.tmp` + rename), so a crash mid-flush leaves the previous
/// file intact. Each line carries an xxh64 hash of its value; lines that do
/// not parse or fail the hash check are skipped on load and the key reads as
/// absent.
///
/// ```text
/// {"key":"app_launch","value":[123,34,...],"hash":"5e1b0f3a9c2d7e41"}
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, Vec<u8>>,
    dirty: bool,
    _lock: Option<File>,
}

impl FileStore {
    /// Open or create a store at `path` with an exclusive lock.
    ///
    /// Fails with [`StoreError::Locked`] if another `FileStore` holds the
    /// lock on the same path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_lock(path, LockMode::Exclusive)
    }

    /// Open or create a store at `path` with the given locking strategy.
    ///
    /// Creates parent directories if they don't exist. The file itself is
    /// only created on the first flush.
    pub fn open_with_lock(path: impl AsRef<Path>, mode: LockMode) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let lock = match mode {
            LockMode::Exclusive => Some(acquire_lock(&path)?),
            LockMode::None => None,
        };

        let entries = load(&path)?;
        debug!(
            "eventtally: opened file store {} with {} entries",
            path.display(),
            entries.len()
        );

        Ok(FileStore {
            path,
            entries,
            dirty: false,
            _lock: lock,
        })
    }

    /// Returns the path to the store file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the advisory lock file guarding this store.
    pub fn lock_path(&self) -> PathBuf {
        with_suffix(&self.path, ".lock")
    }

    /// Remove the value under `key`. Takes effect on disk at the next flush.
    pub fn remove(&mut self, key: &str) -> Option<Vec<u8>> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Whether there are staged changes not yet flushed.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl PersistentStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        self.dirty = true;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }
        save(&self.path, &self.entries)?;
        self.dirty = false;
        Ok(())
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn acquire_lock(path: &Path) -> Result<File, StoreError> {
    let lock_path = with_suffix(path, ".lock");
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(&lock_path)?;

    match file.try_lock_exclusive() {
        Ok(()) => Ok(file),
        Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
            Err(StoreError::Locked(path.to_path_buf()))
        }
        Err(e) => Err(StoreError::Io(e)),
    }
}

/// Read every valid line of the store file. A missing file is an empty store.
fn load(path: &Path) -> Result<BTreeMap<String, Vec<u8>>, StoreError> {
    let contents = match fs::read(path) {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(e.into()),
    };

    let mut entries = BTreeMap::new();
    for (index, line) in contents.split(|&b| b == b'\n').enumerate() {
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }

        let stored: StoredLine = match serde_json::from_slice(line) {
            Ok(stored) => stored,
            Err(e) => {
                warn!(
                    "eventtally: {}: skipping unreadable line {}: {e}",
                    path.display(),
                    index + 1
                );
                continue;
            }
        };

        if value_hash(&stored.value) != stored.hash {
            warn!(
                "eventtally: {}: hash mismatch for key '{}' on line {}, skipping",
                path.display(),
                stored.key,
                index + 1
            );
            continue;
        }

        entries.insert(stored.key, stored.value);
    }
    Ok(entries)
}

/// Rewrite the store file atomically.
fn save(path: &Path, entries: &BTreeMap<String, Vec<u8>>) -> Result<(), StoreError> {
    let tmp_path = with_suffix(path, ".tmp");

    let file = File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    for (key, value) in entries {
        let line = StoredLine {
            key: key.clone(),
            value: value.clone(),
            hash: value_hash(value),
        };
        let json = serde_json::to_string(&line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        writeln!(writer, "{json}")?;
    }
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_data()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}
