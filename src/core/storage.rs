//! # Session Storage
//!
//! The seam between the cache and whatever backs "session storage" on the
//! host. Values are plain strings, keyed by plain strings, same as the
//! browser API.
//!
//! Two backends ship with the crate:
//!
//! - [`MemoryStorage`]: lives in-process. Can be told to reject writes, or
//!   given a byte quota, so restricted and full hosts can be simulated.
//! - [`FileStorage`]: one JSON-encoded file per key under a directory
//!   (`~/.pagerouter/storage/` by default). Used by the CLI.
//!
//! File writes use atomic rename (write `.tmp`, then `rename()`).

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use log::debug;

/// Errors a storage backend can raise on write.
#[derive(Debug)]
pub enum StorageError {
    /// The backend is full.
    Quota,
    /// Storage is disabled or restricted on this host.
    Unavailable(String),
    /// Filesystem failure.
    Io(io::Error),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Quota => write!(f, "storage quota exceeded"),
            StorageError::Unavailable(msg) => write!(f, "storage unavailable: {msg}"),
            StorageError::Io(e) => write!(f, "storage I/O error: {e}"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(e)
    }
}

/// Synchronous string key/value storage, modelled on `window.sessionStorage`.
pub trait SessionStorage: Send + Sync {
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    fn get_item(&self, key: &str) -> Option<String>;

    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

// ============================================================================
// In-memory backend
// ============================================================================

/// In-process storage. Counts writes so callers can check whether storage was
/// touched at all.
#[derive(Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    reject_writes: AtomicBool,
    quota: Option<usize>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend whose every write fails, like a browser in restricted mode.
    pub fn rejecting() -> Self {
        let storage = Self::default();
        storage.reject_writes.store(true, Ordering::SeqCst);
        storage
    }

    /// A backend holding at most `bytes` of values across all keys.
    pub fn with_quota(bytes: usize) -> Self {
        Self {
            quota: Some(bytes),
            ..Self::default()
        }
    }

    /// Starts or stops rejecting writes, e.g. when the host revokes access
    /// after startup.
    pub fn set_rejecting(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Number of `set_item` calls seen, successful or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl SessionStorage for MemoryStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("writes rejected".to_string()));
        }
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("poisoned lock".to_string()))?;
        if let Some(quota) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > quota {
                return Err(StorageError::Quota);
            }
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Option<String> {
        self.items.lock().ok()?.get(key).cloned()
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut items = self
            .items
            .lock()
            .map_err(|_| StorageError::Unavailable("poisoned lock".to_string()))?;
        items.remove(key);
        Ok(())
    }
}

// ============================================================================
// File backend
// ============================================================================

/// Directory-backed storage: each key becomes `<dir>/<encoded key>.json`.
///
/// Bytes outside `[A-Za-z0-9_-]` are written as `%XX`, so distinct keys
/// never share a file and no key can leave the directory.
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (and creates if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Returns `~/.pagerouter/storage/`.
    pub fn default_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".pagerouter").join("storage"))
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", encode_key(key)))
    }
}

fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

/// Atomically write `contents` to `path` (via `.tmp` + rename).
fn atomic_write(path: &Path, contents: &str) -> io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, contents)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

impl SessionStorage for FileStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        atomic_write(&path, value)?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn get_item(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path_for(key)).ok()
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}
