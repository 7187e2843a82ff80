//! # Persistent Cache
//!
//! A small key/value cache mirrored to session storage. Keys are slugified on
//! the way in; values are `serde_json::Value` and always leave the cache as
//! fresh copies, so nothing a caller does to a returned value can reach the
//! stored entry.
//!
//! ```text
//! set("Foo Bar", v) ──► slugify ──► map["foo-bar"] = v ──► save()
//!                                                           │
//!                                     storage[storage_key] = JSON(map)
//! ```
//!
//! Every `save()` serializes the *whole* map. That is fine for the handful of
//! entries this cache holds and becomes the bottleneck if it ever grows large.
//!
//! ## One instance per process
//!
//! There is no global. The composition root owns a [`CacheSlot`]; the first
//! `get_or_init` builds the cache (capability probe, flush, persist) and every
//! later call gets the same `Arc` back, whatever configuration it passes.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use log::{debug, info, warn};
use serde_json::{Map, Value};

use crate::core::storage::{SessionStorage, StorageError};

pub const DEFAULT_STORAGE_KEY: &str = "garberco-cache";
pub const DEFAULT_PROBE_KEY: &str = "garberco-test";

/// Cache settings. Only the first construction's options are ever used.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    pub enable_storage: bool,
    pub storage_key: String,
    pub probe_key: String,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enable_storage: true,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            probe_key: DEFAULT_PROBE_KEY.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum CacheError {
    Storage(StorageError),
    Serialize(serde_json::Error),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheError::Storage(e) => write!(f, "cache write failed: {e}"),
            CacheError::Serialize(e) => write!(f, "cache serialization failed: {e}"),
        }
    }
}

impl std::error::Error for CacheError {}

impl From<StorageError> for CacheError {
    fn from(e: StorageError) -> Self {
        CacheError::Storage(e)
    }
}

/// Lowercase, collapse every run of non-alphanumerics to `-`, trim the ends.
///
/// `"Some Key!"` becomes `"some-key"`.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_sep = false;
    for c in input.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    slug
}

/// Shape of a cached value, as far as copying is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Strings, numbers, booleans: copied by value.
    Primitive,
    /// Arrays: cloned into a new array.
    Sequence,
    /// Objects: cloned into a new object.
    Mapping,
    /// Null or missing: reported as not found.
    Absent,
}

impl ValueKind {
    pub fn of(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => ValueKind::Absent,
            Some(Value::Array(_)) => ValueKind::Sequence,
            Some(Value::Object(_)) => ValueKind::Mapping,
            Some(Value::String(_) | Value::Number(_) | Value::Bool(_)) => ValueKind::Primitive,
        }
    }
}

/// The copy primitive behind every read.
///
/// Containers are rebuilt element by element into a new container of the same
/// kind, so the result never shares storage with `value`.
pub fn copy_value(value: Option<&Value>) -> Option<Value> {
    match (ValueKind::of(value), value) {
        (ValueKind::Absent, _) | (_, None) => None,
        (ValueKind::Sequence, Some(Value::Array(items))) => {
            Some(Value::Array(items.iter().cloned().collect()))
        }
        (ValueKind::Mapping, Some(Value::Object(fields))) => {
            let mut copy = Map::with_capacity(fields.len());
            for (k, v) in fields {
                copy.insert(k.clone(), v.clone());
            }
            Some(Value::Object(copy))
        }
        (_, Some(primitive)) => Some(primitive.clone()),
    }
}

pub struct PersistentCache {
    options: CacheOptions,
    storage: Arc<dyn SessionStorage>,
    storage_supported: bool,
    entries: Mutex<Map<String, Value>>,
}

impl PersistentCache {
    /// Builds the cache: probes storage, then flushes (which persists the
    /// empty map). Prefer [`CacheSlot::get_or_init`] outside of tests.
    pub fn new(
        options: CacheOptions,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Self, CacheError> {
        let storage_supported = probe_storage(storage.as_ref(), &options.probe_key);
        let cache = Self {
            options,
            storage,
            storage_supported,
            entries: Mutex::new(Map::new()),
        };
        cache.flush()?;
        info!(
            "Persistent cache initialized (storage enabled: {}, supported: {})",
            cache.options.enable_storage, cache.storage_supported
        );
        Ok(cache)
    }

    /// Whether the startup probe could write to session storage.
    pub fn is_storage_supported(&self) -> bool {
        self.storage_supported
    }

    fn entries(&self) -> MutexGuard<'_, Map<String, Value>> {
        // A panic while holding the lock cannot leave the map half-written,
        // so recover the guard instead of propagating the poison.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Drops every entry and persists the empty map.
    pub fn flush(&self) -> Result<(), CacheError> {
        self.entries().clear();
        self.save()
    }

    /// Writes the whole map to session storage under the storage key.
    pub fn save(&self) -> Result<(), CacheError> {
        if !self.options.enable_storage || !self.storage_supported {
            debug!("Cache storage disabled - not writing to session storage");
            return Ok(());
        }
        let json = {
            let entries = self.entries();
            serde_json::to_string(&*entries).map_err(CacheError::Serialize)?
        };
        self.storage.set_item(&self.options.storage_key, &json)?;
        Ok(())
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), CacheError> {
        let slug = slugify(key);
        debug!("Cache set: {}", slug);
        self.entries().insert(slug, value);
        self.save()
    }

    /// With a key: a copy of that entry, or `None`. Without: a snapshot of
    /// the whole cache as an object.
    pub fn get(&self, key: Option<&str>) -> Option<Value> {
        let entries = self.entries();
        match key {
            Some(key) => copy_value(entries.get(&slugify(key))),
            None => Some(Value::Object(entries.clone())),
        }
    }

    pub fn get_value(&self, value: Option<&Value>) -> Option<Value> {
        copy_value(value)
    }

    /// Removes the entry from memory only. Storage keeps the old copy until
    /// the next `set`/`flush` rewrites it.
    pub fn remove(&self, key: &str) {
        let slug = slugify(key);
        if self.entries().remove(&slug).is_some() {
            debug!("Cache remove: {} (not persisted)", slug);
        }
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

/// Write-then-delete probe. Any failure disables storage for good.
fn probe_storage(storage: &dyn SessionStorage, probe_key: &str) -> bool {
    let result = storage
        .set_item(probe_key, "1")
        .and_then(|_| storage.remove_item(probe_key));
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Session storage unavailable, cache is in-memory only: {}", e);
            false
        }
    }
}

/// Holds the process's single [`PersistentCache`].
#[derive(Default)]
pub struct CacheSlot {
    cell: OnceLock<Arc<PersistentCache>>,
}

impl CacheSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache, building it on first call. Later calls ignore
    /// `options` and `storage`.
    pub fn get_or_init(
        &self,
        options: CacheOptions,
        storage: Arc<dyn SessionStorage>,
    ) -> Result<Arc<PersistentCache>, CacheError> {
        if let Some(existing) = self.cell.get() {
            debug!("Cache already initialized, ignoring new options");
            return Ok(Arc::clone(existing));
        }
        let cache = Arc::new(PersistentCache::new(options, storage)?);
        // Single-threaded by contract; if another caller won anyway, theirs stands.
        Ok(Arc::clone(self.cell.get_or_init(|| cache)))
    }

    pub fn get(&self) -> Option<Arc<PersistentCache>> {
        self.cell.get().cloned()
    }
}
