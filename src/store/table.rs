//! Object store implementation
//!
//! HashMap of objects behind a single RwLock, with the WAL appended while
//! the write lock is held so log order always matches memory order.

use std::collections::HashMap;
use std::path::Path;

use parking_lot::{Mutex, RwLock};

use crate::config::WalSyncStrategy;
use crate::error::{CraqError, Result};
use crate::wal::{RecoveryResult, WalEntry, WalRecovery, WalWriter};
use super::{now_millis, Object, Value};

/// Versioned key-value store owned by a chain node
///
/// ## Concurrency
/// - `objects`: one writer or many readers at a time
/// - `wal`: only ever locked while holding the `objects` write lock
pub struct ObjectStore {
    /// key → retained version history
    objects: RwLock<HashMap<String, Object>>,

    /// Attached only after replay completes; `None` for memory-only stores
    wal: Option<Mutex<WalWriter>>,
}

impl ObjectStore {
    /// Create an empty, memory-only store
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            wal: None,
        }
    }

    /// Open a durable store: replay the WAL at `path`, then log to it
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let (store, result) = Self::recover_from(path)?;

        if result.entries_replayed > 0 || result.was_truncated {
            tracing::info!(
                "WAL recovery: {} entries replayed ({} sets, {} commits), {} keys, truncated={}",
                result.entries_replayed,
                result.sets,
                result.commits,
                store.len(),
                result.was_truncated
            );
        }

        let writer = WalWriter::open(path, sync_strategy)?;
        Ok(store.with_wal(writer))
    }

    /// Log every later mutation through `writer`
    ///
    /// Attach only after replaying the same log, so memory and log agree.
    pub fn with_wal(mut self, writer: WalWriter) -> Self {
        self.wal = Some(Mutex::new(writer));
        self
    }

    /// Build a memory-only store from the WAL at `path` without attaching it
    pub fn recover_from(path: &Path) -> Result<(Self, RecoveryResult)> {
        let store = Self::new();
        let result = WalRecovery::recover(path, &store)?;
        Ok((store, result))
    }

    /// Whether mutations are being logged
    pub fn has_wal(&self) -> bool {
        self.wal.is_some()
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Append a new pending value for `key`, stamped with the current time
    pub fn set(&self, key: &str, value: &str, version: u64) -> Result<Value> {
        self.set_at(key, value, version, now_millis())
    }

    /// Append a new pending value with an explicit timestamp
    ///
    /// Used for propagated writes, which keep the head's timestamp.
    pub fn set_at(&self, key: &str, value: &str, version: u64, timestamp: u64) -> Result<Value> {
        validate_key(key)?;
        let mut objects = self.objects.write();
        self.append_locked(&mut objects, key, Value::new(value, version, timestamp), true)
    }

    /// Assign the next version for `key` and append the value in one step
    pub fn set_next(&self, key: &str, value: &str) -> Result<Value> {
        validate_key(key)?;
        let mut objects = self.objects.write();
        let version = objects.get(key).map(Object::next_version).unwrap_or(0);
        self.append_locked(&mut objects, key, Value::new(value, version, now_millis()), true)
    }

    /// Mark `version` of `key` as acknowledged by the chain
    ///
    /// Logs a COMMIT entry and drops every older value. Returns `false` if an
    /// equal or newer version was already committed.
    pub fn commit(&self, key: &str, version: u64) -> Result<bool> {
        let mut objects = self.objects.write();
        self.commit_locked(&mut objects, key, version, true)
    }

    /// Apply a logged entry without logging it again (WAL replay)
    pub fn apply(&self, entry: &WalEntry) -> Result<()> {
        let mut objects = self.objects.write();
        match entry {
            WalEntry::Set {
                key,
                value,
                version,
                timestamp,
            } => {
                validate_key(key)?;
                self.append_locked(&mut objects, key, Value::new(value.as_str(), *version, *timestamp), false)?;
            }
            WalEntry::Commit { key, version, .. } => {
                self.commit_locked(&mut objects, key, *version, false)?;
            }
        }
        Ok(())
    }

    fn append_locked(
        &self,
        objects: &mut HashMap<String, Object>,
        key: &str,
        value: Value,
        log: bool,
    ) -> Result<Value> {
        if let Some(object) = objects.get(key) {
            object.check_append(key, value.version)?;
        }

        if log {
            self.log(&WalEntry::Set {
                key: key.to_string(),
                value: value.value.clone(),
                version: value.version,
                timestamp: value.timestamp,
            })?;
        }

        match objects.get_mut(key) {
            Some(object) => object.push(value.clone()),
            None => {
                objects.insert(key.to_string(), Object::new(value.clone()));
            }
        }

        tracing::trace!(key, version = value.version, "stored pending value");
        Ok(value)
    }

    fn commit_locked(
        &self,
        objects: &mut HashMap<String, Object>,
        key: &str,
        version: u64,
        log: bool,
    ) -> Result<bool> {
        let object = objects.get_mut(key).ok_or(CraqError::KeyNotFound)?;
        if !object.check_commit(key, version)? {
            return Ok(false);
        }

        if log {
            self.log(&WalEntry::Commit {
                key: key.to_string(),
                version,
                timestamp: now_millis(),
            })?;
        }

        object.apply_commit(version);
        tracing::trace!(key, version, "committed");
        Ok(true)
    }

    fn log(&self, entry: &WalEntry) -> Result<()> {
        if let Some(wal) = &self.wal {
            wal.lock().append(entry)?;
        }
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Snapshot of the object stored under `key`
    pub fn get(&self, key: &str) -> Result<Object> {
        self.objects
            .read()
            .get(key)
            .cloned()
            .ok_or(CraqError::KeyNotFound)
    }

    /// Whether `key` has ever been written
    pub fn exists(&self, key: &str) -> bool {
        self.objects.read().contains_key(key)
    }

    /// A specific retained version of `key`
    pub fn get_by_version(&self, key: &str, version: u64) -> Result<Value> {
        validate_key(key)?;
        let objects = self.objects.read();
        let object = objects.get(key).ok_or(CraqError::KeyNotFound)?;
        object
            .value_at_version(version)
            .cloned()
            .ok_or_else(|| CraqError::OutOfRange {
                key: key.to_string(),
                version,
            })
    }

    /// Version the next write of `key` would get (0 for a new key)
    pub fn next_version(&self, key: &str) -> u64 {
        self.objects
            .read()
            .get(key)
            .map(Object::next_version)
            .unwrap_or(0)
    }

    /// Version of the last committed value of `key`
    pub fn committed_version(&self, key: &str) -> Result<u64> {
        self.objects
            .read()
            .get(key)
            .and_then(Object::committed_version)
            .ok_or(CraqError::KeyNotFound)
    }

    /// The last committed value of `key`
    pub fn committed_value(&self, key: &str) -> Result<Value> {
        self.objects
            .read()
            .get(key)
            .and_then(Object::committed_value)
            .cloned()
            .ok_or(CraqError::KeyNotFound)
    }

    /// Number of keys
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }

    /// Number of keys with uncommitted values
    pub fn dirty_count(&self) -> usize {
        self.objects.read().values().filter(|o| o.is_dirty()).count()
    }
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CraqError::InvalidArgument("key cannot be empty".to_string()));
    }
    Ok(())
}
