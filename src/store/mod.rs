//! Versioned Object Store Module
//!
//! In-memory, WAL-backed map of key → version history.
//!
//! ## Responsibilities
//! - Keep the last chain-committed value of each key plus any pending ones
//! - Track dirty/clean state for apportioned reads
//! - Log every mutation to the WAL before it becomes visible
//!
//! ## Object States
//! ```text
//!   set (new key)          set                     commit(v)
//! ∅ ─────────────► [v0*] ───────► [v0*, v1*] ... ──────────► [v]
//!                  dirty          dirty                      clean
//!
//!   * = not yet acknowledged by the rest of the chain
//! ```
//! After the first commit an object always retains its committed value as the
//! oldest element, followed by zero or more pending values.

mod table;

pub use table::ObjectStore;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CraqError, Result};

/// An immutable value at a specific version of a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    /// The stored data
    pub value: String,

    /// Per-key version, assigned by the head starting at 0
    pub version: u64,

    /// Creation time at the head (unix millis)
    pub timestamp: u64,
}

impl Value {
    pub fn new(value: impl Into<String>, version: u64, timestamp: u64) -> Self {
        Self {
            value: value.into(),
            version,
            timestamp,
        }
    }
}

/// Per-key state: retained values, oldest first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    /// Never empty; versions strictly increasing
    values: Vec<Value>,

    /// Version of the last value acknowledged by the whole chain
    committed_version: Option<u64>,
}

impl Object {
    pub(crate) fn new(first: Value) -> Self {
        Self {
            values: vec![first],
            committed_version: None,
        }
    }

    /// All retained values, oldest first
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Number of retained values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; an object exists only once it has a value
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether a value not yet acknowledged by the chain is present
    ///
    /// A lone value that was never committed (a first write still in flight)
    /// counts as dirty, so it is never served as if it were durable.
    pub fn is_dirty(&self) -> bool {
        self.values.len() > 1 || self.committed_version.is_none()
    }

    /// Most recent value
    pub fn latest_value(&self) -> &Value {
        // values is non-empty by construction
        &self.values[self.values.len() - 1]
    }

    /// Version the head assigns to the next write of this key
    pub fn next_version(&self) -> u64 {
        self.latest_value().version + 1
    }

    /// Version of the last committed value, if any
    pub fn committed_version(&self) -> Option<u64> {
        self.committed_version
    }

    /// The last committed value, if any
    pub fn committed_value(&self) -> Option<&Value> {
        self.committed_version
            .and_then(|version| self.value_at_version(version))
    }

    /// Look up a retained value by version
    pub fn value_at_version(&self, version: u64) -> Option<&Value> {
        self.values
            .binary_search_by_key(&version, |v| v.version)
            .ok()
            .map(|idx| &self.values[idx])
    }

    /// Reject versions that would break strict ordering
    pub(crate) fn check_append(&self, key: &str, version: u64) -> Result<()> {
        let latest = self.latest_value().version;
        if version <= latest {
            return Err(CraqError::InvalidArgument(format!(
                "version {} for key '{}' is not newer than stored version {}",
                version, key, latest
            )));
        }
        Ok(())
    }

    pub(crate) fn push(&mut self, value: Value) {
        self.values.push(value);
    }

    /// Decide whether committing `version` changes anything
    ///
    /// Returns `Ok(false)` when an equal or newer version is already committed.
    pub(crate) fn check_commit(&self, key: &str, version: u64) -> Result<bool> {
        if matches!(self.committed_version, Some(committed) if committed >= version) {
            return Ok(false);
        }
        if self.value_at_version(version).is_none() {
            return Err(CraqError::OutOfRange {
                key: key.to_string(),
                version,
            });
        }
        Ok(true)
    }

    /// Discard everything older than `version` and mark it committed
    ///
    /// Caller must have passed `check_commit`.
    pub(crate) fn apply_commit(&mut self, version: u64) {
        self.values.retain(|v| v.version >= version);
        self.committed_version = Some(version);
    }
}

/// Current wall-clock time in unix milliseconds
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
