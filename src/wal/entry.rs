//! WAL Entry definitions
//!
//! Defines the structure of individual WAL log entries and their
//! line-oriented JSON encoding.

use serde::{Deserialize, Serialize};

use crate::error::{CraqError, Result};

/// A single entry in the WAL
///
/// Serialized as one JSON object per line, tagged by `operation`:
/// ```text
/// {"operation":"SET","key":"a","value":"1","version":0,"timestamp":1700000000000}
/// {"operation":"COMMIT","key":"a","version":0,"timestamp":1700000000004}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "UPPERCASE")]
pub enum WalEntry {
    /// A new (uncommitted) value was appended to a key's history
    Set {
        key: String,
        value: String,
        version: u64,
        /// Creation time of the value (unix millis), replayed verbatim
        timestamp: u64,
    },

    /// The value at `version` was acknowledged by the rest of the chain
    Commit {
        key: String,
        version: u64,
        /// Time the commit was recorded (unix millis)
        timestamp: u64,
    },
}

impl WalEntry {
    /// The key this entry mutates
    pub fn key(&self) -> &str {
        match self {
            WalEntry::Set { key, .. } | WalEntry::Commit { key, .. } => key,
        }
    }

    /// The version this entry refers to
    pub fn version(&self) -> u64 {
        match self {
            WalEntry::Set { version, .. } | WalEntry::Commit { version, .. } => *version,
        }
    }

    /// Encode as a single newline-terminated JSON line
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)
            .map_err(|e| CraqError::Serialization(format!("WAL entry: {}", e)))?;
        line.push(b'\n');
        Ok(line)
    }

    /// Decode one line (with or without the trailing newline)
    pub fn decode(line: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        let trimmed = match line.last() {
            Some(b'\n') => &line[..line.len() - 1],
            _ => line,
        };
        serde_json::from_slice(trimmed)
    }
}
