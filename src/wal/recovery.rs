//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL into an object store.

use std::fs::OpenOptions;
use std::path::Path;

use crate::error::{CraqError, Result};
use crate::store::ObjectStore;
use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries replayed (or that would be replayed)
    pub entries_replayed: u64,

    /// SET entries among them
    pub sets: u64,

    /// COMMIT entries among them
    pub commits: u64,

    /// Whether an incomplete trailing write was found (and, on recover, removed)
    pub was_truncated: bool,

    /// Byte length of the valid log prefix
    pub valid_len: u64,
}

impl RecoveryResult {
    fn count(&mut self, entry: &WalEntry) {
        self.entries_replayed += 1;
        match entry {
            WalEntry::Set { .. } => self.sets += 1,
            WalEntry::Commit { .. } => self.commits += 1,
        }
    }
}

impl WalRecovery {
    /// Replay a WAL file into `store`
    ///
    /// The store must not have a WAL attached, otherwise replayed entries
    /// would be logged a second time. Entries are applied in file order with
    /// the logged versions and timestamps. A malformed line aborts recovery
    /// with `WalCorruption`; a torn final write is cut off the file.
    /// A missing file is an empty log.
    pub fn recover(path: &Path, store: &ObjectStore) -> Result<RecoveryResult> {
        if store.has_wal() {
            return Err(CraqError::Config(
                "WAL replay target already has a WAL attached".to_string(),
            ));
        }
        if !path.exists() {
            return Ok(RecoveryResult::default());
        }

        let mut reader = WalReader::open(path)?;
        let mut result = RecoveryResult::default();

        while let Some(entry) = reader.next_entry()? {
            store.apply(&entry).map_err(|e| CraqError::WalCorruption {
                line: reader.lines_read(),
                reason: format!("cannot replay {:?}: {}", entry, e),
            })?;
            result.count(&entry);
        }

        result.valid_len = reader.valid_offset();
        result.was_truncated = reader.has_torn_tail();

        if result.was_truncated {
            // Drop the partial write so new appends start on a clean line
            let file = OpenOptions::new().write(true).open(path)?;
            file.set_len(result.valid_len)?;
            file.sync_all()?;
            tracing::warn!(
                "Truncated WAL {} to {} bytes after partial write",
                path.display(),
                result.valid_len
            );
        }

        Ok(result)
    }

    /// Read every entry of a WAL file without applying or modifying anything
    pub fn read_all(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let mut reader = WalReader::open(path)?;
        let mut result = RecoveryResult::default();
        let mut entries = Vec::new();

        while let Some(entry) = reader.next_entry()? {
            result.count(&entry);
            entries.push(entry);
        }

        result.valid_len = reader.valid_offset();
        result.was_truncated = reader.has_torn_tail();
        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::read_all(path).map(|(_, result)| result)
    }
}
