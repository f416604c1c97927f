//! WAL Writer
//!
//! Handles appending entries to the WAL file.
//!
//! ## Failed Appends
//! An append either lands completely or not at all. If writing or syncing a
//! line fails, the file is cut back to its length before the append. If that
//! cut fails too, the writer refuses every later append, since the log may
//! now hold a line the store never applied.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::{CraqError, Result};
use super::WalEntry;

/// Byte sink behind a `WalWriter`
///
/// Implemented for `File`; other implementations let tests inject I/O
/// failures.
pub trait LogFile: Send {
    /// Write the whole buffer at the end of the log
    fn append(&mut self, buf: &[u8]) -> io::Result<()>;

    /// Make appended bytes durable
    fn sync(&mut self) -> io::Result<()>;

    /// Cut the log back to `len` bytes
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Current length in bytes
    fn size(&self) -> io::Result<u64>;
}

impl LogFile for File {
    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        self.write_all(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.metadata()?.len())
    }
}

/// Writes entries to the WAL file
///
/// Each line goes straight to the file (no user-space buffer) and, with
/// `EveryWrite`, is fsynced before `append` returns, so a successful return
/// means the entry survives a crash.
pub struct WalWriter {
    /// Path of the log file
    path: PathBuf,

    /// Handle positioned at the end of the log
    file: Box<dyn LogFile>,

    /// Length of the log after the last successful append
    len: u64,

    /// Durability level for each append
    sync_strategy: WalSyncStrategy,

    /// Entries appended through this writer
    entries_written: u64,

    /// Set when a failed append could not be rolled back
    poisoned: bool,
}

impl WalWriter {
    /// Open or create a WAL file, positioned at its end
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;

        Self::from_log_file(path, file, sync_strategy)
    }

    /// Wrap an already opened log
    ///
    /// `file` must append at its end; `path` is used for messages only.
    pub fn from_log_file(
        path: &Path,
        file: impl LogFile + 'static,
        sync_strategy: WalSyncStrategy,
    ) -> Result<Self> {
        let len = file.size()?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Box::new(file),
            len,
            sync_strategy,
            entries_written: 0,
            poisoned: false,
        })
    }

    /// Append an entry to the WAL
    ///
    /// Returns the number of entries written by this writer so far. On error
    /// nothing of the entry remains in the log.
    pub fn append(&mut self, entry: &WalEntry) -> Result<u64> {
        if self.poisoned {
            return Err(CraqError::WalWrite(format!(
                "{} is unusable after an earlier failed append",
                self.path.display()
            )));
        }

        let line = entry.encode()?;

        if let Err(e) = self.write_line(&line) {
            self.roll_back();
            return Err(e);
        }

        self.len += line.len() as u64;
        self.entries_written += 1;
        Ok(self.entries_written)
    }

    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.file
            .append(line)
            .map_err(|e| CraqError::WalWrite(format!("append to {}: {}", self.path.display(), e)))?;

        if self.sync_strategy == WalSyncStrategy::EveryWrite {
            self.sync()?;
        }
        Ok(())
    }

    /// Drop whatever part of a failed append reached the file
    fn roll_back(&mut self) {
        let mut result = self.file.truncate(self.len);
        if result.is_ok() && self.sync_strategy == WalSyncStrategy::EveryWrite {
            result = self.file.sync();
        }

        match result {
            Ok(()) => tracing::warn!(
                "WAL append to {} failed, log cut back to {} bytes",
                self.path.display(),
                self.len
            ),
            Err(e) => {
                tracing::error!(
                    "WAL append to {} failed and could not be rolled back: {}",
                    self.path.display(),
                    e
                );
                self.poisoned = true;
            }
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file
            .sync()
            .map_err(|e| CraqError::WalWrite(format!("fsync {}: {}", self.path.display(), e)))
    }

    /// Entries appended since this writer was opened
    pub fn entries_written(&self) -> u64 {
        self.entries_written
    }

    /// Whether a failed append left the log in an unknown state
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    /// Path of the underlying log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}
