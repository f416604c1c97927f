//! WAL Reader
//!
//! Handles reading entries from the WAL file in write order.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::{CraqError, Result};
use super::WalEntry;

/// Reads entries from the WAL file
pub struct WalReader {
    /// Buffered file handle
    reader: BufReader<File>,

    /// 1-based number of the last line read
    line: u64,

    /// Byte offset just past the last complete, valid line
    valid_offset: u64,

    /// Set when the file ends in an unterminated fragment
    torn_tail: bool,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            line: 0,
            valid_offset: 0,
            torn_tail: false,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file. A trailing fragment without a
    /// newline is a write that never completed: it ends the log and is
    /// reported through [`WalReader::has_torn_tail`] instead of as an error.
    /// A complete line that does not decode is corruption.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = self.reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                return Ok(None);
            }
            self.line += 1;

            if buf.last() != Some(&b'\n') {
                tracing::warn!(
                    "WAL ends with an incomplete entry at line {} ({} bytes)",
                    self.line,
                    buf.len()
                );
                self.torn_tail = true;
                return Ok(None);
            }

            // Blank lines carry nothing to replay
            if buf.iter().all(|b| b.is_ascii_whitespace()) {
                self.valid_offset += read as u64;
                continue;
            }

            let entry = WalEntry::decode(&buf).map_err(|e| CraqError::WalCorruption {
                line: self.line,
                reason: e.to_string(),
            })?;
            self.valid_offset += read as u64;
            return Ok(Some(entry));
        }
    }

    /// Iterate over all entries, stopping after the first error
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            failed: false,
        }
    }

    /// Byte length of the valid prefix read so far
    pub fn valid_offset(&self) -> u64 {
        self.valid_offset
    }

    /// Whether the file ended with a partial write
    pub fn has_torn_tail(&self) -> bool {
        self.torn_tail
    }

    /// Number of lines consumed so far
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    failed: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
