//! Tests for WAL Writer and Reader
//!
//! These tests verify:
//! - Appending entries as JSON lines
//! - Reopening appends instead of truncating
//! - Sync strategies
//! - Failed appends leave nothing behind
//! - Reading entries back in write order

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use craqkv::config::WalSyncStrategy;
use craqkv::wal::{LogFile, WalEntry, WalReader, WalRecovery, WalWriter};
use craqkv::CraqError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.log");
    (temp_dir, wal_path)
}

fn set_entry(key: &str, value: &str, version: u64) -> WalEntry {
    WalEntry::Set {
        key: key.to_string(),
        value: value.to_string(),
        version,
        timestamp: 1000 + version,
    }
}

/// Switches for failing individual log operations
#[derive(Clone, Default)]
struct Faults {
    write: Arc<AtomicBool>,
    sync: Arc<AtomicBool>,
    truncate: Arc<AtomicBool>,
}

/// A real file whose operations fail on demand
struct FaultyFile {
    file: File,
    faults: Faults,
}

impl LogFile for FaultyFile {
    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        if self.faults.write.load(Ordering::SeqCst) {
            // Part of the line lands before the device fills up
            self.file.write_all(&buf[..buf.len() / 2])?;
            return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
        }
        self.file.write_all(buf)
    }

    fn sync(&mut self) -> io::Result<()> {
        if self.faults.sync.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "fsync failed"));
        }
        self.file.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        if self.faults.truncate.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, "truncate failed"));
        }
        self.file.set_len(len)
    }

    fn size(&self) -> io::Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

fn open_faulty(path: &Path) -> (WalWriter, Faults) {
    let file = OpenOptions::new().create(true).append(true).open(path).unwrap();
    let faults = Faults::default();
    let writer = WalWriter::from_log_file(
        path,
        FaultyFile {
            file,
            faults: faults.clone(),
        },
        WalSyncStrategy::EveryWrite,
    )
    .unwrap();
    (writer, faults)
}

fn read_entries(path: &Path) -> Vec<WalEntry> {
    WalReader::open(path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap()
}

// =============================================================================
// Writer Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let count = writer.append(&set_entry("a", "1", 0)).unwrap();

    assert_eq!(count, 1);
    assert_eq!(writer.entries_written(), 1);

    let contents = fs::read_to_string(&wal_path).unwrap();
    assert_eq!(contents.lines().count(), 1);
    assert!(contents.ends_with('\n'));
}

#[test]
fn test_write_multiple_entries_one_per_line() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    for v in 0..5 {
        writer.append(&set_entry("a", &format!("value{}", v), v)).unwrap();
    }

    let contents = fs::read_to_string(&wal_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 5);
    for (v, line) in lines.iter().enumerate() {
        let entry = WalEntry::decode(line.as_bytes()).unwrap();
        assert_eq!(entry.version(), v as u64);
    }
}

#[test]
fn test_reopen_appends() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(&set_entry("a", "1", 0)).unwrap();
    }
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        assert_eq!(writer.entries_written(), 0);
        writer.append(&set_entry("a", "2", 1)).unwrap();
    }

    let contents = fs::read_to_string(&wal_path).unwrap();
    assert_eq!(contents.lines().count(), 2);
}

#[test]
fn test_flush_only_strategy_is_readable() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::FlushOnly).unwrap();
    writer.append(&set_entry("a", "1", 0)).unwrap();

    // Flushed to the OS, so a reader sees it without closing the writer
    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_entry().unwrap(), Some(set_entry("a", "1", 0)));
}

#[test]
fn test_open_creates_parent_directories() {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("nested").join("node").join("wal.log");

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(&set_entry("a", "1", 0)).unwrap();

    assert!(wal_path.exists());
    assert_eq!(writer.path(), wal_path.as_path());
}

// =============================================================================
// Failure Tests
// =============================================================================

#[test]
fn test_failed_write_is_cut_from_log() {
    let (_temp, wal_path) = setup_temp_wal();
    let (mut writer, faults) = open_faulty(&wal_path);
    writer.append(&set_entry("a", "1", 0)).unwrap();
    let len_before = fs::metadata(&wal_path).unwrap().len();

    faults.write.store(true, Ordering::SeqCst);
    assert!(matches!(
        writer.append(&set_entry("k", "rejected", 0)),
        Err(CraqError::WalWrite(_))
    ));
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
    assert_eq!(writer.entries_written(), 1);

    // The retry is the only trace of the key
    faults.write.store(false, Ordering::SeqCst);
    writer.append(&set_entry("k", "accepted", 0)).unwrap();

    assert_eq!(
        read_entries(&wal_path),
        vec![set_entry("a", "1", 0), set_entry("k", "accepted", 0)]
    );
}

#[test]
fn test_failed_sync_is_cut_from_log() {
    let (_temp, wal_path) = setup_temp_wal();
    let (mut writer, faults) = open_faulty(&wal_path);
    writer.append(&set_entry("a", "1", 0)).unwrap();
    let len_before = fs::metadata(&wal_path).unwrap().len();

    faults.sync.store(true, Ordering::SeqCst);
    assert!(matches!(
        writer.append(&set_entry("a", "2", 1)),
        Err(CraqError::WalWrite(_))
    ));
    assert_eq!(fs::metadata(&wal_path).unwrap().len(), len_before);
    assert!(!writer.is_poisoned());

    faults.sync.store(false, Ordering::SeqCst);
    writer.append(&set_entry("a", "3", 1)).unwrap();
    assert_eq!(read_entries(&wal_path).len(), 2);
}

#[test]
fn test_failed_rollback_refuses_later_appends() {
    let (_temp, wal_path) = setup_temp_wal();
    let (mut writer, faults) = open_faulty(&wal_path);
    writer.append(&set_entry("a", "1", 0)).unwrap();

    faults.write.store(true, Ordering::SeqCst);
    faults.truncate.store(true, Ordering::SeqCst);
    assert!(writer.append(&set_entry("a", "2", 1)).is_err());
    assert!(writer.is_poisoned());

    faults.write.store(false, Ordering::SeqCst);
    faults.truncate.store(false, Ordering::SeqCst);
    assert!(matches!(
        writer.append(&set_entry("a", "3", 1)),
        Err(CraqError::WalWrite(_))
    ));

    // The half-written line is a torn tail that recovery drops
    let result = WalRecovery::verify(&wal_path).unwrap();
    assert_eq!(result.entries_replayed, 1);
    assert!(result.was_truncated);
}

// =============================================================================
// Reader Tests
// =============================================================================

#[test]
fn test_reader_returns_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();

    let entries = vec![
        set_entry("a", "1", 0),
        WalEntry::Commit {
            key: "a".to_string(),
            version: 0,
            timestamp: 2000,
        },
        set_entry("b", "x", 0),
    ];
    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        for entry in &entries {
            writer.append(entry).unwrap();
        }
    }

    let read: Vec<WalEntry> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(read, entries);
}

#[test]
fn test_reader_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    fs::write(&wal_path, b"").unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.next_entry().unwrap(), None);
    assert!(!reader.has_torn_tail());
    assert_eq!(reader.valid_offset(), 0);
}

#[test]
fn test_reader_skips_blank_lines() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut contents = set_entry("a", "1", 0).encode().unwrap();
    contents.extend_from_slice(b"\n");
    contents.extend_from_slice(&set_entry("a", "2", 1).encode().unwrap());
    fs::write(&wal_path, &contents).unwrap();

    let read: Vec<WalEntry> = WalReader::open(&wal_path)
        .unwrap()
        .entries()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(read.len(), 2);
}

#[test]
fn test_reader_reports_corrupt_line_number() {
    let (_temp, wal_path) = setup_temp_wal();
    let mut contents = set_entry("a", "1", 0).encode().unwrap();
    contents.extend_from_slice(b"{\"operation\":\"SET\",\"key\":\n");
    fs::write(&wal_path, &contents).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());

    match reader.next_entry() {
        Err(CraqError::WalCorruption { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected WalCorruption, got {:?}", other),
    }
}

#[test]
fn test_reader_detects_torn_tail() {
    let (_temp, wal_path) = setup_temp_wal();
    let good = set_entry("a", "1", 0).encode().unwrap();
    let mut contents = good.clone();
    let partial = set_entry("a", "2", 1).encode().unwrap();
    contents.extend_from_slice(&partial[..partial.len() / 2]);
    fs::write(&wal_path, &contents).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_entry().unwrap().is_some());
    assert_eq!(reader.next_entry().unwrap(), None);
    assert!(reader.has_torn_tail());
    assert_eq!(reader.valid_offset(), good.len() as u64);
}
