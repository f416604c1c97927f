//! Write-Ahead Log (WAL) Module
//!
//! Provides durability guarantees through append-only logging.
//!
//! ## Responsibilities
//! - Append a log entry before any store mutation becomes visible
//! - Record both new values (SET) and chain acknowledgments (COMMIT)
//! - Crash recovery and deterministic replay
//!
//! ## File Format
//! One JSON object per line, replayed in file order:
//! ```text
//! {"operation":"SET","key":"a","value":"1","version":0,"timestamp":1700000000000}
//! {"operation":"SET","key":"a","value":"2","version":1,"timestamp":1700000000100}
//! {"operation":"COMMIT","key":"a","version":1,"timestamp":1700000000102}
//! ```

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::WalEntry;
pub use writer::{LogFile, WalWriter};
pub use reader::{WalIterator, WalReader};
pub use recovery::{RecoveryResult, WalRecovery};
