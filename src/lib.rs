//! # craqkv
//!
//! A chain-replicated key-value store (CRAQ) with:
//! - Writes ordered head → tail, committed tail → head
//! - Reads served by any node, dirty keys resolved by a tail version query
//! - Write-Ahead Logging (WAL) for durability and crash recovery
//! - TCP-based client and node-to-node protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (Clients and upstream nodes)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    ChainNode                                 │
//! │            (Head / Middle / Tail protocol)                   │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │                                  │
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │   ObjectStore   │                │ ChainTransport  │──► successor / tail
//!   │    (RwLock)     │                │  (TCP / local)  │
//!   └────────┬────────┘                └─────────────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │       WAL       │
//!   │ (JSON lines)    │
//!   └─────────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod wal;
pub mod store;
pub mod chain;
pub mod network;
pub mod protocol;
pub mod node;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CraqError, Result};
pub use config::Config;
pub use chain::{ChainTopology, NodeInfo, Role};
pub use node::{ChainNode, WriteAck};
pub use store::{Object, ObjectStore, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of craqkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
