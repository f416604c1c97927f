//! Error types for craqkv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CraqError
pub type Result<T> = std::result::Result<T, CraqError>;

/// Unified error type for craqkv operations
#[derive(Debug, Error)]
pub enum CraqError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Request Validation Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Key not found")]
    KeyNotFound,

    #[error("Version {version} is not retained for key '{key}'")]
    OutOfRange { key: String, version: u64 },

    // -------------------------------------------------------------------------
    // WAL Errors
    // -------------------------------------------------------------------------
    #[error("WAL write failed: {0}")]
    WalWrite(String),

    #[error("WAL corruption detected at line {line}: {reason}")]
    WalCorruption { line: u64, reason: String },

    // -------------------------------------------------------------------------
    // Chain Errors
    // -------------------------------------------------------------------------
    #[error("Propagation failed: {0}")]
    Propagation(String),

    #[error("Node index {index} has no role in a chain of {chain_len} nodes")]
    UnknownRole { index: usize, chain_len: usize },

    #[error("Operation '{operation}' is not served by the {role} node")]
    WrongRole {
        operation: &'static str,
        role: crate::chain::Role,
    },

    #[error("Topology error: {0}")]
    Topology(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Network error: {0}")]
    Network(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CraqError {
    /// Whether the error is the caller's fault (bad input or wrong node)
    /// rather than a server-side failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CraqError::InvalidArgument(_)
                | CraqError::OutOfRange { .. }
                | CraqError::WrongRole { .. }
                | CraqError::Protocol(_)
        )
    }
}
