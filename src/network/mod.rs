//! Network Module
//!
//! TCP server, client, and node-to-node transports.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool for connections
//! - Commands routed through `ChainNode`
//! - Downstream calls go through a `ChainTransport`

mod server;
mod connection;
mod client;
mod transport;

pub use server::Server;
pub use connection::Connection;
pub use client::Client;
pub use transport::{ChainTransport, LocalTransport, TcpTransport};
