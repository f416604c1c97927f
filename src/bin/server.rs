//! craqkv Server Binary
//!
//! Starts one chain node and its TCP server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use craqkv::network::{Server, TcpTransport};
use craqkv::{ChainNode, ChainTopology, Config};
use tracing_subscriber::{fmt, EnvFilter};

/// craqkv Server
#[derive(Parser, Debug)]
#[command(name = "craqkv-server")]
#[command(about = "Chain-replicated key-value store node")]
#[command(version)]
struct Args {
    /// Position of this node in the chain table (0 = head)
    #[arg(long)]
    id: usize,

    /// Path to the YAML chain table
    #[arg(short, long)]
    chain_table: PathBuf,

    /// Root directory for node state; this node uses <data-dir>/<id>
    #[arg(short, long, default_value = "./states")]
    data_dir: PathBuf,

    /// Listen address (host:port); defaults to this node's address in the chain table
    #[arg(short, long)]
    listen: Option<String>,

    /// Connection worker threads
    #[arg(short, long, default_value = "64")]
    workers: usize,

    /// Timeout for calls to other chain nodes, in milliseconds
    #[arg(long, default_value = "5000")]
    peer_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,craqkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("craqkv Server v{}", craqkv::VERSION);

    let topology = match ChainTopology::from_file(&args.chain_table) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            tracing::error!("Failed to load chain table {}: {}", args.chain_table.display(), e);
            std::process::exit(1);
        }
    };
    tracing::info!("Parsed chain table with {} nodes", topology.len());

    let listen = match args.listen.clone().or_else(|| topology.node(args.id).map(|n| n.addr.clone())) {
        Some(addr) => addr,
        None => {
            tracing::error!("Node id {} is not in the chain table", args.id);
            std::process::exit(1);
        }
    };

    let data_dir = args.data_dir.join(args.id.to_string());
    tracing::info!("Data directory: {}", data_dir.display());
    tracing::info!("Listen address: {}", listen);

    let config = Config::builder()
        .node_index(args.id)
        .data_dir(data_dir)
        .listen_addr(listen)
        .worker_threads(args.workers)
        .peer_timeout_ms(args.peer_timeout_ms)
        .build();

    let transport = Arc::new(TcpTransport::new(config.peer_timeout()));

    let node = match ChainNode::open(&config, topology, transport) {
        Ok(n) => Arc::new(n),
        Err(e) => {
            tracing::error!("Failed to start node: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, node) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
