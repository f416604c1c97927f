//! TCP Server
//!
//! Accepts connections and dispatches them to a fixed pool of worker threads.

use std::collections::HashMap;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use parking_lot::Mutex;

use crate::config::Config;
use crate::error::Result;
use crate::node::ChainNode;
use super::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Read halves of connections handed to workers, by connection id
type OpenConnections = Arc<Mutex<HashMap<u64, TcpStream>>>;

/// TCP server for one chain node
pub struct Server {
    config: Config,
    node: Arc<ChainNode>,
    listener: TcpListener,
    shutdown: Arc<AtomicBool>,
}

impl Server {
    /// Bind `config.listen_addr`
    pub fn bind(config: Config, node: Arc<ChainNode>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        Ok(Self::from_listener(listener, config, node))
    }

    /// Serve on an already bound listener
    pub fn from_listener(listener: TcpListener, config: Config, node: Arc<ChainNode>) -> Self {
        Self {
            config,
            node,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Address actually bound (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops `run` when set
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Start the server (blocking until shutdown)
    ///
    /// On shutdown the read side of every open connection is closed: requests
    /// already being handled still get their response, then each connection
    /// ends at its next read instead of waiting out the read timeout.
    pub fn run(&self) -> Result<()> {
        self.listener.set_nonblocking(true)?;

        let workers = self.config.worker_threads.max(1);
        let (sender, receiver) = channel::bounded::<(u64, TcpStream)>(workers);
        let open: OpenConnections = Arc::new(Mutex::new(HashMap::new()));
        let mut next_id: u64 = 0;

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let receiver = receiver.clone();
            let open = Arc::clone(&open);
            let node = Arc::clone(&self.node);
            let read_ms = self.config.read_timeout_ms;
            let write_ms = self.config.write_timeout_ms;

            let handle = thread::Builder::new()
                .name(format!("craqkv-worker-{}", id))
                .spawn(move || {
                    for (conn_id, stream) in receiver.iter() {
                        serve(stream, Arc::clone(&node), read_ms, write_ms);
                        open.lock().remove(&conn_id);
                    }
                })?;
            handles.push(handle);
        }
        drop(receiver);

        tracing::info!(
            "{} node listening on {} with {} workers",
            self.node.role(),
            self.listener.local_addr()?,
            workers
        );

        while !self.shutdown.load(Ordering::Relaxed) {
            match self.listener.accept() {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nonblocking(false) {
                        tracing::warn!("Dropping connection from {}: {}", peer, e);
                        continue;
                    }
                    let read_half = match stream.try_clone() {
                        Ok(s) => s,
                        Err(e) => {
                            tracing::warn!("Dropping connection from {}: {}", peer, e);
                            continue;
                        }
                    };
                    next_id += 1;
                    open.lock().insert(next_id, read_half);
                    if sender.send((next_id, stream)).is_err() {
                        break;
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                }
            }
        }

        let open_count = {
            let open = open.lock();
            for stream in open.values() {
                let _ = stream.shutdown(Shutdown::Read);
            }
            open.len()
        };
        tracing::info!("Shutting down, closing {} open connections", open_count);
        drop(sender);
        for handle in handles {
            let _ = handle.join();
        }

        Ok(())
    }
}

fn serve(stream: TcpStream, node: Arc<ChainNode>, read_ms: u64, write_ms: u64) {
    let result = Connection::new(stream, node).and_then(|mut conn| {
        conn.set_timeouts(read_ms, write_ms)?;
        conn.handle()
    });

    if let Err(e) = result {
        tracing::debug!("Connection closed with error: {}", e);
    }
}
