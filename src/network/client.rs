//! Blocking TCP client
//!
//! Used by the CLI and by `TcpTransport` for node-to-node calls.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{CraqError, Result};
use crate::protocol::{
    decode_value, decode_version, read_response, write_command, Command, PropagateWrite,
    Response, Status,
};
use crate::store::Value;

/// A connection to one chain node
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    addr: String,
}

impl Client {
    /// Connect to `addr`, applying `timeout` to connect, reads and writes
    ///
    /// A zero timeout means block indefinitely.
    pub fn connect(addr: &str, timeout: Duration) -> Result<Self> {
        let socket_addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| CraqError::Network(format!("{} did not resolve to an address", addr)))?;

        let limit = (!timeout.is_zero()).then_some(timeout);
        let stream = match limit {
            Some(timeout) => TcpStream::connect_timeout(&socket_addr, timeout)?,
            None => TcpStream::connect(socket_addr)?,
        };
        stream.set_nodelay(true)?;
        stream.set_read_timeout(limit)?;
        stream.set_write_timeout(limit)?;

        let read_stream = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
            addr: addr.to_string(),
        })
    }

    /// Send a command and wait for its response
    pub fn request(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }

    /// Read a key; `KeyNotFound` if the node has no committed value
    pub fn get(&mut self, key: &str) -> Result<String> {
        let payload = self.call(&Command::Get { key: key.to_string() })?;
        String::from_utf8(payload).map_err(|_| CraqError::Protocol("value is not valid UTF-8".to_string()))
    }

    /// Write through the head; returns the head's acknowledgment message
    pub fn set(&mut self, key: &str, value: &str) -> Result<String> {
        let payload = self.call(&Command::Set {
            key: key.to_string(),
            value: value.to_string(),
        })?;
        Ok(String::from_utf8_lossy(&payload).into_owned())
    }

    /// Hand a write to the next node in the chain
    pub fn propagate(&mut self, write: &PropagateWrite) -> Result<()> {
        let payload = self.call(&Command::Propagate(write.clone()))?;
        if payload != b"ok" {
            return Err(CraqError::Propagation(format!(
                "{} answered '{}' instead of ok",
                self.addr,
                String::from_utf8_lossy(&payload)
            )));
        }
        Ok(())
    }

    /// Ask the tail for the committed version of `key`
    pub fn query_version(&mut self, key: &str) -> Result<u64> {
        let payload = self.call(&Command::VersionQuery { key: key.to_string() })?;
        decode_version(&payload)
    }

    /// Ask the tail for the committed value of `key`
    pub fn fetch_committed(&mut self, key: &str) -> Result<Value> {
        let payload = self.call(&Command::FetchCommitted { key: key.to_string() })?;
        decode_value(&payload)
    }

    pub fn ping(&mut self) -> Result<()> {
        self.call(&Command::Ping).map(|_| ())
    }

    /// Address this client is connected to
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Issue a command and turn non-OK statuses into errors
    fn call(&mut self, command: &Command) -> Result<Vec<u8>> {
        let response = self.request(command)?;
        match response.status {
            Status::Ok => Ok(response.payload.unwrap_or_default()),
            Status::NotFound => Err(CraqError::KeyNotFound),
            Status::BadRequest => Err(CraqError::InvalidArgument(response.message())),
            Status::Error => Err(CraqError::Network(format!(
                "{} failed: {}",
                self.addr,
                response.message()
            ))),
        }
    }
}
