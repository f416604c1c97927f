//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - GET:       key_len (4 bytes) + key
//! - SET:       key_len (4 bytes) + key + value
//! - PROPAGATE: bincode(PropagateWrite)
//! - VERSION:   key_len (4 bytes) + key
//! - FETCH:     key_len (4 bytes) + key
//! - PING:      empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{CraqError, Result};
use crate::store::Value;
use super::{Command, PropagateWrite, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Result<Vec<u8>> {
    let payload = match command {
        Command::Get { key }
        | Command::VersionQuery { key }
        | Command::FetchCommitted { key } => key_payload(key, None),
        Command::Set { key, value } => key_payload(key, Some(value)),
        Command::Propagate(write) => bincode::serialize(write)
            .map_err(|e| CraqError::Serialization(format!("PROPAGATE payload: {}", e)))?,
        Command::Ping => Vec::new(),
    };

    Ok(frame(command.command_type() as u8, &payload))
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    match cmd_type {
        0x01 => Ok(Command::Get {
            key: decode_key_only(payload, "GET")?,
        }),
        0x02 => {
            let (key, rest) = decode_key(payload, "SET")?;
            let value = utf8(rest.to_vec(), "SET value")?;
            Ok(Command::Set { key, value })
        }
        0x03 => {
            let write: PropagateWrite = bincode::deserialize(payload).map_err(|e| {
                CraqError::Protocol(format!("PROPAGATE command: malformed payload: {}", e))
            })?;
            Ok(Command::Propagate(write))
        }
        0x04 => Ok(Command::VersionQuery {
            key: decode_key_only(payload, "VERSION")?,
        }),
        0x05 => Ok(Command::FetchCommitted {
            key: decode_key_only(payload, "FETCH")?,
        }),
        0x06 => {
            if !payload.is_empty() {
                return Err(CraqError::Protocol(format!(
                    "PING command: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Ok(Command::Ping)
        }
        _ => Err(CraqError::Protocol(format!(
            "Unknown command type: 0x{:02x}",
            cmd_type
        ))),
    }
}

fn key_payload(key: &str, value: Option<&String>) -> Vec<u8> {
    let value_len = value.map(|v| v.len()).unwrap_or(0);
    let mut buf = BytesMut::with_capacity(4 + key.len() + value_len);
    buf.put_u32(key.len() as u32);
    buf.put_slice(key.as_bytes());
    if let Some(value) = value {
        buf.put_slice(value.as_bytes());
    }
    buf.to_vec()
}

/// Split `key_len + key + rest`
fn decode_key<'a>(payload: &'a [u8], name: &str) -> Result<(String, &'a [u8])> {
    if payload.len() < 4 {
        return Err(CraqError::Protocol(format!(
            "{} command: missing key length",
            name
        )));
    }

    let key_len = u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;

    if payload.len() - 4 < key_len {
        return Err(CraqError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            name,
            key_len,
            payload.len() - 4
        )));
    }

    let key = utf8(payload[4..4 + key_len].to_vec(), "key")?;
    Ok((key, &payload[4 + key_len..]))
}

fn decode_key_only(payload: &[u8], name: &str) -> Result<String> {
    let (key, rest) = decode_key(payload, name)?;
    if !rest.is_empty() {
        return Err(CraqError::Protocol(format!(
            "{} command: {} unexpected trailing bytes",
            name,
            rest.len()
        )));
    }
    Ok(key)
}

fn utf8(bytes: Vec<u8>, what: &str) -> Result<String> {
    String::from_utf8(bytes)
        .map_err(|_| CraqError::Protocol(format!("{} is not valid UTF-8", what)))
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        0x03 => Status::BadRequest,
        _ => {
            return Err(CraqError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Typed Payloads
// =============================================================================

/// VERSION response payload: u64 big-endian
pub fn encode_version(version: u64) -> Vec<u8> {
    version.to_be_bytes().to_vec()
}

pub fn decode_version(payload: &[u8]) -> Result<u64> {
    let bytes: [u8; 8] = payload.try_into().map_err(|_| {
        CraqError::Protocol(format!(
            "VERSION response: expected 8 bytes, got {}",
            payload.len()
        ))
    })?;
    Ok(u64::from_be_bytes(bytes))
}

/// FETCH response payload: bincode(Value)
pub fn encode_value(value: &Value) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| CraqError::Serialization(format!("value: {}", e)))
}

pub fn decode_value(payload: &[u8]) -> Result<Value> {
    bincode::deserialize(payload)
        .map_err(|e| CraqError::Protocol(format!("FETCH response: malformed value: {}", e)))
}

// =============================================================================
// Framing
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload.len());
    buf.put_u8(kind);
    buf.put_u32(payload.len() as u32);
    buf.put_slice(payload);
    buf.to_vec()
}

/// Validate a complete frame and split it into (type byte, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(CraqError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = payload_len(&bytes[..HEADER_SIZE], what)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(CraqError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

fn payload_len(header: &[u8], what: &str) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(CraqError::Protocol(format!(
            "{} payload too large: {} bytes (max {})",
            what, len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one complete frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R, what: &str) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = payload_len(&header, what)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let message = read_frame(reader, "command")?;
    decode_command(&message)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    let bytes = encode_command(command)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    let message = read_frame(reader, "response")?;
    decode_response(&message)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let bytes = encode_response(response);
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
