//! Protocol Module
//!
//! Defines the wire protocol for client→node and node→node communication.
//!
//! ## Protocol Format (Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET       - any node, returns the value
//! - 0x02: SET       - head only, returns an ack message
//! - 0x03: PROPAGATE - middle/tail, returns `ok`
//! - 0x04: VERSION   - tail only, returns the committed version (u64 BE)
//! - 0x05: FETCH     - tail only, returns the committed value (bincode)
//! - 0x06: PING      - returns `PONG`
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR
//! - 0x03: BAD_REQUEST

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType, PropagateWrite};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_response, decode_value, decode_version, encode_command,
    encode_response, encode_value, encode_version, read_command, read_response, write_command,
    write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
