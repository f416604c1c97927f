//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;

use craqkv::protocol::{
    decode_command, decode_response, decode_value, decode_version, encode_command,
    encode_response, encode_value, encode_version, read_command, read_response, write_command,
    write_response, Command, PropagateWrite, Response, Status, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
use craqkv::{CraqError, Role, Value};

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![kind];
    bytes.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

fn key_payload(key: &[u8]) -> Vec<u8> {
    let mut payload = (key.len() as u32).to_be_bytes().to_vec();
    payload.extend_from_slice(key);
    payload
}

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_get() {
    let cmd = Command::Get {
        key: "hello".to_string(),
    };
    let encoded = encode_command(&cmd).unwrap();
    let decoded = decode_command(&encoded).unwrap();

    match decoded {
        Command::Get { key } => assert_eq!(key, "hello"),
        _ => panic!("Expected GET command"),
    }
}

#[test]
fn test_encode_decode_set() {
    let cmd = Command::Set {
        key: "mykey".to_string(),
        value: "myvalue".to_string(),
    };
    let encoded = encode_command(&cmd).unwrap();

    assert_eq!(encoded[0], 0x02);
    assert_eq!(encoded.len(), HEADER_SIZE + 4 + 5 + 7);

    match decode_command(&encoded).unwrap() {
        Command::Set { key, value } => {
            assert_eq!(key, "mykey");
            assert_eq!(value, "myvalue");
        }
        _ => panic!("Expected SET command"),
    }
}

#[test]
fn test_encode_decode_propagate() {
    let write = PropagateWrite::new("a", &Value::new("1", 7, 1_700_000_000_000));
    let encoded = encode_command(&Command::Propagate(write.clone())).unwrap();

    assert_eq!(encoded[0], 0x03);
    match decode_command(&encoded).unwrap() {
        Command::Propagate(decoded) => assert_eq!(decoded, write),
        _ => panic!("Expected PROPAGATE command"),
    }
}

#[test]
fn test_encode_decode_tail_queries() {
    let version = Command::VersionQuery {
        key: "k".to_string(),
    };
    let fetch = Command::FetchCommitted {
        key: "k".to_string(),
    };

    let encoded = encode_command(&version).unwrap();
    assert_eq!(encoded[0], 0x04);
    assert_eq!(decode_command(&encoded).unwrap(), version);

    let encoded = encode_command(&fetch).unwrap();
    assert_eq!(encoded[0], 0x05);
    assert_eq!(decode_command(&encoded).unwrap(), fetch);
}

#[test]
fn test_encode_decode_ping() {
    let encoded = encode_command(&Command::Ping).unwrap();
    assert_eq!(encoded, vec![0x06, 0, 0, 0, 0]);
    assert_eq!(decode_command(&encoded).unwrap(), Command::Ping);
}

#[test]
fn test_set_with_empty_value_decodes() {
    // Emptiness is checked by the node, not the codec
    let encoded = frame(0x02, &key_payload(b"k"));
    match decode_command(&encoded).unwrap() {
        Command::Set { key, value } => {
            assert_eq!(key, "k");
            assert!(value.is_empty());
        }
        _ => panic!("Expected SET command"),
    }
}

#[test]
fn test_unicode_key_and_value() {
    let cmd = Command::Set {
        key: "ключ".to_string(),
        value: "värde ✓".to_string(),
    };
    let encoded = encode_command(&cmd).unwrap();
    assert_eq!(decode_command(&encoded).unwrap(), cmd);
}

// =============================================================================
// Malformed Command Tests
// =============================================================================

#[test]
fn test_decode_incomplete_header() {
    let result = decode_command(&[0x01, 0x00]);
    assert!(matches!(result, Err(CraqError::Protocol(_))));
}

#[test]
fn test_decode_incomplete_payload() {
    let mut encoded = encode_command(&Command::Get {
        key: "hello".to_string(),
    })
    .unwrap();
    encoded.truncate(encoded.len() - 2);

    assert!(matches!(decode_command(&encoded), Err(CraqError::Protocol(_))));
}

#[test]
fn test_decode_unknown_command() {
    let result = decode_command(&frame(0xFF, &[]));
    assert!(matches!(result, Err(CraqError::Protocol(_))));
}

#[test]
fn test_decode_payload_too_large() {
    let mut bytes = vec![0x01];
    bytes.extend_from_slice(&(MAX_PAYLOAD_SIZE + 1).to_be_bytes());

    assert!(matches!(decode_command(&bytes), Err(CraqError::Protocol(_))));
}

#[test]
fn test_decode_key_length_past_payload() {
    let mut payload = 10u32.to_be_bytes().to_vec();
    payload.extend_from_slice(b"abc");

    assert!(matches!(
        decode_command(&frame(0x01, &payload)),
        Err(CraqError::Protocol(_))
    ));
}

#[test]
fn test_decode_missing_key_length() {
    assert!(matches!(
        decode_command(&frame(0x04, &[0x00, 0x01])),
        Err(CraqError::Protocol(_))
    ));
}

#[test]
fn test_decode_trailing_bytes_on_get() {
    let mut payload = key_payload(b"k");
    payload.push(b'x');

    assert!(matches!(
        decode_command(&frame(0x01, &payload)),
        Err(CraqError::Protocol(_))
    ));
}

#[test]
fn test_decode_ping_with_payload() {
    assert!(matches!(
        decode_command(&frame(0x06, b"x")),
        Err(CraqError::Protocol(_))
    ));
}

#[test]
fn test_decode_invalid_utf8() {
    assert!(matches!(
        decode_command(&frame(0x01, &key_payload(&[0xFF, 0xFE]))),
        Err(CraqError::Protocol(_))
    ));

    let mut payload = key_payload(b"k");
    payload.extend_from_slice(&[0xC3, 0x28]);
    assert!(matches!(
        decode_command(&frame(0x02, &payload)),
        Err(CraqError::Protocol(_))
    ));
}

#[test]
fn test_decode_malformed_propagate() {
    assert!(matches!(
        decode_command(&frame(0x03, &[0x01, 0x02])),
        Err(CraqError::Protocol(_))
    ));
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_ok_response() {
    let resp = Response::ok(Some(b"result".to_vec()));
    let encoded = encode_response(&resp);
    let decoded = decode_response(&encoded).unwrap();

    assert_eq!(decoded.status, Status::Ok);
    assert_eq!(decoded.payload, Some(b"result".to_vec()));
}

#[test]
fn test_encode_decode_not_found_response() {
    let encoded = encode_response(&Response::not_found());
    let decoded = decode_response(&encoded).unwrap();

    assert_eq!(decoded.status, Status::NotFound);
    assert_eq!(decoded.payload, None);
}

#[test]
fn test_encode_decode_error_response() {
    let decoded = decode_response(&encode_response(&Response::error("boom"))).unwrap();

    assert_eq!(decoded.status, Status::Error);
    assert_eq!(decoded.message(), "boom");
}

#[test]
fn test_decode_unknown_status() {
    assert!(matches!(
        decode_response(&frame(0x09, &[])),
        Err(CraqError::Protocol(_))
    ));
}

#[test]
fn test_response_from_error() {
    assert_eq!(Response::from_error(&CraqError::KeyNotFound).status, Status::NotFound);

    let bad = Response::from_error(&CraqError::InvalidArgument("key cannot be empty".to_string()));
    assert_eq!(bad.status, Status::BadRequest);
    assert!(bad.message().contains("key cannot be empty"));

    let wrong_role = Response::from_error(&CraqError::WrongRole {
        operation: "set",
        role: Role::Middle,
    });
    assert_eq!(wrong_role.status, Status::BadRequest);

    let failed = Response::from_error(&CraqError::Propagation("tail down".to_string()));
    assert_eq!(failed.status, Status::Error);
}

// =============================================================================
// Typed Payload Tests
// =============================================================================

#[test]
fn test_version_payload() {
    let payload = encode_version(42);
    assert_eq!(payload, 42u64.to_be_bytes().to_vec());
    assert_eq!(decode_version(&payload).unwrap(), 42);

    assert!(matches!(decode_version(&[0, 1, 2]), Err(CraqError::Protocol(_))));
}

#[test]
fn test_value_payload() {
    let value = Value::new("hello", 3, 123);
    let payload = encode_value(&value).unwrap();
    assert_eq!(decode_value(&payload).unwrap(), value);

    assert!(matches!(decode_value(&[0x01]), Err(CraqError::Protocol(_))));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_command_roundtrip() {
    let mut buffer = Vec::new();

    write_command(&mut buffer, &Command::Set {
        key: "a".to_string(),
        value: "1".to_string(),
    })
    .unwrap();
    write_command(&mut buffer, &Command::Ping).unwrap();

    let mut cursor = Cursor::new(buffer);
    assert!(matches!(read_command(&mut cursor).unwrap(), Command::Set { .. }));
    assert_eq!(read_command(&mut cursor).unwrap(), Command::Ping);

    // Nothing left: the stream reports EOF as an I/O error
    assert!(matches!(read_command(&mut cursor), Err(CraqError::Io(_))));
}

#[test]
fn test_stream_response_roundtrip() {
    let mut buffer = Vec::new();
    write_response(&mut buffer, &Response::ok(Some(encode_version(9)))).unwrap();

    let mut cursor = Cursor::new(buffer);
    let response = read_response(&mut cursor).unwrap();

    assert_eq!(response.status, Status::Ok);
    assert_eq!(decode_version(&response.payload.unwrap()).unwrap(), 9);
}

#[test]
fn test_stream_rejects_oversized_header() {
    let mut bytes = vec![0x02];
    bytes.extend_from_slice(&u32::MAX.to_be_bytes());

    let mut cursor = Cursor::new(bytes);
    assert!(matches!(read_command(&mut cursor), Err(CraqError::Protocol(_))));
}
