//! Untyped binary (protobuf) payload extraction
//!
//! The proxy does not know the message schema of the backends it fronts,
//! so fields are selected by wire position alone: the index is a dotted
//! list of field numbers, each but the last expected to be a
//! length-delimited nested message.

use crate::error::{ProxyError, Result};
use bytes::Bytes;
use serde_json::Value;

/// One decoded wire-format field.
enum FieldValue<'a> {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
    LengthDelimited(&'a [u8]),
}

/// Extract a field from a buffered binary body by dotted field numbers.
///
/// A leading gRPC message frame (compression flag + 4-byte big-endian
/// length) is skipped when present; compressed frames are rejected.
pub fn extract(body: &Bytes, index: &str) -> Result<Value> {
    let field_numbers = parse_index(index)?;
    let mut data = strip_frame(body)?;

    let last = field_numbers.len() - 1;
    for (depth, field_no) in field_numbers.iter().enumerate() {
        let found = find_field(data, *field_no)?.ok_or_else(|| {
            ProxyError::Extraction(format!("failed to find payload field: {index}"))
        })?;

        if depth == last {
            return decode_leaf(found, index);
        }
        match found {
            FieldValue::LengthDelimited(nested) => data = nested,
            _ => {
                return Err(ProxyError::Extraction(format!(
                    "payload field {field_no} is not a nested message"
                )))
            }
        }
    }
    unreachable!("parse_index guarantees at least one field number")
}

fn decode_leaf(value: FieldValue<'_>, index: &str) -> Result<Value> {
    match value {
        FieldValue::Varint(v) => Ok(Value::from(v)),
        FieldValue::Fixed32(v) => Ok(Value::from(v)),
        FieldValue::Fixed64(v) => Ok(Value::from(v)),
        FieldValue::LengthDelimited(raw) => std::str::from_utf8(raw)
            .map(|s| Value::String(s.to_string()))
            .map_err(|_| {
                ProxyError::Extraction(format!("payload field {index} is not valid utf-8"))
            }),
    }
}

fn parse_index(index: &str) -> Result<Vec<u32>> {
    if index.is_empty() {
        return Err(ProxyError::Config("payload index field empty".to_string()));
    }
    index
        .split('.')
        .map(|part| {
            part.parse::<u32>().map_err(|_| {
                ProxyError::Config(format!("invalid payload field index {part:?}"))
            })
        })
        .collect()
}

/// Skip the gRPC message frame when the body carries one.
fn strip_frame(body: &[u8]) -> Result<&[u8]> {
    if body.len() >= 5 && body[0] <= 1 {
        let declared = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
        if declared == body.len() - 5 {
            if body[0] == 1 {
                return Err(ProxyError::Extraction(
                    "compressed grpc frames are not supported".to_string(),
                ));
            }
            return Ok(&body[5..]);
        }
    }
    Ok(body)
}

/// First occurrence of `field_no` at the current message level.
fn find_field(data: &[u8], field_no: u32) -> Result<Option<FieldValue<'_>>> {
    let mut pos = 0;
    while pos < data.len() {
        let (key, next) = read_varint(data, pos)?;
        pos = next;
        let number = (key >> 3) as u32;
        let wire = (key & 0x7) as u8;

        let value = match wire {
            0 => {
                let (v, next) = read_varint(data, pos)?;
                pos = next;
                FieldValue::Varint(v)
            }
            1 => {
                let raw = take(data, pos, 8)?;
                pos += 8;
                FieldValue::Fixed64(u64::from_le_bytes(
                    raw.try_into().unwrap_or([0; 8]),
                ))
            }
            2 => {
                let (len, next) = read_varint(data, pos)?;
                pos = next;
                let raw = take(data, pos, len as usize)?;
                pos += len as usize;
                FieldValue::LengthDelimited(raw)
            }
            5 => {
                let raw = take(data, pos, 4)?;
                pos += 4;
                FieldValue::Fixed32(u32::from_le_bytes(
                    raw.try_into().unwrap_or([0; 4]),
                ))
            }
            other => {
                return Err(ProxyError::Extraction(format!(
                    "unsupported wire type {other} in payload"
                )))
            }
        };

        if number == field_no {
            return Ok(Some(value));
        }
    }
    Ok(None)
}

fn take(data: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    data.get(pos..pos + len)
        .ok_or_else(|| ProxyError::Extraction("truncated payload".to_string()))
}

fn read_varint(data: &[u8], mut pos: usize) -> Result<(u64, usize)> {
    let mut value: u64 = 0;
    let mut shift = 0;
    loop {
        let byte = *data
            .get(pos)
            .ok_or_else(|| ProxyError::Extraction("truncated varint in payload".to_string()))?;
        pos += 1;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, pos));
        }
        shift += 7;
        if shift >= 64 {
            return Err(ProxyError::Extraction("varint overflow in payload".to_string()));
        }
    }
}
