//! SBOR encoder - the exact byte inverse of the decoder.
//!
//! Encoding only fails on value trees that violate construction invariants
//! (heterogeneous array members, oversize collections, runaway nesting);
//! those are host programming errors, not guest input errors.

use thiserror::Error;

use super::value::{SborValue, ValueKind};
use super::{MAX_DEPTH, MAX_SIZE, PAYLOAD_PREFIX};

/// An encode failure. All variants indicate a malformed host-built tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("array element kind mismatch: declared {declared:?}, found {found:?}")]
    MismatchingElementKind { declared: ValueKind, found: ValueKind },

    #[error("map key kind mismatch: declared {declared:?}, found {found:?}")]
    MismatchingKeyKind { declared: ValueKind, found: ValueKind },

    #[error("map value kind mismatch: declared {declared:?}, found {found:?}")]
    MismatchingValueKind { declared: ValueKind, found: ValueKind },

    #[error("collection length {0} exceeds the maximum encodable size")]
    SizeTooLarge(usize),

    #[error("container nesting exceeds the depth limit of {0}")]
    MaxDepthExceeded(usize),
}

/// Encodes a value tree into one complete SBOR payload.
pub fn encode(value: &SborValue) -> Result<Vec<u8>, EncodeError> {
    let mut buf = Vec::with_capacity(64);
    buf.push(PAYLOAD_PREFIX);
    encode_value(&mut buf, value, 0)?;
    Ok(buf)
}

fn encode_value(buf: &mut Vec<u8>, value: &SborValue, depth: usize) -> Result<(), EncodeError> {
    buf.push(value.value_kind().as_byte());
    encode_body(buf, value, depth)
}

fn encode_body(buf: &mut Vec<u8>, value: &SborValue, depth: usize) -> Result<(), EncodeError> {
    match value {
        SborValue::Bool(v) => buf.push(u8::from(*v)),
        SborValue::I8(v) => buf.push(*v as u8),
        SborValue::I16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::I32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::I64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::I128(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::U8(v) => buf.push(*v),
        SborValue::U16(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::U32(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::U64(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::U128(v) => buf.extend_from_slice(&v.to_le_bytes()),
        SborValue::String(v) => {
            write_size(buf, v.len())?;
            buf.extend_from_slice(v.as_bytes());
        }
        SborValue::Tuple { fields } => {
            check_depth(depth)?;
            write_size(buf, fields.len())?;
            for field in fields {
                encode_value(buf, field, depth + 1)?;
            }
        }
        SborValue::Enum {
            discriminant,
            fields,
        } => {
            check_depth(depth)?;
            buf.push(*discriminant);
            write_size(buf, fields.len())?;
            for field in fields {
                encode_value(buf, field, depth + 1)?;
            }
        }
        SborValue::Array {
            element_kind,
            elements,
        } => {
            check_depth(depth)?;
            buf.push(element_kind.as_byte());
            write_size(buf, elements.len())?;
            for element in elements {
                if element.value_kind() != *element_kind {
                    return Err(EncodeError::MismatchingElementKind {
                        declared: *element_kind,
                        found: element.value_kind(),
                    });
                }
                encode_body(buf, element, depth + 1)?;
            }
        }
        SborValue::Map {
            key_kind,
            value_kind,
            entries,
        } => {
            check_depth(depth)?;
            buf.push(key_kind.as_byte());
            buf.push(value_kind.as_byte());
            write_size(buf, entries.len())?;
            for (key, value) in entries {
                if key.value_kind() != *key_kind {
                    return Err(EncodeError::MismatchingKeyKind {
                        declared: *key_kind,
                        found: key.value_kind(),
                    });
                }
                if value.value_kind() != *value_kind {
                    return Err(EncodeError::MismatchingValueKind {
                        declared: *value_kind,
                        found: value.value_kind(),
                    });
                }
                encode_body(buf, key, depth + 1)?;
                encode_body(buf, value, depth + 1)?;
            }
        }
    }
    Ok(())
}

/// Minimal-form compact size: little-endian 7-bit groups, continuation bit
/// on every group but the last.
fn write_size(buf: &mut Vec<u8>, mut size: usize) -> Result<(), EncodeError> {
    if size > MAX_SIZE {
        return Err(EncodeError::SizeTooLarge(size));
    }
    loop {
        let group = (size & 0x7F) as u8;
        size >>= 7;
        if size == 0 {
            buf.push(group);
            return Ok(());
        }
        buf.push(group | 0x80);
    }
}

#[inline]
fn check_depth(depth: usize) -> Result<(), EncodeError> {
    if depth >= MAX_DEPTH {
        return Err(EncodeError::MaxDepthExceeded(MAX_DEPTH));
    }
    Ok(())
}
