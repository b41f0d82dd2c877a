//! Single-pass SBOR decoder over untrusted bytes.
//!
//! Nothing inside the buffer is trusted: every declared count or length is
//! validated against the remaining bytes before any allocation or recursion,
//! and container nesting is capped at [`crate::sbor::MAX_DEPTH`]. A buffer
//! must decode to exactly one value occupying the whole input.

use thiserror::Error;

use super::value::{SborValue, ValueKind};
use super::{MAX_DEPTH, PAYLOAD_PREFIX};

/// A decode failure, located at the byte offset where it was detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("at offset {offset}: {reason}")]
pub struct DecodeError {
    pub offset: usize,
    pub reason: DecodeErrorKind,
}

/// Why a payload failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeErrorKind {
    #[error("expected payload prefix {expected:#04x}, found {actual:#04x}")]
    UnexpectedPrefix { expected: u8, actual: u8 },

    #[error("unknown value kind {0:#04x}")]
    UnknownValueKind(u8),

    #[error("buffer underflow: needed {required} byte(s), {remaining} remain")]
    BufferUnderflow { required: usize, remaining: usize },

    #[error("declared size {declared} exceeds the {remaining} remaining byte(s)")]
    SizeExceedsRemaining { declared: usize, remaining: usize },

    #[error("length field is non-canonical or too large")]
    InvalidSize,

    #[error("invalid boolean byte {0:#04x}")]
    InvalidBool(u8),

    #[error("string payload is not valid utf-8")]
    InvalidUtf8,

    #[error("container nesting exceeds the depth limit of {0}")]
    MaxDepthExceeded(usize),

    #[error("{0} trailing byte(s) after the top-level value")]
    TrailingBytes(usize),
}

/// Decodes one complete SBOR payload with the default depth limit.
pub fn decode(bytes: &[u8]) -> Result<SborValue, DecodeError> {
    decode_with_depth_limit(bytes, MAX_DEPTH)
}

/// Decodes one complete SBOR payload, capping container nesting at
/// `max_depth`.
pub fn decode_with_depth_limit(
    bytes: &[u8],
    max_depth: usize,
) -> Result<SborValue, DecodeError> {
    let mut decoder = Decoder {
        bytes,
        offset: 0,
        max_depth,
    };
    decoder.read_prefix()?;
    let value = decoder.decode_value(0)?;
    decoder.expect_end()?;
    Ok(value)
}

struct Decoder<'a> {
    bytes: &'a [u8],
    offset: usize,
    max_depth: usize,
}

impl<'a> Decoder<'a> {
    #[inline]
    fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    #[inline]
    fn err(&self, reason: DecodeErrorKind) -> DecodeError {
        DecodeError {
            offset: self.offset,
            reason,
        }
    }

    #[inline]
    fn err_at(&self, offset: usize, reason: DecodeErrorKind) -> DecodeError {
        DecodeError { offset, reason }
    }

    fn read_byte(&mut self) -> Result<u8, DecodeError> {
        if self.remaining() < 1 {
            return Err(self.err(DecodeErrorKind::BufferUnderflow {
                required: 1,
                remaining: 0,
            }));
        }
        let byte = self.bytes[self.offset];
        self.offset += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        if self.remaining() < len {
            return Err(self.err(DecodeErrorKind::BufferUnderflow {
                required: len,
                remaining: self.remaining(),
            }));
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn read_prefix(&mut self) -> Result<(), DecodeError> {
        let start = self.offset;
        let byte = self.read_byte()?;
        if byte != PAYLOAD_PREFIX {
            return Err(self.err_at(
                start,
                DecodeErrorKind::UnexpectedPrefix {
                    expected: PAYLOAD_PREFIX,
                    actual: byte,
                },
            ));
        }
        Ok(())
    }

    fn read_value_kind(&mut self) -> Result<ValueKind, DecodeError> {
        let start = self.offset;
        let byte = self.read_byte()?;
        ValueKind::from_byte(byte)
            .ok_or_else(|| self.err_at(start, DecodeErrorKind::UnknownValueKind(byte)))
    }

    /// Compact length field: little-endian 7-bit groups with a continuation
    /// bit, at most four bytes, minimal form required.
    fn read_size(&mut self) -> Result<usize, DecodeError> {
        let start = self.offset;
        let mut size: usize = 0;
        for group in 0..4 {
            let byte = self.read_byte()?;
            size |= usize::from(byte & 0x7F) << (7 * group);
            if byte & 0x80 == 0 {
                // An overlong encoding would make two distinct byte strings
                // decode to the same value, breaking canonical round-trips.
                if group > 0 && byte == 0 {
                    return Err(self.err_at(start, DecodeErrorKind::InvalidSize));
                }
                return Ok(size);
            }
        }
        Err(self.err_at(start, DecodeErrorKind::InvalidSize))
    }

    /// Reads a member count and rejects it if even the smallest possible
    /// members could not fit the remaining buffer. Never allocate for a
    /// count that has not passed this check.
    fn read_checked_count(&mut self, min_member_bytes: usize) -> Result<usize, DecodeError> {
        let start = self.offset;
        let count = self.read_size()?;
        let remaining = self.remaining();
        if count.saturating_mul(min_member_bytes) > remaining {
            return Err(self.err_at(
                start,
                DecodeErrorKind::SizeExceedsRemaining {
                    declared: count,
                    remaining,
                },
            ));
        }
        Ok(count)
    }

    fn decode_value(&mut self, depth: usize) -> Result<SborValue, DecodeError> {
        let kind = self.read_value_kind()?;
        self.decode_body(kind, depth)
    }

    fn decode_body(&mut self, kind: ValueKind, depth: usize) -> Result<SborValue, DecodeError> {
        match kind {
            ValueKind::Bool => {
                let start = self.offset;
                match self.read_byte()? {
                    0 => Ok(SborValue::Bool(false)),
                    1 => Ok(SborValue::Bool(true)),
                    other => Err(self.err_at(start, DecodeErrorKind::InvalidBool(other))),
                }
            }
            ValueKind::I8 => Ok(SborValue::I8(self.read_byte()? as i8)),
            ValueKind::I16 => Ok(SborValue::I16(i16::from_le_bytes(self.read_fixed()?))),
            ValueKind::I32 => Ok(SborValue::I32(i32::from_le_bytes(self.read_fixed()?))),
            ValueKind::I64 => Ok(SborValue::I64(i64::from_le_bytes(self.read_fixed()?))),
            ValueKind::I128 => Ok(SborValue::I128(i128::from_le_bytes(self.read_fixed()?))),
            ValueKind::U8 => Ok(SborValue::U8(self.read_byte()?)),
            ValueKind::U16 => Ok(SborValue::U16(u16::from_le_bytes(self.read_fixed()?))),
            ValueKind::U32 => Ok(SborValue::U32(u32::from_le_bytes(self.read_fixed()?))),
            ValueKind::U64 => Ok(SborValue::U64(u64::from_le_bytes(self.read_fixed()?))),
            ValueKind::U128 => Ok(SborValue::U128(u128::from_le_bytes(self.read_fixed()?))),
            ValueKind::String => {
                let len = self.read_checked_count(1)?;
                let start = self.offset;
                let bytes = self.read_slice(len)?;
                let string = std::str::from_utf8(bytes)
                    .map_err(|_| self.err_at(start, DecodeErrorKind::InvalidUtf8))?;
                Ok(SborValue::String(string.to_owned()))
            }
            ValueKind::Tuple => {
                self.check_depth(depth)?;
                let count = self.read_checked_count(1)?;
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    fields.push(self.decode_value(depth + 1)?);
                }
                Ok(SborValue::Tuple { fields })
            }
            ValueKind::Enum => {
                self.check_depth(depth)?;
                let discriminant = self.read_byte()?;
                let count = self.read_checked_count(1)?;
                let mut fields = Vec::with_capacity(count);
                for _ in 0..count {
                    fields.push(self.decode_value(depth + 1)?);
                }
                Ok(SborValue::Enum {
                    discriminant,
                    fields,
                })
            }
            ValueKind::Array => {
                self.check_depth(depth)?;
                let element_kind = self.read_value_kind()?;
                let count = self.read_checked_count(1)?;
                let mut elements = Vec::with_capacity(count);
                for _ in 0..count {
                    elements.push(self.decode_body(element_kind, depth + 1)?);
                }
                Ok(SborValue::Array {
                    element_kind,
                    elements,
                })
            }
            ValueKind::Map => {
                self.check_depth(depth)?;
                let key_kind = self.read_value_kind()?;
                let value_kind = self.read_value_kind()?;
                // Every entry is at least one key byte plus one value byte.
                let count = self.read_checked_count(2)?;
                let mut entries = Vec::with_capacity(count);
                for _ in 0..count {
                    let key = self.decode_body(key_kind, depth + 1)?;
                    let value = self.decode_body(value_kind, depth + 1)?;
                    entries.push((key, value));
                }
                Ok(SborValue::Map {
                    key_kind,
                    value_kind,
                    entries,
                })
            }
        }
    }

    fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let slice = self.read_slice(N)?;
        let mut bytes = [0u8; N];
        bytes.copy_from_slice(slice);
        Ok(bytes)
    }

    #[inline]
    fn check_depth(&self, depth: usize) -> Result<(), DecodeError> {
        if depth >= self.max_depth {
            return Err(self.err(DecodeErrorKind::MaxDepthExceeded(self.max_depth)));
        }
        Ok(())
    }

    fn expect_end(&self) -> Result<(), DecodeError> {
        if self.remaining() != 0 {
            return Err(self.err(DecodeErrorKind::TrailingBytes(self.remaining())));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sbor::encode;

    #[test]
    fn empty_tuple_fixture() {
        // The three-byte fixture a minimal contract returns.
        let value = decode(&[0x5C, 0x21, 0x00]).unwrap();
        assert_eq!(value, SborValue::unit());
    }

    #[test]
    fn rejects_missing_prefix() {
        let err = decode(&[]).unwrap_err();
        assert_eq!(
            err.reason,
            DecodeErrorKind::BufferUnderflow {
                required: 1,
                remaining: 0
            }
        );
        let err = decode(&[0x21, 0x00]).unwrap_err();
        assert_eq!(
            err,
            DecodeError {
                offset: 0,
                reason: DecodeErrorKind::UnexpectedPrefix {
                    expected: 0x5C,
                    actual: 0x21
                },
            }
        );
    }

    #[test]
    fn rejects_unknown_value_kind() {
        let err = decode(&[0x5C, 0x7F]).unwrap_err();
        assert_eq!(err.offset, 1);
        assert_eq!(err.reason, DecodeErrorKind::UnknownValueKind(0x7F));
    }

    #[test]
    fn tuple_field_count_is_untrusted() {
        // Tuple claims 2 fields, only one U8 field present.
        let err = decode(&[0x5C, 0x21, 0x02, 0x07, 0x01]).unwrap_err();
        assert_eq!(
            err.reason,
            DecodeErrorKind::BufferUnderflow {
                required: 1,
                remaining: 0
            }
        );

        // Tuple claims more fields than there are remaining bytes: rejected
        // before any recursion or allocation.
        let err = decode(&[0x5C, 0x21, 0x63, 0x07, 0x01]).unwrap_err();
        assert_eq!(
            err.reason,
            DecodeErrorKind::SizeExceedsRemaining {
                declared: 0x63,
                remaining: 2
            }
        );
    }

    #[test]
    fn string_length_is_untrusted() {
        let err = decode(&[0x5C, 0x0C, 0x10, b'h', b'i']).unwrap_err();
        assert_eq!(
            err.reason,
            DecodeErrorKind::SizeExceedsRemaining {
                declared: 16,
                remaining: 2
            }
        );
    }

    #[test]
    fn rejects_invalid_utf8() {
        let err = decode(&[0x5C, 0x0C, 0x02, 0xFF, 0xFE]).unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.reason, DecodeErrorKind::InvalidUtf8);
    }

    #[test]
    fn rejects_invalid_bool() {
        let err = decode(&[0x5C, 0x01, 0x02]).unwrap_err();
        assert_eq!(err.reason, DecodeErrorKind::InvalidBool(0x02));
    }

    #[test]
    fn rejects_trailing_bytes() {
        let err = decode(&[0x5C, 0x21, 0x00, 0xAA]).unwrap_err();
        assert_eq!(err.offset, 3);
        assert_eq!(err.reason, DecodeErrorKind::TrailingBytes(1));
    }

    #[test]
    fn rejects_overlong_size_encoding() {
        // 0x81 0x00 decodes to 1 but is not the minimal form.
        let err = decode(&[0x5C, 0x0C, 0x81, 0x00, b'a']).unwrap_err();
        assert_eq!(err.reason, DecodeErrorKind::InvalidSize);
    }

    #[test]
    fn rejects_size_continuation_past_four_bytes() {
        let err = decode(&[0x5C, 0x0C, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]).unwrap_err();
        assert_eq!(err.reason, DecodeErrorKind::InvalidSize);
    }

    #[test]
    fn multi_byte_sizes_round_trip() {
        let text = "x".repeat(300);
        let bytes = encode(&SborValue::String(text.clone())).unwrap();
        // 300 = 0b10_0101100 -> 0xAC 0x02
        assert_eq!(&bytes[..4], &[0x5C, 0x0C, 0xAC, 0x02]);
        assert_eq!(decode(&bytes).unwrap(), SborValue::String(text));
    }

    #[test]
    fn map_count_is_untrusted() {
        // Map<U8, U8> claiming 4 entries with 3 bytes remaining: each entry
        // needs at least 2 bytes, so the count alone is enough to reject.
        let err = decode(&[0x5C, 0x23, 0x07, 0x07, 0x04, 0x01, 0x02, 0x03]).unwrap_err();
        assert_eq!(
            err.reason,
            DecodeErrorKind::SizeExceedsRemaining {
                declared: 4,
                remaining: 3
            }
        );
    }

    fn nested_tuples(depth: usize) -> Vec<u8> {
        let mut bytes = vec![0x5C];
        for _ in 0..depth - 1 {
            bytes.extend_from_slice(&[0x21, 0x01]);
        }
        bytes.extend_from_slice(&[0x21, 0x00]);
        bytes
    }

    #[test]
    fn depth_limit_is_enforced() {
        assert!(decode(&nested_tuples(MAX_DEPTH)).is_ok());
        let err = decode(&nested_tuples(MAX_DEPTH + 1)).unwrap_err();
        assert_eq!(err.reason, DecodeErrorKind::MaxDepthExceeded(MAX_DEPTH));
    }

    #[test]
    fn custom_depth_limit() {
        assert!(decode_with_depth_limit(&nested_tuples(3), 3).is_ok());
        let err = decode_with_depth_limit(&nested_tuples(4), 3).unwrap_err();
        assert_eq!(err.reason, DecodeErrorKind::MaxDepthExceeded(3));
    }

    #[test]
    fn array_elements_share_one_kind_tag() {
        // Array of two U16s: kind declared once, bodies back to back.
        let bytes = [0x5C, 0x20, 0x08, 0x02, 0x01, 0x00, 0x02, 0x00];
        let value = decode(&bytes).unwrap();
        assert_eq!(
            value,
            SborValue::Array {
                element_kind: ValueKind::U16,
                elements: vec![SborValue::U16(1), SborValue::U16(2)],
            }
        );
    }
}
