//! SBOR - the self-describing binary value encoding crossing the host/guest
//! boundary.
//!
//! Every payload is `[prefix][value kind][kind-specific body]`:
//!
//! - `prefix`: fixed sentinel byte identifying the encoding dialect
//! - `value kind`: one byte tagging the value's type
//! - `body`: fixed-width little-endian integers, length-prefixed strings, or
//!   recursively encoded composite members
//!
//! The decoder treats every length and tag as hostile: lengths are checked
//! against the remaining buffer before any allocation or recursion, and
//! nesting depth is capped. The encoder produces the exact inverse layout,
//! so `encode(decode(bytes)) == bytes` for every well-formed payload.

mod decode;
mod encode;
mod value;

pub use decode::{decode, decode_with_depth_limit, DecodeError, DecodeErrorKind};
pub use encode::{encode, EncodeError};
pub use value::{SborValue, ValueKind};

/// Fixed first byte of every encoded payload.
pub const PAYLOAD_PREFIX: u8 = 0x5C;

/// Maximum container nesting accepted or produced by the codec. Bounds stack
/// usage against adversarial payloads from guest memory.
pub const MAX_DEPTH: usize = 64;

/// Largest length a compact size field can carry (four 7-bit groups).
pub const MAX_SIZE: usize = 0x0FFF_FFFF;

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_tree() -> SborValue {
        SborValue::Tuple {
            fields: vec![
                SborValue::Bool(true),
                SborValue::U32(1_000_000),
                SborValue::I64(-42),
                SborValue::String("vellum".to_owned()),
                SborValue::byte_array(&[0xDE, 0xAD, 0xBE, 0xEF]),
                SborValue::Enum {
                    discriminant: 1,
                    fields: vec![SborValue::U8(7)],
                },
                SborValue::Array {
                    element_kind: ValueKind::U16,
                    elements: vec![SborValue::U16(1), SborValue::U16(2), SborValue::U16(3)],
                },
                SborValue::Map {
                    key_kind: ValueKind::String,
                    value_kind: ValueKind::U64,
                    entries: vec![
                        (SborValue::String("a".to_owned()), SborValue::U64(1)),
                        (SborValue::String("b".to_owned()), SborValue::U64(2)),
                    ],
                },
            ],
        }
    }

    #[test]
    fn value_round_trip() {
        let value = sample_tree();
        let bytes = encode(&value).unwrap();
        assert_eq!(decode(&bytes).unwrap(), value);
    }

    #[test]
    fn byte_round_trip_is_canonical() {
        let bytes = encode(&sample_tree()).unwrap();
        let reencoded = encode(&decode(&bytes).unwrap()).unwrap();
        assert_eq!(reencoded, bytes);
    }

    #[test]
    fn every_truncation_fails() {
        let bytes = encode(&sample_tree()).unwrap();
        for cut in 0..bytes.len() {
            assert!(
                decode(&bytes[..cut]).is_err(),
                "prefix of {} bytes decoded successfully",
                cut
            );
        }
    }

    #[test]
    fn primitive_round_trips() {
        let values = vec![
            SborValue::Bool(false),
            SborValue::I8(-1),
            SborValue::I16(i16::MIN),
            SborValue::I32(i32::MAX),
            SborValue::I64(i64::MIN),
            SborValue::I128(i128::MAX),
            SborValue::U8(0xFF),
            SborValue::U16(0xFFFF),
            SborValue::U32(u32::MAX),
            SborValue::U64(u64::MAX),
            SborValue::U128(u128::MAX),
            SborValue::String(String::new()),
            SborValue::String("héllo wörld".to_owned()),
        ];
        for value in values {
            let bytes = encode(&value).unwrap();
            assert_eq!(decode(&bytes).unwrap(), value, "value {:?}", value);
        }
    }
}
