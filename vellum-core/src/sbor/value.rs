//! The SBOR value tree and its one-byte kind tags.

/// One-byte tag identifying a value's type on the wire.
///
/// Width and signedness of integers are part of the tag, so integer bodies
/// carry no sign-extension ambiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ValueKind {
    Bool = 0x01,
    I8 = 0x02,
    I16 = 0x03,
    I32 = 0x04,
    I64 = 0x05,
    I128 = 0x06,
    U8 = 0x07,
    U16 = 0x08,
    U32 = 0x09,
    U64 = 0x0A,
    U128 = 0x0B,
    String = 0x0C,
    Array = 0x20,
    Tuple = 0x21,
    Enum = 0x22,
    Map = 0x23,
}

impl ValueKind {
    /// Maps a wire byte to a kind, `None` for unassigned tags.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(ValueKind::Bool),
            0x02 => Some(ValueKind::I8),
            0x03 => Some(ValueKind::I16),
            0x04 => Some(ValueKind::I32),
            0x05 => Some(ValueKind::I64),
            0x06 => Some(ValueKind::I128),
            0x07 => Some(ValueKind::U8),
            0x08 => Some(ValueKind::U16),
            0x09 => Some(ValueKind::U32),
            0x0A => Some(ValueKind::U64),
            0x0B => Some(ValueKind::U128),
            0x0C => Some(ValueKind::String),
            0x20 => Some(ValueKind::Array),
            0x21 => Some(ValueKind::Tuple),
            0x22 => Some(ValueKind::Enum),
            0x23 => Some(ValueKind::Map),
            _ => None,
        }
    }

    #[inline]
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// A decoded SBOR value.
///
/// Arrays and maps are homogeneous: member kinds are declared once up front
/// and member bodies are encoded without repeating the tag. Tuples and enum
/// variants are heterogeneous and carry fully tagged fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SborValue {
    Bool(bool),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    String(String),
    Tuple {
        fields: Vec<SborValue>,
    },
    Enum {
        discriminant: u8,
        fields: Vec<SborValue>,
    },
    Array {
        element_kind: ValueKind,
        elements: Vec<SborValue>,
    },
    Map {
        key_kind: ValueKind,
        value_kind: ValueKind,
        entries: Vec<(SborValue, SborValue)>,
    },
}

impl SborValue {
    /// The wire tag this value encodes under.
    pub fn value_kind(&self) -> ValueKind {
        match self {
            SborValue::Bool(_) => ValueKind::Bool,
            SborValue::I8(_) => ValueKind::I8,
            SborValue::I16(_) => ValueKind::I16,
            SborValue::I32(_) => ValueKind::I32,
            SborValue::I64(_) => ValueKind::I64,
            SborValue::I128(_) => ValueKind::I128,
            SborValue::U8(_) => ValueKind::U8,
            SborValue::U16(_) => ValueKind::U16,
            SborValue::U32(_) => ValueKind::U32,
            SborValue::U64(_) => ValueKind::U64,
            SborValue::U128(_) => ValueKind::U128,
            SborValue::String(_) => ValueKind::String,
            SborValue::Tuple { .. } => ValueKind::Tuple,
            SborValue::Enum { .. } => ValueKind::Enum,
            SborValue::Array { .. } => ValueKind::Array,
            SborValue::Map { .. } => ValueKind::Map,
        }
    }

    /// The unit value: an empty tuple.
    pub fn unit() -> Self {
        SborValue::Tuple { fields: Vec::new() }
    }

    /// A byte array is an array of U8 on the wire.
    pub fn byte_array(bytes: &[u8]) -> Self {
        SborValue::Array {
            element_kind: ValueKind::U8,
            elements: bytes.iter().map(|&b| SborValue::U8(b)).collect(),
        }
    }

    /// Collects an array-of-U8 back into raw bytes, `None` for any other shape.
    pub fn as_byte_array(&self) -> Option<Vec<u8>> {
        match self {
            SborValue::Array {
                element_kind: ValueKind::U8,
                elements,
            } => elements
                .iter()
                .map(|e| match e {
                    SborValue::U8(b) => Some(*b),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}
