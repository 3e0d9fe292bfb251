//! Typed field values and their order-preserving byte encodings
//!
//! Dictionaries compare raw bytes, so every value is encoded such that
//! unsigned lexicographic byte order equals value order:
//! - integers: big-endian, signed types with the sign bit flipped
//! - floats: IEEE bits with the sign bit flipped for positives and all bits
//!   flipped for negatives, then big-endian
//! - bool: one byte, `0` or `1`
//! - strings and bytes: as is

use std::fmt;

/// A value stored in an indexed field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bytes(Vec<u8>),
    String(String),
    I32(i32),
    I64(i64),
    U64(u64),
    F64(f64),
    Bool(bool),
}

impl FieldValue {
    /// Order-preserving encoding
    pub fn encode(&self) -> Vec<u8> {
        match self {
            FieldValue::Bytes(bytes) => bytes.clone(),
            FieldValue::String(s) => s.as_bytes().to_vec(),
            FieldValue::I32(v) => ((*v as u32) ^ (1 << 31)).to_be_bytes().to_vec(),
            FieldValue::I64(v) => ((*v as u64) ^ (1 << 63)).to_be_bytes().to_vec(),
            FieldValue::U64(v) => v.to_be_bytes().to_vec(),
            FieldValue::F64(v) => ordered_float_bits(*v).to_be_bytes().to_vec(),
            FieldValue::Bool(v) => vec![u8::from(*v)],
        }
    }

    /// Encoded width for fixed-width types
    pub fn fixed_width(&self) -> Option<usize> {
        match self {
            FieldValue::Bytes(_) | FieldValue::String(_) => None,
            FieldValue::I32(_) => Some(4),
            FieldValue::I64(_) | FieldValue::U64(_) | FieldValue::F64(_) => Some(8),
            FieldValue::Bool(_) => Some(1),
        }
    }

    /// Decodes an `I32` encoding
    pub fn decode_i32(bytes: &[u8]) -> Option<i32> {
        let raw: [u8; 4] = bytes.try_into().ok()?;
        Some((u32::from_be_bytes(raw) ^ (1 << 31)) as i32)
    }

    /// Decodes an `I64` encoding
    pub fn decode_i64(bytes: &[u8]) -> Option<i64> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        Some((u64::from_be_bytes(raw) ^ (1 << 63)) as i64)
    }

    /// Decodes a `U64` encoding
    pub fn decode_u64(bytes: &[u8]) -> Option<u64> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        Some(u64::from_be_bytes(raw))
    }

    /// Decodes an `F64` encoding
    pub fn decode_f64(bytes: &[u8]) -> Option<f64> {
        let raw: [u8; 8] = bytes.try_into().ok()?;
        let ordered = u64::from_be_bytes(raw);
        let bits = if ordered >> 63 == 1 {
            ordered ^ (1 << 63)
        } else {
            !ordered
        };
        Some(f64::from_bits(bits))
    }

    /// Converts a JSON scalar; arrays, objects and null are not indexable
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Bool(b) => Some(FieldValue::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(FieldValue::I64(i))
                } else if let Some(u) = n.as_u64() {
                    Some(FieldValue::U64(u))
                } else {
                    n.as_f64().map(FieldValue::F64)
                }
            }
            serde_json::Value::String(s) => Some(FieldValue::String(s.clone())),
            _ => None,
        }
    }
}

fn ordered_float_bits(v: f64) -> u64 {
    let bits = v.to_bits();
    if bits >> 63 == 1 {
        !bits
    } else {
        bits ^ (1 << 63)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bytes(bytes) => write!(f, "{:?}", bytes),
            FieldValue::String(s) => write!(f, "{:?}", s),
            FieldValue::I32(v) => write!(f, "{}", v),
            FieldValue::I64(v) => write!(f, "{}", v),
            FieldValue::U64(v) => write!(f, "{}", v),
            FieldValue::F64(v) => write!(f, "{}", v),
            FieldValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::String(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::String(v)
    }
}

impl From<&[u8]> for FieldValue {
    fn from(v: &[u8]) -> Self {
        FieldValue::Bytes(v.to_vec())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(v: Vec<u8>) -> Self {
        FieldValue::Bytes(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::I32(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::I64(v)
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::U64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::F64(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}
