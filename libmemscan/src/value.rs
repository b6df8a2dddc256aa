//! Type Codec: the (logical type, byte length) -> byte pattern mapping the
//! rest of the scanner is built on top of.
//!
//! `LogicalType` is a closed, runtime-chosen tag rather than a compile-time
//! generic — the caller picks the type at the API boundary, so dispatch on
//! the variant happens here and in the predicate scanner, not via monomorphization.

use crate::error::{MemScanError, Result};

/// The five value shapes the scanner understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalType {
    Bool,
    /// Signed, two's-complement. Width comes from the caller-supplied length.
    Int,
    /// Always IEEE-754 binary64; any caller-supplied length is ignored.
    Float,
    /// Fixed-width buffer, native narrow encoding, NUL-padded.
    Text,
    /// Raw fixed-width buffer, no decoding.
    Bytes,
}

/// A value read from, or to be written to, the target's memory.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A comparable key used by every predicate except `Equal`/`NotEqual`,
/// which instead compare raw bytes directly (see the substring search).
#[derive(Debug, Clone, PartialEq)]
pub enum NumericKey {
    Int(i128),
    /// NaN sorts last and is equal to itself for predicate purposes.
    Float(f64),
    Bytes(Vec<u8>),
}

impl PartialOrd for NumericKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (NumericKey::Int(a), NumericKey::Int(b)) => a.partial_cmp(b),
            (NumericKey::Float(a), NumericKey::Float(b)) => Some(float_cmp(*a, *b)),
            (NumericKey::Bytes(a), NumericKey::Bytes(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Total order over f64 where NaN sorts last and compares equal to itself.
fn float_cmp(a: f64, b: f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater,
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(&b).unwrap(),
    }
}

/// Encode `value` into exactly `length` bytes, byte-for-byte comparable
/// against the target's in-memory representation (host byte order;
/// cross-endian scanning is explicitly not supported).
pub fn encode(ty: LogicalType, length: u8, value: &Value) -> Result<Vec<u8>> {
    let len = length as usize;
    match (ty, value) {
        (LogicalType::Bool, Value::Bool(b)) => {
            let mut out = vec![0u8; len.max(1)];
            out[0] = if *b { 1 } else { 0 };
            Ok(out)
        }
        (LogicalType::Int, Value::Int(v)) => {
            if !matches!(len, 1 | 2 | 4 | 8) {
                return Err(MemScanError::InvalidValue {
                    length,
                    reason: "integer length must be 1, 2, 4, or 8".into(),
                });
            }
            let full = v.to_ne_bytes();
            Ok(full[..len].to_vec())
        }
        (LogicalType::Float, Value::Float(v)) => Ok(v.to_ne_bytes().to_vec()),
        (LogicalType::Text, Value::Text(s)) => {
            let bytes = s.as_bytes();
            if bytes.len() > len {
                return Err(MemScanError::InvalidValue {
                    length,
                    reason: format!("string of {} bytes does not fit in {len}", bytes.len()),
                });
            }
            let mut out = vec![0u8; len];
            out[..bytes.len()].copy_from_slice(bytes);
            Ok(out)
        }
        (LogicalType::Bytes, Value::Bytes(b)) => {
            if b.len() != len {
                return Err(MemScanError::InvalidValue {
                    length,
                    reason: format!("buffer of {} bytes does not match length {len}", b.len()),
                });
            }
            Ok(b.clone())
        }
        _ => Err(MemScanError::InvalidType),
    }
}

/// Inverse of `encode`: decode a byte slice of the appropriate width back
/// into a typed value. For `Text`, stops at the first NUL.
pub fn decode(ty: LogicalType, bytes: &[u8]) -> Result<Value> {
    match ty {
        LogicalType::Bool => {
            let b = bytes.first().ok_or(MemScanError::InvalidType)?;
            Ok(Value::Bool(*b != 0))
        }
        LogicalType::Int => {
            if !matches!(bytes.len(), 1 | 2 | 4 | 8) {
                return Err(MemScanError::InvalidType);
            }
            let mut buf = [0u8; 8];
            let sign_extend = bytes.last().is_some_and(|b| b & 0x80 != 0);
            if sign_extend {
                buf = [0xff; 8];
            }
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(Value::Int(i64::from_ne_bytes(buf)))
        }
        LogicalType::Float => {
            let arr: [u8; 8] = bytes.get(..8).ok_or(MemScanError::InvalidType)?.try_into().unwrap();
            Ok(Value::Float(f64::from_ne_bytes(arr)))
        }
        LogicalType::Text => {
            let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
            Ok(Value::Text(String::from_utf8_lossy(&bytes[..end]).into_owned()))
        }
        LogicalType::Bytes => Ok(Value::Bytes(bytes.to_vec())),
    }
}

/// Return a comparable key for predicates other than equality.
pub fn numeric_key(ty: LogicalType, bytes: &[u8]) -> Result<NumericKey> {
    match ty {
        LogicalType::Bool => {
            let b = bytes.first().ok_or(MemScanError::InvalidType)?;
            Ok(NumericKey::Int(if *b != 0 { 1 } else { 0 }))
        }
        LogicalType::Int => {
            if !matches!(bytes.len(), 1 | 2 | 4 | 8) {
                return Err(MemScanError::InvalidType);
            }
            let mut buf = [0u8; 16];
            let sign_extend = bytes.last().is_some_and(|b| b & 0x80 != 0);
            if sign_extend {
                buf = [0xff; 16];
            }
            buf[..bytes.len()].copy_from_slice(bytes);
            Ok(NumericKey::Int(i128::from_ne_bytes(buf)))
        }
        LogicalType::Float => {
            let arr: [u8; 8] = bytes.get(..8).ok_or(MemScanError::InvalidType)?.try_into().unwrap();
            Ok(NumericKey::Float(f64::from_ne_bytes(arr)))
        }
        LogicalType::Text | LogicalType::Bytes => Ok(NumericKey::Bytes(bytes.to_vec())),
    }
}

/// The byte width of a value for a given type, resolving `Float`'s fixed
/// 8-byte width regardless of what the caller asked for.
pub fn resolved_length(ty: LogicalType, requested: u8) -> u8 {
    match ty {
        LogicalType::Float => 8,
        LogicalType::Bool => 1,
        _ => requested,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_roundtrip() {
        let enc = encode(LogicalType::Bool, 1, &Value::Bool(true)).unwrap();
        assert_eq!(enc, vec![1]);
        assert_eq!(decode(LogicalType::Bool, &enc).unwrap(), Value::Bool(true));
    }

    #[test]
    fn int32_roundtrip() {
        let enc = encode(LogicalType::Int, 4, &Value::Int(12345)).unwrap();
        assert_eq!(decode(LogicalType::Int, &enc).unwrap(), Value::Int(12345));
    }

    #[test]
    fn int_negative_roundtrip() {
        let enc = encode(LogicalType::Int, 2, &Value::Int(-42)).unwrap();
        assert_eq!(decode(LogicalType::Int, &enc).unwrap(), Value::Int(-42));
    }

    #[test]
    fn float_ignores_length() {
        let enc = encode(LogicalType::Float, 4, &Value::Float(std::f64::consts::PI)).unwrap();
        assert_eq!(enc.len(), 8);
        assert_eq!(
            decode(LogicalType::Float, &enc).unwrap(),
            Value::Float(std::f64::consts::PI)
        );
    }

    #[test]
    fn text_roundtrip_with_padding() {
        let enc = encode(LogicalType::Text, 20, &Value::Text("HELLO".into())).unwrap();
        assert_eq!(enc.len(), 20);
        assert!(enc[5..].iter().all(|&b| b == 0));
        assert_eq!(decode(LogicalType::Text, &enc).unwrap(), Value::Text("HELLO".into()));
    }

    #[test]
    fn text_too_long_fails() {
        let err = encode(LogicalType::Text, 3, &Value::Text("HELLO".into())).unwrap_err();
        assert!(matches!(err, MemScanError::InvalidValue { .. }));
    }

    #[test]
    fn bytes_roundtrip() {
        let buf = vec![1, 2, 3, 4];
        let enc = encode(LogicalType::Bytes, 4, &Value::Bytes(buf.clone())).unwrap();
        assert_eq!(decode(LogicalType::Bytes, &enc).unwrap(), Value::Bytes(buf));
    }

    #[test]
    fn numeric_key_nan_sorts_last_and_equals_itself() {
        let nan = NumericKey::Float(f64::NAN);
        let one = NumericKey::Float(1.0);
        assert_eq!(nan.partial_cmp(&nan), Some(std::cmp::Ordering::Equal));
        assert_eq!(nan.partial_cmp(&one), Some(std::cmp::Ordering::Greater));
        assert_eq!(one.partial_cmp(&nan), Some(std::cmp::Ordering::Less));
    }

    #[test]
    fn numeric_key_text_is_lexicographic() {
        let a = numeric_key(LogicalType::Text, b"AAA\0").unwrap();
        let b = numeric_key(LogicalType::Text, b"AAB\0").unwrap();
        assert_eq!(a.partial_cmp(&b), Some(std::cmp::Ordering::Less));
    }

    #[test]
    fn resolved_length_floats_always_eight() {
        assert_eq!(resolved_length(LogicalType::Float, 4), 8);
        assert_eq!(resolved_length(LogicalType::Int, 4), 4);
    }
}
