//! Scalar protobuf types and their encoding/decoding.

// Protobuf defines its integer conversions as two's complement truncation and
// sign extension, which is exactly what `as` does between integer types.
#![allow(clippy::as_conversions)]

use bytes::{Buf, BufMut, Bytes};

use crate::descriptor::Scalar;
use crate::error::{DecodeError, DecodeErrorKind};
use crate::leb128::{self, LebCodec};
use crate::util::{unlikely, CastFrom};
use crate::value::Value;
use crate::wire;

#[inline]
fn read_varint(buf: &mut Bytes) -> Result<u64, DecodeError> {
    u64::decode_leb128_buf(buf).map(|(value, _)| value)
}

#[inline]
fn ensure(buf: &Bytes, len: usize) -> Result<(), DecodeError> {
    if unlikely(buf.remaining() < len) {
        return Err(DecodeError::truncated());
    }
    Ok(())
}

/// Decode a single (non-packed) value of `scalar` from the front of `buf`.
pub(crate) fn decode_scalar(scalar: Scalar, buf: &mut Bytes) -> Result<Value, DecodeError> {
    let value = match scalar {
        // int32 is sign extended to 64 bits on the wire, keep the low half.
        Scalar::Int32 => Value::I32(read_varint(buf)? as i32),
        Scalar::Int64 => Value::I64(read_varint(buf)? as i64),
        Scalar::Uint32 => Value::U32(read_varint(buf)? as u32),
        Scalar::Uint64 => Value::U64(read_varint(buf)?),
        Scalar::Sint32 => Value::I32(leb128::zigzag_decode_32(read_varint(buf)? as u32)),
        Scalar::Sint64 => Value::I64(leb128::zigzag_decode_64(read_varint(buf)?)),
        Scalar::Bool => Value::Bool(read_varint(buf)? != 0),
        Scalar::Fixed32 => {
            ensure(buf, 4)?;
            Value::U32(buf.get_u32_le())
        }
        Scalar::Sfixed32 => {
            ensure(buf, 4)?;
            Value::I32(buf.get_i32_le())
        }
        Scalar::Float => {
            ensure(buf, 4)?;
            Value::F32(buf.get_f32_le())
        }
        Scalar::Fixed64 => {
            ensure(buf, 8)?;
            Value::U64(buf.get_u64_le())
        }
        Scalar::Sfixed64 => {
            ensure(buf, 8)?;
            Value::I64(buf.get_i64_le())
        }
        Scalar::Double => {
            ensure(buf, 8)?;
            Value::F64(buf.get_f64_le())
        }
        Scalar::String => {
            let data = wire::split_len_delimited(buf)?;
            let text = std::str::from_utf8(&data)
                .map_err(|err| DecodeError::new(DecodeErrorKind::InvalidUtf8).with_source(err))?;
            Value::String(text.to_owned())
        }
        Scalar::Bytes => Value::Bytes(wire::split_len_delimited(buf)?),
    };
    Ok(value)
}

/// Decode an enum number. Numbers unknown to the enum are kept.
pub(crate) fn decode_enum(buf: &mut Bytes) -> Result<Value, DecodeError> {
    Ok(Value::EnumNumber(read_varint(buf)? as i32))
}

#[inline]
pub(crate) fn int32_len(value: i32) -> usize {
    (i64::from(value) as u64).encoded_leb128_len()
}

#[inline]
pub(crate) fn encode_int32<B: BufMut>(value: i32, buf: &mut B) {
    // Negative values are sign-extended to 64 bits.
    (i64::from(value) as u64).encode_leb128(buf);
}

/// Length of a length prefix plus the `len` bytes it prefixes.
#[inline]
pub(crate) fn len_prefixed(len: usize) -> usize {
    u64::cast_from(len).encoded_leb128_len() + len
}

/// Encoded length of `value` as a `scalar`, without the field key. Includes
/// the length prefix of strings and bytes.
pub(crate) fn scalar_len(scalar: Scalar, value: &Value) -> usize {
    match (scalar, value) {
        (Scalar::Int32, Value::I32(v)) => int32_len(*v),
        (Scalar::Int64, Value::I64(v)) => (*v as u64).encoded_leb128_len(),
        (Scalar::Uint32, Value::U32(v)) => v.encoded_leb128_len(),
        (Scalar::Uint64, Value::U64(v)) => v.encoded_leb128_len(),
        (Scalar::Sint32, Value::I32(v)) => leb128::zigzag_encode_32(*v).encoded_leb128_len(),
        (Scalar::Sint64, Value::I64(v)) => leb128::zigzag_encode_64(*v).encoded_leb128_len(),
        (Scalar::Bool, Value::Bool(_)) => 1,
        (Scalar::Fixed32, _) | (Scalar::Sfixed32, _) | (Scalar::Float, _) => 4,
        (Scalar::Fixed64, _) | (Scalar::Sfixed64, _) | (Scalar::Double, _) => 8,
        (Scalar::String, Value::String(v)) => len_prefixed(v.len()),
        (Scalar::Bytes, Value::Bytes(v)) => len_prefixed(v.len()),
        _ => unreachable!("{} value stored in a {scalar:?} field", value.type_name()),
    }
}

/// Encode `value` as a `scalar`, without the field key.
pub(crate) fn encode_scalar<B: BufMut>(scalar: Scalar, value: &Value, buf: &mut B) {
    match (scalar, value) {
        (Scalar::Int32, Value::I32(v)) => encode_int32(*v, buf),
        (Scalar::Int64, Value::I64(v)) => {
            (*v as u64).encode_leb128(buf);
        }
        (Scalar::Uint32, Value::U32(v)) => {
            v.encode_leb128(buf);
        }
        (Scalar::Uint64, Value::U64(v)) => {
            v.encode_leb128(buf);
        }
        (Scalar::Sint32, Value::I32(v)) => {
            leb128::zigzag_encode_32(*v).encode_leb128(buf);
        }
        (Scalar::Sint64, Value::I64(v)) => {
            leb128::zigzag_encode_64(*v).encode_leb128(buf);
        }
        (Scalar::Bool, Value::Bool(v)) => buf.put_u8(u8::from(*v)),
        (Scalar::Fixed32, Value::U32(v)) => buf.put_u32_le(*v),
        (Scalar::Sfixed32, Value::I32(v)) => buf.put_i32_le(*v),
        (Scalar::Float, Value::F32(v)) => buf.put_f32_le(*v),
        (Scalar::Fixed64, Value::U64(v)) => buf.put_u64_le(*v),
        (Scalar::Sfixed64, Value::I64(v)) => buf.put_i64_le(*v),
        (Scalar::Double, Value::F64(v)) => buf.put_f64_le(*v),
        (Scalar::String, Value::String(v)) => {
            u64::cast_from(v.len()).encode_leb128(buf);
            buf.put_slice(v.as_bytes());
        }
        (Scalar::Bytes, Value::Bytes(v)) => {
            u64::cast_from(v.len()).encode_leb128(buf);
            buf.put_slice(v);
        }
        _ => unreachable!("{} value stored in a {scalar:?} field", value.type_name()),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;

    fn roundtrip(scalar: Scalar, value: Value) -> Value {
        let mut buf = Vec::new();
        encode_scalar(scalar, &value, &mut buf);
        assert_eq!(buf.len(), scalar_len(scalar, &value), "{scalar:?} {value:?}");

        let mut bytes = Bytes::from(buf);
        let decoded = decode_scalar(scalar, &mut bytes).unwrap();
        assert!(bytes.is_empty());
        decoded
    }

    #[test]
    fn test_negative_int32_is_ten_bytes() {
        let mut buf = Vec::new();
        encode_int32(-1, &mut buf);
        assert_eq!(buf.len(), 10);
        assert_eq!(int32_len(-1), 10);
        assert_eq!(roundtrip(Scalar::Int32, Value::I32(-1)), Value::I32(-1));
    }

    #[test]
    fn test_sint_uses_zigzag() {
        let mut buf = Vec::new();
        encode_scalar(Scalar::Sint32, &Value::I32(-1), &mut buf);
        assert_eq!(buf, [1]);
        encode_scalar(Scalar::Sint64, &Value::I64(-2), &mut buf);
        assert_eq!(buf, [1, 3]);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut bytes = Bytes::from_static(&[2, 0xC3, 0x28]);
        let err = decode_scalar(Scalar::String, &mut bytes).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::InvalidUtf8);
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_truncated_fixed() {
        let mut bytes = Bytes::from_static(&[1, 2, 3]);
        let err = decode_scalar(Scalar::Fixed32, &mut bytes).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::TruncatedMessage);
    }

    #[test]
    fn test_wide_varint_truncates_for_int32() {
        // 2^32 + 5 read as an int32 keeps the low 32 bits.
        let mut buf = Vec::new();
        ((1u64 << 32) + 5).encode_leb128(&mut buf);
        let value = decode_scalar(Scalar::Int32, &mut Bytes::from(buf)).unwrap();
        assert_eq!(value, Value::I32(5));
    }

    #[test]
    #[should_panic(expected = "string value stored in a Int32 field")]
    fn test_mismatched_value_panics_on_len() {
        scalar_len(Scalar::Int32, &Value::String("x".into()));
    }

    #[test]
    #[should_panic(expected = "bool value stored in a Bytes field")]
    fn test_mismatched_value_panics_on_encode() {
        let mut buf = Vec::new();
        encode_scalar(Scalar::Bytes, &Value::Bool(true), &mut buf);
    }

    #[property_test]
    fn proptest_scalars_roundtrip(a: i32, b: i64, c: u32, d: u64, s: String) {
        prop_assert_eq!(roundtrip(Scalar::Int32, Value::I32(a)), Value::I32(a));
        prop_assert_eq!(roundtrip(Scalar::Sint32, Value::I32(a)), Value::I32(a));
        prop_assert_eq!(roundtrip(Scalar::Sfixed32, Value::I32(a)), Value::I32(a));
        prop_assert_eq!(roundtrip(Scalar::Int64, Value::I64(b)), Value::I64(b));
        prop_assert_eq!(roundtrip(Scalar::Sint64, Value::I64(b)), Value::I64(b));
        prop_assert_eq!(roundtrip(Scalar::Uint32, Value::U32(c)), Value::U32(c));
        prop_assert_eq!(roundtrip(Scalar::Fixed64, Value::U64(d)), Value::U64(d));
        prop_assert_eq!(roundtrip(Scalar::String, Value::String(s.clone())), Value::String(s));
    }
}
