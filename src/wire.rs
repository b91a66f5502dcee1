//! Low level pieces of the protobuf binary format: field keys, length
//! prefixes and skipping over values we don't decode.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{DecodeError, DecodeErrorKind};
use crate::leb128::LebCodec;
use crate::util::{likely, unlikely, CastFrom};

/// Minimum value of a protobuf field number.
pub const MINIMUM_TAG_VAL: u32 = 1;
/// Maximum value of a protobuf field number.
pub const MAXIMUM_TAG_VAL: u32 = (1 << 29) - 1;
/// Field numbers reserved for the protobuf implementation itself.
pub const RESERVED_TAG_RANGE: core::ops::RangeInclusive<u32> = 19_000..=19_999;

/// Maximum nesting of (unknown) groups we are willing to skip over.
const MAX_GROUP_DEPTH: u32 = 100;

/// Returns true if `number` may be used as a field number in a schema.
pub fn is_valid_field_number(number: u32) -> bool {
    (MINIMUM_TAG_VAL..=MAXIMUM_TAG_VAL).contains(&number) && !RESERVED_TAG_RANGE.contains(&number)
}

/// A decoded protobuf field key, a field number and a [`WireType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtoKey {
    tag: u32,
    wire_type: WireType,
}

impl ProtoKey {
    #[inline(always)]
    pub const fn wire_type(self) -> WireType {
        self.wire_type
    }

    /// The field number.
    #[inline(always)]
    pub const fn tag(self) -> u32 {
        self.tag
    }

    #[inline(always)]
    pub const fn into_parts(self) -> (WireType, u32) {
        (self.wire_type, self.tag)
    }
}

/// Writes the key `(tag << 3) | wire_type` as a varint.
#[inline(always)]
pub fn encode_key<B: BufMut>(wire_type: WireType, tag: u32, buf: &mut B) {
    ((tag << 3) | u32::cast_from(wire_type.into_val())).encode_leb128(buf);
}

/// Number of bytes [`encode_key`] writes for `tag`.
#[inline(always)]
pub fn encoded_key_len(tag: u32) -> usize {
    // The wire type only occupies the low 3 bits, it never changes the length.
    (tag << 3).encoded_leb128_len()
}

/// Reads a field key.
///
/// A key of zero is never valid. Callers detect the end of a message by
/// running out of input, not by reading a zero key.
#[inline]
pub fn decode_key<B: Buf>(buf: &mut B) -> Result<ProtoKey, DecodeError> {
    // Keys for field numbers below 16 are a single byte.
    let raw = match buf.chunk().first() {
        Some(&byte) if likely(byte < 0x80) => {
            buf.advance(1);
            u64::from(byte)
        }
        _ => u64::decode_leb128_buf(buf)?.0,
    };
    let raw = u32::try_from(raw).map_err(|_| DecodeError::invalid_tag("key exceeds 32 bits"))?;

    // Masked to 3 bits, always fits.
    #[allow(clippy::as_conversions)]
    let wire_type = WireType::try_from_val((raw & 0b111) as u8)?;
    let tag = raw >> 3;
    if unlikely(tag == 0) {
        return Err(DecodeError::invalid_tag("field number zero"));
    }

    Ok(ProtoKey { tag, wire_type })
}

/// Reads the length prefix of a [`WireType::Len`] value.
///
/// Lengths are 32-bit signed on the wire, anything above `i32::MAX` is
/// reported as a negative size.
#[inline(always)]
pub fn decode_len<B: Buf>(buf: &mut B) -> Result<usize, DecodeError> {
    let len = match buf.chunk().first() {
        Some(&byte) if likely(byte < 0x80) => {
            buf.advance(1);
            u64::from(byte)
        }
        _ => u64::decode_leb128_buf(buf)?.0,
    };

    if unlikely(len > u64::from(i32::MAX.unsigned_abs())) {
        return Err(DecodeError::negative_size());
    }
    usize::try_from(len).map_err(|_| DecodeError::negative_size())
}

/// Reads a length prefix and splits that many bytes off the front of `buf`.
#[inline]
pub fn split_len_delimited(buf: &mut Bytes) -> Result<Bytes, DecodeError> {
    let len = decode_len(buf)?;
    if unlikely(buf.remaining() < len) {
        return Err(DecodeError::truncated());
    }
    Ok(buf.split_to(len))
}

/// Skips over a single field value based on its wire type.
///
/// `tag` is the field number of the key that was just read, it is required to
/// match a start-group with its end-group.
pub fn skip_field<B: Buf>(wire_type: WireType, tag: u32, buf: &mut B) -> Result<(), DecodeError> {
    skip_field_inner(wire_type, tag, buf, 0)
}

fn skip_field_inner<B: Buf>(
    wire_type: WireType,
    tag: u32,
    buf: &mut B,
    depth: u32,
) -> Result<(), DecodeError> {
    let width = match wire_type {
        WireType::Varint => return u64::decode_leb128_buf(buf).map(|_| ()),
        WireType::I32 => 4,
        WireType::I64 => 8,
        WireType::Len => decode_len(buf)?,
        WireType::SGroup => return skip_group(tag, buf, depth + 1),
        // Only valid as the terminator of a group being skipped.
        WireType::EGroup => return Err(DecodeError::invalid_end_tag()),
    };

    if unlikely(buf.remaining() < width) {
        return Err(DecodeError::truncated());
    }
    buf.advance(width);
    Ok(())
}

fn skip_group<B: Buf>(tag: u32, buf: &mut B, depth: u32) -> Result<(), DecodeError> {
    if unlikely(depth > MAX_GROUP_DEPTH) {
        return Err(DecodeErrorKind::RecursionLimitExceeded {
            limit: MAX_GROUP_DEPTH,
        }
        .into());
    }

    while buf.has_remaining() {
        let (wire_type, inner_tag) = decode_key(buf)?.into_parts();
        match wire_type {
            WireType::EGroup if inner_tag == tag => return Ok(()),
            WireType::EGroup => return Err(DecodeError::invalid_end_tag()),
            other => skip_field_inner(other, inner_tag, buf, depth)?,
        }
    }
    Err(DecodeError::truncated())
}

/// Reads one field value and returns its exact encoded bytes, without the key.
///
/// For length-delimited values the returned bytes include the length prefix,
/// for groups they include everything up to and including the end-group key.
/// Writing the key followed by these bytes reproduces the original input.
pub fn read_raw_value(wire_type: WireType, tag: u32, buf: &mut Bytes) -> Result<Bytes, DecodeError> {
    let start = buf.clone();
    skip_field(wire_type, tag, buf)?;
    let consumed = start.len() - buf.len();
    Ok(start.slice(..consumed))
}

/// The low three bits of a field key, which say how to find the end of the
/// value that follows.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum WireType {
    /// A varint: every integer type except the fixed ones, `bool` and enums.
    Varint = 0,
    /// Eight little-endian bytes: `fixed64`, `sfixed64` and `double`.
    I64 = 1,
    /// A varint length then that many bytes: strings, bytes, messages, map
    /// entries and packed repeated fields.
    Len = 2,
    /// Opens a proto2 group, closed by an [`WireType::EGroup`] with the same
    /// field number.
    SGroup = 3,
    EGroup = 4,
    /// Four little-endian bytes: `fixed32`, `sfixed32` and `float`.
    I32 = 5,
}

static_assertions::assert_eq_size!(WireType, u8);

impl WireType {
    #[inline(always)]
    fn try_from_val(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            other => Err(DecodeError::invalid_wire_type(other)),
        }
    }

    /// The three-bit value stored in a key.
    #[inline(always)]
    #[allow(clippy::as_conversions)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = DecodeError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Self::try_from_val(raw)
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;

    #[property_test]
    fn proptest_key_roundtrip(tag: u32, wire_type: u8) {
        let tag = MINIMUM_TAG_VAL + tag % MAXIMUM_TAG_VAL;
        let wire_type = WireType::try_from(wire_type % 6).unwrap();
        let mut encoded = Vec::new();
        encode_key(wire_type, tag, &mut encoded);
        prop_assert_eq!(encoded.len(), encoded_key_len(tag));

        let decoded = decode_key(&mut encoded.as_slice()).unwrap();
        prop_assert_eq!(decoded.into_parts(), (wire_type, tag));
    }

    #[test]
    fn test_wire_type_from_raw() {
        for raw in 0..=u8::MAX {
            match WireType::try_from(raw) {
                Ok(wire_type) => assert_eq!(wire_type.into_val(), raw),
                Err(err) => {
                    assert!(raw > 5);
                    assert_eq!(err.kind(), &DecodeErrorKind::InvalidWireType { value: raw });
                }
            }
        }
    }

    #[test]
    fn test_invalid_keys() {
        let err = decode_key(&mut &[0x00][..]).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::InvalidTag { .. }));

        // Field 1, wire type 7.
        let err = decode_key(&mut &[0x0F][..]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::InvalidWireType { value: 7 });

        let err = decode_key(&mut &[0x80][..]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::TruncatedMessage);
    }

    #[test]
    fn test_lengths() {
        for (input, expected) in [
            (&[0x00][..], 0),
            (&[0x7F][..], 127),
            (&[0x80, 0x01][..], 128),
            (&[0xAC, 0x02][..], 300),
        ] {
            let mut input = input;
            assert_eq!(decode_len(&mut input).unwrap(), expected);
            assert!(input.is_empty());
        }

        // -1 as a 10 byte varint.
        let mut negative = &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01][..];
        let err = decode_len(&mut negative).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::NegativeSize);

        let mut short = Bytes::from_static(&[3, 1, 2]);
        let err = split_len_delimited(&mut short).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::TruncatedMessage);
    }

    #[test]
    fn test_skip_field_values() {
        for (wire_type, input) in [
            (WireType::Varint, &[0x80, 0x01, 0xEE][..]),
            (WireType::I32, &[1, 2, 3, 4, 0xEE][..]),
            (WireType::I64, &[1, 2, 3, 4, 5, 6, 7, 8, 0xEE][..]),
            (WireType::Len, &[2, 1, 2, 0xEE][..]),
        ] {
            let mut rest = input;
            skip_field(wire_type, 1, &mut rest).unwrap();
            assert_eq!(rest, [0xEE], "{wire_type:?}");
        }
    }

    #[test]
    fn test_skip_groups() {
        // Group 2 containing varint field 1 and a nested group 3, then EGROUP 2.
        let mut rest = &[0x08, 0x96, 0x01, 0x1B, 0x08, 0x01, 0x1C, 0x14, 0xEE][..];
        skip_field(WireType::SGroup, 2, &mut rest).unwrap();
        assert_eq!(rest, [0xEE]);

        // Closed with the wrong field number.
        let err = skip_field(WireType::SGroup, 2, &mut &[0x08, 0x01, 0x1C][..]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::InvalidEndTag);

        // Never closed.
        let err = skip_field(WireType::SGroup, 2, &mut &[0x08, 0x01][..]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::TruncatedMessage);

        // A stray end-group.
        let err = skip_field(WireType::EGroup, 2, &mut &[][..]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::InvalidEndTag);
    }

    #[test]
    fn test_read_raw_value() {
        let mut buf = Bytes::from_static(&[0x03, b'a', b'b', b'c', 0x08]);
        let raw = read_raw_value(WireType::Len, 1, &mut buf).unwrap();
        assert_eq!(&raw[..], &[0x03, b'a', b'b', b'c']);
        assert_eq!(&buf[..], &[0x08]);

        let mut buf = Bytes::from_static(&[0x08, 0x01, 0x14]);
        let raw = read_raw_value(WireType::SGroup, 2, &mut buf).unwrap();
        assert_eq!(&raw[..], &[0x08, 0x01, 0x14]);
        assert!(buf.is_empty());
    }
}
