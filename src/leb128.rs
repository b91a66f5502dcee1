//! LEB128 variable-length integer encoding/decoding, aka protobuf "varints".

// This module uses `as` casts which have been thoroughly reviewed for correctness.
#![allow(clippy::as_conversions)]

use crate::error::DecodeError;
use crate::util::likely;

/// Types that can be encoded as, and decoded from, a LEB128 integer.
pub trait LebCodec: Sized + Copy {
    /// Maximum number of bytes an encoded value of this type can occupy.
    const MAX_LEB_BYTES: usize;

    /// Decode a LEB128 integer from the front of `data`.
    ///
    /// Returns the decoded value and the number of bytes consumed.
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeError>;

    /// Decode a LEB128 integer from the front of `buf`, advancing it.
    fn decode_leb128_buf<B: bytes::Buf>(buf: &mut B) -> Result<(Self, usize), DecodeError> {
        let chunk = buf.chunk();

        // Fast path: the current chunk holds the entire integer. This is always
        // the case for contiguous buffers like `&[u8]` and `Bytes`.
        let terminated = chunk
            .iter()
            .take(Self::MAX_LEB_BYTES)
            .any(|b| *b < 0x80);
        if likely(terminated || chunk.len() >= Self::MAX_LEB_BYTES) {
            let (value, bytes_read) = Self::decode_leb128(chunk)?;
            buf.advance(bytes_read);
            return Ok((value, bytes_read));
        }

        // Slow path: the integer straddles chunks, gather it byte by byte.
        let mut scratch = [0u8; 10];
        for i in 0..Self::MAX_LEB_BYTES {
            if !buf.has_remaining() {
                return Err(DecodeError::truncated());
            }
            scratch[i] = buf.get_u8();
            if scratch[i] < 0x80 {
                return Self::decode_leb128(&scratch[..=i]);
            }
        }
        Err(DecodeError::malformed_varint())
    }

    /// Encode `self` as a LEB128 integer into `buf`, returning the number of
    /// bytes written.
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize;

    /// The number of bytes required to encode this integer.
    fn encoded_leb128_len(self) -> usize;
}

impl LebCodec for u64 {
    const MAX_LEB_BYTES: usize = 10;

    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        // Single byte values are by far the most common (small lengths, tags
        // and enum values).
        match data.first() {
            Some(b) if *b < 0x80 => return Ok((u64::from(*b), 1)),
            None => return Err(DecodeError::truncated()),
            Some(_) => (),
        }

        let mut value = 0u64;
        for (i, b) in data.iter().take(Self::MAX_LEB_BYTES).enumerate() {
            // Bits beyond the 64th (only possible in the 10th byte) are
            // discarded, matching the reference implementation.
            value |= u64::from(b & 0x7f) << (7 * i);
            if *b < 0x80 {
                return Ok((value, i + 1));
            }
        }

        if data.len() >= Self::MAX_LEB_BYTES {
            // The 10th byte still had its continuation bit set.
            Err(DecodeError::malformed_varint())
        } else {
            Err(DecodeError::truncated())
        }
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        let mut value = self;
        let mut written = 1;
        while value >= 0x80 {
            buf.put_u8((value as u8) | 0x80);
            value >>= 7;
            written += 1;
        }
        buf.put_u8(value as u8);
        written
    }

    /// LEB128 encodes 7 bits per byte, so the length is the number of
    /// significant bits divided by 7, rounded up, with a minimum of 1.
    #[inline]
    fn encoded_leb128_len(self) -> usize {
        let significant_bits = 64 - (self | 1).leading_zeros();
        ((significant_bits + 6) / 7) as usize
    }
}

impl LebCodec for u32 {
    const MAX_LEB_BYTES: usize = 5;

    #[inline]
    fn decode_leb128(data: &[u8]) -> Result<(Self, usize), DecodeError> {
        if let Some(b) = data.first().filter(|b| **b < 0x80) {
            return Ok((u32::from(*b), 1));
        }

        let window = &data[..data.len().min(Self::MAX_LEB_BYTES)];
        match u64::decode_leb128(window) {
            Ok((value, bytes_read)) => u32::try_from(value)
                .map(|value| (value, bytes_read))
                .map_err(|_| DecodeError::malformed_varint()),
            // Five bytes without a terminator can never be a valid u32.
            Err(_) if window.len() == Self::MAX_LEB_BYTES => Err(DecodeError::malformed_varint()),
            Err(err) => Err(err),
        }
    }

    #[inline]
    fn encode_leb128<B: bytes::BufMut>(self, buf: &mut B) -> usize {
        u64::from(self).encode_leb128(buf)
    }

    #[inline]
    fn encoded_leb128_len(self) -> usize {
        let significant_bits = 32 - (self | 1).leading_zeros();
        ((significant_bits + 6) / 7) as usize
    }
}

/// Zigzag encodes a `sint32`, mapping small magnitudes to small varints.
#[inline]
pub const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Reverses [`zigzag_encode_32`].
#[inline]
pub const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

/// Zigzag encodes a `sint64`.
#[inline]
pub const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Reverses [`zigzag_encode_64`].
#[inline]
pub const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;
    use crate::error::DecodeErrorKind;

    #[test]
    fn smoketest_leb128_u64() {
        #[track_caller]
        fn test_case(val: u64, len: usize) {
            let mut buffer = Vec::with_capacity(16);
            let encode_len = val.encode_leb128(&mut buffer);
            let (rnd, rnd_len) = u64::decode_leb128(&buffer[..]).unwrap();

            assert_eq!(rnd, val, "invalid value");
            assert_eq!(len, rnd_len, "invalid length");
            assert_eq!(len, encode_len, "invalid encode length");
            assert_eq!(len, val.encoded_leb128_len(), "invalid computed length");
        }

        test_case(0, 1);
        test_case(1, 1);
        test_case(42, 1);
        test_case(127, 1);
        test_case(128, 2);
        test_case(300, 2);
        test_case(72057594037927937, 9);
        test_case(u64::MAX, 10);
    }

    #[test]
    fn smoketest_leb128_u32() {
        for (val, len) in [(0u32, 1), (128, 2), (16_383, 2), (16_384, 3), (u32::MAX, 5)] {
            let mut buffer = Vec::new();
            assert_eq!(val.encode_leb128(&mut buffer), len);
            assert_eq!(u32::decode_leb128(&buffer).unwrap(), (val, len));
            assert_eq!(val.encoded_leb128_len(), len);
        }
    }

    #[test]
    fn test_malformed_varint() {
        // Ten bytes that all have the continuation bit set.
        let data = [0xFFu8; 11];
        let err = u64::decode_leb128(&data).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MalformedVarint);

        // A value wider than 32 bits cannot be a u32.
        let mut buffer = Vec::new();
        (u64::from(u32::MAX) + 1).encode_leb128(&mut buffer);
        let err = u32::decode_leb128(&buffer).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::MalformedVarint);
    }

    #[test]
    fn test_truncated_varint() {
        let err = u64::decode_leb128(&[0x80, 0x80]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::TruncatedMessage);

        let err = u64::decode_leb128(&[]).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::TruncatedMessage);
    }

    #[test]
    fn test_decode_buf_across_chunks() {
        use bytes::Buf;

        let mut first = Vec::new();
        let mut second = Vec::new();
        let mut encoded = Vec::new();
        300_000u64.encode_leb128(&mut encoded);
        first.extend_from_slice(&encoded[..1]);
        second.extend_from_slice(&encoded[1..]);
        second.push(0x2A);

        let mut buf = (&first[..]).chain(&second[..]);
        let (value, len) = u64::decode_leb128_buf(&mut buf).unwrap();
        assert_eq!(value, 300_000);
        assert_eq!(len, encoded.len());
        assert_eq!(buf.get_u8(), 0x2A);
    }

    #[test]
    fn test_zigzag() {
        assert_eq!(zigzag_encode_32(0), 0);
        assert_eq!(zigzag_encode_32(-1), 1);
        assert_eq!(zigzag_encode_32(1), 2);
        assert_eq!(zigzag_encode_32(i32::MIN), u32::MAX);
        assert_eq!(zigzag_encode_64(-2), 3);
        assert_eq!(zigzag_encode_64(i64::MAX), u64::MAX - 1);
    }

    #[property_test]
    fn proptest_leb128_u64(val: u64) {
        let mut buffer = Vec::with_capacity(16);
        let og_len = val.encode_leb128(&mut buffer);

        let (rnd, len) = u64::decode_leb128(&buffer[..]).unwrap();
        prop_assert_eq!(rnd, val, "invalid value");
        prop_assert_eq!(len, og_len, "invalid length");
        prop_assert_eq!(val.encoded_leb128_len(), len);

        // Cross-check against an independent implementation.
        let mut reference = Vec::new();
        leb128::write::unsigned(&mut reference, val).unwrap();
        prop_assert_eq!(reference, buffer);
    }

    #[property_test]
    fn proptest_zigzag_roundtrips(a: i32, b: i64) {
        prop_assert_eq!(zigzag_decode_32(zigzag_encode_32(a)), a);
        prop_assert_eq!(zigzag_decode_64(zigzag_encode_64(b)), b);
    }
}
