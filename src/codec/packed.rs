//! Packed repeated fields.
//!
//! A packed run is a single length-delimited record holding the concatenated
//! values of a repeated scalar field, without per-element keys. Fixed-width
//! runs are checked up front so a corrupt length is reported as such instead
//! of as a truncated element.

use bytes::{Buf, BufMut, Bytes};

use crate::codec::scalar;
use crate::descriptor::{Kind, Scalar};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::value::Value;

/// Element type of a packed run. Enums are packed as `int32`.
fn element_scalar(kind: Kind) -> Option<Scalar> {
    match kind {
        Kind::Scalar(scalar) if scalar.is_packable() => Some(scalar),
        Kind::Enum(_) => Some(Scalar::Int32),
        _ => None,
    }
}

/// Decode every element of the packed run `data`, appending to `dst`.
pub(crate) fn decode_packed(kind: Kind, mut data: Bytes, dst: &mut Vec<Value>) -> Result<(), DecodeError> {
    let Some(element) = element_scalar(kind) else {
        return Err(DecodeError::invalid_wire_type(crate::wire::WireType::Len.into_val()));
    };

    if let Some(width) = element.fixed_width() {
        let width_bytes = usize::from(width);
        if data.len() % width_bytes != 0 {
            return Err(DecodeErrorKind::InvalidPackedLength {
                expected_multiple: width,
                actual: data.len(),
            }
            .into());
        }
        dst.reserve(data.len() / width_bytes);
    }

    while data.has_remaining() {
        let value = match kind {
            Kind::Enum(_) => scalar::decode_enum(&mut data)?,
            _ => scalar::decode_scalar(element, &mut data)?,
        };
        dst.push(value);
    }
    Ok(())
}

/// Length of the packed run for `values`, without key or length prefix.
pub(crate) fn packed_len(kind: Kind, values: &[Value]) -> usize {
    let Some(element) = element_scalar(kind) else {
        return 0;
    };
    if let Some(width) = element.fixed_width() {
        return values.len() * usize::from(width);
    }
    values
        .iter()
        .map(|value| match (kind, value) {
            (Kind::Enum(_), Value::EnumNumber(number)) => scalar::int32_len(*number),
            _ => scalar::scalar_len(element, value),
        })
        .sum()
}

/// Write the packed run for `values`, without key or length prefix.
pub(crate) fn encode_packed<B: BufMut>(kind: Kind, values: &[Value], buf: &mut B) {
    let Some(element) = element_scalar(kind) else {
        return;
    };
    for value in values {
        match (kind, value) {
            (Kind::Enum(_), Value::EnumNumber(number)) => scalar::encode_int32(*number, buf),
            _ => scalar::encode_scalar(element, value, buf),
        }
    }
}
