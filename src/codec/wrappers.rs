//! `google.protobuf.*Value` wrapper fields.
//!
//! On the wire a wrapper is a message with the scalar in field 1. Fields of
//! [`Kind::Wrapper`](crate::Kind::Wrapper) hold the bare scalar, so they are
//! encoded here without building an intermediate message.

use bytes::{Buf, BufMut, Bytes};

use crate::codec::scalar;
use crate::descriptor::Scalar;
use crate::error::DecodeError;
use crate::value::Value;
use crate::wire;

const VALUE_TAG: u32 = 1;

/// Decode the body of a wrapper message. A missing value reads as the
/// default, any other field is ignored.
pub(crate) fn decode_wrapper(scalar: Scalar, mut data: Bytes) -> Result<Value, DecodeError> {
    let mut value = None;
    while data.has_remaining() {
        let (wire_type, tag) = wire::decode_key(&mut data)?.into_parts();
        if tag == VALUE_TAG && wire_type == scalar.wire_type() {
            value = Some(scalar::decode_scalar(scalar, &mut data)?);
        } else {
            wire::skip_field(wire_type, tag, &mut data)?;
        }
    }
    Ok(value.unwrap_or_else(|| scalar.default_value()))
}

/// Length of the wrapper message body. The default value is not written at
/// all, giving an empty body.
pub(crate) fn wrapper_len(scalar: Scalar, value: &Value) -> usize {
    if value.is_zero() {
        return 0;
    }
    wire::encoded_key_len(VALUE_TAG) + scalar::scalar_len(scalar, value)
}

/// Write the wrapper message body, without the length prefix.
pub(crate) fn encode_wrapper<B: BufMut>(scalar: Scalar, value: &Value, buf: &mut B) {
    if value.is_zero() {
        return;
    }
    wire::encode_key(scalar.wire_type(), VALUE_TAG, buf);
    scalar::encode_scalar(scalar, value, buf);
}
