//! Binary encoding, the second of the two encoding passes.

use bytes::BufMut;

use crate::codec::{map, packed, scalar, size, wrappers};
use crate::descriptor::{FieldDescriptor, Kind};
use crate::leb128::LebCodec;
use crate::message::MessageValue;
use crate::util::CastFrom;
use crate::value::Value;
use crate::wire::{self, WireType};

#[inline]
fn encode_len<B: BufMut>(len: usize, buf: &mut B) {
    u64::cast_from(len).encode_leb128(buf);
}

/// Write the fields of `message`: regular fields in declaration order, then
/// extensions by number, then unknown fields as they were read.
pub(crate) fn encode_message<B: BufMut>(message: &MessageValue, buf: &mut B) {
    for (field, value) in message.fields() {
        encode_field(field, value, buf);
    }
    message.unknown_fields().encode(buf);
}

/// Write a set field, keys included.
pub(crate) fn encode_field<B: BufMut>(field: &FieldDescriptor, value: &Value, buf: &mut B) {
    let number = field.number();
    match (field.map_entry(), value) {
        (Some(entry), Value::Map(map)) => {
            for (k, v) in map.iter() {
                wire::encode_key(WireType::Len, number, buf);
                encode_len(map::entry_len(entry, k, v), buf);
                map::encode_entry(entry, k, v, buf);
            }
        }
        (None, Value::List(values)) if field.is_repeated() => {
            if values.is_empty() {
                return;
            }
            if field.is_packed() {
                wire::encode_key(WireType::Len, number, buf);
                encode_len(packed::packed_len(field.kind(), values), buf);
                packed::encode_packed(field.kind(), values, buf);
            } else {
                for value in values {
                    wire::encode_key(field.kind().wire_type(), number, buf);
                    encode_value(field.kind(), value, buf);
                }
            }
        }
        (_, value) => {
            wire::encode_key(field.kind().wire_type(), number, buf);
            encode_value(field.kind(), value, buf);
        }
    }
}

/// Write a single value of `kind`, without its key.
pub(crate) fn encode_value<B: BufMut>(kind: Kind, value: &Value, buf: &mut B) {
    match (kind, value) {
        (Kind::Scalar(s), value) => scalar::encode_scalar(s, value, buf),
        (Kind::Enum(_), Value::EnumNumber(number)) => scalar::encode_int32(*number, buf),
        (Kind::Message(_), Value::Message(message)) => {
            encode_len(size::message_len(message), buf);
            encode_message(message, buf);
        }
        (Kind::Wrapper(s), value) => {
            encode_len(wrappers::wrapper_len(s, value), buf);
            wrappers::encode_wrapper(s, value, buf);
        }
        (kind, value) => {
            unreachable!("{} value stored in a {kind:?} field", value.type_name())
        }
    }
}
