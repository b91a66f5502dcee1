//! Encoded length computation, the first of the two encoding passes.
//!
//! Every function here mirrors one in [`encode`](super::encode): whatever the
//! sizer reports is exactly what the writer emits.

use crate::codec::{map, packed, scalar, wrappers};
use crate::descriptor::{FieldDescriptor, Kind};
use crate::message::MessageValue;
use crate::value::Value;
use crate::wire;

/// Encoded length of `message`, memoised in the message.
pub(crate) fn message_len(message: &MessageValue) -> usize {
    *message
        .size_cache()
        .get_or_init(|| compute_message_len(message))
}

fn compute_message_len(message: &MessageValue) -> usize {
    let fields: usize = message
        .fields()
        .map(|(field, value)| field_len(field, value))
        .sum();
    fields + message.unknown_fields().encoded_len()
}

/// Encoded length of a set field, keys included.
pub(crate) fn field_len(field: &FieldDescriptor, value: &Value) -> usize {
    let key_len = wire::encoded_key_len(field.number());
    match (field.map_entry(), value) {
        (Some(entry), Value::Map(map)) => map
            .iter()
            .map(|(k, v)| key_len + scalar::len_prefixed(map::entry_len(entry, k, v)))
            .sum(),
        (None, Value::List(values)) if field.is_repeated() => {
            if values.is_empty() {
                0
            } else if field.is_packed() {
                key_len + scalar::len_prefixed(packed::packed_len(field.kind(), values))
            } else {
                values
                    .iter()
                    .map(|value| key_len + value_len(field.kind(), value))
                    .sum()
            }
        }
        (_, value) => key_len + value_len(field.kind(), value),
    }
}

/// Encoded length of a single value of `kind`, without its key.
pub(crate) fn value_len(kind: Kind, value: &Value) -> usize {
    match (kind, value) {
        (Kind::Scalar(s), value) => scalar::scalar_len(s, value),
        (Kind::Enum(_), Value::EnumNumber(number)) => scalar::int32_len(*number),
        (Kind::Message(_), Value::Message(message)) => scalar::len_prefixed(message_len(message)),
        (Kind::Wrapper(s), value) => scalar::len_prefixed(wrappers::wrapper_len(s, value)),
        (kind, value) => {
            unreachable!("{} value stored in a {kind:?} field", value.type_name())
        }
    }
}
