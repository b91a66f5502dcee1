//! JSON encoding.

use std::borrow::Cow;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value as Json};

use crate::descriptor::{FieldDescriptor, Kind, MessageDescriptor};
use crate::json::{number, JsonConfig};
use crate::message::MessageValue;
use crate::value::Value;
use crate::wkt;

/// `message` as a JSON tree, through its adapter when one is registered.
pub(crate) fn encode_message(message: &MessageValue, config: &JsonConfig) -> Json {
    if let Some(adapter) = config.adapter_for(message.descriptor().full_name()) {
        return adapter.encode(message, config);
    }
    encode_object(message, config)
}

/// `message` with the generic object mapping.
pub(crate) fn encode_object(message: &MessageValue, config: &JsonConfig) -> Json {
    let descriptor = message.descriptor();
    let mut object = Map::new();
    for field in descriptor.fields() {
        let value = match message.get_field(field) {
            Some(value) => Cow::Borrowed(value),
            None if config.emit_default_values && !field.has_presence() => {
                message.get_field_or_default(field)
            }
            None => continue,
        };
        let key = if config.preserve_proto_field_names {
            field.name()
        } else {
            field.json_name()
        };
        object.insert(key.to_owned(), encode_field(descriptor, field, &value, config));
    }
    for field in descriptor.extensions() {
        if let Some(value) = message.get_field(field) {
            let key = format!("[{}]", field.full_name());
            object.insert(key, encode_field(descriptor, field, value, config));
        }
    }
    Json::Object(object)
}

fn encode_field(
    parent: &MessageDescriptor,
    field: &FieldDescriptor,
    value: &Value,
    config: &JsonConfig,
) -> Json {
    match (field.map_entry(), value) {
        (Some(entry), Value::Map(map)) => {
            let object = map
                .iter()
                .map(|(key, value)| {
                    let value = match value {
                        Some(value) => encode_value(parent, entry.value, value, config),
                        None => encode_value(parent, entry.value, &default_for(parent, entry.value), config),
                    };
                    (key.to_string(), value)
                })
                .collect();
            Json::Object(object)
        }
        (None, Value::List(values)) if field.is_repeated() => Json::Array(
            values
                .iter()
                .map(|value| encode_value(parent, field.kind(), value, config))
                .collect(),
        ),
        (_, value) => encode_value(parent, field.kind(), value, config),
    }
}

/// Value read for a map entry that arrived without one.
fn default_for(parent: &MessageDescriptor, kind: Kind) -> Value {
    match kind {
        Kind::Scalar(scalar) | Kind::Wrapper(scalar) => scalar.default_value(),
        Kind::Enum(id) => Value::EnumNumber(parent.related_enum(id).default_number()),
        Kind::Message(id) => Value::Message(MessageValue::new(parent.related_message(id))),
    }
}

pub(crate) fn encode_value(parent: &MessageDescriptor, kind: Kind, value: &Value, config: &JsonConfig) -> Json {
    match (kind, value) {
        (Kind::Scalar(_) | Kind::Wrapper(_), value) => encode_scalar(value),
        (Kind::Enum(id), Value::EnumNumber(number)) => {
            let enumeration = parent.related_enum(id);
            if enumeration.full_name() == wkt::NULL_VALUE {
                return Json::Null;
            }
            match enumeration.value_by_number(*number) {
                Some(value) => Json::String(value.name().to_owned()),
                None => Json::from(*number),
            }
        }
        (Kind::Message(_), Value::Message(message)) => encode_message(message, config),
        (kind, value) => {
            unreachable!("{} value stored in a {kind:?} field", value.type_name())
        }
    }
}

/// 64-bit integers are written as strings, they do not survive a round trip
/// through a double.
pub(crate) fn encode_scalar(value: &Value) -> Json {
    match value {
        Value::Bool(v) => Json::Bool(*v),
        Value::I32(v) => Json::from(*v),
        Value::U32(v) => Json::from(*v),
        Value::I64(v) => Json::String(v.to_string()),
        Value::U64(v) => Json::String(v.to_string()),
        Value::F32(v) => number::from_float(*v),
        Value::F64(v) => number::from_double(*v),
        Value::String(v) => Json::String(v.clone()),
        Value::Bytes(v) => Json::String(STANDARD.encode(v)),
        value => unreachable!("{} is not a scalar", value.type_name()),
    }
}
