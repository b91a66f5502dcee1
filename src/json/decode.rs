//! JSON decoding.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use bytes::Bytes;
use serde_json::Value as Json;

use crate::descriptor::{EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor, Scalar};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::json::{number, JsonConfig};
use crate::message::{MessageBuilder, MessageValue};
use crate::value::{MapKey, MapValue, Value};
use crate::wkt;

const PADDING_INDIFFERENT: GeneralPurposeConfig =
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent);
const STANDARD: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, PADDING_INDIFFERENT);
const URL_SAFE: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, PADDING_INDIFFERENT);

/// Decode `json` as a message of type `descriptor`.
pub(crate) fn decode_message(
    descriptor: &MessageDescriptor,
    json: &Json,
    config: &JsonConfig,
) -> Result<MessageValue, DecodeError> {
    if let Some(adapter) = config.adapter_for(descriptor.full_name()) {
        return adapter
            .decode(descriptor, json, config)
            .map_err(|err| err.in_message(descriptor.full_name(), None));
    }
    decode_object(descriptor, json, config)
}

/// Decode `json` with the generic object mapping, ignoring adapters for
/// `descriptor` itself.
pub(crate) fn decode_object(
    descriptor: &MessageDescriptor,
    json: &Json,
    config: &JsonConfig,
) -> Result<MessageValue, DecodeError> {
    let name = descriptor.full_name();
    let Json::Object(object) = json else {
        return Err(DecodeError::invalid_json_type("object").in_message(name, None));
    };

    let mut builder = MessageBuilder::new(descriptor.clone());
    let mut oneof_keys: Vec<Option<&str>> = vec![None; descriptor.oneofs().len()];
    for (key, value) in object {
        let Some(field) = lookup(descriptor, key) else {
            if config.ignore_unknown_fields {
                tracing::trace!(message = name, key = key.as_str(), "skipping unknown JSON key");
                continue;
            }
            return Err(
                DecodeError::new(DecodeErrorKind::UnknownFieldRejected { name: key.clone() })
                    .in_message(name, None),
            );
        };

        let decoded = decode_field(descriptor, field, value, config)
            .map_err(|err| err.in_message(name, Some(field.name())))?;
        let Some(decoded) = decoded else {
            continue;
        };

        if let Some(index) = field.oneof_index() {
            if oneof_keys[index].replace(key.as_str()).is_some() {
                let oneof = descriptor.oneofs()[index].name().to_owned();
                return Err(DecodeError::new(DecodeErrorKind::OneofConflict { oneof })
                    .in_message(name, Some(field.name())));
            }
        }
        builder.set_unchecked(field, decoded);
    }

    let message = builder.build();
    if let Some(field) = message.missing_required() {
        return Err(DecodeError::new(DecodeErrorKind::MissingRequiredField {
            name: field.full_name().to_owned(),
        })
        .in_message(name, Some(field.name())));
    }
    Ok(message)
}

fn lookup<'a>(descriptor: &'a MessageDescriptor, key: &str) -> Option<&'a FieldDescriptor> {
    match key.strip_prefix('[').and_then(|k| k.strip_suffix(']')) {
        Some(extension) => descriptor.extension_by_name(extension),
        None => descriptor.field_by_name(key),
    }
}

/// Decode the value of a whole field. `None` leaves the field unset.
fn decode_field(
    parent: &MessageDescriptor,
    field: &FieldDescriptor,
    json: &Json,
    config: &JsonConfig,
) -> Result<Option<Value>, DecodeError> {
    let kind = field.kind();
    if json.is_null() && !(accepts_null(parent, kind) && !field.is_repeated() && !field.is_map()) {
        return Ok(None);
    }

    if let Some(entry) = field.map_entry() {
        let Json::Object(object) = json else {
            return Err(DecodeError::invalid_json_type("object"));
        };
        let mut map = MapValue::new();
        for (key, value) in object {
            let key = decode_map_key(entry.key, key)?;
            if let Some(value) = decode_element(parent, entry.value, value, config)? {
                map.insert(key, value);
            }
        }
        return Ok((!map.is_empty()).then_some(Value::Map(map)));
    }

    if field.is_repeated() {
        let Json::Array(array) = json else {
            return Err(DecodeError::invalid_json_type("array"));
        };
        let mut values = Vec::with_capacity(array.len());
        for element in array {
            values.extend(decode_element(parent, kind, element, config)?);
        }
        return Ok((!values.is_empty()).then_some(Value::List(values)));
    }

    decode_value(parent, kind, json, config)
}

/// An element of a list or a map value, where `null` is only valid for
/// kinds that give it a meaning.
fn decode_element(
    parent: &MessageDescriptor,
    kind: Kind,
    json: &Json,
    config: &JsonConfig,
) -> Result<Option<Value>, DecodeError> {
    if json.is_null() && !accepts_null(parent, kind) {
        return Err(DecodeError::invalid_json_type("non-null element"));
    }
    decode_value(parent, kind, json, config)
}

fn accepts_null(parent: &MessageDescriptor, kind: Kind) -> bool {
    match kind {
        Kind::Message(id) => parent.related_message(id).full_name() == wkt::VALUE,
        Kind::Enum(id) => parent.related_enum(id).full_name() == wkt::NULL_VALUE,
        Kind::Scalar(_) | Kind::Wrapper(_) => false,
    }
}

/// Decode a single value of `kind`. `None` is an unknown enum value skipped
/// under `ignore_unknown_fields`.
pub(crate) fn decode_value(
    parent: &MessageDescriptor,
    kind: Kind,
    json: &Json,
    config: &JsonConfig,
) -> Result<Option<Value>, DecodeError> {
    match kind {
        Kind::Scalar(scalar) | Kind::Wrapper(scalar) => decode_scalar(scalar, json).map(Some),
        Kind::Enum(id) => decode_enum(&parent.related_enum(id), json, config),
        Kind::Message(id) => {
            let descriptor = parent.related_message(id);
            decode_message(&descriptor, json, config).map(|m| Some(Value::Message(m)))
        }
    }
}

pub(crate) fn decode_scalar(scalar: Scalar, json: &Json) -> Result<Value, DecodeError> {
    Ok(match scalar {
        Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32 => {
            Value::I32(number::narrow(number::integer(json)?)?)
        }
        Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64 => {
            Value::I64(number::narrow(number::integer(json)?)?)
        }
        Scalar::Uint32 | Scalar::Fixed32 => Value::U32(number::narrow(number::integer(json)?)?),
        Scalar::Uint64 | Scalar::Fixed64 => Value::U64(number::narrow(number::integer(json)?)?),
        Scalar::Float => Value::F32(number::float(json)?),
        Scalar::Double => Value::F64(number::double(json)?),
        Scalar::Bool => Value::Bool(
            json.as_bool()
                .ok_or_else(|| DecodeError::invalid_json_type("bool"))?,
        ),
        Scalar::String => Value::String(
            json.as_str()
                .ok_or_else(|| DecodeError::invalid_json_type("string"))?
                .to_owned(),
        ),
        Scalar::Bytes => {
            let text = json
                .as_str()
                .ok_or_else(|| DecodeError::invalid_json_type("base64 string"))?;
            Value::Bytes(decode_base64(text)?)
        }
    })
}

fn decode_base64(text: &str) -> Result<Bytes, DecodeError> {
    let engine = if text.contains(['-', '_']) {
        &URL_SAFE
    } else {
        &STANDARD
    };
    engine
        .decode(text)
        .map(Bytes::from)
        .map_err(|err| DecodeError::invalid_json_type("base64 string").with_source(err))
}

fn decode_enum(
    enumeration: &EnumDescriptor,
    json: &Json,
    config: &JsonConfig,
) -> Result<Option<Value>, DecodeError> {
    let number = match json {
        Json::Number(_) => number::integer(json)
            .ok()
            .and_then(|v| i32::try_from(v).ok()),
        Json::String(name) => enumeration.value_by_name(name).map(|v| v.number()),
        Json::Null if enumeration.full_name() == wkt::NULL_VALUE => Some(0),
        _ => None,
    };
    match number {
        Some(number) => Ok(Some(Value::EnumNumber(number))),
        None if config.ignore_unknown_fields => {
            tracing::trace!(
                enumeration = enumeration.full_name(),
                %json,
                "skipping unknown enum value"
            );
            Ok(None)
        }
        None => Err(DecodeError::invalid_json_type("enum name or number")),
    }
}

/// Map keys are always JSON strings, parsed per the key type.
fn decode_map_key(scalar: Scalar, key: &str) -> Result<MapKey, DecodeError> {
    Ok(match scalar {
        Scalar::Bool => match key {
            "true" => MapKey::Bool(true),
            "false" => MapKey::Bool(false),
            _ => return Err(DecodeError::invalid_json_type("bool")),
        },
        Scalar::String => MapKey::String(key.to_owned()),
        Scalar::Int32 | Scalar::Sint32 | Scalar::Sfixed32 => {
            MapKey::I32(number::narrow(number::parse_integer(key)?)?)
        }
        Scalar::Int64 | Scalar::Sint64 | Scalar::Sfixed64 => {
            MapKey::I64(number::narrow(number::parse_integer(key)?)?)
        }
        Scalar::Uint32 | Scalar::Fixed32 => MapKey::U32(number::narrow(number::parse_integer(key)?)?),
        Scalar::Uint64 | Scalar::Fixed64 => MapKey::U64(number::narrow(number::parse_integer(key)?)?),
        Scalar::Float | Scalar::Double | Scalar::Bytes => {
            return Err(DecodeError::invalid_json_type("map key"))
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::descriptor::{DescriptorPool, FieldDef, MessageDef};

    fn pool() -> Arc<DescriptorPool> {
        let mut builder = DescriptorPool::builder();
        let wkt = wkt::register(&mut builder).unwrap();
        let all = builder.declare_message("test.All").unwrap();
        let strict = builder.declare_message("test.Strict").unwrap();
        let color = builder
            .declare_enum("test.Color", [("RED", 0), ("GREEN", 1)])
            .unwrap();
        builder
            .define_message(
                all,
                MessageDef::proto3().fields([
                    FieldDef::scalar("optional_int32", 1, Scalar::Int32),
                    FieldDef::scalar("optional_bool", 2, Scalar::Bool),
                    FieldDef::scalar("optional_bytes", 3, Scalar::Bytes),
                    FieldDef::enumeration("color", 4, color),
                    FieldDef::enumeration("colors", 5, color).repeated(),
                    FieldDef::map("by_flag", 6, Scalar::Bool, Kind::Enum(color)),
                    FieldDef::map("by_id", 7, Scalar::Sint64, Kind::Scalar(Scalar::String)),
                    FieldDef::scalar("a", 8, Scalar::String).oneof("choice"),
                    FieldDef::scalar("b", 9, Scalar::Int32).oneof("choice"),
                    FieldDef::message("dynamic", 10, wkt.value),
                    FieldDef::wrapper("maybe", 11, Scalar::Int32),
                    FieldDef::scalar("optional_float", 12, Scalar::Float),
                    FieldDef::scalar("numbers", 13, Scalar::Int32).repeated(),
                    FieldDef::scalar("renamed", 14, Scalar::Int32).json_name("otherName"),
                ]),
            )
            .unwrap();
        builder
            .define_message(
                strict,
                MessageDef::proto2().field(FieldDef::scalar("needed", 1, Scalar::Int32).required()),
            )
            .unwrap();
        builder
            .define_extension(strict, "test.extra", FieldDef::scalar("extra", 100, Scalar::String))
            .unwrap();
        builder.build().unwrap()
    }

    fn decode(json: Json) -> Result<MessageValue, DecodeError> {
        let pool = pool();
        let all = pool.get_message_by_name("test.All").unwrap();
        decode_message(&all, &json, &JsonConfig::default())
    }

    fn decode_lenient(json: Json) -> Result<MessageValue, DecodeError> {
        let pool = pool();
        let all = pool.get_message_by_name("test.All").unwrap();
        let mut config = JsonConfig::default();
        config.ignore_unknown_fields(true);
        decode_message(&all, &json, &config)
    }

    #[test]
    fn test_field_names() {
        let by_json = decode(json!({ "optionalInt32": 1 })).unwrap();
        let by_proto = decode(json!({ "optional_int32": 1 })).unwrap();
        assert_eq!(by_json, by_proto);

        let custom = decode(json!({ "otherName": 2 })).unwrap();
        assert_eq!(custom.get("renamed"), Some(&Value::I32(2)));
        assert_eq!(decode(json!({ "renamed": 2 })).unwrap(), custom);
    }

    #[test]
    fn test_unknown_keys() {
        let err = decode(json!({ "nope": 1 })).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::UnknownFieldRejected { name: "nope".into() }
        );
        assert!(decode_lenient(json!({ "nope": 1 })).is_ok());
    }

    #[test]
    fn test_null_is_unset() {
        let message = decode(json!({ "optionalInt32": null, "color": null })).unwrap();
        assert_eq!(message.fields().count(), 0);
    }

    #[test]
    fn test_null_for_dynamic_value() {
        let message = decode(json!({ "dynamic": null })).unwrap();
        let value = message.get("dynamic").and_then(Value::as_message).unwrap();
        assert_eq!(value.get("null_value"), Some(&Value::EnumNumber(0)));
    }

    #[test]
    fn test_null_list_element() {
        let err = decode(json!({ "numbers": [1, null] })).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::InvalidJsonType { .. }));
        assert_eq!(err.field_name(), Some("numbers"));
    }

    #[test]
    fn test_bool_must_be_bare() {
        assert!(decode(json!({ "optionalBool": "true" })).is_err());
        let message = decode(json!({ "optionalBool": true, "byFlag": { "true": "GREEN" } })).unwrap();
        let map = message.get("by_flag").and_then(Value::as_map).unwrap();
        assert_eq!(map.get(&MapKey::Bool(true)), Some(Some(&Value::EnumNumber(1))));
        assert!(decode(json!({ "byFlag": { "yes": "GREEN" } })).is_err());
    }

    #[test]
    fn test_map_keys() {
        let message = decode(json!({ "byId": { "-5": "a", "7": "b" } })).unwrap();
        let map = message.get("by_id").and_then(Value::as_map).unwrap();
        assert_eq!(map.get(&MapKey::I64(-5)), Some(Some(&Value::from("a"))));
        assert!(decode(json!({ "byId": { "05": "a" } })).is_err());
    }

    #[test]
    fn test_enums() {
        let message = decode(json!({ "color": "GREEN", "colors": [1, "RED", 7] })).unwrap();
        assert_eq!(message.get("color"), Some(&Value::EnumNumber(1)));
        assert_eq!(
            message.get("colors"),
            Some(&Value::List(vec![
                Value::EnumNumber(1),
                Value::EnumNumber(0),
                Value::EnumNumber(7)
            ]))
        );

        let err = decode(json!({ "color": "BLUE" })).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::InvalidJsonType { .. }));

        let lenient = decode_lenient(json!({
            "color": "BLUE",
            "colors": ["BLUE", "GREEN"],
            "byFlag": { "true": "BLUE", "false": "RED" },
        }))
        .unwrap();
        assert!(!lenient.has("color"));
        assert_eq!(lenient.get("colors"), Some(&Value::from(vec![Value::EnumNumber(1)])));
        let map = lenient.get("by_flag").and_then(Value::as_map).unwrap();
        assert_eq!(map.len(), 1);
        assert!(map.contains_key(&MapKey::Bool(false)));
    }

    #[test]
    fn test_oneof_conflict() {
        let err = decode(json!({ "a": "x", "b": 1 })).unwrap_err();
        assert_eq!(
            err.kind(),
            &DecodeErrorKind::OneofConflict { oneof: "choice".into() }
        );
        let message = decode(json!({ "a": null, "b": 0 })).unwrap();
        assert_eq!(message.which_oneof("choice").map(|f| f.name()), Some("b"));
    }

    #[test]
    fn test_bytes() {
        let standard = decode(json!({ "optionalBytes": "+/8=" })).unwrap();
        let url_safe = decode(json!({ "optionalBytes": "-_8" })).unwrap();
        assert_eq!(standard, url_safe);
        assert_eq!(
            standard.get("optional_bytes"),
            Some(&Value::Bytes(Bytes::from_static(&[0xfb, 0xff])))
        );
        let err = decode(json!({ "optionalBytes": "!!" })).unwrap_err();
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_wrapper_fields() {
        let message = decode(json!({ "maybe": 0 })).unwrap();
        assert_eq!(message.get("maybe"), Some(&Value::I32(0)));
        assert!(!decode(json!({ "maybe": null })).unwrap().has("maybe"));
    }

    #[test]
    fn test_float_sentinels() {
        let message = decode(json!({ "optionalFloat": "Infinity" })).unwrap();
        assert_eq!(message.get("optional_float"), Some(&Value::F32(f32::INFINITY)));
        let err = decode(json!({ "optionalFloat": 1e40 })).unwrap_err();
        assert_eq!(err.kind(), &DecodeErrorKind::NumberOutOfRange);
    }

    #[test]
    fn test_required_and_extensions() {
        let pool = pool();
        let strict = pool.get_message_by_name("test.Strict").unwrap();
        let config = JsonConfig::default();

        let err = decode_message(&strict, &json!({ "[test.extra]": "x" }), &config).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::MissingRequiredField { .. }));

        let message =
            decode_message(&strict, &json!({ "needed": 0, "[test.extra]": "x" }), &config).unwrap();
        assert_eq!(message.get("needed"), Some(&Value::I32(0)));
        assert_eq!(message.extension("test.extra"), Some(&Value::from("x")));
    }

    #[test]
    fn test_not_an_object() {
        let err = decode(json!([1])).unwrap_err();
        assert!(matches!(err.kind(), DecodeErrorKind::InvalidJsonType { .. }));
        assert_eq!(err.message_name(), Some("test.All"));
    }
}
