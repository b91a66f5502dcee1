//! Map field support.
//!
//! Maps are syntactic sugar for `repeated Entry { K key = 1; V value = 2; }`.
//! Each entry is encoded as a length-delimited record with two fields:
//!
//! ```text
//! [field_tag, LEN] [entry_len] [key_tag=1] [key] [value_tag=2] [value]
//! ```
//!
//! Like any message field, a key or scalar value equal to its default is
//! left out of the entry. A message value is written whenever it is present,
//! an absent one produces an entry holding only the key.

use bytes::{Buf, BufMut, Bytes};

use crate::codec::{decode, encode, scalar, size, DecodeOptions};
use crate::descriptor::{Kind, MapEntry, MessageDescriptor};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::value::{MapKey, Value};
use crate::wire;

const KEY_TAG: u32 = 1;
const VALUE_TAG: u32 = 2;

/// Decode the body of one map entry.
///
/// A missing key reads as the key type's default. A missing scalar or enum
/// value reads as its default, a missing message value stays absent.
pub(crate) fn decode_entry(
    parent: &MessageDescriptor,
    entry: MapEntry,
    mut data: Bytes,
    options: &DecodeOptions,
    depth: u32,
) -> Result<(MapKey, Option<Value>), DecodeError> {
    let mut key = None;
    let mut value: Option<Value> = None;

    while data.has_remaining() {
        let (wire_type, tag) = wire::decode_key(&mut data)?.into_parts();
        match tag {
            KEY_TAG if wire_type == entry.key.wire_type() => {
                key = Some(scalar::decode_scalar(entry.key, &mut data)?);
            }
            VALUE_TAG if wire_type == entry.value.wire_type() => {
                let decoded = decode::decode_value(parent, entry.value, &mut data, options, depth)?;
                value = match (value, decoded) {
                    (Some(Value::Message(existing)), Value::Message(decoded)) => {
                        Some(Value::Message(existing.merge(&decoded)))
                    }
                    (_, decoded) => Some(decoded),
                };
            }
            _ => wire::skip_field(wire_type, tag, &mut data)?,
        }
    }

    let key = key.unwrap_or_else(|| entry.key.default_value());
    let key = MapKey::from_value(key).ok_or(DecodeErrorKind::InvalidWireType {
        value: entry.key.wire_type().into_val(),
    })?;
    let value = value.or_else(|| default_value(parent, entry.value));
    Ok((key, value))
}

fn default_value(parent: &MessageDescriptor, kind: Kind) -> Option<Value> {
    match kind {
        Kind::Scalar(scalar) => Some(scalar.default_value()),
        Kind::Enum(id) => Some(Value::EnumNumber(parent.related_enum(id).default_number())),
        Kind::Message(_) | Kind::Wrapper(_) => None,
    }
}

/// Returns true if `value` is written into the entry.
fn emit_value(kind: Kind, value: Option<&Value>) -> Option<&Value> {
    value.filter(|value| kind.is_message() || !value.is_zero())
}

/// Length of the entry body, without the outer key or length prefix.
pub(crate) fn entry_len(entry: MapEntry, key: &MapKey, value: Option<&Value>) -> usize {
    let key = key.to_value();
    let mut len = 0;
    if !key.is_zero() {
        len += wire::encoded_key_len(KEY_TAG) + scalar::scalar_len(entry.key, &key);
    }
    if let Some(value) = emit_value(entry.value, value) {
        len += wire::encoded_key_len(VALUE_TAG) + size::value_len(entry.value, value);
    }
    len
}

/// Write the entry body, without the outer key or length prefix.
pub(crate) fn encode_entry<B: BufMut>(entry: MapEntry, key: &MapKey, value: Option<&Value>, buf: &mut B) {
    let key = key.to_value();
    if !key.is_zero() {
        wire::encode_key(entry.key.wire_type(), KEY_TAG, buf);
        scalar::encode_scalar(entry.key, &key, buf);
    }
    if let Some(value) = emit_value(entry.value, value) {
        wire::encode_key(entry.value.wire_type(), VALUE_TAG, buf);
        encode::encode_value(entry.value, value, buf);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::descriptor::{DescriptorPool, FieldDef, MessageDef, Scalar};

    fn pool() -> Arc<DescriptorPool> {
        let mut builder = DescriptorPool::builder();
        let holder = builder.declare_message("test.Holder").unwrap();
        builder
            .define_message(
                holder,
                MessageDef::proto3().field(FieldDef::map(
                    "m",
                    1,
                    Scalar::String,
                    Kind::Scalar(Scalar::Int32),
                )),
            )
            .unwrap();
        builder.build().unwrap()
    }

    fn entry() -> MapEntry {
        MapEntry {
            key: Scalar::String,
            value: Kind::Scalar(Scalar::Int32),
        }
    }

    #[test]
    fn test_entry_roundtrip() {
        let key = MapKey::from("a");
        let value = Value::I32(150);
        let mut buf = Vec::new();
        encode_entry(entry(), &key, Some(&value), &mut buf);
        assert_eq!(buf, [0x0A, 1, b'a', 0x10, 0x96, 0x01]);
        assert_eq!(entry_len(entry(), &key, Some(&value)), buf.len());

        let pool = pool();
        let parent = pool.get_message_by_name("test.Holder").unwrap();
        let (k, v) =
            decode_entry(&parent, entry(), Bytes::from(buf), &DecodeOptions::default(), 0).unwrap();
        assert_eq!(k, key);
        assert_eq!(v, Some(value));
    }

    #[test]
    fn test_defaults_are_omitted() {
        let mut buf = Vec::new();
        encode_entry(entry(), &MapKey::from(""), Some(&Value::I32(0)), &mut buf);
        assert!(buf.is_empty());

        let pool = pool();
        let parent = pool.get_message_by_name("test.Holder").unwrap();
        let (k, v) =
            decode_entry(&parent, entry(), Bytes::new(), &DecodeOptions::default(), 0).unwrap();
        assert_eq!(k, MapKey::from(""));
        assert_eq!(v, Some(Value::I32(0)));
    }

    #[test]
    fn test_value_before_key() {
        let pool = pool();
        let parent = pool.get_message_by_name("test.Holder").unwrap();
        let data = Bytes::from_static(&[0x10, 0x05, 0x0A, 1, b'z']);
        let (k, v) = decode_entry(&parent, entry(), data, &DecodeOptions::default(), 0).unwrap();
        assert_eq!(k, MapKey::from("z"));
        assert_eq!(v, Some(Value::I32(5)));
    }
}
