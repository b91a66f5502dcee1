//! Binary decoding.
//!
//! The decoder walks the tagged fields of a message, dispatching each one on
//! the field descriptor for its number. Fields the schema does not know, or
//! that arrive with a wire type the field cannot accept, are kept verbatim as
//! unknown fields.

use bytes::{Buf, Bytes};

use crate::codec::{map, packed, scalar, wrappers, DecodeOptions};
use crate::descriptor::{FieldDescriptor, Kind, MessageDescriptor};
use crate::error::{DecodeError, DecodeErrorKind};
use crate::message::{MessageBuilder, MessageValue};
use crate::unknown::UnknownValue;
use crate::util::unlikely;
use crate::value::Value;
use crate::wire::{self, WireType};

/// Decode `buf` to its end as a message of type `descriptor`.
pub(crate) fn decode_message(
    descriptor: &MessageDescriptor,
    buf: &mut Bytes,
    options: &DecodeOptions,
    depth: u32,
) -> Result<MessageValue, DecodeError> {
    let name = descriptor.full_name();
    if unlikely(depth > options.recursion_limit) {
        return Err(DecodeError::new(DecodeErrorKind::RecursionLimitExceeded {
            limit: options.recursion_limit,
        })
        .in_message(name, None));
    }

    let mut builder = MessageBuilder::new(descriptor.clone());
    while buf.has_remaining() {
        let (wire_type, number) = wire::decode_key(buf)
            .map_err(|err| err.in_message(name, None))?
            .into_parts();

        let field = descriptor
            .field_by_number(number)
            .or_else(|| descriptor.extension_by_number(number))
            .filter(|field| field.accepts_wire_type(wire_type));
        match field {
            Some(field) => decode_field(&mut builder, field, wire_type, buf, options, depth)
                .map_err(|err| err.in_message(name, Some(field.name())))?,
            None => {
                tracing::trace!(message = name, number, ?wire_type, "preserving unknown field");
                let raw = wire::read_raw_value(wire_type, number, buf)
                    .map_err(|err| err.in_message(name, None))?;
                builder.add_unknown(number, UnknownValue::new(wire_type, raw));
            }
        }
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

fn decode_field(
    builder: &mut MessageBuilder,
    field: &FieldDescriptor,
    wire_type: WireType,
    buf: &mut Bytes,
    options: &DecodeOptions,
    depth: u32,
) -> Result<(), DecodeError> {
    if let Some(entry) = field.map_entry() {
        let data = wire::split_len_delimited(buf)?;
        let (key, value) = map::decode_entry(builder.descriptor(), entry, data, options, depth)?;
        builder.insert_unchecked(field, key, value);
        return Ok(());
    }

    if field.is_repeated() {
        // Packed and unpacked occurrences may be freely mixed, parsers must
        // accept both no matter how the field is declared.
        if wire_type == WireType::Len && field.kind().is_packable() {
            let data = wire::split_len_delimited(buf)?;
            let mut values = Vec::new();
            packed::decode_packed(field.kind(), data, &mut values)?;
            builder.extend_unchecked(field, values);
        } else {
            let value = decode_value(builder.descriptor(), field.kind(), buf, options, depth)?;
            builder.push_unchecked(field, value);
        }
        return Ok(());
    }

    let value = decode_value(builder.descriptor(), field.kind(), buf, options, depth)?;
    builder.set_unchecked(field, value);
    Ok(())
}

/// Decode a single value of `kind`. Message types are resolved through
/// `parent`'s pool.
pub(crate) fn decode_value(
    parent: &MessageDescriptor,
    kind: Kind,
    buf: &mut Bytes,
    options: &DecodeOptions,
    depth: u32,
) -> Result<Value, DecodeError> {
    match kind {
        Kind::Scalar(s) => scalar::decode_scalar(s, buf),
        Kind::Enum(_) => scalar::decode_enum(buf),
        Kind::Message(id) => {
            // The submessage reads its slice to the end, so an overrun of the
            // declared length surfaces as truncation inside it.
            let mut data = wire::split_len_delimited(buf)?;
            let descriptor = parent.related_message(id);
            let message = decode_message(&descriptor, &mut data, options, depth + 1)?;
            Ok(Value::Message(message))
        }
        Kind::Wrapper(s) => wrappers::decode_wrapper(s, wire::split_len_delimited(buf)?),
    }
}
