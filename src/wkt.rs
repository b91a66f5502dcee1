//! Well-known types from the `google.protobuf` package.
//!
//! [`register`] adds their descriptors to a pool under construction. Their
//! special JSON forms are implemented by the adapters in `json::wkt`, which
//! are keyed by the names defined here.

use crate::descriptor::{EnumId, FieldDef, Kind, MessageDef, MessageId, PoolBuilder, Scalar};
use crate::error::SchemaError;

pub const DURATION: &str = "google.protobuf.Duration";
pub const TIMESTAMP: &str = "google.protobuf.Timestamp";
pub const FIELD_MASK: &str = "google.protobuf.FieldMask";
pub const STRUCT: &str = "google.protobuf.Struct";
pub const VALUE: &str = "google.protobuf.Value";
pub const LIST_VALUE: &str = "google.protobuf.ListValue";
pub const EMPTY: &str = "google.protobuf.Empty";
pub const NULL_VALUE: &str = "google.protobuf.NullValue";

/// Scalars that have a `google.protobuf.*Value` wrapper message.
pub const WRAPPED_SCALARS: [Scalar; 9] = [
    Scalar::Double,
    Scalar::Float,
    Scalar::Int64,
    Scalar::Uint64,
    Scalar::Int32,
    Scalar::Uint32,
    Scalar::Bool,
    Scalar::String,
    Scalar::Bytes,
];

/// Ids of the registered well-known types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WellKnownTypes {
    pub duration: MessageId,
    pub timestamp: MessageId,
    pub field_mask: MessageId,
    pub struct_type: MessageId,
    pub value: MessageId,
    pub list_value: MessageId,
    pub empty: MessageId,
    pub null_value: EnumId,
}

/// Declare and define the well-known types in `builder`.
pub fn register(builder: &mut PoolBuilder) -> Result<WellKnownTypes, SchemaError> {
    let null_value = builder.declare_enum(NULL_VALUE, [("NULL_VALUE", 0)])?;
    let duration = builder.declare_message(DURATION)?;
    let timestamp = builder.declare_message(TIMESTAMP)?;
    let field_mask = builder.declare_message(FIELD_MASK)?;
    let struct_type = builder.declare_message(STRUCT)?;
    let value = builder.declare_message(VALUE)?;
    let list_value = builder.declare_message(LIST_VALUE)?;
    let empty = builder.declare_message(EMPTY)?;

    let seconds_and_nanos = || {
        MessageDef::proto3()
            .field(FieldDef::scalar("seconds", 1, Scalar::Int64))
            .field(FieldDef::scalar("nanos", 2, Scalar::Int32))
    };
    builder.define_message(duration, seconds_and_nanos())?;
    builder.define_message(timestamp, seconds_and_nanos())?;
    builder.define_message(
        field_mask,
        MessageDef::proto3().field(FieldDef::scalar("paths", 1, Scalar::String).repeated()),
    )?;
    builder.define_message(
        struct_type,
        MessageDef::proto3().field(FieldDef::map("fields", 1, Scalar::String, Kind::Message(value))),
    )?;
    builder.define_message(
        value,
        MessageDef::proto3().fields([
            FieldDef::enumeration("null_value", 1, null_value).oneof("kind"),
            FieldDef::scalar("number_value", 2, Scalar::Double).oneof("kind"),
            FieldDef::scalar("string_value", 3, Scalar::String).oneof("kind"),
            FieldDef::scalar("bool_value", 4, Scalar::Bool).oneof("kind"),
            FieldDef::message("struct_value", 5, struct_type).oneof("kind"),
            FieldDef::message("list_value", 6, list_value).oneof("kind"),
        ]),
    )?;
    builder.define_message(
        list_value,
        MessageDef::proto3().field(FieldDef::message("values", 1, value).repeated()),
    )?;
    builder.define_message(empty, MessageDef::proto3())?;

    for scalar in WRAPPED_SCALARS {
        if let Some(name) = scalar.wrapper_name() {
            let id = builder.declare_message(name)?;
            builder.define_message(id, MessageDef::proto3().field(FieldDef::scalar("value", 1, scalar)))?;
        }
    }

    Ok(WellKnownTypes {
        duration,
        timestamp,
        field_mask,
        struct_type,
        value,
        list_value,
        empty,
        null_value,
    })
}

/// The scalar wrapped by the named wrapper message, if it is one.
pub fn wrapped_scalar(full_name: &str) -> Option<Scalar> {
    WRAPPED_SCALARS
        .into_iter()
        .find(|scalar| scalar.wrapper_name() == Some(full_name))
}
